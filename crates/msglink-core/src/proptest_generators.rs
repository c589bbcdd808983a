//! Property-based test generators for links.
//!
//! Provides `proptest` strategies for usernames, HTTP links and deep-link
//! schemes, plus the properties that tie classification and generation
//! together.

use proptest::prelude::*;

use crate::link::AdministratorRights;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Shared proptest configuration: 1 000 cases, generous shrink budget.
#[must_use]
pub fn proptest_config() -> ProptestConfig {
    ProptestConfig {
        cases: 1000,
        max_shrink_iters: 5000,
        ..ProptestConfig::default()
    }
}

/// First path segments of t.me that are never usernames.
const T_ME_PATH_WORDS: [&str; 18] = [
    "c",
    "bg",
    "contact",
    "joinchat",
    "addstickers",
    "addemoji",
    "addtheme",
    "invoice",
    "login",
    "setlanguage",
    "list",
    "confirmphone",
    "proxy",
    "socks",
    "share",
    "msg",
    "iv",
    "s",
];

// ─── Leaf strategies ─────────────────────────────────────────────────────────

/// Strategy for a valid username: letter first, single inner underscores.
pub fn arb_username() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-zA-Z][a-zA-Z0-9]{3,26}(_[a-zA-Z0-9]{1,3})?")
        .expect("valid regex")
        .prop_filter("t.me path word", |name| {
            !T_ME_PATH_WORDS.contains(&name.to_ascii_lowercase().as_str())
        })
}

/// Strategy for usernames of 31 to 33 characters, straddling the limit.
pub fn arb_long_username() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-zA-Z][a-zA-Z0-9]{30,32}").expect("valid regex")
}

/// Strategy for any combination of the twelve administrator rights.
pub fn arb_rights() -> impl Strategy<Value = AdministratorRights> {
    proptest::array::uniform12(any::<bool>()).prop_map(|flags| AdministratorRights {
        manage_chat: flags[0],
        change_info: flags[1],
        post_messages: flags[2],
        edit_messages: flags[3],
        delete_messages: flags[4],
        invite_users: flags[5],
        restrict_members: flags[6],
        pin_messages: flags[7],
        manage_topics: flags[8],
        promote_members: flags[9],
        manage_video_chats: flags[10],
        is_anonymous: flags[11],
    })
}

/// Strategy for a start parameter: `[A-Za-z0-9_-]{1,64}`.
pub fn arb_start_parameter() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z0-9_-]{1,64}").expect("valid regex")
}

/// Strategy for an HTTP(S) link with a mixed-case host and a plain path.
pub fn arb_http_link() -> impl Strategy<Value = String> {
    (
        prop_oneof![Just("http"), Just("https"), Just("HTTPS")],
        proptest::string::string_regex("[a-zA-Z0-9]{1,12}\\.[a-zA-Z]{2,6}").expect("valid regex"),
        proptest::string::string_regex("(/[a-zA-Z0-9_.-]{1,10}){1,3}").expect("valid regex"),
    )
        .prop_map(|(scheme, host, path)| format!("{scheme}://{host}{path}"))
}

/// Strategy for every capitalization of `tg`.
pub fn arb_tg_scheme() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("tg"), Just("Tg"), Just("tG"), Just("TG")]
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::link::rules::MAX_BOT_USER_ID;
    use crate::link::{InternalLink, LinkManager};
    use crate::url::check_link;

    /// Generate `link` and classify the result again.
    fn regenerate(link: &InternalLink, is_internal: bool) -> Result<Option<InternalLink>, Error> {
        let manager = LinkManager::default();
        let url = manager.get_internal_link(link, is_internal)?;
        Ok(manager.parse_internal_link(&url, false))
    }

    fn is_invalid(result: &Result<Option<InternalLink>, Error>, name: &str) -> bool {
        matches!(result, Err(Error::InvalidField { field, .. }) if *field == name)
    }

    proptest! {
        #![proptest_config(proptest_config())]

        /// Canonical HTTP links are fixed points of `check_link`.
        #[test]
        fn proptest_check_link_idempotent(link in arb_http_link()) {
            let once = check_link(&link);
            prop_assert!(once.is_ok(), "rejected {link}: {once:?}");
            let once = once.unwrap_or_default();
            prop_assert_eq!(check_link(&once).ok(), Some(once.clone()));
            prop_assert_eq!(once.to_ascii_lowercase(), link.to_ascii_lowercase());
        }

        /// The deep-link scheme is matched without regard to case.
        #[test]
        fn proptest_scheme_case_insensitive(
            scheme in arb_tg_scheme(),
            username in arb_username(),
        ) {
            let manager = LinkManager::default();
            let link = format!("{scheme}://resolve?domain={username}");
            prop_assert_eq!(
                manager.parse_internal_link(&link, false),
                Some(InternalLink::PublicChat { chat_username: username })
            );
        }

        /// Generated links classify back to the value they came from.
        #[test]
        fn proptest_bot_start_round_trip(
            username in arb_username(),
            start in arb_start_parameter(),
            is_internal in any::<bool>(),
        ) {
            let manager = LinkManager::default();
            let link = InternalLink::BotStart {
                bot_username: username,
                start_parameter: start,
                autostart: false,
            };
            let url = manager.get_internal_link(&link, is_internal);
            prop_assert!(url.is_ok(), "{url:?}");
            let url = url.unwrap_or_default();
            prop_assert_eq!(manager.parse_internal_link(&url, false), Some(link));
        }

        /// Channel rights are rendered normalized, or refused when none apply.
        #[test]
        fn proptest_bot_add_to_channel_rights(
            username in arb_username(),
            rights in arb_rights(),
            is_internal in any::<bool>(),
        ) {
            let link = InternalLink::BotAddToChannel {
                bot_username: username.clone(),
                administrator_rights: rights,
            };
            let result = regenerate(&link, is_internal);
            match rights.normalized_for_channel() {
                Some(normalized) => prop_assert_eq!(
                    result.ok(),
                    Some(Some(InternalLink::BotAddToChannel {
                        bot_username: username,
                        administrator_rights: normalized,
                    }))
                ),
                None => prop_assert!(is_invalid(&result, "administrator_rights"), "{result:?}"),
            }
        }

        /// Group rights are rendered normalized and dropped when none apply.
        #[test]
        fn proptest_bot_start_in_group_rights(
            username in arb_username(),
            start in prop_oneof![Just(String::new()), arb_start_parameter()],
            rights in proptest::option::of(arb_rights()),
            is_internal in any::<bool>(),
        ) {
            let link = InternalLink::BotStartInGroup {
                bot_username: username.clone(),
                start_parameter: start.clone(),
                administrator_rights: rights,
            };
            prop_assert_eq!(
                regenerate(&link, is_internal).ok(),
                Some(Some(InternalLink::BotStartInGroup {
                    bot_username: username,
                    start_parameter: start,
                    administrator_rights: rights.and_then(AdministratorRights::normalized_for_group),
                }))
            );
        }

        /// Passport bot ids outside `1..MAX_BOT_USER_ID` are never rendered.
        #[test]
        fn proptest_passport_bot_id_range(
            bot_user_id in prop_oneof![
                any::<i64>(),
                1..MAX_BOT_USER_ID,
                Just(MAX_BOT_USER_ID - 1),
                Just(MAX_BOT_USER_ID),
                Just(0_i64),
            ],
            scope in "[a-zA-Z0-9]{1,16}",
            public_key in "[a-zA-Z0-9]{1,16}",
            nonce in "[a-zA-Z0-9]{1,16}",
        ) {
            let link = InternalLink::PassportDataRequest {
                bot_user_id,
                scope,
                public_key,
                nonce,
                callback_url: String::new(),
            };
            let result = regenerate(&link, true);
            if (1..MAX_BOT_USER_ID).contains(&bot_user_id) {
                prop_assert_eq!(result.ok(), Some(Some(link)));
            } else {
                prop_assert!(is_invalid(&result, "bot_user_id"), "{result:?}");
            }
        }

        /// Usernames round-trip up to 32 characters and are refused beyond.
        #[test]
        fn proptest_username_length_limit(
            username in arb_long_username(),
            is_internal in any::<bool>(),
        ) {
            let link = InternalLink::PublicChat { chat_username: username.clone() };
            let result = regenerate(&link, is_internal);
            if username.len() <= 32 {
                prop_assert_eq!(result.ok(), Some(Some(link)));
            } else {
                prop_assert!(is_invalid(&result, "chat_username"), "{result:?}");
            }
        }

        /// Classification is stable once a link has been canonicalized.
        #[test]
        fn proptest_public_chat_idempotent(username in arb_username()) {
            let manager = LinkManager::default();
            let first = manager.parse_internal_link(&format!("t.me/{username}"), false);
            prop_assert_eq!(
                first.clone(),
                Some(InternalLink::PublicChat { chat_username: username })
            );
            if let Some(first) = first {
                for is_internal in [true, false] {
                    let url = manager.get_internal_link(&first, is_internal).unwrap_or_default();
                    prop_assert_eq!(manager.parse_internal_link(&url, false), Some(first.clone()));
                }
            }
        }
    }
}
