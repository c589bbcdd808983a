//! Rendering [`InternalLink`] values back into `tg://` or t.me links.

use super::LinkManager;
use super::background::BackgroundFill;
use super::proxy::normalize_secret;
use super::rules::{
    MAX_BOT_USER_ID, is_valid_folder_slug, is_valid_game_name, is_valid_invite_hash, is_valid_phone_number,
    is_valid_start_parameter, is_valid_username, is_valid_video_chat_hash, is_valid_web_app_name,
};
use super::types::{AdministratorRights, InternalLink, ProxyType, TargetChat};
use crate::error::{Error, LinkMode, Result};
use crate::url::url_encode;

fn check(valid: bool, field: &'static str, value: &str) -> Result<()> {
    if valid {
        Ok(())
    } else {
        Err(Error::invalid_field(field, format!("{value:?} is not allowed")))
    }
}

fn check_username(field: &'static str, value: &str) -> Result<()> {
    check(is_valid_username(value), field, value)
}

fn check_non_empty(field: &'static str, value: &str) -> Result<()> {
    check(!value.is_empty(), field, value)
}

fn check_start_parameter(value: &str) -> Result<()> {
    check(is_valid_start_parameter(value), "start_parameter", value)
}

/// `key` when `value` is empty, `key=<encoded>` otherwise.
fn optional_arg(key: &str, value: &str) -> String {
    if value.is_empty() {
        key.to_string()
    } else {
        format!("{key}={}", url_encode(value))
    }
}

/// Append `args` to `base`, opening the query when needed.
fn with_args(mut base: String, args: &[String]) -> String {
    for arg in args {
        base.push(if base.contains('?') { '&' } else { '?' });
        base.push_str(arg);
    }
    base
}

const fn unavailable(is_internal: bool) -> Error {
    Error::Unavailable(if is_internal {
        LinkMode::Deep
    } else {
        LinkMode::Http
    })
}

impl LinkManager {
    /// Render `link` as a `tg://` link (`is_internal`) or a t.me link.
    ///
    /// Fails with [`Error::Unavailable`] for variants that have no form in the
    /// requested flavour and with [`Error::InvalidField`] for malformed fields.
    pub fn get_internal_link(&self, link: &InternalLink, is_internal: bool) -> Result<String> {
        let result = self.render(link, is_internal);
        if let Err(err) = &result {
            tracing::debug!(
                kind = link.kind(),
                is_internal,
                error = %err,
                "internal link not generated"
            );
        }
        result
    }

    fn http(&self, path: &str) -> String {
        format!("{}{path}", self.t_me_url)
    }

    /// `tg://resolve?domain=<username>&args` or `<t.me>/<username>?args`.
    fn resolve(&self, is_internal: bool, username: &str, args: &[String]) -> String {
        if is_internal {
            with_args(format!("tg://resolve?domain={username}"), args)
        } else {
            with_args(self.http(username), args)
        }
    }

    /// `tg://<deep>` or `<t.me>/<http>`.
    fn either(&self, is_internal: bool, deep: &str, http: &str) -> String {
        if is_internal {
            format!("tg://{deep}")
        } else {
            self.http(http)
        }
    }

    #[allow(clippy::too_many_lines)]
    fn render(&self, link: &InternalLink, is_internal: bool) -> Result<String> {
        match link {
            InternalLink::ActiveSessions => settings_page(is_internal, "devices"),
            InternalLink::ChangePhoneNumber => settings_page(is_internal, "change_number"),
            InternalLink::DefaultMessageAutoDeleteTimerSettings => {
                settings_page(is_internal, "auto_delete")
            }
            InternalLink::EditProfileSettings => settings_page(is_internal, "edit_profile"),
            InternalLink::FolderSettings => settings_page(is_internal, "folders"),
            InternalLink::LanguageSettings => settings_page(is_internal, "language"),
            InternalLink::PrivacyAndSecuritySettings => settings_page(is_internal, "privacy"),
            InternalLink::ThemeSettings => settings_page(is_internal, "themes"),
            InternalLink::Settings => {
                if is_internal {
                    Ok("tg://settings".to_string())
                } else {
                    Err(unavailable(false))
                }
            }
            InternalLink::AttachmentMenuBot {
                target_chat,
                bot_username,
                start_parameter,
            } => self.attachment_menu_bot(is_internal, target_chat, bot_username, start_parameter),
            InternalLink::AuthenticationCode { code } => {
                check_non_empty("code", code)?;
                let code = url_encode(code);
                Ok(self.either(is_internal, &format!("login?code={code}"), &format!("login/{code}")))
            }
            InternalLink::Background { background_name } => {
                let fill = BackgroundFill::parse(background_name)?;
                Ok(self.either(
                    is_internal,
                    &format!("bg?{}", fill.deep_query()),
                    &format!("bg/{}", fill.http_name()),
                ))
            }
            InternalLink::BotAddToChannel {
                bot_username,
                administrator_rights,
            } => {
                check_username("bot_username", bot_username)?;
                let Some(rights) = administrator_rights.normalized_for_channel() else {
                    return Err(Error::invalid_field(
                        "administrator_rights",
                        "no right allowed in channels is set",
                    ));
                };
                let args = [
                    "startchannel".to_string(),
                    format!("admin={}", rights.to_query_value()),
                ];
                Ok(self.resolve(is_internal, bot_username, &args))
            }
            InternalLink::BotStart {
                bot_username,
                start_parameter,
                ..
            } => {
                check_username("bot_username", bot_username)?;
                check_start_parameter(start_parameter)?;
                let args = [format!("start={start_parameter}")];
                Ok(self.resolve(is_internal, bot_username, &args))
            }
            InternalLink::BotStartInGroup {
                bot_username,
                start_parameter,
                administrator_rights,
            } => {
                check_username("bot_username", bot_username)?;
                check_start_parameter(start_parameter)?;
                let mut args = vec![optional_arg("startgroup", start_parameter)];
                // Rights with nothing left after normalization are omitted.
                if let Some(rights) =
                    administrator_rights.and_then(AdministratorRights::normalized_for_group)
                {
                    args.push(format!("admin={}", rights.to_query_value()));
                }
                Ok(self.resolve(is_internal, bot_username, &args))
            }
            InternalLink::ChatFolderInvite { slug } => {
                check(is_valid_folder_slug(slug), "slug", slug)?;
                Ok(self.either(is_internal, &format!("list?slug={slug}"), &format!("list/{slug}")))
            }
            InternalLink::ChatInvite { hash } => {
                check(is_valid_invite_hash(hash), "hash", hash)?;
                Ok(self.either(is_internal, &format!("join?invite={hash}"), &format!("+{hash}")))
            }
            InternalLink::Game {
                bot_username,
                game_short_name,
            } => {
                check_username("bot_username", bot_username)?;
                check(is_valid_game_name(game_short_name), "game_short_name", game_short_name)?;
                let args = [format!("game={game_short_name}")];
                Ok(self.resolve(is_internal, bot_username, &args))
            }
            InternalLink::InstantView { url, .. } => {
                if is_internal {
                    return Err(unavailable(true));
                }
                check_non_empty("url", url)?;
                Ok(url.clone())
            }
            InternalLink::Invoice { invoice_name } => {
                check_non_empty("invoice_name", invoice_name)?;
                let name = url_encode(invoice_name);
                Ok(self.either(is_internal, &format!("invoice?slug={name}"), &format!("${name}")))
            }
            InternalLink::LanguagePack { language_pack_id } => {
                check_non_empty("language_pack_id", language_pack_id)?;
                let id = url_encode(language_pack_id);
                Ok(self.either(
                    is_internal,
                    &format!("setlanguage?lang={id}"),
                    &format!("setlanguage/{id}"),
                ))
            }
            InternalLink::Message { url } => {
                if !is_internal {
                    return Err(unavailable(false));
                }
                match self.parse_internal_link(url, false) {
                    Some(InternalLink::Message { url: canonical }) if canonical == *url => {
                        Ok(url.clone())
                    }
                    _ => Err(Error::invalid_field("url", "not a message link")),
                }
            }
            InternalLink::MessageDraft {
                text,
                contains_link,
            } => {
                check_non_empty("text", text)?;
                let (url, text) = if *contains_link {
                    text.split_once('\n').ok_or_else(|| {
                        Error::invalid_field("text", "a draft with a link needs a second line")
                    })?
                } else {
                    (text.as_str(), "")
                };
                let mut args = vec![format!("url={}", url_encode(url))];
                if !text.is_empty() {
                    args.push(format!("text={}", url_encode(text)));
                }
                let base = if is_internal {
                    "tg://msg_url".to_string()
                } else {
                    self.http("share")
                };
                Ok(with_args(base, &args))
            }
            InternalLink::PassportDataRequest {
                bot_user_id,
                scope,
                public_key,
                nonce,
                callback_url,
            } => {
                if !is_internal {
                    return Err(unavailable(false));
                }
                check(
                    (1..MAX_BOT_USER_ID).contains(bot_user_id),
                    "bot_user_id",
                    &bot_user_id.to_string(),
                )?;
                check_non_empty("scope", scope)?;
                check_non_empty("public_key", public_key)?;
                check_non_empty("nonce", nonce)?;
                let mut args = vec![
                    format!("bot_id={bot_user_id}"),
                    format!("scope={}", url_encode(scope)),
                    format!("public_key={}", url_encode(public_key)),
                    format!("nonce={}", url_encode(nonce)),
                ];
                if !callback_url.is_empty() {
                    args.push(format!("callback_url={}", url_encode(callback_url)));
                }
                Ok(with_args("tg://passport".to_string(), &args))
            }
            InternalLink::PhoneNumberConfirmation { hash, phone_number } => {
                check_non_empty("hash", hash)?;
                check_non_empty("phone_number", phone_number)?;
                let args = [
                    format!("phone={}", url_encode(phone_number)),
                    format!("hash={}", url_encode(hash)),
                ];
                let base = self.either(is_internal, "confirmphone", "confirmphone");
                Ok(with_args(base, &args))
            }
            InternalLink::PremiumFeatures { referrer } => {
                if !is_internal {
                    return Err(unavailable(false));
                }
                let mut result = "tg://premium_offer".to_string();
                if !referrer.is_empty() {
                    result.push_str("?ref=");
                    result.push_str(&url_encode(referrer));
                }
                Ok(result)
            }
            InternalLink::Proxy {
                server,
                port,
                proxy,
            } => {
                check_non_empty("server", server)?;
                check(*port > 0, "port", &port.to_string())?;
                let mut args = vec![
                    format!("server={}", url_encode(server)),
                    format!("port={port}"),
                ];
                let kind = match proxy {
                    ProxyType::Mtproto { secret } => {
                        let secret = normalize_secret(secret).ok_or_else(|| {
                            Error::invalid_field("secret", "unsupported proxy secret")
                        })?;
                        args.push(format!("secret={secret}"));
                        "proxy"
                    }
                    ProxyType::Socks5 { username, password } => {
                        if !username.is_empty() {
                            args.push(format!("user={}", url_encode(username)));
                        }
                        if !password.is_empty() {
                            args.push(format!("pass={}", url_encode(password)));
                        }
                        "socks"
                    }
                };
                Ok(with_args(self.either(is_internal, kind, kind), &args))
            }
            InternalLink::PublicChat { chat_username } => {
                check_username("chat_username", chat_username)?;
                Ok(self.resolve(is_internal, chat_username, &[]))
            }
            InternalLink::QrCodeAuthentication | InternalLink::UnsupportedProxy => {
                Err(unavailable(is_internal))
            }
            InternalLink::RestorePurchases => {
                if is_internal {
                    Ok("tg://restore_purchases".to_string())
                } else {
                    Err(unavailable(false))
                }
            }
            InternalLink::StickerSet {
                sticker_set_name,
                expect_custom_emoji,
            } => {
                check_non_empty("sticker_set_name", sticker_set_name)?;
                let kind = if *expect_custom_emoji {
                    "addemoji"
                } else {
                    "addstickers"
                };
                let name = url_encode(sticker_set_name);
                Ok(self.either(is_internal, &format!("{kind}?set={name}"), &format!("{kind}/{name}")))
            }
            InternalLink::Theme { theme_name } => {
                check_non_empty("theme_name", theme_name)?;
                let name = url_encode(theme_name);
                Ok(self.either(is_internal, &format!("addtheme?slug={name}"), &format!("addtheme/{name}")))
            }
            InternalLink::UnknownDeepLink { link } => {
                if !is_internal {
                    return Err(unavailable(false));
                }
                check(
                    link.starts_with("tg://") || link.starts_with("ton://"),
                    "link",
                    link,
                )?;
                Ok(link.clone())
            }
            InternalLink::UserPhoneNumber { phone_number } => {
                check(is_valid_phone_number(phone_number), "phone_number", phone_number)?;
                Ok(self.either(
                    is_internal,
                    &format!("resolve?phone={phone_number}"),
                    &format!("+{phone_number}"),
                ))
            }
            InternalLink::UserToken { token } => {
                check_non_empty("token", token)?;
                let token = url_encode(token);
                Ok(self.either(is_internal, &format!("contact?token={token}"), &format!("contact/{token}")))
            }
            InternalLink::VideoChat {
                chat_username,
                invite_hash,
                is_live_stream,
            } => {
                check_username("chat_username", chat_username)?;
                check(is_valid_video_chat_hash(invite_hash), "invite_hash", invite_hash)?;
                let key = if *is_live_stream {
                    "livestream"
                } else {
                    "videochat"
                };
                Ok(self.resolve(is_internal, chat_username, &[optional_arg(key, invite_hash)]))
            }
            InternalLink::WebApp {
                bot_username,
                web_app_short_name,
                start_parameter,
            } => {
                check_username("bot_username", bot_username)?;
                check(
                    is_valid_web_app_name(web_app_short_name),
                    "web_app_short_name",
                    web_app_short_name,
                )?;
                check_start_parameter(start_parameter)?;
                let mut args = Vec::new();
                if is_internal {
                    args.push(format!("appname={web_app_short_name}"));
                }
                if !start_parameter.is_empty() {
                    args.push(format!("startapp={start_parameter}"));
                }
                if is_internal {
                    Ok(self.resolve(true, bot_username, &args))
                } else {
                    Ok(with_args(
                        self.http(&format!("{bot_username}/{web_app_short_name}")),
                        &args,
                    ))
                }
            }
        }
    }

    fn attachment_menu_bot(
        &self,
        is_internal: bool,
        target_chat: &TargetChat,
        bot_username: &str,
        start_parameter: &str,
    ) -> Result<String> {
        check_username("bot_username", bot_username)?;
        check_start_parameter(start_parameter)?;

        let chat_link = match target_chat {
            TargetChat::InternalLink { link } => link.as_ref(),
            TargetChat::Current | TargetChat::Chosen(_) => {
                let mut args = vec![optional_arg("startattach", start_parameter)];
                if let TargetChat::Chosen(types) = target_chat {
                    if !types.is_empty() {
                        args.push(format!("choose={}", types.to_query_value()));
                    }
                }
                return Ok(self.resolve(is_internal, bot_username, &args));
            }
        };

        let mut args = vec![format!("attach={bot_username}")];
        if !start_parameter.is_empty() {
            args.push(format!("startattach={start_parameter}"));
        }
        match chat_link {
            InternalLink::PublicChat { chat_username } => {
                check_username("chat_username", chat_username)?;
                Ok(self.resolve(is_internal, chat_username, &args))
            }
            InternalLink::UserPhoneNumber { phone_number } => {
                check(is_valid_phone_number(phone_number), "phone_number", phone_number)?;
                let base = self.either(
                    is_internal,
                    &format!("resolve?phone={phone_number}"),
                    &format!("+{phone_number}"),
                );
                Ok(with_args(base, &args))
            }
            other => Err(Error::invalid_field(
                "target_chat",
                format!("{} cannot be an attachment target", other.kind()),
            )),
        }
    }
}

fn settings_page(is_internal: bool, page: &str) -> Result<String> {
    if is_internal {
        Ok(format!("tg://settings/{page}"))
    } else {
        Err(unavailable(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::types::{AdministratorRights, ChatTypes};

    fn manager() -> LinkManager {
        LinkManager::default()
    }

    #[test]
    fn unavailable_flavours() {
        let m = manager();
        assert!(matches!(
            m.get_internal_link(&InternalLink::Settings, false),
            Err(Error::Unavailable(LinkMode::Http))
        ));
        assert!(matches!(
            m.get_internal_link(&InternalLink::QrCodeAuthentication, true),
            Err(Error::Unavailable(LinkMode::Deep))
        ));
        let iv = InternalLink::InstantView {
            url: "https://t.me/iv?url=x".into(),
            fallback_url: "x".into(),
        };
        assert!(matches!(
            m.get_internal_link(&iv, true),
            Err(Error::Unavailable(LinkMode::Deep))
        ));
        assert_eq!(m.get_internal_link(&iv, false).unwrap(), "https://t.me/iv?url=x");
    }

    #[test]
    fn attachment_menu_bot_forms() {
        let m = manager();
        let link = InternalLink::AttachmentMenuBot {
            target_chat: TargetChat::Chosen(ChatTypes {
                allow_bot_chats: true,
                allow_group_chats: true,
                ..ChatTypes::default()
            }),
            bot_username: "username".into(),
            start_parameter: String::new(),
        };
        assert_eq!(
            m.get_internal_link(&link, true).unwrap(),
            "tg://resolve?domain=username&startattach&choose=bots+groups"
        );
        assert_eq!(
            m.get_internal_link(&link, false).unwrap(),
            "https://t.me/username?startattach&choose=bots+groups"
        );

        let link = InternalLink::AttachmentMenuBot {
            target_chat: TargetChat::InternalLink {
                link: Box::new(InternalLink::UserPhoneNumber {
                    phone_number: "123456".into(),
                }),
            },
            bot_username: "bot".into(),
            start_parameter: "1".into(),
        };
        assert_eq!(
            m.get_internal_link(&link, false).unwrap(),
            "https://t.me/+123456?attach=bot&startattach=1"
        );
    }

    #[test]
    fn rights_are_required_for_channels() {
        let link = InternalLink::BotAddToChannel {
            bot_username: "username".into(),
            administrator_rights: AdministratorRights::default(),
        };
        assert!(matches!(
            manager().get_internal_link(&link, true),
            Err(Error::InvalidField {
                field: "administrator_rights",
                ..
            })
        ));
    }

    fn reparse(link: &InternalLink, is_internal: bool) -> Option<InternalLink> {
        let url = manager().get_internal_link(link, is_internal).unwrap();
        manager().parse_internal_link(&url, true)
    }

    #[test]
    fn channel_rights_are_normalized_before_rendering() {
        let pin_only = InternalLink::BotAddToChannel {
            bot_username: "bot".into(),
            administrator_rights: AdministratorRights {
                pin_messages: true,
                ..AdministratorRights::default()
            },
        };
        for is_internal in [true, false] {
            assert!(matches!(
                manager().get_internal_link(&pin_only, is_internal),
                Err(Error::InvalidField {
                    field: "administrator_rights",
                    ..
                })
            ));
        }

        let post_only = InternalLink::BotAddToChannel {
            bot_username: "bot".into(),
            administrator_rights: AdministratorRights {
                post_messages: true,
                ..AdministratorRights::default()
            },
        };
        let expected = InternalLink::BotAddToChannel {
            bot_username: "bot".into(),
            administrator_rights: AdministratorRights {
                manage_chat: true,
                post_messages: true,
                restrict_members: true,
                ..AdministratorRights::default()
            },
        };
        assert_eq!(
            manager().get_internal_link(&post_only, true).unwrap(),
            "tg://resolve?domain=bot&startchannel&admin=manage_chat+post_messages+restrict_members"
        );
        for is_internal in [true, false] {
            assert_eq!(reparse(&post_only, is_internal), Some(expected.clone()));
            assert_eq!(reparse(&expected, is_internal), Some(expected.clone()));
        }
    }

    #[test]
    fn group_rights_are_normalized_before_rendering() {
        let group = |rights| InternalLink::BotStartInGroup {
            bot_username: "bot".into(),
            start_parameter: String::new(),
            administrator_rights: rights,
        };

        let post_only = group(Some(AdministratorRights {
            post_messages: true,
            ..AdministratorRights::default()
        }));
        assert_eq!(
            manager().get_internal_link(&post_only, true).unwrap(),
            "tg://resolve?domain=bot&startgroup"
        );
        for is_internal in [true, false] {
            assert_eq!(reparse(&post_only, is_internal), Some(group(None)));
        }

        let delete_only = group(Some(AdministratorRights {
            delete_messages: true,
            ..AdministratorRights::default()
        }));
        let expected = group(Some(AdministratorRights {
            manage_chat: true,
            delete_messages: true,
            ..AdministratorRights::default()
        }));
        for is_internal in [true, false] {
            assert_eq!(reparse(&delete_only, is_internal), Some(expected.clone()));
            assert_eq!(reparse(&expected, is_internal), Some(expected.clone()));
        }
    }

    #[test]
    fn passport_bot_id_is_bounded() {
        let passport = |bot_user_id| InternalLink::PassportDataRequest {
            bot_user_id,
            scope: "s".into(),
            public_key: "k".into(),
            nonce: "n".into(),
            callback_url: String::new(),
        };
        let largest = passport(MAX_BOT_USER_ID - 1);
        assert_eq!(reparse(&largest, true), Some(largest.clone()));
        for bot_user_id in [MAX_BOT_USER_ID, 0, -1, i64::MAX] {
            assert!(matches!(
                manager().get_internal_link(&passport(bot_user_id), true),
                Err(Error::InvalidField {
                    field: "bot_user_id",
                    ..
                })
            ));
        }
    }

    #[test]
    fn web_app_forms() {
        let link = InternalLink::WebApp {
            bot_username: "username".into(),
            web_app_short_name: "asd".into(),
            start_parameter: "qwe".into(),
        };
        assert_eq!(
            manager().get_internal_link(&link, true).unwrap(),
            "tg://resolve?domain=username&appname=asd&startapp=qwe"
        );
        assert_eq!(
            manager().get_internal_link(&link, false).unwrap(),
            "https://t.me/username/asd?startapp=qwe"
        );
    }

    #[test]
    fn draft_with_link_needs_newline() {
        let link = InternalLink::MessageDraft {
            text: "google.com".into(),
            contains_link: true,
        };
        assert!(manager().get_internal_link(&link, true).is_err());
        let link = InternalLink::MessageDraft {
            text: "google.com\ntext".into(),
            contains_link: true,
        };
        assert_eq!(
            manager().get_internal_link(&link, true).unwrap(),
            "tg://msg_url?url=google.com&text=text"
        );
    }

    #[test]
    fn message_urls_are_validated() {
        let m = manager();
        let ok = InternalLink::Message {
            url: "tg://resolve?domain=levlam&post=1".into(),
        };
        assert_eq!(
            m.get_internal_link(&ok, true).unwrap(),
            "tg://resolve?domain=levlam&post=1"
        );
        let bad = InternalLink::Message {
            url: "tg://resolve?domain=levlam".into(),
        };
        assert!(m.get_internal_link(&bad, true).is_err());
        assert!(matches!(
            m.get_internal_link(&ok, false),
            Err(Error::Unavailable(LinkMode::Http))
        ));
    }

    #[test]
    fn proxy_secret_is_normalized() {
        let link = InternalLink::Proxy {
            server: "1.2.3.4".into(),
            port: 80,
            proxy: ProxyType::Mtproto {
                secret: "1234567890ABCDEF1234567890ABCDEF".into(),
            },
        };
        assert_eq!(
            manager().get_internal_link(&link, true).unwrap(),
            "tg://proxy?server=1.2.3.4&port=80&secret=1234567890abcdef1234567890abcdef"
        );
    }
}
