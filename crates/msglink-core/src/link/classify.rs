//! Rule cascade mapping link strings onto [`InternalLink`].
//!
//! Deep links dispatch on their whole path; t.me links on the first path
//! segment. A reserved word that fails its own rule never falls back to
//! being read as a username.

use super::LinkManager;
use super::background;
use super::proxy::proxy_link;
use super::rules::{
    MAX_BOT_USER_ID, is_valid_folder_slug, is_valid_game_name, is_valid_invite_hash, is_valid_phone_number,
    is_valid_start_parameter, is_valid_subdomain_username, is_valid_username,
    is_valid_video_chat_hash, is_valid_web_app_name, to_integer,
};
use super::types::{AdministratorRights, ChatTypes, InternalLink, TargetChat};
use crate::url::{
    DeepScheme, Protocol, UrlQuery, parse_url, split_deep_link_scheme, starts_with_ignore_case,
    url_decode, url_encode,
};

const TELEGRAPH_HOSTS: [&str; 3] = ["telegra.ph", "te.legra.ph", "graph.org"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinkKind {
    Deep(DeepScheme),
    TMe,
    Telegraph,
}

/// Recognized link family plus the query the rules run on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LinkInfo {
    pub kind: LinkKind,
    pub query: String,
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

/// Start parameter for `key`, or empty when malformed.
fn start_parameter(query: &UrlQuery, key: &str) -> String {
    let value = query.arg(key);
    if is_valid_start_parameter(&value) {
        value
    } else {
        String::new()
    }
}

impl LinkManager {
    pub(crate) fn link_info(&self, link: &str) -> Option<LinkInfo> {
        let link = link.find('#').map_or(link, |pos| &link[..pos]);
        let (scheme, rest) = split_deep_link_scheme(link);
        let url = parse_url(rest).ok()?;
        if !url.userinfo.is_empty() || url.is_ipv6 {
            return None;
        }

        if let Some(scheme) = scheme {
            if starts_with_ignore_case(rest, "http://")
                || url.protocol == Protocol::Https
                || url.specified_port != 0
            {
                return None;
            }
            return Some(LinkInfo {
                kind: LinkKind::Deep(scheme),
                query: rest.to_string(),
            });
        }

        if url.port != 80 && url.port != 443 {
            return None;
        }
        let host = url_decode(&url.host, false).to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);

        if self.t_me_hosts.iter().any(|known| known == host) {
            let mut query = url.query.as_str();
            loop {
                if query.starts_with("/s/") {
                    query = &query[2..];
                } else if query.starts_with("/%73/") {
                    query = &query[4..];
                } else {
                    break;
                }
            }
            return Some(LinkInfo {
                kind: LinkKind::TMe,
                query: query.to_string(),
            });
        }

        if let Some(subdomain) = host
            .strip_suffix(self.t_me_host.as_str())
            .and_then(|head| head.strip_suffix('.'))
        {
            if !subdomain.contains('.') && is_valid_subdomain_username(subdomain) {
                return Some(LinkInfo {
                    kind: LinkKind::TMe,
                    query: format!("/{subdomain}{}", url.query),
                });
            }
        }

        if TELEGRAPH_HOSTS.contains(&host) && url.query.len() > 1 {
            return Some(LinkInfo {
                kind: LinkKind::Telegraph,
                query: url.query,
            });
        }
        None
    }

    /// Classify `link`. `None` means it is not an internal link at all.
    ///
    /// `is_trusted` marks links from trusted sources; it only affects
    /// whether bot-start links start automatically.
    #[must_use]
    pub fn parse_internal_link(&self, link: &str, is_trusted: bool) -> Option<InternalLink> {
        let info = self.link_info(link)?;
        let parsed = match info.kind {
            LinkKind::Deep(DeepScheme::Tg) => parse_tg_link(&info.query, is_trusted),
            LinkKind::Deep(DeepScheme::Ton) => unknown_unless_empty("ton", &info.query),
            LinkKind::TMe => self.parse_t_me_link(&info.query, is_trusted),
            LinkKind::Telegraph => Some(InternalLink::InstantView {
                url: format!("https://telegra.ph{}", info.query),
                fallback_url: link.to_string(),
            }),
        };
        if let Some(parsed) = &parsed {
            tracing::debug!(kind = parsed.kind(), "classified internal link");
        }
        parsed
    }

    fn parse_t_me_link(&self, query: &str, is_trusted: bool) -> Option<InternalLink> {
        let url_query = UrlQuery::parse(query);
        let path = &url_query.path;
        let first = path.first()?.as_str();
        let second = path.get(1).map_or("", String::as_str);

        match first {
            "c" => {
                let channel = to_integer(second);
                let post = to_integer(path.get(2).map_or("", String::as_str));
                if channel <= 0 || post <= 0 {
                    return None;
                }
                let base = format!("tg://privatepost?channel={channel}");
                Some(message_with_path_thread(base, post, path.get(3), &url_query))
            }
            "bg" => non_empty(second.to_string()).map(|name| InternalLink::Background {
                background_name: background::from_http_path(&name, &url_query),
            }),
            "contact" => non_empty(second.to_string()).map(|token| InternalLink::UserToken { token }),
            "joinchat" => is_valid_invite_hash(second).then(|| InternalLink::ChatInvite {
                hash: second.to_string(),
            }),
            "addstickers" | "addemoji" => {
                non_empty(second.to_string()).map(|name| InternalLink::StickerSet {
                    sticker_set_name: name,
                    expect_custom_emoji: first == "addemoji",
                })
            }
            "addtheme" => non_empty(second.to_string()).map(|theme_name| InternalLink::Theme { theme_name }),
            "invoice" => {
                non_empty(second.to_string()).map(|invoice_name| InternalLink::Invoice { invoice_name })
            }
            "login" => non_empty(second.to_string()).map(|code| InternalLink::AuthenticationCode { code }),
            "setlanguage" => non_empty(second.to_string())
                .map(|language_pack_id| InternalLink::LanguagePack { language_pack_id }),
            "list" => is_valid_folder_slug(second).then(|| InternalLink::ChatFolderInvite {
                slug: second.to_string(),
            }),
            "confirmphone" => phone_confirmation(&url_query),
            "proxy" => Some(proxy_link(&url_query, false)),
            "socks" => Some(proxy_link(&url_query, true)),
            "share" | "msg" => {
                if matches!(second, "bookmarklet" | "embed") {
                    None
                } else {
                    message_draft(&url_query)
                }
            }
            "iv" => {
                let url = url_query.arg("url");
                if path.len() != 1 || url.is_empty() {
                    return None;
                }
                let mut iv_url = format!("{}iv?url={}", self.t_me_url, url_encode(&url));
                if let Some(rhash) = url_query.encoded_arg("rhash") {
                    iv_url.push('&');
                    iv_url.push_str(&rhash);
                }
                Some(InternalLink::InstantView {
                    url: iv_url,
                    fallback_url: url,
                })
            }
            _ if first.len() >= 2 && (first.starts_with(' ') || first.starts_with('+')) => {
                let hash = &first[1..];
                if is_valid_phone_number(hash) {
                    Some(phone_number_link(hash.to_string(), &url_query))
                } else {
                    is_valid_invite_hash(hash).then(|| InternalLink::ChatInvite {
                        hash: hash.to_string(),
                    })
                }
            }
            _ if first.starts_with('$') => non_empty(first[1..].to_string())
                .map(|invoice_name| InternalLink::Invoice { invoice_name }),
            _ if is_valid_username(first) => {
                let post = to_integer(second);
                if post > 0 {
                    let base = format!("tg://resolve?domain={first}");
                    return Some(message_with_path_thread(base, post, path.get(2), &url_query));
                }
                if path.len() == 2 && is_valid_web_app_name(second) {
                    return Some(InternalLink::WebApp {
                        bot_username: first.to_string(),
                        web_app_short_name: second.to_string(),
                        start_parameter: start_parameter(&url_query, "startapp"),
                    });
                }
                Some(resolve_username(first, &url_query, is_trusted, false))
            }
            _ => None,
        }
    }
}

fn unknown_unless_empty(scheme: &str, query: &str) -> Option<InternalLink> {
    let url_query = UrlQuery::parse(query);
    url_query
        .path
        .first()
        .is_some_and(|first| !first.is_empty())
        .then(|| InternalLink::unknown_deep_link(format!("{scheme}://{query}")))
}

fn parse_tg_link(query: &str, is_trusted: bool) -> Option<InternalLink> {
    let url_query = UrlQuery::parse(query);
    let path: Vec<&str> = url_query.path.iter().map(String::as_str).collect();

    let parsed = match path.as_slice() {
        ["resolve"] => resolve_deep(&url_query, query, is_trusted),
        ["contact"] => non_empty(url_query.arg("token")).map(|token| InternalLink::UserToken { token }),
        ["join"] => {
            let hash = url_query.arg("invite");
            is_valid_invite_hash(&hash).then_some(InternalLink::ChatInvite { hash })
        }
        ["list"] => {
            let slug = url_query.arg("slug");
            is_valid_folder_slug(&slug).then_some(InternalLink::ChatFolderInvite { slug })
        }
        [set_kind @ ("addstickers" | "addemoji")] => {
            non_empty(url_query.arg("set")).map(|name| InternalLink::StickerSet {
                sticker_set_name: name,
                expect_custom_emoji: *set_kind == "addemoji",
            })
        }
        ["setlanguage"] => non_empty(url_query.arg("lang"))
            .map(|language_pack_id| InternalLink::LanguagePack { language_pack_id }),
        ["addtheme"] => non_empty(url_query.arg("slug")).map(|theme_name| InternalLink::Theme { theme_name }),
        ["confirmphone"] => phone_confirmation(&url_query),
        ["login"] => {
            if url_query.arg("token").is_empty() {
                non_empty(url_query.arg("code")).map(|code| InternalLink::AuthenticationCode { code })
            } else {
                Some(InternalLink::QrCodeAuthentication)
            }
        }
        ["restore_purchases"] => Some(InternalLink::RestorePurchases),
        ["passport"] => Some(passport_link(&url_query, query)),
        ["premium_offer"] => Some(InternalLink::PremiumFeatures {
            referrer: url_query.arg("ref"),
        }),
        ["settings", rest @ ..] => Some(settings_link(rest)),
        ["bg"] => background::from_deep_query(&url_query)
            .map(|background_name| InternalLink::Background { background_name }),
        ["share" | "msg" | "msg_url"] => return message_draft(&url_query),
        ["privatepost"] => private_post_deep(&url_query),
        ["invoice"] => non_empty(url_query.arg("slug")).map(|invoice_name| InternalLink::Invoice { invoice_name }),
        ["proxy"] => Some(proxy_link(&url_query, false)),
        ["socks"] => Some(proxy_link(&url_query, true)),
        _ => None,
    };
    parsed.or_else(|| unknown_unless_empty("tg", query))
}

fn settings_link(rest: &[&str]) -> InternalLink {
    match rest {
        ["auto_delete"] => InternalLink::DefaultMessageAutoDeleteTimerSettings,
        ["change_number"] => InternalLink::ChangePhoneNumber,
        ["devices"] => InternalLink::ActiveSessions,
        ["edit_profile"] => InternalLink::EditProfileSettings,
        ["folders"] => InternalLink::FolderSettings,
        ["language"] => InternalLink::LanguageSettings,
        ["privacy"] => InternalLink::PrivacyAndSecuritySettings,
        ["themes"] => InternalLink::ThemeSettings,
        _ => InternalLink::Settings,
    }
}

fn resolve_deep(query: &UrlQuery, raw_query: &str, is_trusted: bool) -> Option<InternalLink> {
    let domain = query.arg("domain");
    if is_valid_username(&domain) {
        let post = to_integer(&query.arg("post"));
        if post > 0 {
            let base = format!("tg://resolve?domain={domain}");
            return Some(InternalLink::Message {
                url: message_url(base, post, None, query),
            });
        }
        if domain == "telegrampassport" && query.has_arg("bot_id") {
            return Some(passport_link(query, raw_query));
        }
        return Some(resolve_username(&domain, query, is_trusted, true));
    }
    let phone = query.arg("phone");
    is_valid_phone_number(&phone).then(|| phone_number_link(phone, query))
}

/// Arguments of `resolve?domain=<username>` after the message rule.
fn resolve_username(
    username: &str,
    query: &UrlQuery,
    is_trusted: bool,
    allow_app_name: bool,
) -> InternalLink {
    let attach = query.arg("attach");
    if is_valid_username(&attach) {
        return InternalLink::AttachmentMenuBot {
            target_chat: TargetChat::InternalLink {
                link: Box::new(InternalLink::public_chat(username)),
            },
            bot_username: attach,
            start_parameter: start_parameter(query, "startattach"),
        };
    }
    if query.has_arg("startattach") {
        return InternalLink::AttachmentMenuBot {
            target_chat: ChatTypes::target_chat(&query.arg("choose")),
            bot_username: username.to_string(),
            start_parameter: start_parameter(query, "startattach"),
        };
    }
    for (key, hash) in query.args() {
        if matches!(key, "voicechat" | "videochat" | "livestream") && is_valid_video_chat_hash(&hash) {
            return InternalLink::VideoChat {
                chat_username: username.to_string(),
                invite_hash: hash,
                is_live_stream: key == "livestream",
            };
        }
    }
    if query.has_arg("start") {
        let start = query.arg("start");
        if is_valid_start_parameter(&start) {
            return InternalLink::BotStart {
                bot_username: username.to_string(),
                start_parameter: start,
                autostart: is_trusted,
            };
        }
    }
    if query.has_arg("startgroup") {
        let start = query.arg("startgroup");
        if is_valid_start_parameter(&start) {
            return InternalLink::BotStartInGroup {
                bot_username: username.to_string(),
                start_parameter: start,
                administrator_rights: AdministratorRights::for_group(&query.arg("admin")),
            };
        }
    }
    if query.has_arg("startchannel") {
        if let Some(rights) = AdministratorRights::for_channel(&query.arg("admin")) {
            return InternalLink::BotAddToChannel {
                bot_username: username.to_string(),
                administrator_rights: rights,
            };
        }
    }
    let game = query.arg("game");
    if is_valid_game_name(&game) {
        return InternalLink::Game {
            bot_username: username.to_string(),
            game_short_name: game,
        };
    }
    if allow_app_name {
        let app_name = query.arg("appname");
        if is_valid_web_app_name(&app_name) {
            return InternalLink::WebApp {
                bot_username: username.to_string(),
                web_app_short_name: app_name,
                start_parameter: start_parameter(query, "startapp"),
            };
        }
    }
    InternalLink::public_chat(username)
}

/// A phone-number chat, wrapped by `attach=<bot>` when present.
fn phone_number_link(phone_number: String, query: &UrlQuery) -> InternalLink {
    let user = InternalLink::UserPhoneNumber { phone_number };
    let attach = query.arg("attach");
    if is_valid_username(&attach) {
        InternalLink::AttachmentMenuBot {
            target_chat: TargetChat::InternalLink {
                link: Box::new(user),
            },
            bot_username: attach,
            start_parameter: start_parameter(query, "startattach"),
        }
    } else {
        user
    }
}

/// `base&post=N` followed by the copied `single`, `thread`, `comment`
/// and `t` arguments. A `path_thread` replaces the `thread` argument.
fn message_url(base: String, post: i64, path_thread: Option<i64>, query: &UrlQuery) -> String {
    let mut url = format!("{base}&post={post}");
    let mut args: Vec<String> = Vec::new();
    args.extend(query.encoded_arg("single"));
    match path_thread {
        Some(thread) => args.push(format!("thread={thread}")),
        None => args.extend(query.encoded_arg("thread")),
    }
    args.extend(query.encoded_arg("comment"));
    args.extend(query.encoded_arg("t"));
    for arg in args {
        url.push('&');
        url.push_str(&arg);
    }
    url
}

/// `.../<thread>/<post>` when the segment after the first post is also
/// a positive integer, `.../<post>` otherwise.
fn message_with_path_thread(
    base: String,
    post: i64,
    next_segment: Option<&String>,
    query: &UrlQuery,
) -> InternalLink {
    let next = next_segment.map_or(0, |segment| to_integer(segment));
    let url = if next > 0 {
        message_url(base, next, Some(post), query)
    } else {
        message_url(base, post, None, query)
    };
    InternalLink::Message { url }
}

fn private_post_deep(query: &UrlQuery) -> Option<InternalLink> {
    let channel = query.arg("channel");
    let channel = if is_valid_username(&channel) {
        channel
    } else {
        let id = to_integer(&channel);
        if id <= 0 {
            return None;
        }
        id.to_string()
    };
    let post = to_integer(&query.arg("post"));
    (post > 0).then(|| InternalLink::Message {
        url: message_url(format!("tg://privatepost?channel={channel}"), post, None, query),
    })
}

fn phone_confirmation(query: &UrlQuery) -> Option<InternalLink> {
    let hash = query.arg("hash");
    let phone_number = query.arg("phone");
    (!hash.is_empty() && !phone_number.is_empty())
        .then_some(InternalLink::PhoneNumberConfirmation { hash, phone_number })
}

fn passport_link(query: &UrlQuery, raw_query: &str) -> InternalLink {
    let bot_user_id = to_integer(&query.arg("bot_id"));
    let scope = query.arg("scope");
    let public_key = query.arg("public_key");
    let mut nonce = query.arg("nonce");
    if nonce.is_empty() {
        nonce = query.arg("payload");
    }
    if !(1..MAX_BOT_USER_ID).contains(&bot_user_id)
        || scope.is_empty()
        || public_key.is_empty()
        || nonce.is_empty()
    {
        return InternalLink::unknown_deep_link(format!("tg://{raw_query}"));
    }
    InternalLink::PassportDataRequest {
        bot_user_id,
        scope,
        public_key,
        nonce,
        callback_url: query.arg("callback_url"),
    }
}

/// `url` and `text` folded into one draft; `None` when nothing is left.
fn message_draft(query: &UrlQuery) -> Option<InternalLink> {
    let url = query.arg_utf8("url")?;
    let text = query.arg_utf8("text")?;

    let mut text = text.trim_end_matches('\n').to_string();
    let mut url = url.trim().to_string();
    if url.is_empty() {
        url = std::mem::take(&mut text);
    }

    let mut full = url;
    let contains_link = !text.is_empty();
    if contains_link {
        full.push('\n');
        full.push_str(&text);
    }
    if full.is_empty() {
        return None;
    }
    if full.starts_with('@') {
        full.insert(0, ' ');
    }
    Some(InternalLink::MessageDraft {
        text: full,
        contains_link,
    })
}
