//! Typed internal links.

use serde::{Deserialize, Serialize};

/// Every link shape the classifier recognizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InternalLink {
    ActiveSessions,
    AttachmentMenuBot {
        target_chat: TargetChat,
        bot_username: String,
        start_parameter: String,
    },
    AuthenticationCode {
        code: String,
    },
    Background {
        background_name: String,
    },
    BotAddToChannel {
        bot_username: String,
        administrator_rights: AdministratorRights,
    },
    BotStart {
        bot_username: String,
        start_parameter: String,
        autostart: bool,
    },
    BotStartInGroup {
        bot_username: String,
        start_parameter: String,
        administrator_rights: Option<AdministratorRights>,
    },
    ChangePhoneNumber,
    ChatFolderInvite {
        slug: String,
    },
    ChatInvite {
        hash: String,
    },
    DefaultMessageAutoDeleteTimerSettings,
    EditProfileSettings,
    FolderSettings,
    Game {
        bot_username: String,
        game_short_name: String,
    },
    InstantView {
        url: String,
        fallback_url: String,
    },
    Invoice {
        invoice_name: String,
    },
    LanguagePack {
        language_pack_id: String,
    },
    LanguageSettings,
    /// `url` is a compact `tg://resolve?...` or `tg://privatepost?...` link.
    Message {
        url: String,
    },
    MessageDraft {
        text: String,
        contains_link: bool,
    },
    PassportDataRequest {
        bot_user_id: i64,
        scope: String,
        public_key: String,
        nonce: String,
        callback_url: String,
    },
    PhoneNumberConfirmation {
        hash: String,
        phone_number: String,
    },
    PremiumFeatures {
        referrer: String,
    },
    PrivacyAndSecuritySettings,
    Proxy {
        server: String,
        port: u16,
        proxy: ProxyType,
    },
    PublicChat {
        chat_username: String,
    },
    QrCodeAuthentication,
    RestorePurchases,
    Settings,
    StickerSet {
        sticker_set_name: String,
        expect_custom_emoji: bool,
    },
    Theme {
        theme_name: String,
    },
    ThemeSettings,
    UnknownDeepLink {
        link: String,
    },
    UnsupportedProxy,
    UserPhoneNumber {
        phone_number: String,
    },
    UserToken {
        token: String,
    },
    VideoChat {
        chat_username: String,
        invite_hash: String,
        is_live_stream: bool,
    },
    WebApp {
        bot_username: String,
        web_app_short_name: String,
        start_parameter: String,
    },
}

impl InternalLink {
    /// Variant name, as used in the serialized `type` tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ActiveSessions => "active_sessions",
            Self::AttachmentMenuBot { .. } => "attachment_menu_bot",
            Self::AuthenticationCode { .. } => "authentication_code",
            Self::Background { .. } => "background",
            Self::BotAddToChannel { .. } => "bot_add_to_channel",
            Self::BotStart { .. } => "bot_start",
            Self::BotStartInGroup { .. } => "bot_start_in_group",
            Self::ChangePhoneNumber => "change_phone_number",
            Self::ChatFolderInvite { .. } => "chat_folder_invite",
            Self::ChatInvite { .. } => "chat_invite",
            Self::DefaultMessageAutoDeleteTimerSettings => {
                "default_message_auto_delete_timer_settings"
            }
            Self::EditProfileSettings => "edit_profile_settings",
            Self::FolderSettings => "folder_settings",
            Self::Game { .. } => "game",
            Self::InstantView { .. } => "instant_view",
            Self::Invoice { .. } => "invoice",
            Self::LanguagePack { .. } => "language_pack",
            Self::LanguageSettings => "language_settings",
            Self::Message { .. } => "message",
            Self::MessageDraft { .. } => "message_draft",
            Self::PassportDataRequest { .. } => "passport_data_request",
            Self::PhoneNumberConfirmation { .. } => "phone_number_confirmation",
            Self::PremiumFeatures { .. } => "premium_features",
            Self::PrivacyAndSecuritySettings => "privacy_and_security_settings",
            Self::Proxy { .. } => "proxy",
            Self::PublicChat { .. } => "public_chat",
            Self::QrCodeAuthentication => "qr_code_authentication",
            Self::RestorePurchases => "restore_purchases",
            Self::Settings => "settings",
            Self::StickerSet { .. } => "sticker_set",
            Self::Theme { .. } => "theme",
            Self::ThemeSettings => "theme_settings",
            Self::UnknownDeepLink { .. } => "unknown_deep_link",
            Self::UnsupportedProxy => "unsupported_proxy",
            Self::UserPhoneNumber { .. } => "user_phone_number",
            Self::UserToken { .. } => "user_token",
            Self::VideoChat { .. } => "video_chat",
            Self::WebApp { .. } => "web_app",
        }
    }

    /// Analytics source of a premium-features link; `None` for other variants.
    #[must_use]
    pub fn premium_source(&self) -> Option<String> {
        match self {
            Self::PremiumFeatures { referrer } if referrer.is_empty() => {
                Some("deeplink".to_string())
            }
            Self::PremiumFeatures { referrer } => Some(format!("deeplink_{referrer}")),
            _ => None,
        }
    }

    pub(crate) fn public_chat(chat_username: impl Into<String>) -> Self {
        Self::PublicChat {
            chat_username: chat_username.into(),
        }
    }

    pub(crate) fn unknown_deep_link(link: impl Into<String>) -> Self {
        Self::UnknownDeepLink { link: link.into() }
    }
}

/// Where an attachment-menu bot should open.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetChat {
    /// The chat the link was opened from.
    #[default]
    Current,
    /// A chat the user picks, restricted to the allowed kinds.
    Chosen(ChatTypes),
    /// A specific chat: `PublicChat` or `UserPhoneNumber`.
    InternalLink { link: Box<InternalLink> },
}

/// Allowed chat kinds of a chosen target chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChatTypes {
    pub allow_user_chats: bool,
    pub allow_bot_chats: bool,
    pub allow_group_chats: bool,
    pub allow_channel_chats: bool,
}

impl ChatTypes {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !(self.allow_user_chats
            || self.allow_bot_chats
            || self.allow_group_chats
            || self.allow_channel_chats)
    }
}

/// Administrator rights requested by a bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct AdministratorRights {
    pub manage_chat: bool,
    pub change_info: bool,
    pub post_messages: bool,
    pub edit_messages: bool,
    pub delete_messages: bool,
    pub invite_users: bool,
    pub restrict_members: bool,
    pub pin_messages: bool,
    pub manage_topics: bool,
    pub promote_members: bool,
    pub manage_video_chats: bool,
    pub is_anonymous: bool,
}

/// Proxy protocol and its credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProxyType {
    /// `secret` is lowercase hex, or unpadded base64url for `0xee` secrets.
    Mtproto { secret: String },
    Socks5 { username: String, password: String },
}
