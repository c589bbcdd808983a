//! `admin=` and `choose=` argument handling.

use super::types::{AdministratorRights, ChatTypes, TargetChat};

const RIGHT_TOKENS: [&str; 12] = [
    "manage_chat",
    "change_info",
    "post_messages",
    "edit_messages",
    "delete_messages",
    "invite_users",
    "restrict_members",
    "pin_messages",
    "manage_topics",
    "promote_members",
    "manage_video_chats",
    "anonymous",
];

impl AdministratorRights {
    const fn flags(&self) -> [bool; 12] {
        [
            self.manage_chat,
            self.change_info,
            self.post_messages,
            self.edit_messages,
            self.delete_messages,
            self.invite_users,
            self.restrict_members,
            self.pin_messages,
            self.manage_topics,
            self.promote_members,
            self.manage_video_chats,
            self.is_anonymous,
        ]
    }

    fn flag_mut(&mut self, token: &str) -> Option<&mut bool> {
        Some(match token {
            "manage_chat" => &mut self.manage_chat,
            "change_info" => &mut self.change_info,
            "post_messages" => &mut self.post_messages,
            "edit_messages" => &mut self.edit_messages,
            "delete_messages" => &mut self.delete_messages,
            "invite_users" => &mut self.invite_users,
            "restrict_members" => &mut self.restrict_members,
            "pin_messages" => &mut self.pin_messages,
            "manage_topics" => &mut self.manage_topics,
            "promote_members" => &mut self.promote_members,
            "manage_video_chats" => &mut self.manage_video_chats,
            "anonymous" => &mut self.is_anonymous,
            _ => return None,
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.flags().contains(&true)
    }

    /// Space-separated tokens; unknown ones are ignored.
    fn from_tokens(admin: &str) -> Self {
        let mut rights = Self::default();
        for token in admin.split(' ') {
            if let Some(flag) = rights.flag_mut(token) {
                *flag = true;
            }
        }
        rights
    }

    /// Rights a bot may request when added to a group.
    #[must_use]
    pub fn for_group(admin: &str) -> Option<Self> {
        Self::from_tokens(admin).normalized_for_group()
    }

    /// Rights a bot may request when added to a channel.
    #[must_use]
    pub fn for_channel(admin: &str) -> Option<Self> {
        Self::from_tokens(admin).normalized_for_channel()
    }

    /// Drop channel-only rights and force `manage_chat`. `None` when
    /// nothing remains.
    #[must_use]
    pub fn normalized_for_group(mut self) -> Option<Self> {
        self.post_messages = false;
        self.edit_messages = false;
        if self.is_empty() {
            return None;
        }
        self.manage_chat = true;
        Some(self)
    }

    /// Drop group-only rights and force `manage_chat` and
    /// `restrict_members`. `None` when nothing remains.
    #[must_use]
    pub fn normalized_for_channel(mut self) -> Option<Self> {
        self.pin_messages = false;
        self.manage_topics = false;
        self.is_anonymous = false;
        if self.is_empty() {
            return None;
        }
        self.manage_chat = true;
        self.restrict_members = true;
        Some(self)
    }

    /// Tokens joined by `+`, ready to be placed after `admin=`.
    #[must_use]
    pub fn to_query_value(&self) -> String {
        RIGHT_TOKENS
            .iter()
            .zip(self.flags())
            .filter(|(_, set)| *set)
            .map(|(token, _)| *token)
            .collect::<Vec<_>>()
            .join("+")
    }
}

impl ChatTypes {
    /// Parse `choose=`; no known token leaves the target as the current chat.
    #[must_use]
    pub fn target_chat(choose: &str) -> TargetChat {
        let mut types = Self::default();
        for token in choose.split(' ') {
            match token {
                "users" => types.allow_user_chats = true,
                "bots" => types.allow_bot_chats = true,
                "groups" => types.allow_group_chats = true,
                "channels" => types.allow_channel_chats = true,
                _ => {}
            }
        }
        if types.is_empty() {
            TargetChat::Current
        } else {
            TargetChat::Chosen(types)
        }
    }

    #[must_use]
    pub fn to_query_value(&self) -> String {
        [
            (self.allow_user_chats, "users"),
            (self.allow_bot_chats, "bots"),
            (self.allow_group_chats, "groups"),
            (self.allow_channel_chats, "channels"),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, token)| *token)
        .collect::<Vec<_>>()
        .join("+")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &str = "manage_chat change_info post_messages edit_messages delete_messages \
                       invite_users restrict_members pin_messages manage_topics promote_members \
                       manage_video_chats anonymous";

    #[test]
    fn group_rights_drop_channel_only_flags() {
        assert_eq!(AdministratorRights::for_group("post_messages"), None);
        assert_eq!(AdministratorRights::for_group("asdas"), None);

        let rights = AdministratorRights::for_group("delete_messages anonymous").unwrap();
        assert!(rights.manage_chat && rights.delete_messages && rights.is_anonymous);
        assert!(!rights.change_info);

        let rights = AdministratorRights::for_group(ALL).unwrap();
        assert!(!rights.post_messages && !rights.edit_messages);
        assert!(rights.pin_messages && rights.manage_topics && rights.is_anonymous);
    }

    #[test]
    fn channel_rights_force_restrict() {
        assert_eq!(AdministratorRights::for_channel(""), None);
        let rights = AdministratorRights::for_channel("post_messages").unwrap();
        assert!(rights.manage_chat && rights.post_messages && rights.restrict_members);
        assert!(!rights.delete_messages);

        let rights = AdministratorRights::for_channel(ALL).unwrap();
        assert!(!rights.pin_messages && !rights.manage_topics && !rights.is_anonymous);
        assert!(rights.edit_messages);
    }

    #[test]
    fn rights_query_value_reparses() {
        let rights = AdministratorRights::for_channel(ALL).unwrap();
        let value = rights.to_query_value();
        assert!(value.starts_with("manage_chat+change_info+post_messages"));
        assert_eq!(
            AdministratorRights::for_channel(&value.replace('+', " ")),
            Some(rights)
        );
    }

    #[test]
    fn normalizing_parsed_rights_is_stable() {
        let group = AdministratorRights::for_group("delete_messages").unwrap();
        assert_eq!(group.normalized_for_group(), Some(group));
        let channel = AdministratorRights::for_channel("post_messages").unwrap();
        assert_eq!(channel.normalized_for_channel(), Some(channel));
    }

    #[test]
    fn normalizing_hand_built_rights() {
        let pin_only = AdministratorRights {
            pin_messages: true,
            ..AdministratorRights::default()
        };
        assert_eq!(pin_only.normalized_for_channel(), None);
        assert_eq!(
            pin_only.normalized_for_group(),
            Some(AdministratorRights {
                manage_chat: true,
                pin_messages: true,
                ..AdministratorRights::default()
            })
        );

        let post_only = AdministratorRights {
            post_messages: true,
            ..AdministratorRights::default()
        };
        assert_eq!(post_only.normalized_for_group(), None);
    }

    #[test]
    fn choose_tokens() {
        assert_eq!(ChatTypes::target_chat("cats dogs"), TargetChat::Current);
        let TargetChat::Chosen(types) = ChatTypes::target_chat("users channels") else {
            panic!("expected chosen target");
        };
        assert!(types.allow_user_chats && types.allow_channel_chats);
        assert!(!types.allow_bot_chats);
        assert_eq!(types.to_query_value(), "users+channels");
    }
}
