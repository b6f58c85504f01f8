//! Domain entities. Pure data structures mapped from the transport adapter;
//! no Telegram wire types here.

use serde::Serialize;

/// Conversation id (numeric, stable across sessions).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ConversationId(pub i64);

/// Message id (numeric, unique within a conversation, larger = newer).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct MessageId(pub i32);

/// What kind of peer a conversation handle points at.
///
/// Only `Channel` and `Chat` support paged history fetch; `User` and `Other`
/// yield no messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Channel,
    Chat,
    User,
    Other,
}

/// Output-labeling classification, independent of `EntityKind`'s gating role.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoleFlags {
    pub is_channel: bool,
    pub is_group: bool,
    pub is_user: bool,
}

/// A resolved reference to a channel, group, or user chat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationHandle {
    pub id: ConversationId,
    pub title: String,
    pub entity_kind: EntityKind,
    pub username: Option<String>,
    pub roles: RoleFlags,
}

impl ConversationHandle {
    /// Whether paged history fetch applies to this conversation at all.
    pub fn supports_history(&self) -> bool {
        matches!(self.entity_kind, EntityKind::Channel | EntityKind::Chat)
    }

    /// First true role flag wins: channel > group > user > unknown.
    pub fn source_type(&self) -> SourceType {
        if self.roles.is_channel {
            SourceType::Channel
        } else if self.roles.is_group {
            SourceType::Group
        } else if self.roles.is_user {
            SourceType::User
        } else {
            SourceType::Unknown
        }
    }

    /// True iff this is a channel without a public handle.
    pub fn is_private_channel(&self) -> bool {
        self.entity_kind == EntityKind::Channel && self.username.is_none()
    }
}

/// One message as returned per page by the transport. Empty `text` marks a
/// non-text event (sticker, join, ...) and is filtered out of the output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawMessage {
    pub id: MessageId,
    pub text: String,
    pub timestamp: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Channel,
    Group,
    User,
    Unknown,
}

/// Flat output record: one surviving message plus its parent conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMessage {
    pub id: MessageId,
    pub text: String,
    pub timestamp: i64,
    pub source_title: String,
    pub source_id: ConversationId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_username: Option<String>,
    pub source_type: SourceType,
    pub is_private_channel: bool,
}

impl NormalizedMessage {
    pub fn from_raw(raw: RawMessage, conversation: &ConversationHandle) -> Self {
        Self {
            id: raw.id,
            text: raw.text,
            timestamp: raw.timestamp,
            source_title: conversation.title.clone(),
            source_id: conversation.id,
            source_username: conversation.username.clone(),
            source_type: conversation.source_type(),
            is_private_channel: conversation.is_private_channel(),
        }
    }
}
