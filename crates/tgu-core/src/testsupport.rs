//! Shared in-memory transport and fixtures for unit tests.
//!
//! The paging semantics mirror the real transport: pages are newest-first,
//! `min_id` is exclusive, `offset_date` keeps strictly older messages, and
//! `limit` is applied last.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;

use crate::{
    domain::{
        ConversationHandle, ConversationId, EntityKind, MessageId, RawMessage, RoleFlags,
    },
    ports::{PageRequest, TransportPort},
    Error, Result,
};

#[derive(Clone, Copy, Debug, Default)]
pub struct CallCounts {
    pub get_messages: usize,
    pub join: usize,
    pub get_dialogs: usize,
}

pub struct FixtureTransport {
    history: HashMap<i64, Vec<RawMessage>>,
    dialogs: Mutex<Vec<ConversationHandle>>,
    /// Appended to the dialog list when `join` is called, emulating a join
    /// that the next refresh picks up.
    joined: Option<ConversationHandle>,
    calls: Mutex<CallCounts>,
}

impl FixtureTransport {
    pub fn new(dialogs: Vec<ConversationHandle>) -> Self {
        Self {
            history: HashMap::new(),
            dialogs: Mutex::new(dialogs),
            joined: None,
            calls: Mutex::new(CallCounts::default()),
        }
    }

    pub fn with_history(mut self, id: ConversationId, messages: Vec<RawMessage>) -> Self {
        self.history.insert(id.0, messages);
        self
    }

    pub fn with_joined(mut self, handle: ConversationHandle) -> Self {
        self.joined = Some(handle);
        self
    }

    pub fn counts(&self) -> CallCounts {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl TransportPort for FixtureTransport {
    async fn get_messages(
        &self,
        conversation: &ConversationHandle,
        page: PageRequest,
    ) -> Result<Vec<RawMessage>> {
        self.calls.lock().unwrap().get_messages += 1;
        let history = self
            .history
            .get(&conversation.id.0)
            .ok_or_else(|| Error::Transport("no history fixture for conversation".to_string()))?;

        let matching = history
            .iter()
            .filter(|m| page.min_id.map_or(true, |min| m.id > min))
            .filter(|m| page.offset_date.map_or(true, |off| m.timestamp < off))
            .cloned();

        Ok(match page.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    async fn join(&self, _identifier: &str) -> Result<()> {
        self.calls.lock().unwrap().join += 1;
        if let Some(handle) = &self.joined {
            self.dialogs.lock().unwrap().push(handle.clone());
        }
        Ok(())
    }

    async fn get_dialogs(&self) -> Result<Vec<ConversationHandle>> {
        self.calls.lock().unwrap().get_dialogs += 1;
        Ok(self.dialogs.lock().unwrap().clone())
    }
}

pub fn channel_handle() -> ConversationHandle {
    ConversationHandle {
        id: ConversationId(-1001429590454),
        title: "channel-name".to_string(),
        entity_kind: EntityKind::Channel,
        username: Some("kontext_channel".to_string()),
        roles: RoleFlags {
            is_channel: true,
            is_group: false,
            is_user: false,
        },
    }
}

pub fn group_handle() -> ConversationHandle {
    ConversationHandle {
        id: ConversationId(-400123456),
        title: "group-name".to_string(),
        entity_kind: EntityKind::Chat,
        username: None,
        roles: RoleFlags {
            is_channel: false,
            is_group: true,
            is_user: false,
        },
    }
}

pub fn user_handle() -> ConversationHandle {
    ConversationHandle {
        id: ConversationId(777000),
        title: "some-user".to_string(),
        entity_kind: EntityKind::User,
        username: Some("some_user".to_string()),
        roles: RoleFlags {
            is_channel: false,
            is_group: false,
            is_user: true,
        },
    }
}

/// The canonical history fixture: twelve text messages, newest-first, two
/// minutes apart, with a two-hour-old outlier at the end.
pub fn twelve_messages(now: i64) -> Vec<RawMessage> {
    let mut out: Vec<RawMessage> = (0..11)
        .map(|i| RawMessage {
            id: MessageId(54872 - i),
            text: "Some text".to_string(),
            timestamp: now - 120 * i64::from(i),
        })
        .collect();
    out.push(RawMessage {
        id: MessageId(54861),
        text: "Some text".to_string(),
        timestamp: now - 60 * 60 * 2,
    });
    out
}
