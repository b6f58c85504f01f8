//! Telegram adapter (grammers).
//!
//! This crate implements the `tgu-core` TransportPort over an MTProto user
//! session. Core code never sees grammers types; everything is mapped into
//! domain entities at this boundary.

use std::collections::HashMap;

use async_trait::async_trait;
use grammers_client::{types::Chat, Client, Config as ClientConfig, InitParams};
use grammers_session::{PackedChat, Session};
use tokio::sync::Mutex;
use tracing::info;

use tgu_core::{
    config::Config,
    domain::{
        ConversationHandle, ConversationId, EntityKind, MessageId, RawMessage, RoleFlags,
    },
    errors::Error,
    ports::{PageRequest, TransportPort},
    Result,
};

pub struct TelegramTransport {
    client: Client,
    /// Packed peer references by conversation id, so history calls carry the
    /// right access hashes. Refilled on every dialog refresh.
    peers: Mutex<HashMap<i64, PackedChat>>,
}

impl TelegramTransport {
    /// Connect with the configured session file and app credentials.
    ///
    /// The session must already be signed in; interactive login is not part
    /// of this adapter.
    pub async fn connect(cfg: &Config) -> Result<Self> {
        let session = Session::load_file_or_create(&cfg.session_file)?;

        let client = Client::connect(ClientConfig {
            session,
            api_id: cfg.api_id,
            api_hash: cfg.api_hash.clone(),
            params: InitParams::default(),
        })
        .await
        .map_err(|e| Error::Transport(format!("telegram connect failed: {e}")))?;

        if !client
            .is_authorized()
            .await
            .map_err(|e| Error::Transport(format!("authorization check failed: {e}")))?
        {
            return Err(Error::Transport(
                "session file is not signed in".to_string(),
            ));
        }

        Ok(Self {
            client,
            peers: Mutex::new(HashMap::new()),
        })
    }

    async fn peer(&self, id: ConversationId) -> Result<PackedChat> {
        self.peers.lock().await.get(&id.0).copied().ok_or_else(|| {
            Error::Transport(format!(
                "unknown conversation {}; refresh dialogs first",
                id.0
            ))
        })
    }
}

fn map_err(e: grammers_client::InvocationError) -> Error {
    Error::Transport(format!("telegram error: {e}"))
}

fn map_chat(chat: &Chat) -> ConversationHandle {
    let (entity_kind, roles) = match chat {
        Chat::Channel(_) => (
            EntityKind::Channel,
            RoleFlags {
                is_channel: true,
                is_group: false,
                is_user: false,
            },
        ),
        Chat::Group(_) => (
            EntityKind::Chat,
            RoleFlags {
                is_channel: false,
                is_group: true,
                is_user: false,
            },
        ),
        Chat::User(_) => (
            EntityKind::User,
            RoleFlags {
                is_channel: false,
                is_group: false,
                is_user: true,
            },
        ),
    };

    ConversationHandle {
        id: ConversationId(chat.id()),
        title: chat.name().to_string(),
        entity_kind,
        username: chat.username().map(|u| u.to_string()),
        roles,
    }
}

#[async_trait]
impl TransportPort for TelegramTransport {
    async fn get_messages(
        &self,
        conversation: &ConversationHandle,
        page: PageRequest,
    ) -> Result<Vec<RawMessage>> {
        let peer = self.peer(conversation.id).await?;

        let mut iter = self.client.iter_messages(peer);
        if let Some(limit) = page.limit {
            iter = iter.limit(limit);
        }
        if let Some(offset_date) = page.offset_date {
            iter = iter.offset_date(offset_date as i32);
        }

        let mut out = Vec::new();
        while let Some(message) = iter.next().await.map_err(map_err)? {
            // History comes back newest-first, so the first message at or
            // below the cursor ends the page.
            if page.min_id.is_some_and(|min| message.id() <= min.0) {
                break;
            }
            out.push(RawMessage {
                id: MessageId(message.id()),
                text: message.text().to_string(),
                timestamp: message.date().timestamp(),
            });
        }
        Ok(out)
    }

    async fn join(&self, identifier: &str) -> Result<()> {
        let chat = self
            .client
            .resolve_username(identifier)
            .await
            .map_err(map_err)?
            .ok_or_else(|| Error::ChannelNotFound(identifier.to_string()))?;

        self.client.join_chat(chat.pack()).await.map_err(map_err)?;
        info!(identifier, "joined");
        Ok(())
    }

    async fn get_dialogs(&self) -> Result<Vec<ConversationHandle>> {
        let mut iter = self.client.iter_dialogs();
        let mut out = Vec::new();
        let mut peers = self.peers.lock().await;

        while let Some(dialog) = iter.next().await.map_err(map_err)? {
            let chat = dialog.chat();
            peers.insert(chat.id(), chat.pack());
            out.push(map_chat(chat));
        }
        Ok(out)
    }
}
