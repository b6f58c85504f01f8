use async_trait::async_trait;

use crate::{
    domain::{ConversationHandle, MessageId, RawMessage},
    Result,
};

/// One backward-paginated history request.
///
/// `limit` caps the page size (absent = unbounded by count). `min_id`
/// excludes messages at or below that id. `offset_date` excludes messages at
/// or after that timestamp, i.e. paginates strictly older.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: Option<usize>,
    pub min_id: Option<MessageId>,
    pub offset_date: Option<i64>,
}

/// Transport port for an authenticated user-session chat client.
///
/// The adapter crate implements this over MTProto; tests implement it
/// in-memory. Pages come back newest-first.
#[async_trait]
pub trait TransportPort: Send + Sync {
    async fn get_messages(
        &self,
        conversation: &ConversationHandle,
        page: PageRequest,
    ) -> Result<Vec<RawMessage>>;

    /// Side-effecting join-by-identifier. Fire-and-forget: the refreshed
    /// dialog list is the source of truth afterwards.
    async fn join(&self, identifier: &str) -> Result<()>;

    /// Full refresh of the known-conversation list.
    async fn get_dialogs(&self) -> Result<Vec<ConversationHandle>>;
}
