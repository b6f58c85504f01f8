//! Backward-paginated message retrieval.
//!
//! One invocation issues a bounded sequence of history calls against the
//! transport port and decides per page whether to keep going. Three policies,
//! mutually exclusive by precedence:
//!
//! 1. cursor (`last_message_id`): unbounded page, everything newer than the
//!    cursor is kept;
//! 2. backfill (`is_new`): one capped page, kept regardless of age;
//! 3. default: capped pages filtered to the freshness window, paging on while
//!    a full page still ends inside the window.

use chrono::Utc;
use tracing::debug;

use crate::{
    domain::{ConversationHandle, MessageId, NormalizedMessage},
    ports::{PageRequest, TransportPort},
    Result,
};

/// Page cap for non-cursor fetches.
pub const PAGE_SIZE: usize = 10;

/// Default-mode freshness window.
pub const FRESHNESS_WINDOW_SECS: i64 = 60 * 60;

/// Caller intent for one conversation fetch. `last_message_id` wins over
/// `is_new`; with neither set the freshness window applies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FetchPolicy {
    pub is_new: bool,
    pub last_message_id: Option<MessageId>,
}

impl FetchPolicy {
    /// Policy for a conversation joined during this invocation: full first
    /// page, no cursor.
    pub fn backfill() -> Self {
        Self {
            is_new: true,
            last_message_id: None,
        }
    }
}

/// Fetch and normalize recent messages from one conversation.
///
/// Output order is exactly the transport order: newest-first within a page,
/// pages concatenated in fetch order (each page strictly older than the
/// previous). Conversations that do not support history yield an empty list
/// without touching the transport.
pub async fn fetch_from_conversation(
    transport: &dyn TransportPort,
    conversation: &ConversationHandle,
    policy: FetchPolicy,
) -> Result<Vec<NormalizedMessage>> {
    if !conversation.supports_history() {
        return Ok(Vec::new());
    }

    let cutoff = Utc::now().timestamp() - FRESHNESS_WINDOW_SECS;
    let keep_all = policy.last_message_id.is_some() || policy.is_new;

    let mut messages = Vec::new();
    let mut offset_date: Option<i64> = None;

    loop {
        let page = PageRequest {
            limit: if policy.last_message_id.is_some() {
                None
            } else {
                Some(PAGE_SIZE)
            },
            min_id: policy.last_message_id,
            offset_date,
        };

        let raw = transport.get_messages(conversation, page).await?;
        if raw.is_empty() {
            break;
        }
        debug!(
            conversation = conversation.id.0,
            count = raw.len(),
            "fetched page"
        );

        // Pages are newest-first, so the last entry is the oldest seen so
        // far. Page on only in default mode, while the page was full and its
        // oldest message still falls inside the freshness window.
        offset_date = match raw.last() {
            Some(oldest)
                if !keep_all && raw.len() == PAGE_SIZE && oldest.timestamp > cutoff =>
            {
                Some(oldest.timestamp)
            }
            _ => None,
        };

        messages.extend(
            raw.into_iter()
                .filter(|m| keep_all || m.timestamp >= cutoff)
                .filter(|m| !m.text.is_empty())
                .map(|m| NormalizedMessage::from_raw(m, conversation)),
        );

        if offset_date.is_none() {
            break;
        }
    }

    Ok(messages)
}

/// Fan-out: fetch every known conversation sequentially with the caller's
/// backfill flag (never a cursor) and concatenate in dialog-list order.
pub async fn fetch_all(
    transport: &dyn TransportPort,
    dialogs: &[ConversationHandle],
    is_new: bool,
) -> Result<Vec<NormalizedMessage>> {
    let mut out = Vec::new();
    for conversation in dialogs {
        let messages = fetch_from_conversation(
            transport,
            conversation,
            FetchPolicy {
                is_new,
                last_message_id: None,
            },
        )
        .await?;
        out.extend(messages);
    }
    Ok(out)
}
