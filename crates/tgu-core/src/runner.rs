//! Caller-facing work-item surface.
//!
//! One work item is one retrieval request: a channel identifier (empty means
//! "all known conversations"), an optional resume cursor, and a backfill
//! hint. Items run sequentially to completion; nothing is shared between
//! them except the transport session.

use serde::Deserialize;
use tracing::warn;

use crate::{
    domain::{MessageId, NormalizedMessage},
    fetch::{fetch_all, fetch_from_conversation, FetchPolicy},
    ports::TransportPort,
    resolve::resolve,
    Error, Result,
};

/// One retrieval request, as supplied by the caller.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkItem {
    /// Identifier to resolve; empty means fan out over every known
    /// conversation.
    pub channel_name: String,
    /// Resume cursor; 0 means not cursor mode.
    pub last_message_id: i32,
    /// Backfill-mode hint. Loses to `last_message_id` when both are set.
    pub is_new: bool,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RunOptions {
    /// Record per-item failures and keep going instead of aborting the run.
    pub continue_on_fail: bool,
}

/// The per-item result the run-level driver decides over.
#[derive(Debug)]
pub struct ItemOutcome {
    pub index: usize,
    pub result: Result<Vec<NormalizedMessage>>,
}

/// Process one work item: refresh the dialog list, resolve (or fan out), and
/// fetch.
///
/// A conversation joined during resolution is always fetched in backfill
/// mode with no cursor; a known conversation gets the caller's cursor and
/// backfill flag as-is.
pub async fn run_item(
    transport: &dyn TransportPort,
    item: &WorkItem,
) -> Result<Vec<NormalizedMessage>> {
    let dialogs = transport.get_dialogs().await?;

    if item.channel_name.is_empty() {
        return fetch_all(transport, &dialogs, item.is_new).await;
    }

    let resolved = resolve(transport, &dialogs, &item.channel_name).await?;
    let policy = if resolved.newly_joined {
        FetchPolicy::backfill()
    } else {
        FetchPolicy {
            is_new: item.is_new,
            last_message_id: (item.last_message_id != 0)
                .then_some(MessageId(item.last_message_id)),
        }
    };

    fetch_from_conversation(transport, &resolved.conversation, policy).await
}

/// Process work items in order.
///
/// With `continue_on_fail`, a failing item is recorded in its outcome and the
/// run moves on; otherwise the first failure aborts the run, tagged with the
/// offending item's index, and later items are never started.
pub async fn run_items(
    transport: &dyn TransportPort,
    items: &[WorkItem],
    options: RunOptions,
) -> Result<Vec<ItemOutcome>> {
    let mut outcomes = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        match run_item(transport, item).await {
            Ok(messages) => outcomes.push(ItemOutcome {
                index,
                result: Ok(messages),
            }),
            Err(error) if options.continue_on_fail => {
                warn!(index, %error, "work item failed, continuing");
                outcomes.push(ItemOutcome {
                    index,
                    result: Err(error),
                });
            }
            Err(error) => {
                return Err(Error::Item {
                    index,
                    source: Box::new(error),
                });
            }
        }
    }

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::testsupport::{
        channel_handle, group_handle, twelve_messages, user_handle, FixtureTransport,
    };

    fn item(channel_name: &str, last_message_id: i32, is_new: bool) -> WorkItem {
        WorkItem {
            channel_name: channel_name.to_string(),
            last_message_id,
            is_new,
        }
    }

    fn fixture() -> FixtureTransport {
        let now = Utc::now().timestamp();
        let channel = channel_handle();
        FixtureTransport::new(vec![channel.clone()])
            .with_history(channel.id, twelve_messages(now))
    }

    #[test]
    fn work_items_deserialize_with_defaults() {
        let full: WorkItem = serde_json::from_str(
            r#"{"channelName": "@kontext_channel", "lastMessageId": 54868, "isNew": true}"#,
        )
        .unwrap();
        assert_eq!(full.channel_name, "@kontext_channel");
        assert_eq!(full.last_message_id, 54868);
        assert!(full.is_new);

        let empty: WorkItem = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.channel_name, "");
        assert_eq!(empty.last_message_id, 0);
        assert!(!empty.is_new);
    }

    #[tokio::test]
    async fn known_channel_default_mode_returns_the_window() {
        let transport = fixture();
        let messages = run_item(&transport, &item("channel-name", 0, false))
            .await
            .unwrap();
        assert_eq!(messages.len(), 11);
    }

    #[tokio::test]
    async fn known_channel_backfill_returns_one_page() {
        let transport = fixture();
        let messages = run_item(&transport, &item("channel-name", 0, true))
            .await
            .unwrap();
        assert_eq!(messages.len(), 10);
    }

    #[tokio::test]
    async fn cursor_wins_over_the_backfill_hint() {
        let transport = fixture();
        let messages = run_item(&transport, &item("channel-name", 54868, true))
            .await
            .unwrap();
        assert_eq!(
            messages.iter().map(|m| m.id.0).collect::<Vec<_>>(),
            vec![54872, 54871, 54870, 54869]
        );
    }

    #[tokio::test]
    async fn cursor_at_the_oldest_message_returns_the_rest() {
        let transport = fixture();
        let messages = run_item(&transport, &item("channel-name", 54861, false))
            .await
            .unwrap();
        assert_eq!(messages.len(), 11);
    }

    #[tokio::test]
    async fn newly_joined_channel_is_backfilled_ignoring_the_cursor() {
        let now = Utc::now().timestamp();
        let known = group_handle();
        let joined = channel_handle();
        let transport = FixtureTransport::new(vec![known])
            .with_history(joined.id, twelve_messages(now))
            .with_joined(joined);

        // The cursor would select 4 messages on a known channel; on the
        // freshly-joined one a full backfill page comes back instead.
        let messages = run_item(&transport, &item("kontext_channel", 54868, false))
            .await
            .unwrap();

        assert_eq!(messages.len(), 10);
        assert_eq!(transport.counts().join, 1);
        assert_eq!(transport.counts().get_dialogs, 2);
    }

    #[tokio::test]
    async fn empty_channel_name_fans_out_over_all_dialogs() {
        let now = Utc::now().timestamp();
        let channel = channel_handle();
        let group = group_handle();
        let transport =
            FixtureTransport::new(vec![channel.clone(), user_handle(), group.clone()])
                .with_history(channel.id, twelve_messages(now))
                .with_history(group.id, twelve_messages(now));

        let messages = run_item(&transport, &item("", 0, false)).await.unwrap();

        // 11 in-window from each history-bearing dialog, in dialog order.
        assert_eq!(messages.len(), 22);
        assert_eq!(messages[0].source_id, channel.id);
        assert_eq!(messages.last().unwrap().source_id, group.id);
        assert_eq!(transport.counts().join, 0);
    }

    #[tokio::test]
    async fn continue_on_fail_records_the_error_and_keeps_going() {
        let transport = fixture();
        let items = [item("@missing", 0, false), item("channel-name", 0, false)];

        let outcomes = run_items(
            &transport,
            &items,
            RunOptions {
                continue_on_fail: true,
            },
        )
        .await
        .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(matches!(
            outcomes[0].result,
            Err(Error::ChannelNotFound(_))
        ));
        assert_eq!(outcomes[1].result.as_ref().unwrap().len(), 11);
    }

    #[tokio::test]
    async fn abort_mode_tags_the_failing_item_index_and_stops() {
        let transport = fixture();
        let items = [item("@missing", 0, false), item("channel-name", 0, false)];

        let err = run_items(&transport, &items, RunOptions::default())
            .await
            .unwrap_err();

        let Error::Item { index, source } = err else {
            panic!("expected an item error");
        };
        assert_eq!(index, 0);
        assert!(matches!(*source, Error::ChannelNotFound(_)));

        // Item 0 used one initial dialog fetch plus the post-join refresh;
        // item 1 never started.
        assert_eq!(transport.counts().get_dialogs, 2);
        assert_eq!(transport.counts().get_messages, 0);
    }
}
