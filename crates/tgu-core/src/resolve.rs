//! Channel resolution: turn a human-supplied identifier (invite URL,
//! `@handle`, or bare title) into a conversation handle, joining on demand.

use tracing::info;

use crate::{
    domain::ConversationHandle,
    ports::TransportPort,
    Error, Result,
};

const INVITE_URL_PREFIX: &str = "https://t.me/";

/// Strip the invite-link prefix or a leading `@` sigil; bare titles pass
/// through unchanged.
pub fn normalize_identifier(identifier: &str) -> &str {
    if let Some(rest) = identifier.strip_prefix(INVITE_URL_PREFIX) {
        rest
    } else if let Some(rest) = identifier.strip_prefix('@') {
        rest
    } else {
        identifier
    }
}

/// A resolved conversation, with a flag telling the fetcher whether the
/// membership is new (newly-joined conversations are always backfilled).
#[derive(Clone, Debug)]
pub struct Resolved {
    pub conversation: ConversationHandle,
    pub newly_joined: bool,
}

fn find_exact<'a>(
    dialogs: &'a [ConversationHandle],
    name: &str,
) -> Option<&'a ConversationHandle> {
    dialogs
        .iter()
        .find(|d| d.title == name || d.username.as_deref() == Some(name))
}

fn find_ignore_case<'a>(
    dialogs: &'a [ConversationHandle],
    name: &str,
) -> Option<&'a ConversationHandle> {
    dialogs.iter().find(|d| {
        d.title.eq_ignore_ascii_case(name)
            || d.username
                .as_deref()
                .is_some_and(|u| u.eq_ignore_ascii_case(name))
    })
}

/// Find `identifier` in the known-conversation list, or join it and re-find
/// it in a refreshed list.
///
/// The first pass matches title and username case-sensitively. On a miss, one
/// join call and one dialog-list refresh are issued; the re-match then also
/// tolerates case differences, since the identifier demonstrably reaches a
/// real conversation at that point. Join is one-shot: if the refreshed list
/// still has no match, resolution fails.
pub async fn resolve(
    transport: &dyn TransportPort,
    dialogs: &[ConversationHandle],
    identifier: &str,
) -> Result<Resolved> {
    let name = normalize_identifier(identifier);

    if let Some(found) = find_exact(dialogs, name) {
        return Ok(Resolved {
            conversation: found.clone(),
            newly_joined: false,
        });
    }

    info!(identifier = name, "not a member yet, joining");
    transport.join(name).await?;
    let refreshed = transport.get_dialogs().await?;

    let found = find_exact(&refreshed, name)
        .or_else(|| find_ignore_case(&refreshed, name))
        .ok_or_else(|| Error::ChannelNotFound(name.to_string()))?;

    Ok(Resolved {
        conversation: found.clone(),
        newly_joined: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::{channel_handle, group_handle, FixtureTransport};

    #[test]
    fn identifier_normalization_handles_all_three_spellings() {
        assert_eq!(normalize_identifier("channel-name"), "channel-name");
        assert_eq!(normalize_identifier("@kontext_channel"), "kontext_channel");
        assert_eq!(
            normalize_identifier("https://t.me/kontext_channel"),
            "kontext_channel"
        );
    }

    #[tokio::test]
    async fn title_handle_and_url_resolve_to_the_same_conversation() {
        let channel = channel_handle();
        let transport = FixtureTransport::new(vec![channel.clone()]);
        let dialogs = vec![channel.clone()];

        for identifier in [
            "channel-name",
            "@kontext_channel",
            "https://t.me/kontext_channel",
        ] {
            let resolved = resolve(&transport, &dialogs, identifier).await.unwrap();
            assert_eq!(resolved.conversation, channel);
            assert!(!resolved.newly_joined);
        }
        assert_eq!(transport.counts().join, 0);
        assert_eq!(transport.counts().get_dialogs, 0);
    }

    #[tokio::test]
    async fn unknown_identifier_joins_once_then_matches_the_refreshed_list() {
        let known = group_handle();
        let joined = channel_handle();
        let transport =
            FixtureTransport::new(vec![known.clone()]).with_joined(joined.clone());

        let resolved = resolve(&transport, &[known], "kontext_channel")
            .await
            .unwrap();

        assert_eq!(resolved.conversation, joined);
        assert!(resolved.newly_joined);
        assert_eq!(transport.counts().join, 1);
        assert_eq!(transport.counts().get_dialogs, 1);
    }

    #[tokio::test]
    async fn mixed_case_identifier_matches_only_after_the_join_round_trip() {
        let channel = channel_handle();
        let transport = FixtureTransport::new(vec![channel.clone()]);

        let resolved = resolve(&transport, &[channel.clone()], "Channel-Name")
            .await
            .unwrap();

        // The exact-case pass misses, so a join and a refresh happen; the
        // re-match then tolerates the casing and reports the membership as new.
        assert_eq!(resolved.conversation, channel);
        assert!(resolved.newly_joined);
        assert_eq!(transport.counts().join, 1);
        assert_eq!(transport.counts().get_dialogs, 1);
    }

    #[tokio::test]
    async fn unresolvable_identifier_fails_after_one_join_attempt() {
        let transport = FixtureTransport::new(vec![group_handle()]);

        let err = resolve(&transport, &[group_handle()], "@no-such-channel")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ChannelNotFound(name) if name == "no-such-channel"));
        assert_eq!(transport.counts().join, 1);
        assert_eq!(transport.counts().get_dialogs, 1);
    }
}
