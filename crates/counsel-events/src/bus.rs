//! The event bus: publish, subscribe, and reconnection (§4.1, §5).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::Stream;
use tokio::sync::broadcast;
use tracing::warn;

use crate::channel::Channel;
use crate::error::EventsError;
use crate::event::EventPayload;
use crate::frame::Frame;
use crate::replay::{InMemoryReplayStore, ReplayStore};

/// Bounded per-subscriber buffer size. A subscriber that cannot keep up is
/// disconnected rather than allowed to apply backpressure to the publisher
/// (§4.1, §5).
const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

struct ChannelState {
    seq: AtomicU64,
    sender: broadcast::Sender<Frame>,
}

impl ChannelState {
    fn new(buffer: usize) -> Self {
        Self { seq: AtomicU64::new(0), sender: broadcast::channel(buffer).0 }
    }
}

struct EventBusInner<R: ReplayStore> {
    channels: DashMap<String, Arc<ChannelState>>,
    replay: R,
    window: Duration,
    heartbeat_interval: Duration,
    subscriber_buffer: usize,
}

/// The tenant-scoped event fabric. Cheap to clone: internally an `Arc`, so
/// the same bus handle can be shared with background producers and the HTTP
/// streaming layer alike.
pub struct EventBus<R: ReplayStore = InMemoryReplayStore> {
    inner: Arc<EventBusInner<R>>,
}

impl<R: ReplayStore> Clone for EventBus<R> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl EventBus<InMemoryReplayStore> {
    /// Builds a bus over the in-memory replay store with the documented
    /// defaults (300s window, 15s heartbeat).
    pub fn in_memory() -> Self {
        Self::new(InMemoryReplayStore::new(), Duration::from_secs(300), Duration::from_secs(15))
    }
}

impl<R: ReplayStore + Clone + 'static> EventBus<R> {
    /// Builds a bus over the given replay store implementation.
    pub fn new(replay: R, window: Duration, heartbeat_interval: Duration) -> Self {
        Self {
            inner: Arc::new(EventBusInner {
                channels: DashMap::new(),
                replay,
                window,
                heartbeat_interval,
                subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
            }),
        }
    }

    fn channel_state(&self, key: &str) -> Arc<ChannelState> {
        self.inner
            .channels
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(ChannelState::new(self.inner.subscriber_buffer)))
            .clone()
    }

    /// Publishes an event, assigning it a strictly monotonic per-channel
    /// identifier, persisting it to the replay window, and fanning it out
    /// to any live subscribers. Never blocks on a slow subscriber.
    pub async fn publish(
        &self,
        channel: &Channel,
        payload: EventPayload,
    ) -> Result<u64, EventsError> {
        let key = channel.key();
        let state = self.channel_state(&key);
        let id = state.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let frame = Frame::Data { id, payload };
        self.inner.replay.append(&key, frame.clone(), self.inner.window).await;
        // A broadcast send fails only when there are zero receivers, which is
        // not a publish failure: the replay window is the authoritative
        // record (§4.1 "publish is best-effort ordered" / §7 "the database
        // transaction is the authoritative record").
        let _ = state.sender.send(frame);
        Ok(id)
    }

    /// Subscribes to a channel, optionally resuming from `last_event_id`.
    /// The returned stream first yields every retained event strictly after
    /// `last_event_id`, then continues with live events and periodic
    /// heartbeats, until the caller drops it or the subscriber is
    /// disconnected for falling behind.
    pub fn subscribe(
        &self,
        channel: &Channel,
        last_event_id: Option<u64>,
    ) -> impl Stream<Item = Frame> + Send + 'static {
        let key = channel.key();
        let state = self.channel_state(&key);
        let mut rx = state.sender.subscribe();
        let replay = self.inner.replay.clone();
        let heartbeat_interval = self.inner.heartbeat_interval;
        let log_key = key.clone();

        async_stream::stream! {
            for frame in replay.replay_after(&key, last_event_id).await {
                yield frame;
            }

            let mut ticker = tokio::time::interval(heartbeat_interval);
            ticker.tick().await; // the first tick fires immediately; consume it

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        yield Frame::Heartbeat;
                    }
                    received = rx.recv() => {
                        match received {
                            Ok(frame) => yield frame,
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                warn!(channel = %log_key, skipped, "subscriber lagged, disconnecting");
                                yield Frame::Data {
                                    id: 0,
                                    payload: EventPayload::Error {
                                        code: "subscriber_lagged".to_string(),
                                        message: "fell behind the live stream and was disconnected".to_string(),
                                        recoverable: true,
                                    },
                                };
                                break;
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use counsel_core::{EntityId, TenantId};
    use futures::StreamExt;

    #[tokio::test]
    async fn published_ids_are_strictly_monotonic_per_channel() {
        let bus = EventBus::in_memory();
        let channel = Channel::conversation(TenantId::new(), EntityId::new());
        let id1 = bus.publish(&channel, EventPayload::ConversationCancelled).await.unwrap();
        let id2 = bus.publish(&channel, EventPayload::ConversationCancelled).await.unwrap();
        let id3 = bus.publish(&channel, EventPayload::ConversationCancelled).await.unwrap();
        assert!(id1 < id2 && id2 < id3);
    }

    #[tokio::test]
    async fn reconnection_replays_exactly_events_after_last_seen() {
        let bus = EventBus::in_memory();
        let channel = Channel::conversation(TenantId::new(), EntityId::new());
        let e1 = bus.publish(&channel, EventPayload::ConversationCancelled).await.unwrap();
        bus.publish(&channel, EventPayload::ConversationCancelled).await.unwrap();
        bus.publish(&channel, EventPayload::ConversationCancelled).await.unwrap();

        let stream = bus.subscribe(&channel, Some(e1));
        tokio::pin!(stream);
        let first = stream.next().await.unwrap();
        let second = stream.next().await.unwrap();
        assert_eq!(first.id(), Some(e1 + 1));
        assert_eq!(second.id(), Some(e1 + 2));
    }

    #[tokio::test]
    async fn cross_tenant_channels_never_observe_each_others_events() {
        let bus = EventBus::in_memory();
        let resource = EntityId::new();
        let channel_a = Channel::conversation(TenantId::new(), resource);
        let channel_b = Channel::conversation(TenantId::new(), resource);

        let stream_b = bus.subscribe(&channel_b, None);
        tokio::pin!(stream_b);

        bus.publish(&channel_a, EventPayload::ContentDelta { text: "secret".into() })
            .await
            .unwrap();

        let next = tokio::time::timeout(Duration::from_millis(200), stream_b.next()).await;
        assert!(next.is_err(), "tenant B's subscription must not observe tenant A's publish");
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeats_are_emitted_on_idle_channels() {
        let bus = EventBus::new(InMemoryReplayStore::new(), Duration::from_secs(300), Duration::from_millis(50));
        let channel = Channel::conversation(TenantId::new(), EntityId::new());
        let stream = bus.subscribe(&channel, None);
        tokio::pin!(stream);

        tokio::time::advance(Duration::from_millis(60)).await;
        let frame = stream.next().await.unwrap();
        assert!(matches!(frame, Frame::Heartbeat));
    }
}
