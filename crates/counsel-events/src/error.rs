use counsel_core::{CoreError, ErrorKind};
use thiserror::Error;

/// Errors raised by the event fabric.
#[derive(Debug, Error)]
pub enum EventsError {
    /// The channel's broadcast topic could not be reached (all receivers
    /// dropped mid-send, or the topic was torn down concurrently).
    #[error("publish failed for channel {channel}: {reason}")]
    PublishFailed { channel: String, reason: String },

    /// The subscriber fell behind the bounded per-subscriber buffer and was
    /// disconnected; it must reconnect with its last seen event identifier.
    #[error("subscriber for channel {channel} lagged and was disconnected")]
    SubscriberLagged { channel: String },
}

impl From<EventsError> for CoreError {
    fn from(err: EventsError) -> Self {
        match &err {
            EventsError::PublishFailed { .. } => {
                CoreError::upstream_transient(err.to_string())
            }
            EventsError::SubscriberLagged { .. } => {
                CoreError::new(ErrorKind::Internal, err.to_string())
            }
        }
    }
}
