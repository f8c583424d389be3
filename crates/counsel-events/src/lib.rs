//! Tenant-scoped event fabric.
//!
//! Publishers call [`bus::EventBus::publish`] on a [`channel::Channel`];
//! subscribers call [`bus::EventBus::subscribe`] and receive a [`futures::Stream`]
//! of [`frame::Frame`]s that can be rendered directly onto an SSE wire
//! (`frame::Frame::to_sse_lines`). Reconnecting clients pass the last
//! identifier they saw and receive exactly the gap, served from the
//! [`replay::ReplayStore`].

pub mod bus;
pub mod channel;
pub mod error;
pub mod event;
pub mod frame;
pub mod replay;

pub use bus::EventBus;
pub use channel::{Channel, ChannelScope};
pub use error::EventsError;
pub use event::{EventPayload, SourceStatus, VerificationIssue};
pub use frame::Frame;
pub use replay::{InMemoryReplayStore, ReplayStore};
