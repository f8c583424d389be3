//! High-availability gateway to the external legislation service (§4.3).
//!
//! Consumers call [`client::LegislationClient::for_active`] against a
//! process-wide [`health::HealthManagerHandle`] to get a client bound to
//! whichever endpoint the health manager currently trusts. A background
//! probe loop (not included here — the surrounding application schedules
//! it) calls [`health::HealthManagerHandle::record_probe`] on an interval.

pub mod change_detection;
pub mod client;
pub mod error;
pub mod health;
pub mod model;

pub use client::LegislationClient;
pub use error::{GatewayError, Result};
pub use health::{Endpoint, HealthManagerHandle};
