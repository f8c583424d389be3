//! Shared foundation for the Counsel compliance core.
//!
//! This crate has no runtime behaviour of its own. It exists so that
//! `counsel-events`, `counsel-retrieval`, `counsel-legislation`,
//! `counsel-verification`, `counsel-agent`, and `counsel-review` share one
//! definition of tenant/entity identifiers, the entity data model, the
//! error taxonomy, recognised configuration, and the provider ports they
//! call through.

pub mod config;
pub mod error;
pub mod ids;
pub mod model;
pub mod ports;

pub use error::{CoreError, ErrorKind, Result};
pub use ids::{EntityId, TenantId};
