//! Primary/fallback health management (§4.3).
//!
//! A single [`HealthManagerHandle`] is built once per process and shared;
//! nothing in this module constructs state per-request (§9). The handle
//! wraps an `Arc` over a `tokio::sync::RwLock`-guarded state triple, so
//! reads (almost every call) never contend with each other and writes
//! (probe results) are rare.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// Which endpoint is currently preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Primary,
    Fallback,
}

#[derive(Debug, Clone)]
struct HealthState {
    active: Endpoint,
    consecutive_failures: u32,
    last_check: Option<DateTime<Utc>>,
}

struct HealthManagerInner {
    state: RwLock<HealthState>,
    failure_threshold: u32,
    primary_url: String,
    fallback_url: String,
}

/// A cheap, `Clone`-able handle to the shared health-manager state.
#[derive(Clone)]
pub struct HealthManagerHandle {
    inner: Arc<HealthManagerInner>,
}

impl HealthManagerHandle {
    /// Builds a new handle, starting in the primary state with a clean
    /// failure counter. Call once per process and share the handle.
    pub fn new(primary_url: impl Into<String>, fallback_url: impl Into<String>, failure_threshold: u32) -> Self {
        Self {
            inner: Arc::new(HealthManagerInner {
                state: RwLock::new(HealthState {
                    active: Endpoint::Primary,
                    consecutive_failures: 0,
                    last_check: None,
                }),
                failure_threshold,
                primary_url: primary_url.into(),
                fallback_url: fallback_url.into(),
            }),
        }
    }

    /// Returns the base URL bound to whichever endpoint is currently active.
    pub async fn active_url(&self) -> String {
        match self.state().await.active {
            Endpoint::Primary => self.inner.primary_url.clone(),
            Endpoint::Fallback => self.inner.fallback_url.clone(),
        }
    }

    /// Returns the currently active endpoint.
    pub async fn active(&self) -> Endpoint {
        self.state().await.active
    }

    async fn state(&self) -> HealthState {
        self.inner.state.read().await.clone()
    }

    /// Records the outcome of a primary health-check probe (§4.3):
    /// success resets the counter (and flips back to primary if the
    /// fallback was active); failure increments it, flipping to fallback
    /// once the threshold is reached.
    pub async fn record_probe(&self, succeeded: bool, at: DateTime<Utc>) {
        let mut state = self.inner.state.write().await;
        state.last_check = Some(at);
        if succeeded {
            state.consecutive_failures = 0;
            state.active = Endpoint::Primary;
        } else {
            state.consecutive_failures += 1;
            if state.consecutive_failures >= self.inner.failure_threshold {
                state.active = Endpoint::Fallback;
            }
        }
    }

    /// Administrative override: force primary regardless of the current
    /// failure counter (§4.3).
    pub async fn force_primary(&self) {
        let mut state = self.inner.state.write().await;
        state.active = Endpoint::Primary;
        state.consecutive_failures = 0;
    }

    /// The consecutive-failure counter, for observability/tests.
    pub async fn consecutive_failures(&self) -> u32 {
        self.state().await.consecutive_failures
    }
}
