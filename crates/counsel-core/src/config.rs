//! Recognised configuration options (§6).
//!
//! `CoreConfig` is a passive data holder: reading it from the environment or
//! a config file, and wiring it into the HTTP surface's bootstrap, is the
//! surrounding application's job. What lives here is the closed list of
//! options the core actually consults, with defaults matching the spec.

use serde::{Deserialize, Serialize};

/// Configuration consumed directly by the core components (C1-C6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// How long the event replay window retains published events.
    pub event_replay_window_seconds: u64,
    /// Idle interval between subscriber heartbeat frames.
    pub heartbeat_interval_seconds: u64,
    /// Primary (private, preferred) legislation service base URL.
    pub legislation_primary_url: String,
    /// Fallback (public) legislation service base URL.
    pub legislation_fallback_url: String,
    /// Interval between legislation gateway health probes.
    pub legislation_health_check_interval_seconds: u64,
    /// Consecutive failures before the health manager fails over.
    pub legislation_max_consecutive_failures: u32,
    /// Per-call timeout for the legislation client.
    pub legislation_call_timeout_seconds: u64,
    /// Reduced timeout used on the citation-verification path.
    pub legislation_verification_timeout_seconds: u64,
    /// Embedding model identifier.
    pub embedding_model_id: String,
    /// Embedding vector dimensionality.
    pub embedding_dimensions: u32,
    /// Batch size for embedding requests.
    pub embedding_batch_size: u32,
    /// Target tokens per chunk.
    pub chunk_target_tokens: u32,
    /// Maximum tokens per chunk.
    pub chunk_max_tokens: u32,
    /// Token overlap between adjacent chunks.
    pub chunk_overlap_tokens: u32,
    /// Maximum accepted upload size, in bytes.
    pub max_upload_size_bytes: u64,
    /// Model identifier used for the fast tier (router, title generation).
    pub model_fast: String,
    /// Model identifier used for the standard tier.
    pub model_standard: String,
    /// Model identifier used for the advanced tier (orchestrator, evaluation).
    pub model_advanced: String,
    /// Minimum cosine similarity for a semantic-cache hit.
    pub semantic_cache_hit_threshold: f32,
    /// Semantic cache entry time-to-live.
    pub semantic_cache_ttl_seconds: i64,
    /// Maximum retry count before a document is dead-lettered.
    pub max_retry_count: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            event_replay_window_seconds: 300,
            heartbeat_interval_seconds: 15,
            legislation_primary_url: String::new(),
            legislation_fallback_url: String::new(),
            legislation_health_check_interval_seconds: 30,
            legislation_max_consecutive_failures: 3,
            legislation_call_timeout_seconds: 30,
            legislation_verification_timeout_seconds: 15,
            embedding_model_id: String::new(),
            embedding_dimensions: 1024,
            embedding_batch_size: 32,
            chunk_target_tokens: 512,
            chunk_max_tokens: 768,
            chunk_overlap_tokens: 64,
            max_upload_size_bytes: 50 * 1024 * 1024,
            model_fast: String::new(),
            model_standard: String::new(),
            model_advanced: String::new(),
            semantic_cache_hit_threshold: 0.95,
            semantic_cache_ttl_seconds: 30 * 24 * 3600,
            max_retry_count: 3,
        }
    }
}
