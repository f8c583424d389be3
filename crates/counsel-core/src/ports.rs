//! Narrow trait ports the orchestration crates (`counsel-agent`,
//! `counsel-review`) call through, instead of depending on a concrete model
//! provider or clock. Adapters implementing these for a real provider live
//! outside this core (§1 scope); tests use simple in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use crate::error::Result;

/// A chunk of streamed model output.
pub type TextChunk = String;

/// The model-provider port used by the orchestrator stage. Model
/// identifiers are treated as opaque strings; only a routing helper outside
/// this trait chooses among tiers.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Streams a text completion for the given system prompt and
    /// conversation history, yielding one chunk at a time so callers can
    /// publish each as its own event without buffering the full response.
    async fn stream(
        &self,
        model: &str,
        system_prompt: &str,
        history: &[ChatTurn],
    ) -> Result<BoxStream<'static, Result<TextChunk>>>;

    /// Single-shot, JSON-constrained generation: the provider is asked to
    /// return a value matching `schema_hint` (a human-readable description
    /// used in the prompt, not a machine-enforced schema) and the raw JSON
    /// text is returned for the caller to parse defensively (§9).
    async fn generate_json(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String>;
}

/// One turn of conversation history passed to a [`ChatModel`].
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// Speaker role for a [`ChatTurn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// The embedding-provider port.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a single query string into a dense vector.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Embeds a batch of texts, preserving input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// An injectable clock so time-dependent logic (replay windows, cache TTLs,
/// health-check intervals) can be tested deterministically.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock, used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A fixed clock for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
