//! Provider-abstracted seams the pipeline calls through. Connection
//! pooling, row mapping, and transaction management are the surrounding
//! application's job (see `counsel-core::model`'s module doc); what
//! belongs here is the shape of the calls the pipeline makes against them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use counsel_core::error::Result;
use counsel_core::model::{AgentInvocation, Conversation, InvocationState, Message, Persona};
use counsel_core::{EntityId, TenantId};

/// The relational store seam: conversation history, invocation bookkeeping,
/// and message persistence.
#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// The last 20 messages of a conversation, ordered ascending (§4.5 stage 1).
    async fn load_history(&self, tenant_id: TenantId, conversation_id: EntityId) -> Result<Vec<Message>>;

    async fn load_persona(&self, tenant_id: TenantId, persona_id: EntityId) -> Result<Option<Persona>>;

    async fn load_conversation(&self, tenant_id: TenantId, conversation_id: EntityId) -> Result<Conversation>;

    /// Creates the invocation row in `running` state and returns it.
    async fn create_invocation(&self, invocation: AgentInvocation) -> Result<AgentInvocation>;

    async fn update_invocation_state(
        &self,
        tenant_id: TenantId,
        invocation_id: EntityId,
        state: InvocationState,
        model_used: Option<String>,
    ) -> Result<()>;

    /// Persists a new message and returns its assigned identifier.
    async fn persist_message(&self, message: Message) -> Result<EntityId>;

    /// Attaches confidence and verification-result to an already-persisted
    /// assistant message.
    async fn attach_outcome(
        &self,
        tenant_id: TenantId,
        message_id: EntityId,
        confidence: counsel_core::model::Confidence,
        verification_result: serde_json::Value,
    ) -> Result<()>;

    async fn update_conversation_title(
        &self,
        tenant_id: TenantId,
        conversation_id: EntityId,
        title: String,
    ) -> Result<()>;

    /// Rolls back every write made for this invocation. Called from the
    /// pipeline's top-level error handler (§4.5 stage 12).
    async fn rollback(&self, tenant_id: TenantId, invocation_id: EntityId) -> Result<()>;
}

/// The semantic cache store: tenant-scoped, embedding-keyed response cache
/// (§4.5 optional read short-circuit, stage 11 write).
#[async_trait]
pub trait SemanticCacheStore: Send + Sync {
    /// All non-expired entries for a tenant, as of `now`.
    async fn live_entries(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> Result<Vec<counsel_core::model::SemanticCacheEntry>>;

    async fn insert(&self, entry: counsel_core::model::SemanticCacheEntry) -> Result<()>;
}

/// Advisory, non-blocking response review (§4.5 stage 8, §9 open question:
/// production gating is unspecified).
#[async_trait]
pub trait QualityReviewer: Send + Sync {
    async fn review(&self, response: &str, has_disclaimer: bool) -> QualityReview;
}

#[derive(Debug, Clone)]
pub struct QualityReview {
    pub approved: bool,
    pub completeness_score: f32,
    pub clarity_score: f32,
    pub issues: Vec<String>,
}

/// Always approves. Mirrors the hard-coded testing-mode flag in the system
/// this pipeline replaces; production gating is an open question (§9).
#[derive(Debug, Clone, Copy, Default)]
pub struct TestingModeReviewer;

#[async_trait]
impl QualityReviewer for TestingModeReviewer {
    async fn review(&self, response: &str, has_disclaimer: bool) -> QualityReview {
        let mut issues = Vec::new();
        if !has_disclaimer {
            issues.push("response missing legal-advice disclaimer".to_string());
        }
        if response.trim().is_empty() {
            issues.push("response is empty".to_string());
        }
        QualityReview {
            approved: true,
            completeness_score: if response.len() > 80 { 1.0 } else { 0.5 },
            clarity_score: 1.0,
            issues,
        }
    }
}
