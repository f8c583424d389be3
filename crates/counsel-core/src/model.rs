//! Persistent entity shapes and their state machines.
//!
//! These are plain data types: the storage layer (connection pooling, row
//! mapping, row-level security) is out of scope for this core and lives in
//! the surrounding application. What belongs here is the *shape* of each
//! entity and the *rules* governing its lifecycle, because those rules are
//! part of the domain, not the storage technology.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::{EntityId, TenantId};

/// A generic four-state lifecycle used by tenant-scoped label entities
/// (policy definitions, personas, knowledge bases) that are created, made
/// active, optionally disabled, and eventually soft-deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    /// Created but not yet usable.
    Pending,
    /// Usable.
    Active,
    /// Temporarily withdrawn from use; may return to active.
    Disabled,
    /// Permanently withdrawn.
    Deleted,
}

impl LifecycleStatus {
    /// Validates a proposed transition, returning a [`CoreError::validation`]
    /// for transitions the domain forbids.
    ///
    /// Allowed: `pending -> active`, `active -> disabled`, `active -> deleted`,
    /// `disabled -> active`. Everything else, including any transition out of
    /// `deleted` and `pending -> disabled`/`pending -> deleted`, is rejected.
    pub fn validate_transition(self, next: LifecycleStatus) -> Result<(), CoreError> {
        use LifecycleStatus::*;
        let allowed = matches!(
            (self, next),
            (Pending, Active) | (Active, Disabled) | (Active, Deleted) | (Disabled, Active)
        );
        if allowed {
            Ok(())
        } else {
            Err(CoreError::validation(format!(
                "illegal status transition: {self:?} -> {next:?}"
            )))
        }
    }
}

/// Conversation lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    Pending,
    Ready,
    Cancelled,
    Error,
}

/// A user-owned, tenant-scoped conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: EntityId,
    pub tenant_id: TenantId,
    pub user_id: EntityId,
    pub title: Option<String>,
    pub state: ConversationState,
    pub template_id: Option<EntityId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker; user-facing entities are never hard-deleted.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Message lifecycle state. Only [`MessageState::Success`] is a
/// "terminal-success" state; `Cancelled` and `Error` are terminal but not
/// successful, and confidence/verification are never attached to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageState {
    Pending,
    Streaming,
    Success,
    Cancelled,
    Error,
}

impl MessageState {
    /// A terminal state admits no further content mutation.
    pub fn is_terminal(self) -> bool {
        matches!(self, MessageState::Success | MessageState::Cancelled | MessageState::Error)
    }

    /// Only `Success` is terminal-success.
    pub fn is_terminal_success(self) -> bool {
        matches!(self, MessageState::Success)
    }
}

/// Three-valued qualitative confidence attached to a finalised assistant
/// message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// A message within a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: EntityId,
    pub tenant_id: TenantId,
    pub conversation_id: EntityId,
    pub role: MessageRole,
    pub content: String,
    pub state: MessageState,
    /// Present iff `verification_result` is present iff `state` is
    /// `Success` (checked in the invariant tests below).
    pub confidence_level: Option<Confidence>,
    pub verification_result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Checks the §3 invariant: confidence is set iff verification is set
    /// iff the state is terminal-success.
    pub fn satisfies_confidence_invariant(&self) -> bool {
        let both_set = self.confidence_level.is_some() && self.verification_result.is_some();
        let both_unset = self.confidence_level.is_none() && self.verification_result.is_none();
        (both_set || both_unset) && (both_set == self.state.is_terminal_success())
    }
}

/// Agent invocation mode (kept opaque beyond the two values the pipeline
/// currently distinguishes; additional modes are additive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationMode {
    Chat,
    PolicyReview,
}

/// Agent invocation lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationState {
    Pending,
    Running,
    Complete,
    Cancelled,
    Error,
}

impl InvocationState {
    /// §3 invariant: an invocation in `Running` state has no terminal child
    /// event. Exposed as a predicate so callers can assert it against their
    /// event log without duplicating the state list here.
    pub fn is_terminal(self) -> bool {
        matches!(self, InvocationState::Complete | InvocationState::Cancelled | InvocationState::Error)
    }
}

/// One record per user query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInvocation {
    pub id: EntityId,
    pub tenant_id: TenantId,
    pub conversation_id: EntityId,
    pub mode: InvocationMode,
    pub query: String,
    pub persona_id: Option<EntityId>,
    pub state: InvocationState,
    pub model_used: Option<String>,
    pub cache_hit: bool,
    pub created_at: DateTime<Utc>,
}

/// Tenant-scoped prompt augmentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub id: EntityId,
    pub tenant_id: TenantId,
    pub name: String,
    pub description: String,
    pub instructions: String,
}

/// A cached response keyed by query-embedding similarity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticCacheEntry {
    pub id: EntityId,
    pub tenant_id: TenantId,
    pub embedding: Vec<f32>,
    pub query_text: String,
    pub response: String,
    pub sources: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub ttl_seconds: i64,
    pub hit_count: u64,
}

impl SemanticCacheEntry {
    /// An entry is live while `created_at + ttl > now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.created_at + chrono::Duration::seconds(self.ttl_seconds) > now
    }

    /// §3/§5 invariant: visible iff same tenant and not expired.
    pub fn is_visible_to(&self, tenant_id: TenantId, now: DateTime<Utc>) -> bool {
        self.tenant_id == tenant_id && self.is_live(now)
    }
}

/// Document processing state. Dead-lettered after three consecutive
/// failures (see [`DocumentRetryState`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentProcessingState {
    Uploaded,
    Validating,
    Extracting,
    Chunking,
    Contextualising,
    Embedding,
    Indexing,
    Ready,
    Failed,
}

/// Tracks the retry/dead-letter bookkeeping for a document separately from
/// its processing state, so the dead-letter rule (§7) is one small, directly
/// testable function rather than buried in a larger entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DocumentRetryState {
    pub retry_count: u32,
    pub dead_lettered: bool,
}

impl DocumentRetryState {
    /// Maximum consecutive failures before dead-lettering (§6 configuration:
    /// "maximum retry count before dead-letter (3)").
    pub const MAX_RETRIES: u32 = 3;

    /// Records a failure, incrementing the retry counter and setting the
    /// dead-letter flag once [`Self::MAX_RETRIES`] is reached.
    pub fn record_failure(&mut self) {
        self.retry_count += 1;
        if self.retry_count >= Self::MAX_RETRIES {
            self.dead_lettered = true;
        }
    }

    /// Administrative retry: resets the counter and clears the flag.
    pub fn reset(&mut self) {
        self.retry_count = 0;
        self.dead_lettered = false;
    }
}

/// A document belonging to a knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: EntityId,
    pub tenant_id: TenantId,
    pub knowledge_base_id: EntityId,
    pub name: String,
    pub blob_ref: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub content_hash: String,
    pub state: DocumentProcessingState,
    pub version: u32,
    pub predecessor_version_id: Option<EntityId>,
    pub retry: DocumentRetryState,
    pub last_error: Option<String>,
}

impl Document {
    /// §3 invariant: the version chain is acyclic and monotonically
    /// numbered. Given the full chain for a document lineage (oldest first),
    /// checks both properties.
    pub fn chain_is_well_formed(chain: &[Document]) -> bool {
        let mut seen = std::collections::HashSet::new();
        let mut last_version = 0u32;
        for doc in chain {
            if !seen.insert(doc.id) {
                return false; // cycle
            }
            if doc.version <= last_version && last_version != 0 {
                return false; // not monotonically increasing
            }
            last_version = doc.version;
        }
        true
    }
}

/// A chunk of a document's text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: EntityId,
    pub tenant_id: TenantId,
    pub document_id: EntityId,
    pub content: String,
    pub contextual_prefix: Option<String>,
    pub ordinal: u32,
    pub byte_range: Option<(u64, u64)>,
    pub embedding_model: Option<String>,
}

/// Criterion priority used in both compliance evaluation and gap severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// One compliance criterion a policy document is evaluated against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceCriterion {
    pub name: String,
    pub priority: Priority,
    pub description: String,
    pub criteria_type: String,
}

/// One scoring criterion with textual RAG thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringCriterion {
    pub name: String,
    pub green_threshold: String,
    pub amber_threshold: String,
    pub red_threshold: String,
}

/// A tenant-scoped specification of what a policy document of a given type
/// must contain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDefinition {
    pub id: EntityId,
    pub tenant_id: TenantId,
    pub uri: String,
    pub name: String,
    pub name_variants: Vec<String>,
    pub status: LifecycleStatus,
    pub required_sections: Vec<String>,
    pub compliance_criteria: Vec<ComplianceCriterion>,
    pub scoring_criteria: Vec<ScoringCriterion>,
    pub legislation_references: Vec<String>,
    pub review_cycle_days: u32,
    pub group_id: Option<EntityId>,
    pub topic_ids: Vec<EntityId>,
    /// Whether this definition counts toward the tenant's required-policy
    /// coverage metric (§4.6 "Trends operation").
    pub is_required: bool,
}

/// Red/amber/green compliance rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RagRating {
    Red,
    Amber,
    Green,
}

/// Policy review lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyReviewState {
    Pending,
    Processing,
    Complete,
    Cancelled,
    Error,
}

impl PolicyReviewState {
    /// `cancel` is accepted in `Pending` or `Processing`; ignored otherwise.
    pub fn accepts_cancel(self) -> bool {
        matches!(self, PolicyReviewState::Pending | PolicyReviewState::Processing)
    }
}

/// A policy review: the job record, not its result payload (see
/// `counsel_review::PolicyReviewResult` for the assembled output).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyReview {
    pub id: EntityId,
    pub tenant_id: TenantId,
    pub user_id: EntityId,
    pub policy_definition_id: Option<EntityId>,
    pub state: PolicyReviewState,
    pub result: Option<serde_json::Value>,
    pub version: u32,
    pub created_at: DateTime<Utc>,
}
