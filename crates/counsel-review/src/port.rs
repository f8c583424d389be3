//! The relational store seam the review engine calls through (§4.6).
//! Connection pooling, row mapping, and transaction management are the
//! surrounding application's job, same as `counsel-agent::port`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use counsel_core::error::Result;
use counsel_core::model::{PolicyDefinition, PolicyReview, PolicyReviewState};
use counsel_core::{EntityId, TenantId};

#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Creates the review row in `pending` state and returns it.
    async fn create_review(&self, review: PolicyReview) -> Result<PolicyReview>;

    async fn update_review_state(&self, tenant_id: TenantId, review_id: EntityId, state: PolicyReviewState) -> Result<()>;

    /// Persists the assembled result (or error blob) and the terminal state
    /// in one write (§4.6 stage 9 / "Error transitions").
    async fn persist_result(
        &self,
        tenant_id: TenantId,
        review_id: EntityId,
        state: PolicyReviewState,
        result: serde_json::Value,
    ) -> Result<()>;

    async fn load_review(&self, tenant_id: TenantId, review_id: EntityId) -> Result<PolicyReview>;

    /// All active policy definitions for a tenant, used by the type
    /// identifier when no definition was supplied (§4.6 stage 2).
    async fn load_active_definitions(&self, tenant_id: TenantId) -> Result<Vec<PolicyDefinition>>;

    async fn load_definition(&self, tenant_id: TenantId, definition_id: EntityId) -> Result<PolicyDefinition>;

    /// Completed reviews in a date range, for the trends/comparison
    /// operations (§4.6).
    async fn completed_reviews_in_range(
        &self,
        tenant_id: TenantId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<PolicyReview>>;

    /// Count of active, required definitions for a tenant (trends coverage
    /// denominator).
    async fn count_required_definitions(&self, tenant_id: TenantId) -> Result<u32>;
}
