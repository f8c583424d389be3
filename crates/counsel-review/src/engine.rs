//! The review engine (§4.6): ties type identification, per-criterion
//! evaluation, the deterministic rollup stages, and summary generation
//! together behind one entry point, publishing progress to the review's
//! channel throughout and catching every error at the top level so a
//! review always ends in `complete`, `cancelled`, or `error`.

use std::sync::Arc;
use std::time::Instant;

use counsel_core::model::{PolicyDefinition, PolicyReview, PolicyReviewState};
use counsel_core::ports::ChatModel;
use counsel_core::{EntityId, TenantId};
use counsel_events::{Channel, EventBus, EventPayload, InMemoryReplayStore, ReplayStore};
use counsel_legislation::LegislationClient;
use counsel_retrieval::HybridSearch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{ReviewError, Result};
use crate::model::{PolicyReviewResult, ReviewErrorOutcome};
use crate::port::ReviewStore;
use crate::rollup;
use crate::type_identifier::PolicyTypeIdentifier;
use crate::{evaluator, summary};

/// Model identifiers the engine calls through (§6: `model-fast`, `model-advanced`).
pub struct ModelTiers {
    pub fast: String,
    pub advanced: String,
}

/// Input to one review run.
pub struct ReviewRequest {
    pub tenant_id: TenantId,
    pub user_id: EntityId,
    pub document_text: String,
    pub policy_definition_id: Option<EntityId>,
}

/// Everything the engine needs to run one review. Cheap to clone: every
/// field is an `Arc`, a plain value, or already internally shared.
pub struct ReviewEngine<R: ReplayStore = InMemoryReplayStore> {
    pub store: Arc<dyn ReviewStore>,
    pub event_bus: EventBus<R>,
    pub chat_model: Arc<dyn ChatModel>,
    pub policy_search: Option<HybridSearch>,
    pub legislation_client: Option<LegislationClient>,
    pub models: ModelTiers,
}

impl<R: ReplayStore + Clone + 'static> ReviewEngine<R> {
    /// Runs the full review (§4.6 stages 1-9). Every error is caught,
    /// mapped to its recorded code, and persisted on the review row rather
    /// than propagated — callers only see `Err` for failures that
    /// prevented the review row itself from being created.
    pub async fn run(&self, request: ReviewRequest, cancel: CancellationToken) -> Result<PolicyReview> {
        let review = self
            .store
            .create_review(PolicyReview {
                id: EntityId::new(),
                tenant_id: request.tenant_id,
                user_id: request.user_id,
                policy_definition_id: request.policy_definition_id,
                state: PolicyReviewState::Pending,
                result: None,
                version: 1,
                created_at: chrono_now(),
            })
            .await
            .map_err(ReviewError::Store)?;

        let channel = Channel::policy_review(request.tenant_id, review.id);
        self.publish(&channel, EventPayload::AgentStart { name: "policy-review".into(), task: "Starting policy review...".into() })
            .await;

        self.store
            .update_review_state(request.tenant_id, review.id, PolicyReviewState::Processing)
            .await
            .map_err(ReviewError::Store)?;
        self.publish(&channel, EventPayload::PolicyReviewStatus { state: "processing".into(), text: "Identifying policy type".into() })
            .await;

        match self.run_stages(&request, &channel, &cancel).await {
            Ok(result) => {
                let value = serde_json::to_value(&result).map_err(|e| ReviewError::Validation {
                    stage: "persist_result",
                    message: format!("result failed to serialise: {e}"),
                })?;
                self.store
                    .persist_result(request.tenant_id, review.id, PolicyReviewState::Complete, value)
                    .await
                    .map_err(ReviewError::Store)?;
                self.publish(&channel, EventPayload::PolicyReviewComplete { id: review.id.to_string() }).await;
                self.publish(&channel, EventPayload::AgentComplete { name: "policy-review".into(), duration_ms: 0 }).await;
            }
            Err(ReviewError::Cancelled) => {
                self.store
                    .update_review_state(request.tenant_id, review.id, PolicyReviewState::Cancelled)
                    .await
                    .map_err(ReviewError::Store)?;
                self.publish(&channel, EventPayload::PolicyReviewStatus { state: "cancelled".into(), text: "Review cancelled".into() })
                    .await;
            }
            Err(err) => {
                warn!(error = %err, tenant_id = %request.tenant_id, review_id = %review.id, "policy review failed");
                let outcome = ReviewErrorOutcome { error_code: err.code().to_string(), message: err.to_string() };
                let value = serde_json::to_value(&outcome).unwrap_or_default();
                self.store
                    .persist_result(request.tenant_id, review.id, PolicyReviewState::Error, value)
                    .await
                    .map_err(ReviewError::Store)?;
                self.publish(&channel, EventPayload::PolicyReviewFailed { code: err.code().to_string(), message: err.to_string() })
                    .await;
            }
        }

        self.store.load_review(request.tenant_id, review.id).await.map_err(ReviewError::Store)
    }

    /// Records a cancellation request against a pending or processing
    /// review (§4.6 "Error transitions"); ignored for a review already in
    /// a terminal state. Called from outside an in-flight `run`, the same
    /// way [`crate::engine`]'s caller is expected to hold the
    /// [`CancellationToken`] passed to `run` and cancel it separately —
    /// this method only updates persisted state and emits the event, it
    /// does not itself reach into a running `run` call.
    pub async fn cancel(&self, tenant_id: TenantId, review_id: EntityId) -> Result<()> {
        let review = self.store.load_review(tenant_id, review_id).await.map_err(ReviewError::Store)?;
        if !review.state.accepts_cancel() {
            return Ok(());
        }
        self.store.update_review_state(tenant_id, review_id, PolicyReviewState::Cancelled).await.map_err(ReviewError::Store)?;
        let channel = Channel::policy_review(tenant_id, review_id);
        self.publish(&channel, EventPayload::PolicyReviewStatus { state: "cancelled".into(), text: "Review cancelled".into() }).await;
        Ok(())
    }

    async fn run_stages(&self, request: &ReviewRequest, channel: &Channel, cancel: &CancellationToken) -> Result<PolicyReviewResult> {
        if cancel.is_cancelled() {
            return Err(ReviewError::Cancelled);
        }

        // Stage 2-3: identify (if needed) and load the definition.
        let definition = self.resolve_definition(request).await?;

        if cancel.is_cancelled() {
            return Err(ReviewError::Cancelled);
        }

        // Stage 4: per-criterion evaluation, concurrently; order of
        // completion doesn't matter, only that every criterion is covered.
        let tenant_key = request.tenant_id.to_string();
        let total = definition.compliance_criteria.len() as u32;
        let evaluations = futures::future::join_all(definition.compliance_criteria.iter().map(|criterion| {
            let document_text = request.document_text.clone();
            let tenant_key = tenant_key.clone();
            let model = self.chat_model.clone();
            let model_id = self.models.advanced.clone();
            async move {
                evaluator::evaluate_criterion(
                    criterion,
                    &document_text,
                    &tenant_key,
                    self.policy_search.as_ref(),
                    self.legislation_client.as_ref(),
                    &model,
                    &model_id,
                )
                .await
            }
        }))
        .await;

        let mut criterion_results = Vec::with_capacity(evaluations.len());
        for (i, evaluation) in evaluations.into_iter().enumerate() {
            let result = evaluation?;
            self.publish(channel, EventPayload::PolicyReviewCitationProgress { so_far: (i + 1) as u32, total }).await;
            criterion_results.push(result);

            if cancel.is_cancelled() {
                return Err(ReviewError::Cancelled);
            }
        }

        // Stages 5-7: deterministic rollup, no model call.
        let gap_analysis = rollup::gap_analysis(&definition, &request.document_text, &criterion_results);
        let recommended_actions = rollup::recommended_actions(&criterion_results);
        let overall_rating = rollup::overall_rating(&criterion_results);

        // Stage 8: executive summary.
        let summary_started = Instant::now();
        let summary_text = summary::generate(
            &self.chat_model,
            &self.models.advanced,
            &definition.name,
            overall_rating,
            &criterion_results,
            &gap_analysis,
        )
        .await?;
        info!(elapsed_ms = summary_started.elapsed().as_millis() as u64, "policy review summary generated");

        Ok(PolicyReviewResult {
            policy_definition_id: definition.id,
            policy_definition_name: definition.name,
            overall_rating,
            criterion_results,
            gap_analysis,
            recommended_actions,
            summary: summary_text,
        })
    }

    async fn resolve_definition(&self, request: &ReviewRequest) -> Result<PolicyDefinition> {
        if let Some(definition_id) = request.policy_definition_id {
            return self.store.load_definition(request.tenant_id, definition_id).await.map_err(ReviewError::Store);
        }

        let definitions =
            self.store.load_active_definitions(request.tenant_id).await.map_err(ReviewError::Store)?;
        let identifier = PolicyTypeIdentifier::new(self.chat_model.clone(), self.models.fast.clone());
        let matched = identifier.identify(&request.document_text, &definitions).await?;
        Ok(matched.clone())
    }

    async fn publish(&self, channel: &Channel, payload: EventPayload) {
        let _ = self.event_bus.publish(channel, payload).await;
    }
}

/// `chrono::Utc::now()` is not reachable through a port here the way C5
/// threads a [`counsel_core::ports::Clock`] through; the review row's
/// creation timestamp is advisory only (the store is free to overwrite it
/// on insert), so a direct call is acceptable at this single call site.
fn chrono_now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}
