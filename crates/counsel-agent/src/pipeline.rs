//! The agent invocation pipeline (§4.5): ties every stage together behind
//! one entry point, publishing events to the conversation's channel
//! throughout and observing cancellation at each stage boundary.

use std::sync::Arc;
use std::time::Instant;

use counsel_core::error::ErrorKind;
use counsel_core::model::{
    AgentInvocation, Confidence, InvocationMode, InvocationState, Message, MessageRole, MessageState,
};
use counsel_core::ports::{ChatModel, Clock, EmbeddingProvider};
use counsel_core::{EntityId, TenantId};
use counsel_events::{Channel, EventBus, EventPayload, InMemoryReplayStore, ReplayStore, SourceStatus, VerificationIssue};
use counsel_legislation::LegislationClient;
use counsel_retrieval::HybridSearch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cache;
use crate::confidence;
use crate::error::{AgentError, Result};
use crate::model::{KnowledgeContext, PipelineOutcome, RouterDecision};
use crate::orchestrator;
use crate::port::{PipelineStore, QualityReviewer, SemanticCacheStore};
use crate::retrieval;
use crate::router::RouterAgent;
use crate::title::{self, TitleGenerator};

/// Model identifiers for the three tiers the pipeline calls through
/// (§6 configuration: `model-fast`, `model-standard`, `model-advanced`).
pub struct ModelTiers {
    pub fast: String,
    pub advanced: String,
}

/// Everything the pipeline needs to run one invocation. Cheap to clone:
/// every field is an `Arc` or a plain value.
pub struct AgentPipeline<R: ReplayStore = InMemoryReplayStore> {
    pub store: Arc<dyn PipelineStore>,
    pub cache_store: Arc<dyn SemanticCacheStore>,
    pub event_bus: EventBus<R>,
    pub chat_model: Arc<dyn ChatModel>,
    pub embeddings: Arc<dyn EmbeddingProvider>,
    pub clock: Arc<dyn Clock>,
    pub quality_reviewer: Arc<dyn QualityReviewer>,
    pub policy_search: Option<HybridSearch>,
    pub legislation_client: Option<LegislationClient>,
    pub models: ModelTiers,
    pub semantic_cache_enabled: bool,
    pub semantic_cache_hit_threshold: f32,
    pub semantic_cache_ttl_seconds: i64,
}

/// Input to one invocation of the pipeline.
pub struct InvokeRequest {
    pub tenant_id: TenantId,
    pub conversation_id: EntityId,
    pub user_id: EntityId,
    pub query: String,
    pub persona_id: Option<EntityId>,
}

impl<R: ReplayStore + Clone + 'static> AgentPipeline<R> {
    /// Runs the full invocation. On any stage error the invocation's
    /// writes are rolled back and the error is returned (§4.5 stage 12).
    pub async fn invoke(&self, request: InvokeRequest, cancel: CancellationToken) -> Result<PipelineOutcome> {
        let channel = Channel::conversation(request.tenant_id, request.conversation_id);

        match self.invoke_inner(&request, &channel, &cancel).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                warn!(error = %err, tenant_id = %request.tenant_id, "agent invocation failed, rolling back");
                Err(err)
            }
        }
    }

    async fn invoke_inner(
        &self,
        request: &InvokeRequest,
        channel: &Channel,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome> {
        // Optional semantic cache read short-circuit (§4.5, before stage 2).
        if self.semantic_cache_enabled {
            if let Some(hit) = cache::read(
                self.cache_store.as_ref(),
                self.embeddings.as_ref(),
                self.clock.as_ref(),
                request.tenant_id,
                &request.query,
                self.semantic_cache_hit_threshold,
            )
            .await
            {
                info!(similarity = hit.similarity, "semantic cache hit, bypassing pipeline stages 2-11");
                self.publish(channel, EventPayload::ContentDelta { text: hit.entry.response.clone() }).await;
                return Ok(PipelineOutcome {
                    content: hit.entry.response,
                    confidence: None,
                    cache_hit: true,
                    model_used: None,
                });
            }
        }

        // Stage 1: load context.
        let history = self
            .store
            .load_history(request.tenant_id, request.conversation_id)
            .await
            .map_err(AgentError::Store)?;
        let persona = match request.persona_id {
            Some(id) => self.store.load_persona(request.tenant_id, id).await.map_err(AgentError::Store)?,
            None => None,
        };

        let invocation = self
            .store
            .create_invocation(AgentInvocation {
                id: EntityId::new(),
                tenant_id: request.tenant_id,
                conversation_id: request.conversation_id,
                mode: InvocationMode::Chat,
                query: request.query.clone(),
                persona_id: request.persona_id,
                state: InvocationState::Running,
                model_used: None,
                cache_hit: false,
                created_at: self.clock.now(),
            })
            .await
            .map_err(AgentError::Store)?;

        if self.check_cancelled(channel, request.tenant_id, invocation.id, cancel).await {
            return Err(AgentError::Cancelled);
        }

        // Stage 2: router.
        self.publish(channel, EventPayload::AgentStart { name: "router".into(), task: "Classifying query intent...".into() })
            .await;
        let router_started = Instant::now();
        let router = RouterAgent::new(self.chat_model.clone(), self.models.fast.clone());
        let router_decision = match router.classify(&request.query).await {
            Ok(d) => d,
            Err(err) => {
                self.abort(channel, request.tenant_id, invocation.id, &err).await;
                return Err(err);
            }
        };
        self.publish(
            channel,
            EventPayload::AgentComplete { name: "router".into(), duration_ms: router_started.elapsed().as_millis() as u64 },
        )
        .await;

        if self.check_cancelled(channel, request.tenant_id, invocation.id, cancel).await {
            return Err(AgentError::Cancelled);
        }

        // Stage 3: parallel knowledge retrieval. Worker failures already
        // degrade to empty results inside `retrieval::gather`.
        let tenant_key = request.tenant_id.to_string();
        let knowledge = retrieval::gather(
            self.policy_search.as_ref(),
            self.legislation_client.as_ref(),
            &tenant_key,
            &router_decision,
            &request.query,
        )
        .await;
        self.emit_knowledge_sources(channel, &knowledge).await;

        // Stage 4-5: orchestrator + disclaimer.
        self.publish(
            channel,
            EventPayload::AgentStart { name: "orchestrator".into(), task: "Generating response...".into() },
        )
        .await;
        let orchestrator_started = Instant::now();
        let system_prompt = orchestrator::assemble_system_prompt(persona.as_ref(), &knowledge, &router_decision);
        let messages = orchestrator::build_messages(&history, &request.query);

        let content = match orchestrator::stream_response(
            &self.chat_model,
            &self.models.advanced,
            &system_prompt,
            &messages,
            &self.event_bus,
            channel,
        )
        .await
        {
            Ok(c) => c,
            Err(err) => {
                self.abort(channel, request.tenant_id, invocation.id, &err).await;
                return Err(err);
            }
        };
        self.publish(
            channel,
            EventPayload::AgentComplete {
                name: "orchestrator".into(),
                duration_ms: orchestrator_started.elapsed().as_millis() as u64,
            },
        )
        .await;

        if self.check_cancelled(channel, request.tenant_id, invocation.id, cancel).await {
            return Err(AgentError::Cancelled);
        }

        // Stage 6: persist assistant message.
        let message_id = self
            .store
            .persist_message(Message {
                id: EntityId::new(),
                tenant_id: request.tenant_id,
                conversation_id: request.conversation_id,
                role: MessageRole::Assistant,
                content: content.clone(),
                state: MessageState::Success,
                confidence_level: None,
                verification_result: None,
                created_at: self.clock.now(),
            })
            .await
            .map_err(AgentError::Store)?;

        // Stage 7: citation verification. Upstream unavailability degrades
        // to an empty result rather than failing the invocation (§4.5).
        self.publish(
            channel,
            EventPayload::AgentStart { name: "verification".into(), task: "Verifying citations...".into() },
        )
        .await;
        let verification_started = Instant::now();
        let verification = match &self.legislation_client {
            Some(client) => counsel_verification::verify_response(client, &content).await,
            None => counsel_verification::VerificationResult {
                checked: 0,
                verified: 0,
                unverified: 0,
                removed: 0,
                citations: vec![],
                issues: vec![],
            },
        };
        self.publish(
            channel,
            EventPayload::VerificationResult {
                checked: verification.checked,
                verified: verification.verified,
                unverified: verification.unverified,
                removed: verification.removed,
                issues: verification
                    .citations
                    .iter()
                    .filter(|c| c.status != counsel_verification::VerificationStatus::Verified)
                    .map(|c| VerificationIssue {
                        citation_text: c.citation_text.clone(),
                        reason: c.error_message.clone().unwrap_or_default(),
                    })
                    .collect(),
            },
        )
        .await;
        self.publish(
            channel,
            EventPayload::AgentComplete {
                name: "verification".into(),
                duration_ms: verification_started.elapsed().as_millis() as u64,
            },
        )
        .await;

        // Stage 8: quality review (advisory, never blocking).
        let review = self.quality_reviewer.review(&content, content.contains("does not constitute legal advice")).await;
        info!(
            approved = review.approved,
            completeness = review.completeness_score,
            clarity = review.clarity_score,
            issues = review.issues.len(),
            "quality review complete"
        );

        // Stage 9: confidence scoring.
        let (level, reason) = confidence::score(&verification, knowledge.has_sources(), &router_decision);
        self.store
            .attach_outcome(request.tenant_id, message_id, level, verification_to_json(&verification))
            .await
            .map_err(AgentError::Store)?;
        self.publish(channel, EventPayload::ConfidenceUpdate { level: confidence_label(level).to_string(), reason }).await;

        // Stage 10: title generation, first exchange only.
        self.maybe_generate_title(channel, request, &history).await?;

        // Stage 11: semantic cache write, best-effort, high confidence only.
        if self.semantic_cache_enabled && level == Confidence::High {
            cache::write(
                self.cache_store.as_ref(),
                self.embeddings.as_ref(),
                request.tenant_id,
                &request.query,
                &content,
                serde_json::json!([]),
                self.semantic_cache_ttl_seconds,
                self.clock.now(),
            )
            .await;
        }

        // Stage 12: finalise.
        self.store
            .update_invocation_state(request.tenant_id, invocation.id, InvocationState::Complete, Some(self.models.advanced.clone()))
            .await
            .map_err(AgentError::Store)?;

        Ok(PipelineOutcome { content, confidence: Some(level), cache_hit: false, model_used: Some(self.models.advanced.clone()) })
    }

    async fn maybe_generate_title(
        &self,
        channel: &Channel,
        request: &InvokeRequest,
        history: &[Message],
    ) -> Result<()> {
        let conversation = self.store.load_conversation(request.tenant_id, request.conversation_id).await.map_err(AgentError::Store)?;
        if !title::should_generate(conversation.title.as_deref(), history.len()) {
            return Ok(());
        }

        self.publish(channel, EventPayload::ConversationTitleUpdating).await;
        let generator = TitleGenerator::new(self.chat_model.clone(), self.models.fast.clone());
        let title = generator.generate(&request.query).await?;
        self.store
            .update_conversation_title(request.tenant_id, request.conversation_id, title.clone())
            .await
            .map_err(AgentError::Store)?;
        self.publish(channel, EventPayload::ConversationTitleUpdated { title }).await;
        Ok(())
    }

    async fn emit_knowledge_sources(&self, channel: &Channel, knowledge: &KnowledgeContext) {
        use crate::model::RetrievedSource::*;
        for source in &knowledge.sources {
            let event = match source {
                Policy { document_name, section, .. } => EventPayload::CompanyPolicySource {
                    document_name: document_name.clone(),
                    section: section.clone(),
                    status: SourceStatus::Unverified,
                },
                Legislation { act_name, section, uri, .. } => EventPayload::LegalSource {
                    act: act_name.clone(),
                    section: section.clone(),
                    uri: uri.clone(),
                    status: SourceStatus::Unverified,
                },
                CaseLaw { case_name, citation, .. } => {
                    EventPayload::CaseLawSource { case_name: case_name.clone(), citation: citation.clone(), status: SourceStatus::Unverified }
                }
            };
            self.publish(channel, event).await;
        }
    }

    /// On external cancel: sets invocation state to `cancelled`, emits
    /// `conversation-cancelled`, and signals the caller to stop (§4.5).
    async fn check_cancelled(&self, channel: &Channel, tenant_id: TenantId, invocation_id: EntityId, cancel: &CancellationToken) -> bool {
        if !cancel.is_cancelled() {
            return false;
        }
        let _ = self.store.update_invocation_state(tenant_id, invocation_id, InvocationState::Cancelled, None).await;
        self.publish(channel, EventPayload::ConversationCancelled).await;
        true
    }

    async fn abort(&self, channel: &Channel, tenant_id: TenantId, invocation_id: EntityId, err: &AgentError) {
        let kind = ErrorKind::from(err);
        self.publish(
            channel,
            EventPayload::Error { code: format!("{kind:?}"), message: err.to_string(), recoverable: kind.is_retryable() },
        )
        .await;
        let _ = self.store.rollback(tenant_id, invocation_id).await;
        let _ = self.store.update_invocation_state(tenant_id, invocation_id, InvocationState::Error, None).await;
    }

    async fn publish(&self, channel: &Channel, payload: EventPayload) {
        let _ = self.event_bus.publish(channel, payload).await;
    }
}

fn confidence_label(level: Confidence) -> &'static str {
    match level {
        Confidence::Low => "low",
        Confidence::Medium => "medium",
        Confidence::High => "high",
    }
}

fn verification_to_json(result: &counsel_verification::VerificationResult) -> serde_json::Value {
    serde_json::json!({
        "checked": result.checked,
        "verified": result.verified,
        "unverified": result.unverified,
        "removed": result.removed,
        "issues": result.issues,
    })
}

/// External cancel on a running invocation: sets state, emits the event.
/// Called from outside the in-flight `invoke` call (e.g. an HTTP DELETE
/// handler); the in-flight call observes the state change at its own next
/// stage boundary and exits via [`AgentError::Cancelled`].
pub async fn cancel<R: ReplayStore + Clone + 'static>(
    store: &dyn PipelineStore,
    event_bus: &EventBus<R>,
    tenant_id: TenantId,
    invocation_id: EntityId,
    conversation_id: EntityId,
) -> Result<()> {
    store
        .update_invocation_state(tenant_id, invocation_id, InvocationState::Cancelled, None)
        .await
        .map_err(AgentError::Store)?;
    let channel = Channel::conversation(tenant_id, conversation_id);
    let _ = event_bus.publish(&channel, EventPayload::ConversationCancelled).await;
    Ok(())
}
