//! Router stage (§4.5 stage 2): fast-model query classification.

use std::sync::Arc;

use counsel_core::ports::ChatModel;

use crate::error::{AgentError, Result};
use crate::model::RouterDecision;

const ROUTER_SYSTEM_PROMPT: &str = r#"You classify a user's legal/housing query. Respond with JSON only,
matching exactly: {"intent": string, "sources": array of "uk-legislation"|"case-law"|"internal-policies",
"complexity": "simple"|"moderate"|"complex", "reasoning": string}. Do not include any other text."#;

pub struct RouterAgent {
    model: Arc<dyn ChatModel>,
    model_id: String,
}

impl RouterAgent {
    pub fn new(model: Arc<dyn ChatModel>, model_id: impl Into<String>) -> Self {
        Self { model, model_id: model_id.into() }
    }

    /// Classifies one query. A model response that doesn't parse against
    /// the expected schema is a validation failure, not a panic (§9).
    pub async fn classify(&self, query: &str) -> Result<RouterDecision> {
        let raw = self
            .model
            .generate_json(&self.model_id, ROUTER_SYSTEM_PROMPT, query)
            .await
            .map_err(|e| AgentError::Model { stage: "router", source: e })?;

        serde_json::from_str(&raw)
            .map_err(|e| AgentError::Validation { stage: "router", message: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use counsel_core::error::Result as CoreResult;
    use counsel_core::ports::{ChatTurn, TextChunk};
    use futures::stream::BoxStream;

    use super::*;

    struct FixedModel(String);

    #[async_trait]
    impl ChatModel for FixedModel {
        async fn stream(
            &self,
            _model: &str,
            _system_prompt: &str,
            _history: &[ChatTurn],
        ) -> CoreResult<BoxStream<'static, CoreResult<TextChunk>>> {
            unreachable!("router never streams")
        }

        async fn generate_json(&self, _model: &str, _system_prompt: &str, _user_prompt: &str) -> CoreResult<String> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn classifies_a_well_formed_response() {
        let model = Arc::new(FixedModel(
            r#"{"intent":"tenancy_question","sources":["uk-legislation"],"complexity":"simple","reasoning":"asks about notice periods"}"#
                .to_string(),
        ));
        let router = RouterAgent::new(model, "fast-model");
        let decision = router.classify("what notice must my landlord give?").await.unwrap();
        assert_eq!(decision.intent, "tenancy_question");
        assert!(decision.wants(crate::model::KnowledgeSourceKind::UkLegislation));
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error_not_a_panic() {
        let model = Arc::new(FixedModel("not json at all".to_string()));
        let router = RouterAgent::new(model, "fast-model");
        let err = router.classify("hello").await.unwrap_err();
        assert!(matches!(err, AgentError::Validation { stage: "router", .. }));
    }

    #[tokio::test]
    async fn unknown_fields_and_missing_optional_fields_degrade_gracefully() {
        let model = Arc::new(FixedModel(r#"{"intent":"greeting","sources":[],"unexpected":true}"#.to_string()));
        let router = RouterAgent::new(model, "fast-model");
        let decision = router.classify("hi").await.unwrap();
        assert_eq!(decision.intent, "greeting");
        assert!(decision.sources.is_empty());
    }
}
