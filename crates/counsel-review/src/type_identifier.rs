//! Policy-type identification (§4.6 stage 2): matches an uploaded document
//! against the tenant's policy ontology using a fast model, skipped
//! entirely when the caller already supplied a definition identifier.

use std::sync::Arc;

use counsel_core::model::PolicyDefinition;
use counsel_core::ports::ChatModel;

use crate::error::{ReviewError, Result};
use crate::model::PolicyTypeIdentification;

/// Below this confidence the match is treated as no-match and the review
/// aborts with a validation error (§4.6 stage 2).
pub const CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Characters of the document excerpted into the classification prompt.
const DOCUMENT_EXCERPT_CHARS: usize = 2000;

const SYSTEM_PROMPT: &str = "You are a policy classification agent. Identify which policy \
type a document matches from the tenant's policy ontology based on its title, subject \
matter, themes, required sections, and terminology. Respond with JSON only: \
{\"matched_definition_uri\": string|null, \"confidence\": number, \"reasoning\": string, \
\"alternative_matches\": [{\"uri\": string, \"confidence\": number, \"name\": string}]}. \
If no clear match is found (confidence < 0.6), set matched_definition_uri to null and \
explain why in reasoning.";

pub struct PolicyTypeIdentifier {
    model: Arc<dyn ChatModel>,
    model_id: String,
}

impl PolicyTypeIdentifier {
    pub fn new(model: Arc<dyn ChatModel>, model_id: impl Into<String>) -> Self {
        Self { model, model_id: model_id.into() }
    }

    /// Classifies the document against `definitions`, returning the
    /// matched definition. Fails validation if there are no active
    /// definitions to match against, or if the model's best match falls
    /// below [`CONFIDENCE_THRESHOLD`] (§4.6 stage 2).
    pub async fn identify<'a>(
        &self,
        document_text: &str,
        definitions: &'a [PolicyDefinition],
    ) -> Result<&'a PolicyDefinition> {
        if definitions.is_empty() {
            return Err(ReviewError::Validation {
                stage: "policy_type_identification",
                message: "no active policy definitions found for tenant".to_string(),
            });
        }

        let prompt = build_prompt(definitions, document_text);
        let raw = self
            .model
            .generate_json(&self.model_id, SYSTEM_PROMPT, &prompt)
            .await
            .map_err(|e| ReviewError::Model { stage: "policy_type_identification", source: e })?;

        let parsed: PolicyTypeIdentification = serde_json::from_str(&raw).map_err(|e| ReviewError::Validation {
            stage: "policy_type_identification",
            message: format!("unparseable classification response: {e}"),
        })?;

        if parsed.confidence < CONFIDENCE_THRESHOLD {
            return Err(ReviewError::Validation {
                stage: "policy_type_identification",
                message: format!("no confident policy-type match (confidence {:.2}): {}", parsed.confidence, parsed.reasoning),
            });
        }

        let Some(uri) = parsed.matched_definition_uri else {
            return Err(ReviewError::Validation {
                stage: "policy_type_identification",
                message: "classification reported no matched definition".to_string(),
            });
        };

        definitions.iter().find(|d| d.uri == uri).ok_or_else(|| ReviewError::Validation {
            stage: "policy_type_identification",
            message: format!("classification matched an unknown uri: {uri}"),
        })
    }
}

fn build_prompt(definitions: &[PolicyDefinition], document_text: &str) -> String {
    let mut definitions_text = String::from("Tenant's Policy Definitions:\n\n");
    for (i, defn) in definitions.iter().enumerate() {
        definitions_text.push_str(&format!("{}. {} [uri: {}]\n", i + 1, defn.name, defn.uri));
        if !defn.name_variants.is_empty() {
            definitions_text.push_str(&format!("   Name variants: {:?}\n", defn.name_variants));
        }
        if !defn.required_sections.is_empty() {
            definitions_text.push_str(&format!("   Required sections: {:?}\n", defn.required_sections));
        }
        definitions_text.push('\n');
    }

    let excerpt: String = document_text.chars().take(DOCUMENT_EXCERPT_CHARS).collect();
    let truncated = document_text.chars().count() > DOCUMENT_EXCERPT_CHARS;
    let excerpt = if truncated { format!("{excerpt}\n\n[... document continues ...]") } else { excerpt };

    format!("{definitions_text}\nDocument to classify (first {DOCUMENT_EXCERPT_CHARS} characters):\n\n{excerpt}\n\nClassify this document against the policy definitions above.")
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use counsel_core::error::Result as CoreResult;
    use counsel_core::model::LifecycleStatus;
    use counsel_core::ports::{ChatTurn, TextChunk};
    use counsel_core::{EntityId, TenantId};
    use futures::stream::BoxStream;

    use super::*;

    struct FixedModel(&'static str);

    #[async_trait]
    impl ChatModel for FixedModel {
        async fn stream(&self, _m: &str, _s: &str, _h: &[ChatTurn]) -> CoreResult<BoxStream<'static, CoreResult<TextChunk>>> {
            unreachable!("type identification never streams")
        }
        async fn generate_json(&self, _m: &str, _s: &str, _u: &str) -> CoreResult<String> {
            Ok(self.0.to_string())
        }
    }

    fn definition(uri: &str, name: &str) -> PolicyDefinition {
        PolicyDefinition {
            id: EntityId::new(),
            tenant_id: TenantId::new(),
            uri: uri.to_string(),
            name: name.to_string(),
            name_variants: vec![],
            status: LifecycleStatus::Active,
            required_sections: vec![],
            compliance_criteria: vec![],
            scoring_criteria: vec![],
            legislation_references: vec![],
            review_cycle_days: 365,
            group_id: None,
            topic_ids: vec![],
            is_required: false,
        }
    }

    #[tokio::test]
    async fn matches_a_confident_classification() {
        let model = Arc::new(FixedModel(
            r#"{"matched_definition_uri":"fire-safety","confidence":0.92,"reasoning":"fire safety terms","alternative_matches":[]}"#,
        ));
        let identifier = PolicyTypeIdentifier::new(model, "fast-model");
        let defs = vec![definition("fire-safety", "Fire Safety Policy")];
        let matched = identifier.identify("Fire safety document", &defs).await.unwrap();
        assert_eq!(matched.uri, "fire-safety");
    }

    #[tokio::test]
    async fn low_confidence_aborts_with_validation_error() {
        let model = Arc::new(FixedModel(
            r#"{"matched_definition_uri":"fire-safety","confidence":0.4,"reasoning":"unclear","alternative_matches":[]}"#,
        ));
        let identifier = PolicyTypeIdentifier::new(model, "fast-model");
        let defs = vec![definition("fire-safety", "Fire Safety Policy")];
        let err = identifier.identify("ambiguous document", &defs).await.unwrap_err();
        assert!(matches!(err, ReviewError::Validation { .. }));
    }

    #[tokio::test]
    async fn no_definitions_aborts_with_validation_error() {
        let model = Arc::new(FixedModel("{}"));
        let identifier = PolicyTypeIdentifier::new(model, "fast-model");
        let err = identifier.identify("any document", &[]).await.unwrap_err();
        assert!(matches!(err, ReviewError::Validation { .. }));
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error_not_a_panic() {
        let model = Arc::new(FixedModel("not json"));
        let identifier = PolicyTypeIdentifier::new(model, "fast-model");
        let defs = vec![definition("fire-safety", "Fire Safety Policy")];
        let err = identifier.identify("any document", &defs).await.unwrap_err();
        assert!(matches!(err, ReviewError::Validation { .. }));
    }
}
