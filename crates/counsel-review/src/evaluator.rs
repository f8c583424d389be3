//! Per-criterion compliance evaluation (§4.6 stage 4): pulls tenant
//! guidance and legislation context for one criterion, then asks the main
//! model for a rated, justified, citation-bearing verdict.

use std::sync::Arc;

use counsel_core::model::ComplianceCriterion;
use counsel_core::ports::ChatModel;
use counsel_legislation::LegislationClient;
use counsel_retrieval::{HybridSearch, SearchRequest};

use crate::error::{ReviewError, Result};
use crate::model::CriterionResult;

/// Result limit for both the tenant-guidance and legislation searches
/// (§4.6 stage 4).
const SEARCH_LIMIT: usize = 5;

/// Characters of policy text included in the evaluation prompt.
const POLICY_EXCERPT_CHARS: usize = 4000;

const SYSTEM_PROMPT: &str = "You are evaluating a UK social housing policy document against \
a specific compliance criterion. Assign a RAG rating: green if the policy fully complies, \
amber if it partially complies or is unclear, red if it does not comply or a requirement is \
missing. Only cite sources from the search results provided. If no relevant legislation was \
found, say so. Use British English. Distinguish legal duties (\"must\") from regulatory \
expectations (\"should\") and best practices (\"could\"). Be specific: cite section numbers \
and quote relevant text. Respond with JSON only: {\"rating\": \"green\"|\"amber\"|\"red\", \
\"justification\": string, \"citations\": [{\"source_type\": string, \"act_name\": string|null, \
\"document_name\": string|null, \"section\": string|null, \"uri\": string|null, \"excerpt\": \
string|null}], \"recommendations\": [string]}.";

/// Evaluates one compliance criterion against `document_text`, pulling
/// context from both knowledge ports in parallel before prompting the
/// model (§4.6 stage 4). Absent ports degrade to no context rather than
/// failing the evaluation, matching the agent pipeline's retrieval
/// stage (§4.5).
pub async fn evaluate_criterion(
    criterion: &ComplianceCriterion,
    document_text: &str,
    tenant_key: &str,
    policy_search: Option<&HybridSearch>,
    legislation_client: Option<&LegislationClient>,
    model: &Arc<dyn ChatModel>,
    model_id: &str,
) -> Result<CriterionResult> {
    let (guidance, legislation) = tokio::join!(
        search_guidance(policy_search, tenant_key, criterion),
        search_legislation(legislation_client, criterion),
    );

    let prompt = build_prompt(criterion, document_text, &guidance, &legislation);
    let raw = model
        .generate_json(model_id, SYSTEM_PROMPT, &prompt)
        .await
        .map_err(|e| ReviewError::Model { stage: "criterion_evaluation", source: e })?;

    let parsed: RawCriterionVerdict = serde_json::from_str(&raw).map_err(|e| ReviewError::Validation {
        stage: "criterion_evaluation",
        message: format!("unparseable evaluation response for {}: {e}", criterion.name),
    })?;

    Ok(CriterionResult {
        criterion_name: criterion.name.clone(),
        criterion_priority: criterion.priority,
        rating: parsed.rating,
        justification: parsed.justification,
        citations: parsed.citations,
        recommendations: parsed.recommendations,
    })
}

#[derive(serde::Deserialize)]
#[serde(default)]
struct RawCriterionVerdict {
    rating: counsel_core::model::RagRating,
    justification: String,
    citations: Vec<crate::model::Citation>,
    recommendations: Vec<String>,
}

impl Default for RawCriterionVerdict {
    fn default() -> Self {
        Self {
            rating: counsel_core::model::RagRating::Red,
            justification: String::new(),
            citations: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

async fn search_guidance(
    policy_search: Option<&HybridSearch>,
    tenant_key: &str,
    criterion: &ComplianceCriterion,
) -> Vec<counsel_retrieval::SearchResult> {
    let Some(search) = policy_search else { return Vec::new() };
    let request = SearchRequest {
        query: format!("{}: {}", criterion.name, criterion.description),
        category_filter: None,
        knowledge_base_ids: None,
        limit: SEARCH_LIMIT,
        min_similarity: None,
    };
    match search.search(tenant_key, &request).await {
        Ok(results) => results,
        Err(err) => {
            tracing::warn!(error = %err, criterion = criterion.name, "guidance search failed, evaluating without it");
            Vec::new()
        }
    }
}

async fn search_legislation(
    client: Option<&LegislationClient>,
    criterion: &ComplianceCriterion,
) -> Vec<counsel_legislation::model::SectionSearchResult> {
    let Some(client) = client else { return Vec::new() };
    match client.search_sections(&criterion.description, None, SEARCH_LIMIT as u32).await {
        Ok(response) => response.results,
        Err(err) => {
            tracing::warn!(error = %err, criterion = criterion.name, "legislation search failed, evaluating without it");
            Vec::new()
        }
    }
}

fn build_prompt(
    criterion: &ComplianceCriterion,
    document_text: &str,
    guidance: &[counsel_retrieval::SearchResult],
    legislation: &[counsel_legislation::model::SectionSearchResult],
) -> String {
    let legislation_context = if legislation.is_empty() {
        "No relevant legislation found in search.".to_string()
    } else {
        legislation
            .iter()
            .map(|r| format!("- {} s.{} ({}): {}", r.legislation_title, r.section_number, r.uri, r.excerpt))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let guidance_context = if guidance.is_empty() {
        "No relevant sector guidance found in search.".to_string()
    } else {
        guidance.iter().map(|r| format!("- {}: {}", r.document_name, r.text)).collect::<Vec<_>>().join("\n")
    };

    let excerpt: String = document_text.chars().take(POLICY_EXCERPT_CHARS).collect();

    format!(
        "Criterion: {}\nPriority: {:?}\nDescription: {}\nCompliance type: {}\n\n\
Relevant legislation:\n{legislation_context}\n\n\
Relevant sector guidance:\n{guidance_context}\n\n\
Policy document text (relevant sections):\n{excerpt}\n\n\
Evaluate the policy against this criterion and return the JSON response.",
        criterion.name, criterion.priority, criterion.description, criterion.criteria_type,
    )
}
