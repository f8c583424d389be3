//! Executive summary generation (§4.6 stage 8): a single free-text model
//! call, capped at 500 tokens by the prompt's own instruction since the
//! model provider port has no separate max-token knob.

use std::sync::Arc;

use counsel_core::model::RagRating;
use counsel_core::ports::ChatModel;

use crate::error::{ReviewError, Result};
use crate::model::{CriterionResult, GapItem};

const SYSTEM_PROMPT: &str = "Provide a concise executive summary (3-4 sentences, at most 500 \
tokens) of this policy review. Summarise the key findings, main strengths, and critical areas \
for improvement. Respond with plain text only, no markdown headings.";

pub async fn generate(
    model: &Arc<dyn ChatModel>,
    model_id: &str,
    policy_name: &str,
    overall_rating: RagRating,
    criterion_results: &[CriterionResult],
    gap_analysis: &[GapItem],
) -> Result<String> {
    let prompt = build_prompt(policy_name, overall_rating, criterion_results, gap_analysis);
    let raw = model
        .generate_json(model_id, SYSTEM_PROMPT, &prompt)
        .await
        .map_err(|e| ReviewError::Model { stage: "summary_generation", source: e })?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok("Summary generation failed".to_string());
    }
    Ok(trimmed.to_string())
}

fn build_prompt(
    policy_name: &str,
    overall_rating: RagRating,
    criterion_results: &[CriterionResult],
    gap_analysis: &[GapItem],
) -> String {
    let criterion_summary = criterion_results
        .iter()
        .map(|r| format!("- {}: {:?} - {}", r.criterion_name, r.rating, r.justification))
        .collect::<Vec<_>>()
        .join("\n");

    let gap_summary =
        gap_analysis.iter().map(|g| format!("- {} ({:?}): {}", g.area, g.severity, g.description)).collect::<Vec<_>>().join("\n");

    format!(
        "Policy: {policy_name}\nOverall rating: {overall_rating:?}\n\nCriterion results:\n{criterion_summary}\n\nKey gaps:\n{gap_summary}"
    )
}
