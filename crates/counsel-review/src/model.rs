//! Result shapes assembled by the review engine (§4.6): this is the
//! structured report, distinct from [`counsel_core::model::PolicyReview`]
//! which is the job row it gets attached to.

use counsel_core::model::{Priority, RagRating};
use serde::{Deserialize, Serialize};

/// A citation surfaced by a single criterion evaluation. Verification
/// against the legislation gateway happens separately, at the text level,
/// via `counsel-verification`; this is the raw citation as the model
/// reported it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Citation {
    pub source_type: String,
    pub act_name: Option<String>,
    pub document_name: Option<String>,
    pub section: Option<String>,
    pub uri: Option<String>,
    pub excerpt: Option<String>,
}

/// One criterion's evaluated outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionResult {
    pub criterion_name: String,
    pub criterion_priority: Priority,
    pub rating: RagRating,
    pub justification: String,
    pub citations: Vec<Citation>,
    pub recommendations: Vec<String>,
}

/// Severity assigned to a gap-analysis entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapSeverity {
    Critical,
    Important,
}

/// One entry in the gap analysis (§4.6 stage 5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapItem {
    pub area: String,
    pub severity: GapSeverity,
    pub description: String,
    pub relevant_citations: Vec<Citation>,
}

/// Priority assigned to a recommended action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPriority {
    Critical,
    Important,
    Advisory,
}

impl ActionPriority {
    /// Sort key used by §4.6 stage 6 ("sort by priority"): critical first.
    fn order(self) -> u8 {
        match self {
            ActionPriority::Critical => 0,
            ActionPriority::Important => 1,
            ActionPriority::Advisory => 2,
        }
    }
}

/// One recommended action (§4.6 stage 6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub priority: ActionPriority,
    pub description: String,
    pub related_criteria: Vec<String>,
    pub related_legislation: Vec<Citation>,
}

/// Sorts actions by priority (critical, important, advisory), stable
/// within a priority tier so ties preserve their evaluation order.
pub fn sort_actions_by_priority(actions: &mut [Action]) {
    actions.sort_by_key(|a| a.priority.order());
}

/// The fully assembled review result (§4.6 stage 8), persisted as the
/// review row's `result` blob on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyReviewResult {
    pub policy_definition_id: counsel_core::EntityId,
    pub policy_definition_name: String,
    pub overall_rating: RagRating,
    pub criterion_results: Vec<CriterionResult>,
    pub gap_analysis: Vec<GapItem>,
    pub recommended_actions: Vec<Action>,
    pub summary: String,
}

/// The error blob persisted on a review row that ended in `error` state
/// (§4.6 "Error transitions").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewErrorOutcome {
    pub error_code: String,
    pub message: String,
}

/// One criterion's rating compared across two reviews of the same
/// definition (§4.6 "Comparison operation").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionComparison {
    pub criterion_name: String,
    pub previous_rating: Option<RagRating>,
    pub current_rating: Option<RagRating>,
    pub changed: bool,
}

/// The result of comparing two reviews (§4.6 "Comparison operation").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub previous_review_id: counsel_core::EntityId,
    pub previous_overall_rating: RagRating,
    pub current_review_id: counsel_core::EntityId,
    pub current_overall_rating: RagRating,
    pub criteria: Vec<CriterionComparison>,
}

/// Tenant-wide aggregate trend data (§4.6 "Trends operation").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewTrends {
    pub total_reviews: u32,
    pub green_count: u32,
    pub amber_count: u32,
    pub red_count: u32,
    pub green_percentage: f64,
    pub amber_percentage: f64,
    pub red_percentage: f64,
    pub required_policies_reviewed: u32,
    pub required_policies_total: u32,
    pub required_policy_coverage_percentage: f64,
}

/// One alternative policy-type match surfaced alongside the primary one.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AlternativeMatch {
    pub uri: String,
    pub confidence: f64,
    #[serde(default)]
    pub name: String,
}

/// The model's raw classification response, parsed defensively (§9
/// "implementations must parse defensively").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PolicyTypeIdentification {
    pub matched_definition_uri: Option<String>,
    pub confidence: f64,
    pub reasoning: String,
    pub alternative_matches: Vec<AlternativeMatch>,
}
