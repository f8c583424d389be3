//! Review comparison and tenant-wide trend aggregation (§4.6 "Comparison
//! operation" / "Trends operation"). Both are pure data transforms over
//! already-loaded rows; neither makes a model call or touches the store
//! directly, mirroring [`crate::rollup`].

use std::collections::HashSet;

use counsel_core::model::{PolicyReview, PolicyReviewState, RagRating};
use counsel_core::EntityId;

use crate::error::{ReviewError, Result};
use crate::model::{ComparisonResult, CriterionComparison, PolicyReviewResult, ReviewTrends};

/// Pairs criteria by name across two completed reviews of the same policy
/// definition, in sorted-name order, flagging ones whose rating changed.
pub fn compare_reviews(previous: &PolicyReview, current: &PolicyReview) -> Result<ComparisonResult> {
    let previous_result = parsed_result(previous, "previous")?;
    let current_result = parsed_result(current, "current")?;

    if previous_result.policy_definition_id != current_result.policy_definition_id {
        return Err(ReviewError::Validation {
            stage: "review_comparison",
            message: "reviews must be for the same policy definition".to_string(),
        });
    }

    let mut names: Vec<&str> = previous_result
        .criterion_results
        .iter()
        .chain(current_result.criterion_results.iter())
        .map(|r| r.criterion_name.as_str())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    names.sort_unstable();

    let criteria = names
        .into_iter()
        .map(|name| {
            let previous_rating = previous_result.criterion_results.iter().find(|r| r.criterion_name == name).map(|r| r.rating);
            let current_rating = current_result.criterion_results.iter().find(|r| r.criterion_name == name).map(|r| r.rating);
            CriterionComparison {
                criterion_name: name.to_string(),
                previous_rating,
                current_rating,
                changed: previous_rating != current_rating,
            }
        })
        .collect();

    Ok(ComparisonResult {
        previous_review_id: previous.id,
        previous_overall_rating: previous_result.overall_rating,
        current_review_id: current.id,
        current_overall_rating: current_result.overall_rating,
        criteria,
    })
}

fn parsed_result(review: &PolicyReview, label: &'static str) -> Result<PolicyReviewResult> {
    if review.state != PolicyReviewState::Complete {
        return Err(ReviewError::Validation {
            stage: "review_comparison",
            message: format!("{label} review is not complete"),
        });
    }
    let value = review.result.clone().ok_or_else(|| ReviewError::Validation {
        stage: "review_comparison",
        message: format!("{label} review has no result"),
    })?;
    serde_json::from_value(value).map_err(|e| ReviewError::Validation {
        stage: "review_comparison",
        message: format!("{label} review result failed to parse: {e}"),
    })
}

/// Aggregates completed reviews into tenant-wide RAG percentages and
/// required-policy coverage. `required_definition_ids` is the tenant's
/// active, required policy definitions (the coverage denominator);
/// `required_total` is their count, passed separately since an empty set
/// is valid ("no required policies configured").
pub fn trends(
    completed: &[PolicyReview],
    required_definition_ids: &HashSet<EntityId>,
    required_total: u32,
) -> ReviewTrends {
    let total = completed.len() as u32;
    if total == 0 {
        return ReviewTrends {
            total_reviews: 0,
            green_count: 0,
            amber_count: 0,
            red_count: 0,
            green_percentage: 0.0,
            amber_percentage: 0.0,
            red_percentage: 0.0,
            required_policies_reviewed: 0,
            required_policies_total: required_total,
            required_policy_coverage_percentage: 0.0,
        };
    }

    let mut green_count = 0u32;
    let mut amber_count = 0u32;
    let mut red_count = 0u32;
    let mut required_reviewed: HashSet<EntityId> = HashSet::new();

    for review in completed {
        if let Some(value) = &review.result {
            if let Ok(result) = serde_json::from_value::<PolicyReviewResult>(value.clone()) {
                match result.overall_rating {
                    RagRating::Green => green_count += 1,
                    RagRating::Amber => amber_count += 1,
                    RagRating::Red => red_count += 1,
                }
                if required_definition_ids.contains(&result.policy_definition_id) {
                    required_reviewed.insert(result.policy_definition_id);
                }
            }
        }
    }

    let percentage = |count: u32| (count as f64 / total as f64 * 1000.0).round() / 10.0;

    ReviewTrends {
        total_reviews: total,
        green_count,
        amber_count,
        red_count,
        green_percentage: percentage(green_count),
        amber_percentage: percentage(amber_count),
        red_percentage: percentage(red_count),
        required_policies_reviewed: required_reviewed.len() as u32,
        required_policies_total: required_total,
        required_policy_coverage_percentage: if required_total > 0 {
            (required_reviewed.len() as f64 / required_total as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        },
    }
}

#[cfg(test)]
mod tests {
    use counsel_core::model::Priority;
    use counsel_core::{EntityId, TenantId};

    use super::*;
    use crate::model::CriterionResult;

    fn review(definition_id: EntityId, result: PolicyReviewResult) -> PolicyReview {
        PolicyReview {
            id: EntityId::new(),
            tenant_id: TenantId::new(),
            user_id: EntityId::new(),
            policy_definition_id: Some(definition_id),
            state: PolicyReviewState::Complete,
            result: Some(serde_json::to_value(&result).unwrap()),
            version: 1,
            created_at: chrono::Utc::now(),
        }
    }

    fn criterion_result(name: &str, rating: RagRating) -> CriterionResult {
        CriterionResult {
            criterion_name: name.to_string(),
            criterion_priority: Priority::Medium,
            rating,
            justification: "because".to_string(),
            citations: vec![],
            recommendations: vec![],
        }
    }

    fn result(definition_id: EntityId, overall: RagRating, criteria: Vec<CriterionResult>) -> PolicyReviewResult {
        PolicyReviewResult {
            policy_definition_id: definition_id,
            policy_definition_name: "Fire Safety Policy".to_string(),
            overall_rating: overall,
            criterion_results: criteria,
            gap_analysis: vec![],
            recommended_actions: vec![],
            summary: "summary".to_string(),
        }
    }

    #[test]
    fn compare_reviews_flags_changed_criteria() {
        let definition_id = EntityId::new();
        let previous =
            review(definition_id, result(definition_id, RagRating::Amber, vec![criterion_result("fire risk assessment", RagRating::Amber)]));
        let current =
            review(definition_id, result(definition_id, RagRating::Green, vec![criterion_result("fire risk assessment", RagRating::Green)]));

        let comparison = compare_reviews(&previous, &current).unwrap();
        assert_eq!(comparison.previous_overall_rating, RagRating::Amber);
        assert_eq!(comparison.current_overall_rating, RagRating::Green);
        assert_eq!(comparison.criteria.len(), 1);
        assert!(comparison.criteria[0].changed);
    }

    #[test]
    fn compare_reviews_rejects_different_definitions() {
        let previous = review(EntityId::new(), result(EntityId::new(), RagRating::Green, vec![]));
        let current = review(EntityId::new(), result(EntityId::new(), RagRating::Green, vec![]));
        let err = compare_reviews(&previous, &current).unwrap_err();
        assert!(matches!(err, ReviewError::Validation { .. }));
    }

    #[test]
    fn compare_reviews_rejects_an_incomplete_review() {
        let definition_id = EntityId::new();
        let mut previous = review(definition_id, result(definition_id, RagRating::Green, vec![]));
        previous.state = PolicyReviewState::Processing;
        let current = review(definition_id, result(definition_id, RagRating::Green, vec![]));
        let err = compare_reviews(&previous, &current).unwrap_err();
        assert!(matches!(err, ReviewError::Validation { .. }));
    }

    #[test]
    fn trends_computes_percentages_and_coverage() {
        let required_id = EntityId::new();
        let other_id = EntityId::new();
        let reviews = vec![
            review(required_id, result(required_id, RagRating::Green, vec![])),
            review(required_id, result(required_id, RagRating::Amber, vec![])),
            review(other_id, result(other_id, RagRating::Red, vec![])),
        ];
        let required_ids: HashSet<EntityId> = [required_id].into_iter().collect();

        let trends = trends(&reviews, &required_ids, 2);
        assert_eq!(trends.total_reviews, 3);
        assert_eq!(trends.green_count, 1);
        assert_eq!(trends.amber_count, 1);
        assert_eq!(trends.red_count, 1);
        assert!((trends.green_percentage - 33.3).abs() < 0.01);
        assert_eq!(trends.required_policies_reviewed, 1);
        assert_eq!(trends.required_policies_total, 2);
        assert!((trends.required_policy_coverage_percentage - 50.0).abs() < 0.01);
    }

    #[test]
    fn trends_with_no_reviews_is_all_zero() {
        let trends = trends(&[], &HashSet::new(), 0);
        assert_eq!(trends.total_reviews, 0);
        assert_eq!(trends.required_policy_coverage_percentage, 0.0);
    }
}
