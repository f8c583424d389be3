//! Deterministic post-evaluation stages (§4.6 stages 5-7): gap analysis,
//! recommended actions, and the overall rating rollup. None of these make
//! a model call; every one is a pure function of the criterion results.

use counsel_core::model::{PolicyDefinition, Priority, RagRating};

use crate::model::{Action, ActionPriority, CriterionResult, GapItem, GapSeverity};

/// §4.6 stage 5: one gap per missing required section (case-insensitive
/// substring match against the document text), plus one gap per `red`
/// criterion.
pub fn gap_analysis(definition: &PolicyDefinition, document_text: &str, results: &[CriterionResult]) -> Vec<GapItem> {
    let lower_document = document_text.to_lowercase();
    let mut gaps = Vec::new();

    for section in &definition.required_sections {
        if !lower_document.contains(&section.to_lowercase()) {
            gaps.push(GapItem {
                area: format!("Missing required section: {section}"),
                severity: GapSeverity::Critical,
                description: format!(
                    "Policy definition requires a '{section}' section but it was not found in the document."
                ),
                relevant_citations: Vec::new(),
            });
        }
    }

    for result in results {
        if result.rating == RagRating::Red {
            gaps.push(GapItem {
                area: result.criterion_name.clone(),
                severity: if result.criterion_priority == Priority::High { GapSeverity::Critical } else { GapSeverity::Important },
                description: result.justification.clone(),
                relevant_citations: result.citations.clone(),
            });
        }
    }

    gaps
}

/// §4.6 stage 6: lifts every non-green criterion's recommendations into
/// priority-ordered action items.
pub fn recommended_actions(results: &[CriterionResult]) -> Vec<Action> {
    let mut actions: Vec<Action> = Vec::new();

    for result in results {
        if result.rating == RagRating::Green {
            continue;
        }
        let priority = action_priority(result);
        for recommendation in &result.recommendations {
            actions.push(Action {
                priority,
                description: recommendation.clone(),
                related_criteria: vec![result.criterion_name.clone()],
                related_legislation: result.citations.clone(),
            });
        }
    }

    crate::model::sort_actions_by_priority(&mut actions);
    actions
}

fn action_priority(result: &CriterionResult) -> ActionPriority {
    match (result.rating, result.criterion_priority) {
        (RagRating::Red, Priority::High) => ActionPriority::Critical,
        (RagRating::Red, _) => ActionPriority::Important,
        _ => ActionPriority::Advisory,
    }
}

/// `⌈N/3⌉` using integer arithmetic, per §9's explicit instruction to make
/// the ceiling-division choice visible rather than relying on the
/// source's float-division threshold (`red_count > len / 3`, which is NOT
/// equivalent — see the worked example in the tests below).
fn ceil_div3(n: usize) -> usize {
    (n + 2) / 3
}

/// §4.6 stage 7: the deterministic overall rollup. An empty criteria list
/// is treated as a failing review (no criteria means nothing was actually
/// checked).
pub fn overall_rating(results: &[CriterionResult]) -> RagRating {
    if results.is_empty() {
        return RagRating::Red;
    }

    let red_count = results.iter().filter(|r| r.rating == RagRating::Red).count();
    let amber_count = results.iter().filter(|r| r.rating == RagRating::Amber).count();
    let high_priority_red = results.iter().any(|r| r.rating == RagRating::Red && r.criterion_priority == Priority::High);

    let threshold = ceil_div3(results.len());

    if high_priority_red || red_count > threshold {
        RagRating::Red
    } else if amber_count > threshold || red_count > 0 {
        RagRating::Amber
    } else {
        RagRating::Green
    }
}
