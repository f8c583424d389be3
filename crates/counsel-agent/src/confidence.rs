//! Confidence scoring (§4.5 stage 9, §8 scenarios 1-3): a pure function of
//! verification outcomes, the router's decision, and whether any source
//! was used to ground the response.

use counsel_core::model::Confidence;
use counsel_verification::VerificationResult;

use crate::model::RouterDecision;

/// Any `removed` citation forces `Low`. Otherwise a verified ratio of at
/// least 0.8, with at least one retrieved source, forces `High`. Everything
/// else is `Medium`. When nothing was checked the ratio is vacuously `1.0`
/// so a citation-free response backed by at least one source reads `High`
/// rather than being penalised for having nothing to fabricate.
pub fn score(verification: &VerificationResult, has_sources: bool, _router: &RouterDecision) -> (Confidence, String) {
    if verification.removed > 0 {
        return (
            Confidence::Low,
            format!("{} citation(s) could not be found in the legislation source", verification.removed),
        );
    }

    let ratio = if verification.checked == 0 { 1.0 } else { verification.verified as f64 / verification.checked as f64 };

    if ratio >= 0.8 && has_sources {
        return (Confidence::High, "citations verified and response grounded in retrieved sources".to_string());
    }

    let reason = if verification.checked == 0 && !has_sources {
        "no citations to check and no sources retrieved".to_string()
    } else {
        format!("verified ratio {ratio:.2} below the high-confidence threshold")
    };
    (Confidence::Medium, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use counsel_verification::{VerificationStatus, VerifiedCitation};

    fn decision() -> RouterDecision {
        RouterDecision { intent: "q".into(), sources: vec![], complexity: "simple".into(), reasoning: String::new() }
    }

    fn result(checked: u32, verified: u32, removed: u32) -> VerificationResult {
        VerificationResult {
            checked,
            verified,
            unverified: checked - verified - removed,
            removed,
            citations: vec![VerifiedCitation {
                citation_text: "x".into(),
                status: VerificationStatus::Verified,
                confidence: 1.0,
                error_message: None,
            }],
            issues: vec![],
        }
    }

    #[test]
    fn any_removed_citation_forces_low() {
        let (level, _) = score(&result(2, 1, 1), true, &decision());
        assert_eq!(level, Confidence::Low);
    }

    #[test]
    fn verified_ratio_at_threshold_with_sources_is_high() {
        let (level, _) = score(&result(5, 4, 0), true, &decision());
        assert_eq!(level, Confidence::High);
    }

    #[test]
    fn high_confidence_requires_sources_even_at_perfect_ratio() {
        let (level, _) = score(&result(5, 5, 0), false, &decision());
        assert_eq!(level, Confidence::Medium);
    }

    #[test]
    fn below_threshold_ratio_is_medium() {
        let (level, _) = score(&result(5, 3, 0), true, &decision());
        assert_eq!(level, Confidence::Medium);
    }

    #[test]
    fn zero_checked_with_sources_is_high() {
        let (level, _) = score(&result(0, 0, 0), true, &decision());
        assert_eq!(level, Confidence::High);
    }

    #[test]
    fn zero_checked_without_sources_is_medium() {
        let (level, _) = score(&result(0, 0, 0), false, &decision());
        assert_eq!(level, Confidence::Medium);
    }
}
