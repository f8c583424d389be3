//! Citation verification against the legislation gateway (§4.4).

use std::collections::HashMap;

use counsel_legislation::{GatewayError, LegislationClient};

use crate::extract::{extract_all, ExtractedCitation};

/// The closed three-way verification outcome (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    Verified,
    Unverified,
    Removed,
}

/// One citation's verification outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedCitation {
    pub citation_text: String,
    pub status: VerificationStatus,
    pub confidence: f32,
    pub error_message: Option<String>,
}

/// The aggregate result of verifying every citation in one pass (§4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationResult {
    pub checked: u32,
    pub verified: u32,
    pub unverified: u32,
    pub removed: u32,
    pub citations: Vec<VerifiedCitation>,
    pub issues: Vec<String>,
}

fn verified(text: String) -> VerifiedCitation {
    VerifiedCitation { citation_text: text, status: VerificationStatus::Verified, confidence: 1.0, error_message: None }
}

fn removed(text: String, reason: &str) -> VerifiedCitation {
    VerifiedCitation {
        citation_text: text,
        status: VerificationStatus::Removed,
        confidence: 0.0,
        error_message: Some(reason.to_string()),
    }
}

fn unverified(text: String, reason: String) -> VerifiedCitation {
    VerifiedCitation { citation_text: text, status: VerificationStatus::Unverified, confidence: 0.0, error_message: Some(reason) }
}

/// Runs the full verification pass over response text: extract, dedup
/// legislation citations by lowercased act name, verify each citation kind
/// against the gateway, and aggregate.
pub async fn verify_response(client: &LegislationClient, response_text: &str) -> VerificationResult {
    let extracted = extract_all(response_text);
    if extracted.is_empty() {
        return VerificationResult { checked: 0, verified: 0, unverified: 0, removed: 0, citations: vec![], issues: vec![] };
    }

    // Per-act dedup: each distinct lowercased act name incurs at most one lookup.
    let mut legislation_lookups: HashMap<String, VerifiedCitation> = HashMap::new();

    let mut citations = Vec::with_capacity(extracted.len());
    for citation in &extracted {
        let outcome = match citation {
            ExtractedCitation::Legislation { text, act_name, .. } => {
                let key = act_name.to_lowercase();
                if let Some(cached) = legislation_lookups.get(&key) {
                    let mut outcome = cached.clone();
                    outcome.citation_text = text.clone();
                    outcome
                } else {
                    let outcome = verify_legislation(client, text, act_name).await;
                    legislation_lookups.insert(key, outcome.clone());
                    outcome
                }
            }
            ExtractedCitation::CaseLaw { text, .. } => {
                unverified(text.clone(), "case law verification not available".to_string())
            }
            ExtractedCitation::Policy { text, .. } => {
                unverified(text.clone(), "policy verification pending implementation".to_string())
            }
        };
        citations.push(outcome);
    }

    let mut verified_count = 0u32;
    let mut unverified_count = 0u32;
    let mut removed_count = 0u32;
    let mut issues = Vec::new();

    for citation in &citations {
        match citation.status {
            VerificationStatus::Verified => verified_count += 1,
            VerificationStatus::Unverified => {
                unverified_count += 1;
                issues.push(format!(
                    "{}: {}",
                    citation.citation_text,
                    citation.error_message.as_deref().unwrap_or("unverified")
                ));
            }
            VerificationStatus::Removed => {
                removed_count += 1;
                issues.push(format!(
                    "{}: {}",
                    citation.citation_text,
                    citation.error_message.as_deref().unwrap_or("removed")
                ));
            }
        }
    }

    VerificationResult {
        checked: citations.len() as u32,
        verified: verified_count,
        unverified: unverified_count,
        removed: removed_count,
        citations,
        issues,
    }
}

async fn verify_legislation(client: &LegislationClient, citation_text: &str, act_name: &str) -> VerifiedCitation {
    let filter = counsel_legislation::model::LegislationSearchFilter {
        query: Some(act_name.to_string()),
        limit: 1,
        ..Default::default()
    };

    match client.search_legislation(&filter).await {
        Ok(response) if is_verification_successful(response.total, response.results.len()) => {
            verified(citation_text.to_string())
        }
        Ok(_) => removed(citation_text.to_string(), "legislation not found or section does not exist"),
        Err(err) if err_degrades_to_unverified(&err) => {
            unverified(citation_text.to_string(), format!("legislation gateway error: {err}"))
        }
        Err(err) => unverified(citation_text.to_string(), format!("verification error: {err}")),
    }
}

fn err_degrades_to_unverified(err: &GatewayError) -> bool {
    err.degrades_to_unverified()
}

/// Interprets a search-envelope response per §4.4's schema-tolerant rule:
/// `total >= 1` or a non-empty `results` list both count as success.
fn is_verification_successful(total: u32, results_len: usize) -> bool {
    total >= 1 || results_len > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_with_search_response(body: serde_json::Value) -> LegislationClient {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/legislation/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
        LegislationClient::for_url(server.uri(), std::time::Duration::from_secs(5))
    }

    #[tokio::test]
    async fn scenario_1_verified_citation() {
        let client = client_with_search_response(json!({ "total": 1, "results": [{"title": "Housing Act 1985"}] })).await;
        let result = verify_response(&client, "The Housing Act 1985, s.8(1) defines the landlord condition.").await;
        assert_eq!(result.checked, 1);
        assert_eq!(result.verified, 1);
        assert_eq!(result.removed, 0);
        assert_eq!(result.unverified, 0);
        assert_eq!(result.citations[0].citation_text, "Housing Act 1985, s.8(1)");
        assert_eq!(result.citations[0].status, VerificationStatus::Verified);
    }

    #[tokio::test]
    async fn scenario_2_fabricated_citation() {
        let client = client_with_search_response(json!({ "total": 0, "results": [] })).await;
        let result = verify_response(&client, "According to the Housing Act 1985, s.999, ...").await;
        assert_eq!(result.checked, 1);
        assert_eq!(result.verified, 0);
        assert_eq!(result.removed, 1);
        assert!(result.issues[0].contains("Housing Act 1985, s.999"));
    }

    #[tokio::test]
    async fn scenario_3_mixed_citations() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/legislation/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "total": 1, "results": [{"title": "Housing Act 1985"}] })))
            .mount(&server)
            .await;
        let client = LegislationClient::for_url(server.uri(), std::time::Duration::from_secs(5));

        let text = "Housing Act 1985, s.8(1) and Housing Act 1985, s.999 and R v Smith [2020] EWCA Crim 123";
        let result = verify_response(&client, text).await;
        assert_eq!(result.checked, 3);
        // Both legislation citations share the same act name, so the dedup
        // path serves them the same lookup outcome: verified.
        assert_eq!(result.verified, 2);
        assert_eq!(result.unverified, 1, "case law has no verification available");
    }

    #[tokio::test]
    async fn upstream_timeout_degrades_to_unverified_not_removed() {
        // No mock mounted: the connection itself fails.
        let client = LegislationClient::for_url("http://127.0.0.1:1", std::time::Duration::from_millis(50));
        let result = verify_response(&client, "The Housing Act 1985, s.8(1) applies.").await;
        assert_eq!(result.unverified, 1);
        assert_eq!(result.removed, 0);
    }

    #[test]
    fn verification_success_accepts_nonempty_results_even_with_zero_total() {
        assert!(is_verification_successful(0, 1));
        assert!(is_verification_successful(1, 0));
        assert!(!is_verification_successful(0, 0));
    }

    #[tokio::test]
    async fn no_citations_yields_zeroed_aggregate() {
        let client = client_with_search_response(json!({})).await;
        let result = verify_response(&client, "Nothing legal here.").await;
        assert_eq!(result.checked, 0);
        assert!(result.citations.is_empty());
    }
}
