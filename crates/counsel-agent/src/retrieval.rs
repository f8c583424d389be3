//! Knowledge retrieval stage (§4.5 stage 3): parallel workers over the
//! router's source set. A worker's own failure degrades to empty results
//! and is logged; it never fails the invocation.

use std::collections::HashMap;

use counsel_legislation::LegislationClient;
use counsel_retrieval::{HybridSearch, SearchRequest};
use tracing::warn;

use crate::model::{KnowledgeContext, KnowledgeSourceKind, RetrievedSource, RouterDecision};

/// Acts whose sections get a second, deeper fetch once the initial search
/// shows which acts dominate the hit set (§4.5 stage 3 "enrich").
const ENRICHMENT_TOP_ACTS: usize = 3;
const SECTION_SEARCH_SIZE: u32 = 15;
const ENRICHMENT_SECTION_SIZE: u32 = 8;

/// Gathers knowledge context for one query, running every requested source
/// concurrently.
pub async fn gather(
    policy_search: Option<&HybridSearch>,
    legislation: Option<&LegislationClient>,
    tenant_key: &str,
    router_decision: &RouterDecision,
    query: &str,
) -> KnowledgeContext {
    let policy_fut = async {
        if router_decision.wants(KnowledgeSourceKind::InternalPolicies) {
            if let Some(search) = policy_search {
                return search_policies(search, tenant_key, query).await;
            }
        }
        Vec::new()
    };

    let legislation_fut = async {
        if router_decision.wants(KnowledgeSourceKind::UkLegislation) {
            if let Some(client) = legislation {
                return search_legislation(client, query).await;
            }
        }
        Vec::new()
    };

    let case_law_fut = async {
        if router_decision.wants(KnowledgeSourceKind::CaseLaw) {
            return search_case_law(query).await;
        }
        Vec::new()
    };

    let (policy, legislation, case_law) = tokio::join!(policy_fut, legislation_fut, case_law_fut);

    let mut sources = Vec::with_capacity(policy.len() + legislation.len() + case_law.len());
    sources.extend(policy);
    sources.extend(legislation);
    sources.extend(case_law);
    KnowledgeContext { sources }
}

async fn search_policies(search: &HybridSearch, tenant_key: &str, query: &str) -> Vec<RetrievedSource> {
    let request = SearchRequest {
        query: query.to_string(),
        category_filter: None,
        knowledge_base_ids: None,
        limit: 5,
        min_similarity: None,
    };
    match search.search(tenant_key, &request).await {
        Ok(results) => results
            .into_iter()
            .map(|r| RetrievedSource::Policy {
                document_name: r.document_name,
                section: None,
                content: r.text,
            })
            .collect(),
        Err(err) => {
            warn!(error = %err, "policy knowledge worker failed, degrading to empty results");
            Vec::new()
        }
    }
}

/// Searches act-level metadata and section-level text concurrently, then
/// enriches the top three most-represented acts with a second, deeper
/// section fetch so the model sees fuller per-act coverage rather than
/// scattered fragments (§4.5 stage 3).
async fn search_legislation(client: &LegislationClient, query: &str) -> Vec<RetrievedSource> {
    let filter = counsel_legislation::model::LegislationSearchFilter {
        query: Some(query.to_string()),
        limit: 5,
        ..Default::default()
    };

    let (act_result, sections) = tokio::join!(
        client.search_legislation(&filter),
        client.search_sections(query, None, SECTION_SEARCH_SIZE),
    );

    let act_result = match act_result {
        Ok(r) => r,
        Err(err) => {
            warn!(error = %err, "legislation act search failed, degrading to empty results");
            return Vec::new();
        }
    };
    let mut sections = match sections {
        Ok(r) => r.results,
        Err(err) => {
            warn!(error = %err, "legislation section search failed, degrading to empty results");
            Vec::new()
        }
    };

    let mut act_titles: HashMap<String, String> = HashMap::new();
    for item in &act_result.results {
        act_titles.insert(item.id.clone(), item.title.clone());
    }

    let mut hit_counts: HashMap<String, u32> = HashMap::new();
    for section in &sections {
        if !section.legislation_id.is_empty() {
            *hit_counts.entry(section.legislation_id.clone()).or_insert(0) += 1;
        }
    }
    let mut top_acts: Vec<&String> = hit_counts.keys().collect();
    top_acts.sort_by_key(|id| std::cmp::Reverse(hit_counts[*id]));
    top_acts.truncate(ENRICHMENT_TOP_ACTS);

    let mut seen: std::collections::HashSet<String> =
        sections.iter().map(|s| format!("{}:{}", s.legislation_id, s.section_number)).collect();

    for act_id in top_acts {
        match client.search_sections(query, Some(act_id), ENRICHMENT_SECTION_SIZE).await {
            Ok(extra) => {
                for section in extra.results {
                    let key = format!("{}:{}", section.legislation_id, section.section_number);
                    if seen.insert(key) {
                        sections.push(section);
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, act_id = %act_id, "section enrichment fetch failed, skipping this act");
            }
        }
    }

    sections
        .into_iter()
        .map(|s| RetrievedSource::Legislation {
            is_historical: s.is_historical(),
            act_name: act_titles.get(&s.legislation_id).cloned().unwrap_or(s.legislation_title),
            section: (!s.section_number.is_empty()).then_some(s.section_number),
            content: s.excerpt,
            uri: s.uri,
        })
        .collect()
}

/// Case law search is gated by upstream capability; this instance doesn't
/// expose it, so the worker is a documented no-op (§4.5 stage 3).
async fn search_case_law(_query: &str) -> Vec<RetrievedSource> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enrichment_caps_scattered_acts_to_the_top_three() {
        let mut hit_counts: HashMap<String, u32> = HashMap::new();
        hit_counts.insert("a".to_string(), 1);
        hit_counts.insert("b".to_string(), 5);
        hit_counts.insert("c".to_string(), 3);
        hit_counts.insert("d".to_string(), 2);
        let mut top: Vec<&String> = hit_counts.keys().collect();
        top.sort_by_key(|id| std::cmp::Reverse(hit_counts[*id]));
        top.truncate(ENRICHMENT_TOP_ACTS);
        assert_eq!(top, vec![&"b".to_string(), &"c".to_string(), &"d".to_string()]);
    }

    #[tokio::test]
    async fn case_law_worker_is_a_no_op() {
        assert!(search_case_law("anything").await.is_empty());
    }

    #[tokio::test]
    async fn gather_skips_sources_the_router_did_not_request() {
        let decision =
            RouterDecision { intent: "greeting".into(), sources: vec![], complexity: "simple".into(), reasoning: String::new() };
        let context = gather(None, None, "tenant-a", &decision, "hello").await;
        assert!(!context.has_sources());
    }
}
