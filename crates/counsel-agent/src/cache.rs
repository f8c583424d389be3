//! Semantic cache read/write (§4.5 optional short-circuit before stage 2,
//! and stage 11's best-effort write).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use counsel_core::model::SemanticCacheEntry;
use counsel_core::ports::{Clock, EmbeddingProvider};
use counsel_core::{EntityId, TenantId};
use tracing::warn;

use crate::port::SemanticCacheStore;

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// A semantic-cache hit: the cached response text and the similarity score
/// that qualified it.
pub struct CacheHit {
    pub entry: SemanticCacheEntry,
    pub similarity: f32,
}

/// Embeds the query, scans the tenant's non-expired entries, and returns
/// the entry with maximum cosine similarity if it clears `threshold`.
/// Returns `Ok(None)` on a clean miss; embedding/store failures are
/// surfaced so the caller can decide whether to fall back to the full
/// pipeline (a cache-read failure should never itself fail the invocation).
pub async fn read(
    store: &dyn SemanticCacheStore,
    embeddings: &dyn EmbeddingProvider,
    clock: &dyn Clock,
    tenant_id: TenantId,
    query: &str,
    threshold: f32,
) -> Option<CacheHit> {
    let query_embedding = match embeddings.embed_query(query).await {
        Ok(v) => v,
        Err(err) => {
            warn!(error = %err, "semantic cache read: embedding failed, skipping cache");
            return None;
        }
    };

    let now = clock.now();
    let entries = match store.live_entries(tenant_id, now).await {
        Ok(e) => e,
        Err(err) => {
            warn!(error = %err, "semantic cache read: store lookup failed, skipping cache");
            return None;
        }
    };

    let best = entries
        .into_iter()
        .map(|entry| {
            let similarity = cosine_similarity(&query_embedding, &entry.embedding);
            (entry, similarity)
        })
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;

    if best.1 >= threshold {
        Some(CacheHit { entry: best.0, similarity: best.1 })
    } else {
        None
    }
}

/// Best-effort write: embeds the query and stores the response. Failures
/// are logged, never propagated (§4.5 stage 11).
pub async fn write(
    store: &dyn SemanticCacheStore,
    embeddings: &dyn EmbeddingProvider,
    tenant_id: TenantId,
    query: &str,
    response: &str,
    sources: serde_json::Value,
    ttl_seconds: i64,
    now: DateTime<Utc>,
) {
    let embedding = match embeddings.embed_query(query).await {
        Ok(v) => v,
        Err(err) => {
            warn!(error = %err, "semantic cache write: embedding failed, skipping");
            return;
        }
    };

    let entry = SemanticCacheEntry {
        id: EntityId::new(),
        tenant_id,
        embedding,
        query_text: query.to_string(),
        response: response.to_string(),
        sources,
        created_at: now,
        ttl_seconds,
        hit_count: 0,
    };

    if let Err(err) = store.insert(entry).await {
        warn!(error = %err, "semantic cache write: store insert failed, skipping");
    }
}

#[allow(dead_code)]
fn _assert_store_is_object_safe(_: Arc<dyn SemanticCacheStore>) {}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use counsel_core::error::Result as CoreResult;
    use counsel_core::ports::FixedClock;

    use super::*;

    struct FixedEmbeddings(Vec<f32>);

    #[async_trait]
    impl EmbeddingProvider for FixedEmbeddings {
        async fn embed_query(&self, _text: &str) -> CoreResult<Vec<f32>> {
            Ok(self.0.clone())
        }
        async fn embed_batch(&self, texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| self.0.clone()).collect())
        }
    }

    struct InMemoryStore(std::sync::Mutex<Vec<SemanticCacheEntry>>);

    #[async_trait]
    impl SemanticCacheStore for InMemoryStore {
        async fn live_entries(&self, tenant_id: TenantId, now: DateTime<Utc>) -> CoreResult<Vec<SemanticCacheEntry>> {
            Ok(self.0.lock().unwrap().iter().filter(|e| e.is_visible_to(tenant_id, now)).cloned().collect())
        }
        async fn insert(&self, entry: SemanticCacheEntry) -> CoreResult<()> {
            self.0.lock().unwrap().push(entry);
            Ok(())
        }
    }

    #[test]
    fn identical_vectors_have_similarity_one() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_have_similarity_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[tokio::test]
    async fn read_misses_below_threshold() {
        let tenant = TenantId::new();
        let store = InMemoryStore(std::sync::Mutex::new(vec![SemanticCacheEntry {
            id: EntityId::new(),
            tenant_id: tenant,
            embedding: vec![0.0, 1.0],
            query_text: "unrelated".into(),
            response: "r".into(),
            sources: serde_json::json!([]),
            created_at: Utc::now(),
            ttl_seconds: 3600,
            hit_count: 0,
        }]));
        let embeddings = FixedEmbeddings(vec![1.0, 0.0]);
        let clock = FixedClock(Utc::now());
        let hit = read(&store, &embeddings, &clock, tenant, "query", 0.95).await;
        assert!(hit.is_none());
    }

    #[tokio::test]
    async fn read_hits_above_threshold_picking_the_best_match() {
        let tenant = TenantId::new();
        let store = InMemoryStore(std::sync::Mutex::new(vec![
            SemanticCacheEntry {
                id: EntityId::new(),
                tenant_id: tenant,
                embedding: vec![0.0, 1.0],
                query_text: "far".into(),
                response: "far-response".into(),
                sources: serde_json::json!([]),
                created_at: Utc::now(),
                ttl_seconds: 3600,
                hit_count: 0,
            },
            SemanticCacheEntry {
                id: EntityId::new(),
                tenant_id: tenant,
                embedding: vec![1.0, 0.0],
                query_text: "close".into(),
                response: "close-response".into(),
                sources: serde_json::json!([]),
                created_at: Utc::now(),
                ttl_seconds: 3600,
                hit_count: 0,
            },
        ]));
        let embeddings = FixedEmbeddings(vec![1.0, 0.0]);
        let clock = FixedClock(Utc::now());
        let hit = read(&store, &embeddings, &clock, tenant, "query", 0.95).await.unwrap();
        assert_eq!(hit.entry.response, "close-response");
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let tenant = TenantId::new();
        let store = InMemoryStore(std::sync::Mutex::new(vec![]));
        let embeddings = FixedEmbeddings(vec![0.5, 0.5]);
        let now = Utc::now();
        write(&store, &embeddings, tenant, "q", "response text", serde_json::json!([]), 3600, now).await;
        let clock = FixedClock(now);
        let hit = read(&store, &embeddings, &clock, tenant, "q", 0.95).await.unwrap();
        assert_eq!(hit.entry.response, "response text");
    }
}
