//! The hybrid search pipeline: embed, fuse, enrich, rerank, truncate (§4.2).

use std::sync::Arc;

use counsel_core::ports::EmbeddingProvider;

use crate::error::{RetrievalError, Result};
use crate::model::{SearchRequest, SearchResult};
use crate::port::{DocumentCatalog, Reranker, VectorIndex};
use crate::rrf;

/// Orchestrates the hybrid search pipeline over a tenant's collection.
/// Cheap to clone: holds only `Arc`s to its ports.
pub struct HybridSearch {
    embeddings: Arc<dyn EmbeddingProvider>,
    vector_index: Arc<dyn VectorIndex>,
    catalog: Arc<dyn DocumentCatalog>,
    reranker: Arc<dyn Reranker>,
}

impl HybridSearch {
    pub fn new(
        embeddings: Arc<dyn EmbeddingProvider>,
        vector_index: Arc<dyn VectorIndex>,
        catalog: Arc<dyn DocumentCatalog>,
        reranker: Arc<dyn Reranker>,
    ) -> Self {
        Self { embeddings, vector_index, catalog, reranker }
    }

    /// Runs the full pipeline for a tenant's collection and returns the
    /// ranked, truncated result sequence.
    pub async fn search(&self, tenant_key: &str, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        request.validate().map_err(RetrievalError::InvalidRequest)?;

        // Step 1: embed.
        let query_embedding = self
            .embeddings
            .embed_query(&request.query)
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        // Step 2: vector and keyword candidate retrieval, run concurrently.
        let category_filter = request.category_filter.as_deref();
        let kb_ids = request.knowledge_base_ids.as_deref();
        let (vector_hits, keyword_hits) = tokio::try_join!(
            self.vector_index.knn_search(
                tenant_key,
                &query_embedding,
                SearchRequest::CANDIDATE_K,
                category_filter,
                kb_ids,
            ),
            self.vector_index.keyword_search(
                tenant_key,
                &request.query,
                SearchRequest::CANDIDATE_K,
                category_filter,
                kb_ids,
            ),
        )?;

        // Step 3: fuse. The vector list is passed first so it wins ties.
        let fused = rrf::fuse(&[&vector_hits, &keyword_hits]);
        if fused.is_empty() {
            return Ok(Vec::new());
        }

        // Step 4: enrich, dropping any chunk whose document has vanished.
        let chunk_ids: Vec<_> = fused.iter().map(|f| f.chunk_id).collect();
        let metadata = self
            .catalog
            .lookup(&chunk_ids)
            .await
            .map_err(|e| RetrievalError::VectorStore(e.to_string()))?;

        let mut by_id: std::collections::HashMap<_, _> =
            vector_hits.iter().chain(keyword_hits.iter()).map(|c| (c.chunk_id, c)).collect();

        let mut enriched = Vec::new();
        for fused_chunk in &fused {
            let Some(doc) = metadata.get(&fused_chunk.chunk_id) else { continue };
            let Some(ranked) = by_id.remove(&fused_chunk.chunk_id) else { continue };
            if let Some(threshold) = request.min_similarity {
                if (fused_chunk.score as f32) < threshold {
                    continue;
                }
            }
            enriched.push(SearchResult {
                chunk_id: fused_chunk.chunk_id,
                document_id: ranked.document_id,
                document_name: doc.document_name.clone(),
                document_uri: doc.document_uri.clone(),
                knowledge_base_category: doc.knowledge_base_category.clone(),
                chunk_ordinal: ranked.chunk_ordinal,
                text: ranked.text.clone(),
                contextual_prefix: None,
                score: fused_chunk.score,
                metadata: doc.metadata.clone(),
            });
        }

        // Step 5: rerank and truncate.
        let reranked = self.reranker.rerank(enriched);
        Ok(reranked.into_iter().take(request.limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use counsel_core::error::Result as CoreResult;
    use counsel_core::EntityId;

    use super::*;
    use crate::model::DocumentMetadata;
    use crate::port::{IdentityReranker, RankedChunk};

    struct FixedEmbeddings;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbeddings {
        async fn embed_query(&self, _text: &str) -> CoreResult<Vec<f32>> {
            Ok(vec![0.1, 0.2, 0.3])
        }
        async fn embed_batch(&self, texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.1, 0.2, 0.3]).collect())
        }
    }

    struct FakeVectorIndex {
        vector_hits: Vec<RankedChunk>,
        keyword_hits: Vec<RankedChunk>,
    }

    #[async_trait]
    impl VectorIndex for FakeVectorIndex {
        async fn ensure_collection(&self, _tenant_key: &str, _dimensions: u32) -> Result<()> {
            Ok(())
        }
        async fn upsert(&self, _tenant_key: &str, _chunks: &[crate::model::IndexedChunk]) -> Result<()> {
            Ok(())
        }
        async fn delete_documents(&self, _tenant_key: &str, _document_ids: &[EntityId]) -> Result<()> {
            Ok(())
        }
        async fn knn_search(
            &self,
            _tenant_key: &str,
            _query_embedding: &[f32],
            _k: usize,
            _category_filter: Option<&[String]>,
            _knowledge_base_ids: Option<&[EntityId]>,
        ) -> Result<Vec<RankedChunk>> {
            Ok(self.vector_hits.clone())
        }
        async fn keyword_search(
            &self,
            _tenant_key: &str,
            _query: &str,
            _k: usize,
            _category_filter: Option<&[String]>,
            _knowledge_base_ids: Option<&[EntityId]>,
        ) -> Result<Vec<RankedChunk>> {
            Ok(self.keyword_hits.clone())
        }
    }

    struct FakeCatalog {
        documents: HashMap<EntityId, DocumentMetadata>,
    }

    #[async_trait]
    impl DocumentCatalog for FakeCatalog {
        async fn lookup(&self, chunk_ids: &[EntityId]) -> Result<HashMap<EntityId, DocumentMetadata>> {
            Ok(chunk_ids
                .iter()
                .filter_map(|id| self.documents.get(id).map(|d| (*id, d.clone())))
                .collect())
        }
    }

    fn ranked(id: EntityId, document_id: EntityId) -> RankedChunk {
        RankedChunk {
            chunk_id: id,
            text: "chunk text".to_string(),
            document_id,
            knowledge_base_id: EntityId::new(),
            chunk_ordinal: 0,
        }
    }

    #[tokio::test]
    async fn full_pipeline_returns_enriched_ranked_results() {
        let chunk_id = EntityId::new();
        let document_id = EntityId::new();
        let vector_index = Arc::new(FakeVectorIndex {
            vector_hits: vec![ranked(chunk_id, document_id)],
            keyword_hits: vec![],
        });
        let mut documents = HashMap::new();
        documents.insert(
            chunk_id,
            DocumentMetadata {
                document_id,
                document_name: "Housing Act Guidance".to_string(),
                document_uri: "doc://housing-act".to_string(),
                knowledge_base_category: Some("legislation".to_string()),
                metadata: serde_json::json!({}),
            },
        );
        let catalog = Arc::new(FakeCatalog { documents });

        let pipeline = HybridSearch::new(
            Arc::new(FixedEmbeddings),
            vector_index,
            catalog,
            Arc::new(IdentityReranker),
        );

        let request = SearchRequest {
            query: "rent increase notice period".to_string(),
            category_filter: None,
            knowledge_base_ids: None,
            limit: 10,
            min_similarity: None,
        };

        let results = pipeline.search("tenant-a", &request).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_name, "Housing Act Guidance");
        assert_eq!(results[0].chunk_id, chunk_id);
    }

    #[tokio::test]
    async fn chunks_whose_document_vanished_are_dropped() {
        let chunk_id = EntityId::new();
        let vector_index = Arc::new(FakeVectorIndex {
            vector_hits: vec![ranked(chunk_id, EntityId::new())],
            keyword_hits: vec![],
        });
        let catalog = Arc::new(FakeCatalog { documents: HashMap::new() });

        let pipeline = HybridSearch::new(
            Arc::new(FixedEmbeddings),
            vector_index,
            catalog,
            Arc::new(IdentityReranker),
        );

        let request = SearchRequest {
            query: "anything".to_string(),
            category_filter: None,
            knowledge_base_ids: None,
            limit: 10,
            min_similarity: None,
        };

        let results = pipeline.search("tenant-a", &request).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn empty_query_is_rejected_before_any_port_call() {
        let pipeline = HybridSearch::new(
            Arc::new(FixedEmbeddings),
            Arc::new(FakeVectorIndex { vector_hits: vec![], keyword_hits: vec![] }),
            Arc::new(FakeCatalog { documents: HashMap::new() }),
            Arc::new(IdentityReranker),
        );
        let request = SearchRequest {
            query: "   ".to_string(),
            category_filter: None,
            knowledge_base_ids: None,
            limit: 10,
            min_similarity: None,
        };
        let err = pipeline.search("tenant-a", &request).await.unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn results_are_truncated_to_the_requested_limit() {
        let hits: Vec<RankedChunk> =
            (0..5).map(|_| ranked(EntityId::new(), EntityId::new())).collect();
        let mut documents = HashMap::new();
        for hit in &hits {
            documents.insert(
                hit.chunk_id,
                DocumentMetadata {
                    document_id: hit.document_id,
                    document_name: "doc".to_string(),
                    document_uri: "doc://x".to_string(),
                    knowledge_base_category: None,
                    metadata: serde_json::json!({}),
                },
            );
        }
        let vector_index = Arc::new(FakeVectorIndex { vector_hits: hits, keyword_hits: vec![] });
        let catalog = Arc::new(FakeCatalog { documents });
        let pipeline = HybridSearch::new(
            Arc::new(FixedEmbeddings),
            vector_index,
            catalog,
            Arc::new(IdentityReranker),
        );
        let request = SearchRequest {
            query: "x".to_string(),
            category_filter: None,
            knowledge_base_ids: None,
            limit: 2,
            min_similarity: None,
        };
        let results = pipeline.search("tenant-a", &request).await.unwrap();
        assert_eq!(results.len(), 2);
    }
}
