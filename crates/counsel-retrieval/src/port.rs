//! Provider-abstracted seams the hybrid search pipeline calls through, so
//! the pipeline's fusion and enrichment logic can be exercised against
//! in-memory fakes without a running Qdrant or relational store.

use async_trait::async_trait;
use counsel_core::EntityId;

use crate::error::Result;
use crate::model::{DocumentMetadata, IndexedChunk};

/// A single scored hit from either the vector or the keyword leg of the
/// hybrid search pipeline, prior to fusion.
#[derive(Debug, Clone)]
pub struct RankedChunk {
    pub chunk_id: EntityId,
    pub text: String,
    pub document_id: EntityId,
    pub knowledge_base_id: EntityId,
    pub chunk_ordinal: u32,
}

/// A tenant's dense-vector collection (§4.2 index model). One collection
/// per tenant, namespaced by tenant identifier.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Ensures the tenant's collection exists with the configured vector
    /// dimension and a text payload index, creating it on first use.
    async fn ensure_collection(&self, tenant_key: &str, dimensions: u32) -> Result<()>;

    /// Upserts a batch of chunks into the tenant's collection.
    async fn upsert(&self, tenant_key: &str, chunks: &[IndexedChunk]) -> Result<()>;

    /// Deletes every point belonging to the given document identifiers.
    async fn delete_documents(&self, tenant_key: &str, document_ids: &[EntityId]) -> Result<()>;

    /// Runs approximate k-nearest-neighbours over the query embedding.
    async fn knn_search(
        &self,
        tenant_key: &str,
        query_embedding: &[f32],
        k: usize,
        category_filter: Option<&[String]>,
        knowledge_base_ids: Option<&[EntityId]>,
    ) -> Result<Vec<RankedChunk>>;

    /// Runs a keyword search against the text payload index.
    async fn keyword_search(
        &self,
        tenant_key: &str,
        query: &str,
        k: usize,
        category_filter: Option<&[String]>,
        knowledge_base_ids: Option<&[EntityId]>,
    ) -> Result<Vec<RankedChunk>>;
}

/// The enrich-stage join back to the relational store (§4.2 step 4).
#[async_trait]
pub trait DocumentCatalog: Send + Sync {
    /// Looks up document metadata for the given chunk identifiers. Chunks
    /// whose document no longer exists are simply absent from the returned
    /// map (eventual-consistency tolerated, per §4.2).
    async fn lookup(
        &self,
        chunk_ids: &[EntityId],
    ) -> Result<std::collections::HashMap<EntityId, DocumentMetadata>>;
}

/// Reorders fused-and-enriched candidates before truncation. The default
/// implementation is identity-by-RRF-score (§4.2 step 5).
pub trait Reranker: Send + Sync {
    fn rerank(&self, results: Vec<crate::model::SearchResult>) -> Vec<crate::model::SearchResult>;
}

/// Leaves the RRF-score ordering untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityReranker;

impl Reranker for IdentityReranker {
    fn rerank(&self, results: Vec<crate::model::SearchResult>) -> Vec<crate::model::SearchResult> {
        results
    }
}
