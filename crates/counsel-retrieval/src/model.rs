//! Search request/result shapes (§4.2).

use counsel_core::EntityId;
use serde::{Deserialize, Serialize};

/// A request to the hybrid search pipeline.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub category_filter: Option<Vec<String>>,
    pub knowledge_base_ids: Option<Vec<EntityId>>,
    pub limit: usize,
    pub min_similarity: Option<f32>,
}

impl SearchRequest {
    /// Default vector/keyword candidate depth before fusion (§4.2).
    pub const CANDIDATE_K: usize = 200;
    /// Default result limit when the caller does not specify one.
    pub const DEFAULT_LIMIT: usize = 10;

    /// Validates the request per §4.2's contract: non-empty query, limit in 1..=200.
    pub fn validate(&self) -> Result<(), String> {
        if self.query.trim().is_empty() {
            return Err("query must not be empty".to_string());
        }
        if self.limit == 0 || self.limit > 200 {
            return Err(format!("limit must be in 1..=200, got {}", self.limit));
        }
        Ok(())
    }
}

/// One point stored in a tenant's vector collection (§4.2 index model).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub chunk_id: EntityId,
    pub document_id: EntityId,
    pub knowledge_base_id: EntityId,
    pub text: String,
    pub chunk_ordinal: u32,
    pub embedding: Vec<f32>,
    pub category: Option<String>,
}

/// A single fused-and-enriched search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk_id: EntityId,
    pub document_id: EntityId,
    pub document_name: String,
    pub document_uri: String,
    pub knowledge_base_category: Option<String>,
    pub chunk_ordinal: u32,
    pub text: String,
    pub contextual_prefix: Option<String>,
    pub score: f64,
    pub metadata: serde_json::Value,
}

/// Document metadata recovered during the enrich stage, joining a fused
/// chunk identifier back to the relational store (§4.2 step 4).
#[derive(Debug, Clone)]
pub struct DocumentMetadata {
    pub document_id: EntityId,
    pub document_name: String,
    pub document_uri: String,
    pub knowledge_base_category: Option<String>,
    pub metadata: serde_json::Value,
}
