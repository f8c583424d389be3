//! Qdrant-backed [`VectorIndex`]: one collection per tenant, a text payload
//! index for the keyword leg of hybrid search (§4.2 index model).
//!
//! Grounded in the upstream Qdrant integration's collection-lifecycle and
//! point-upsert conventions (`collection_exists` / `create_collection` /
//! builder-style point construction), adapted to a tenant-keyed collection
//! name and the narrower [`VectorIndex`] port this crate calls through.

use std::collections::HashMap;

use async_trait::async_trait;
use counsel_core::EntityId;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, DeletePointsBuilder,
    Distance, FieldCondition, FieldType, Filter, Match, PointStruct, ScrollPointsBuilder,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;

use crate::error::{RetrievalError, Result};
use crate::model::IndexedChunk;
use crate::port::{RankedChunk, VectorIndex};

const TEXT_PAYLOAD_FIELD: &str = "text";
const DOCUMENT_ID_FIELD: &str = "document_id";
const KNOWLEDGE_BASE_ID_FIELD: &str = "knowledge_base_id";
const CATEGORY_FIELD: &str = "category";
const CHUNK_ORDINAL_FIELD: &str = "chunk_ordinal";

/// A [`VectorIndex`] backed by a live Qdrant instance.
pub struct QdrantVectorIndex {
    client: Qdrant,
}

impl QdrantVectorIndex {
    pub fn new(client: Qdrant) -> Self {
        Self { client }
    }

    fn collection_name(tenant_key: &str) -> String {
        format!("tenant_{tenant_key}")
    }

    fn filter(category_filter: Option<&[String]>, knowledge_base_ids: Option<&[EntityId]>) -> Option<Filter> {
        let mut must = Vec::new();

        if let Some(categories) = category_filter {
            if !categories.is_empty() {
                must.push(Condition::matches(CATEGORY_FIELD, categories.to_vec()));
            }
        }

        if let Some(kb_ids) = knowledge_base_ids {
            if !kb_ids.is_empty() {
                let values: Vec<String> = kb_ids.iter().map(|id| id.to_string()).collect();
                must.push(Condition::matches(KNOWLEDGE_BASE_ID_FIELD, values));
            }
        }

        if must.is_empty() {
            None
        } else {
            Some(Filter { must, ..Default::default() })
        }
    }

    fn point_to_ranked_chunk(
        id_str: &str,
        payload: &HashMap<String, qdrant_client::qdrant::Value>,
    ) -> Option<RankedChunk> {
        let chunk_id = EntityId::from_uuid(uuid::Uuid::parse_str(id_str).ok()?);
        let text = payload.get(TEXT_PAYLOAD_FIELD)?.as_str()?.to_string();
        let document_id =
            EntityId::from_uuid(uuid::Uuid::parse_str(payload.get(DOCUMENT_ID_FIELD)?.as_str()?).ok()?);
        let knowledge_base_id = EntityId::from_uuid(
            uuid::Uuid::parse_str(payload.get(KNOWLEDGE_BASE_ID_FIELD)?.as_str()?).ok()?,
        );
        let chunk_ordinal = payload.get(CHUNK_ORDINAL_FIELD).and_then(|v| v.as_integer()).unwrap_or(0) as u32;
        Some(RankedChunk { chunk_id, text, document_id, knowledge_base_id, chunk_ordinal })
    }
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    async fn ensure_collection(&self, tenant_key: &str, dimensions: u32) -> Result<()> {
        let name = Self::collection_name(tenant_key);
        let exists = self
            .client
            .collection_exists(&name)
            .await
            .map_err(|e| RetrievalError::VectorStore(e.to_string()))?;
        if exists {
            return Ok(());
        }

        let vectors = VectorParamsBuilder::new(dimensions as u64, Distance::Cosine);
        self.client
            .create_collection(CreateCollectionBuilder::new(&name).vectors_config(vectors))
            .await
            .map_err(|e| RetrievalError::VectorStore(e.to_string()))?;

        self.client
            .create_field_index(CreateFieldIndexCollectionBuilder::new(
                &name,
                TEXT_PAYLOAD_FIELD,
                FieldType::Text,
            ))
            .await
            .map_err(|e| RetrievalError::VectorStore(e.to_string()))?;

        Ok(())
    }

    async fn upsert(&self, tenant_key: &str, chunks: &[IndexedChunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let name = Self::collection_name(tenant_key);
        let points: Vec<PointStruct> = chunks
            .iter()
            .map(|chunk| {
                let mut payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::new();
                payload.insert(TEXT_PAYLOAD_FIELD.to_string(), chunk.text.clone().into());
                payload.insert(DOCUMENT_ID_FIELD.to_string(), chunk.document_id.to_string().into());
                payload.insert(
                    KNOWLEDGE_BASE_ID_FIELD.to_string(),
                    chunk.knowledge_base_id.to_string().into(),
                );
                payload.insert(CHUNK_ORDINAL_FIELD.to_string(), (chunk.chunk_ordinal as i64).into());
                if let Some(category) = &chunk.category {
                    payload.insert(CATEGORY_FIELD.to_string(), category.clone().into());
                }
                PointStruct::new(chunk.chunk_id.to_string(), chunk.embedding.clone(), payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&name, points))
            .await
            .map_err(|e| RetrievalError::VectorStore(e.to_string()))?;
        Ok(())
    }

    async fn delete_documents(&self, tenant_key: &str, document_ids: &[EntityId]) -> Result<()> {
        if document_ids.is_empty() {
            return Ok(());
        }
        let name = Self::collection_name(tenant_key);
        let values: Vec<String> = document_ids.iter().map(|id| id.to_string()).collect();
        let filter = Filter {
            must: vec![Condition::matches(DOCUMENT_ID_FIELD, values)],
            ..Default::default()
        };
        self.client
            .delete_points(DeletePointsBuilder::new(&name).points(filter))
            .await
            .map_err(|e| RetrievalError::VectorStore(e.to_string()))?;
        Ok(())
    }

    async fn knn_search(
        &self,
        tenant_key: &str,
        query_embedding: &[f32],
        k: usize,
        category_filter: Option<&[String]>,
        knowledge_base_ids: Option<&[EntityId]>,
    ) -> Result<Vec<RankedChunk>> {
        let name = Self::collection_name(tenant_key);
        let mut request = SearchPointsBuilder::new(&name, query_embedding.to_vec(), k as u64)
            .with_payload(true);
        if let Some(filter) = Self::filter(category_filter, knowledge_base_ids) {
            request = request.filter(filter);
        }

        let response = self
            .client
            .search_points(request)
            .await
            .map_err(|e| RetrievalError::VectorStore(e.to_string()))?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| {
                let id_str = match point.id?.point_id_options? {
                    qdrant_client::qdrant::point_id::PointIdOptions::Uuid(u) => u,
                    qdrant_client::qdrant::point_id::PointIdOptions::Num(n) => n.to_string(),
                };
                Self::point_to_ranked_chunk(&id_str, &point.payload)
            })
            .collect())
    }

    async fn keyword_search(
        &self,
        tenant_key: &str,
        query: &str,
        k: usize,
        category_filter: Option<&[String]>,
        knowledge_base_ids: Option<&[EntityId]>,
    ) -> Result<Vec<RankedChunk>> {
        let name = Self::collection_name(tenant_key);
        let mut must = vec![Condition {
            condition_one_of: Some(qdrant_client::qdrant::condition::ConditionOneOf::Field(
                FieldCondition {
                    key: TEXT_PAYLOAD_FIELD.to_string(),
                    r#match: Some(Match {
                        match_value: Some(qdrant_client::qdrant::r#match::MatchValue::Text(
                            query.to_string(),
                        )),
                    }),
                    ..Default::default()
                },
            )),
        }];
        if let Some(filter) = Self::filter(category_filter, knowledge_base_ids) {
            must.extend(filter.must);
        }

        let response = self
            .client
            .scroll(
                ScrollPointsBuilder::new(&name)
                    .filter(Filter { must, ..Default::default() })
                    .limit(k as u32)
                    .with_payload(true),
            )
            .await
            .map_err(|e| RetrievalError::KeywordIndex(e.to_string()))?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| {
                let id_str = match point.id?.point_id_options? {
                    qdrant_client::qdrant::point_id::PointIdOptions::Uuid(u) => u,
                    qdrant_client::qdrant::point_id::PointIdOptions::Num(n) => n.to_string(),
                };
                Self::point_to_ranked_chunk(&id_str, &point.payload)
            })
            .collect())
    }
}
