//! Hybrid retrieval core: embed, fuse (vector + keyword via Reciprocal Rank
//! Fusion), enrich, rerank, truncate (§4.2).

pub mod error;
pub mod model;
pub mod port;
pub mod qdrant;
pub mod rrf;
pub mod search;

pub use error::{Result, RetrievalError};
pub use model::{DocumentMetadata, IndexedChunk, SearchRequest, SearchResult};
pub use port::{DocumentCatalog, IdentityReranker, RankedChunk, Reranker, VectorIndex};
pub use qdrant::QdrantVectorIndex;
pub use search::HybridSearch;
