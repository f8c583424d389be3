//! The agent invocation pipeline (§4.5): router, parallel knowledge
//! retrieval, streaming orchestration, citation verification, confidence
//! scoring, and the surrounding bookkeeping stages, tied together behind
//! [`pipeline::AgentPipeline::invoke`].

pub mod cache;
pub mod confidence;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod pipeline;
pub mod port;
pub mod retrieval;
pub mod router;
pub mod title;

pub use error::{AgentError, Result};
pub use model::{KnowledgeContext, KnowledgeSourceKind, PipelineOutcome, RetrievedSource, RouterDecision};
pub use pipeline::{AgentPipeline, InvokeRequest, ModelTiers};
pub use port::{PipelineStore, QualityReview, QualityReviewer, SemanticCacheStore, TestingModeReviewer};
