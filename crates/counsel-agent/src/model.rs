//! Shapes produced and consumed by the pipeline stages (§4.5).

use serde::{Deserialize, Serialize};

/// A source category the router can request knowledge from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KnowledgeSourceKind {
    UkLegislation,
    CaseLaw,
    InternalPolicies,
}

/// The router's JSON-constrained classification of one query.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RouterDecision {
    pub intent: String,
    pub sources: Vec<KnowledgeSourceKind>,
    pub complexity: String,
    pub reasoning: String,
}

impl RouterDecision {
    pub fn wants(&self, kind: KnowledgeSourceKind) -> bool {
        self.sources.contains(&kind)
    }
}

/// One piece of retrieved knowledge-context, tagged by origin, formatted
/// into the orchestrator's system prompt verbatim by [`crate::orchestrator`].
#[derive(Debug, Clone)]
pub enum RetrievedSource {
    Policy {
        document_name: String,
        section: Option<String>,
        content: String,
    },
    Legislation {
        act_name: String,
        section: Option<String>,
        content: String,
        uri: String,
        is_historical: bool,
    },
    CaseLaw {
        case_name: String,
        citation: String,
        content: String,
    },
}

/// The aggregated output of the knowledge retrieval stage (§4.5 stage 3).
#[derive(Debug, Clone, Default)]
pub struct KnowledgeContext {
    pub sources: Vec<RetrievedSource>,
}

impl KnowledgeContext {
    pub fn has_sources(&self) -> bool {
        !self.sources.is_empty()
    }
}

/// The final, caller-visible result of one invocation: either a freshly
/// generated response or a semantic-cache hit.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub content: String,
    pub confidence: Option<counsel_core::model::Confidence>,
    pub cache_hit: bool,
    pub model_used: Option<String>,
}
