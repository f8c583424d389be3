//! The closed tagged union of event payloads (§4.1).

use serde::{Deserialize, Serialize};

/// A verification status as surfaced to the client, mirroring the outcome
/// vocabulary produced by the verification core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Verified,
    Unverified,
    Removed,
}

/// One citation/source issue surfaced in a [`EventPayload::VerificationResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationIssue {
    pub citation_text: String,
    pub reason: String,
}

/// The closed set of event payloads this fabric carries. Every variant's
/// serde tag matches the kebab-case type-tag used on the wire (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EventPayload {
    // --- Conversation stream ---
    AgentStart { name: String, task: String },
    AgentProgress { name: String, status: String },
    AgentComplete { name: String, duration_ms: u64 },
    ContentDelta { text: String },
    LegalSource { act: String, section: Option<String>, uri: String, status: SourceStatus },
    CaseLawSource { case_name: String, citation: String, status: SourceStatus },
    CompanyPolicySource { document_name: String, section: Option<String>, status: SourceStatus },
    ConfidenceUpdate { level: String, reason: String },
    UsageMetrics { model: String, in_tokens: u64, out_tokens: u64 },
    VerificationResult {
        checked: u32,
        verified: u32,
        unverified: u32,
        removed: u32,
        issues: Vec<VerificationIssue>,
    },
    MessageState { id: String, state: String },
    MessageComplete { id: String },
    ConversationState { state: String },
    ConversationCancelled,
    Error { code: String, message: String, recoverable: bool },

    // --- Policy review stream ---
    PolicyReviewStatus { state: String, text: String },
    PolicyReviewCitationProgress { so_far: u32, total: u32 },
    PolicyReviewComplete { id: String },
    PolicyReviewFailed { code: String, message: String },

    // --- User push ---
    ConversationTitleUpdating,
    ConversationTitleUpdated { title: String },
    PolicyReviewCreated { review_id: String },
    RegulatoryChangeAlert { summary: String, affected_acts: Vec<String> },
    CreditUsageWarning { used: u64, limit: u64 },
    IngestionStarted { document_id: String },
    IngestionProgress { document_id: String, stage: String },
    IngestionCompleted { document_id: String },
    IngestionFailed { document_id: String, message: String },
}

impl EventPayload {
    /// The wire type tag for this variant, e.g. `"agent-start"`.
    ///
    /// Derived by round-tripping through JSON rather than hand-maintaining
    /// a parallel match arm per variant, so the tag can never drift from
    /// the `#[serde(tag = "type")]` definition above.
    pub fn type_tag(&self) -> String {
        let value = serde_json::to_value(self).unwrap_or_default();
        value
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tag_matches_wire_kebab_case() {
        let e = EventPayload::ContentDelta { text: "hi".into() };
        assert_eq!(e.type_tag(), "content-delta");

        let e = EventPayload::AgentStart { name: "router".into(), task: "classify".into() };
        assert_eq!(e.type_tag(), "agent-start");

        let e = EventPayload::ConversationCancelled;
        assert_eq!(e.type_tag(), "conversation-cancelled");
    }
}
