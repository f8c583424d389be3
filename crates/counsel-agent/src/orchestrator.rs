//! Orchestrator stage (§4.5 stage 4-5): assembles the system prompt,
//! streams the main-model response chunk by chunk, and unconditionally
//! appends the legal-advice disclaimer.

use std::sync::Arc;

use counsel_core::ports::{ChatModel, ChatRole, ChatTurn};
use counsel_events::{Channel, EventBus, EventPayload, ReplayStore};
use futures::StreamExt;

use crate::error::{AgentError, Result};
use crate::model::{KnowledgeContext, RetrievedSource, RouterDecision};

const BASE_SYSTEM_PROMPT: &str = "You are a legal research assistant for UK housing law. \
Answer the user's question clearly and cite your sources inline using their exact citation text. \
If the provided sources don't contain enough information, say so rather than guessing.";

const DISCLAIMER: &str = "\n\n---\n\n*This information is provided for general guidance only and \
does not constitute legal advice. For specific legal matters, please consult qualified legal counsel.*";

/// The last 20 messages of history, trimmed and converted to chat turns.
/// If the final message is already the current user query, it is not
/// re-appended (the API rejects consecutive user turns, §4.5 stage 4).
pub fn build_messages(history: &[counsel_core::model::Message], current_query: &str) -> Vec<ChatTurn> {
    let mut turns: Vec<ChatTurn> = history
        .iter()
        .rev()
        .take(20)
        .rev()
        .map(|m| ChatTurn {
            role: match m.role {
                counsel_core::model::MessageRole::User => ChatRole::User,
                counsel_core::model::MessageRole::Assistant => ChatRole::Assistant,
            },
            content: m.content.clone(),
        })
        .collect();

    let already_ends_with_query =
        matches!(turns.last(), Some(t) if t.role == ChatRole::User && t.content == current_query);
    if !already_ends_with_query {
        turns.push(ChatTurn { role: ChatRole::User, content: current_query.to_string() });
    }
    turns
}

/// Builds the full system prompt: base + persona + knowledge context.
/// Skill blocks are keyed by the router's source set; built-ins cover legal
/// research, case law analysis, and policy interpretation (§4.5 stage 4).
pub fn assemble_system_prompt(
    persona: Option<&counsel_core::model::Persona>,
    knowledge: &KnowledgeContext,
    router_decision: &RouterDecision,
) -> String {
    let mut prompt = BASE_SYSTEM_PROMPT.to_string();

    if let Some(persona) = persona {
        if !persona.instructions.trim().is_empty() {
            prompt.push_str("\n\n# Persona Instructions\n\n");
            prompt.push_str(&persona.instructions);
        }
    }

    for skill in activated_skills(router_decision) {
        prompt.push_str("\n\n");
        prompt.push_str(skill);
    }

    if knowledge.has_sources() {
        prompt.push_str("\n\n# Retrieved Sources\n\n");
        prompt.push_str(&format_knowledge_context(knowledge));
        prompt.push_str(
            "\n\n**IMPORTANT**: use only the sources above to answer the question. \
Cite each source inline using its exact citation text.",
        );
    }

    prompt
}

fn activated_skills(router_decision: &RouterDecision) -> Vec<&'static str> {
    use crate::model::KnowledgeSourceKind::*;
    let mut skills = Vec::new();
    if router_decision.wants(UkLegislation) {
        skills.push("# Skill: Legal Research\n\nPrefer the most recent amended provision. Flag historical (pre-1963) provisions explicitly as historical context, not current law.");
    }
    if router_decision.wants(CaseLaw) {
        skills.push("# Skill: Case Law Analysis\n\nSummarise the ratio of each case before applying it; note when a judgment has been distinguished or overturned.");
    }
    if router_decision.wants(InternalPolicies) {
        skills.push("# Skill: Policy Interpretation\n\nQuote the operative clause verbatim before interpreting it.");
    }
    skills
}

fn format_knowledge_context(knowledge: &KnowledgeContext) -> String {
    let mut sections = Vec::new();
    for source in &knowledge.sources {
        let block = match source {
            RetrievedSource::Policy { document_name, section, content } => {
                let locator = section.as_deref().unwrap_or("");
                format!("[Policy: {document_name} {locator}]\n{content}")
            }
            RetrievedSource::Legislation { act_name, section, content, uri, is_historical } => {
                let locator = section.as_deref().unwrap_or("");
                let historical = if *is_historical { " (historical provision, pre-1963)" } else { "" };
                format!("[Legislation: {act_name}, s.{locator}{historical} — {uri}]\n{content}")
            }
            RetrievedSource::CaseLaw { case_name, citation, content } => {
                format!("[Case law: {case_name} {citation}]\n{content}")
            }
        };
        sections.push(block);
    }
    sections.join("\n\n")
}

/// Streams the main-model response, publishing a `content-delta` event for
/// every text chunk as it arrives (never buffering the full response, §9),
/// then appends the disclaimer as one final chunk. Returns the full
/// accumulated content including the disclaimer. Publishing is awaited
/// in order so the conversation's event stream reflects generation order.
pub async fn stream_response<R: ReplayStore + Clone + 'static>(
    model: &Arc<dyn ChatModel>,
    model_id: &str,
    system_prompt: &str,
    messages: &[ChatTurn],
    event_bus: &EventBus<R>,
    channel: &Channel,
) -> Result<String> {
    let mut stream = model
        .stream(model_id, system_prompt, messages)
        .await
        .map_err(|e| AgentError::Model { stage: "orchestrator", source: e })?;

    let mut content = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| AgentError::Model { stage: "orchestrator", source: e })?;
        let _ = event_bus.publish(channel, EventPayload::ContentDelta { text: chunk.clone() }).await;
        content.push_str(&chunk);
    }

    let _ = event_bus.publish(channel, EventPayload::ContentDelta { text: DISCLAIMER.to_string() }).await;
    content.push_str(DISCLAIMER);
    Ok(content)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use counsel_core::error::Result as CoreResult;
    use counsel_core::ports::TextChunk;
    use counsel_core::model::{Message, MessageRole, MessageState};
    use futures::stream::{self, BoxStream};

    use super::*;

    struct FixedStreamModel(Vec<&'static str>);

    #[async_trait]
    impl ChatModel for FixedStreamModel {
        async fn stream(
            &self,
            _model: &str,
            _system_prompt: &str,
            _history: &[ChatTurn],
        ) -> CoreResult<BoxStream<'static, CoreResult<TextChunk>>> {
            let chunks: Vec<CoreResult<TextChunk>> = self.0.iter().map(|s| Ok(s.to_string())).collect();
            Ok(stream::iter(chunks).boxed())
        }

        async fn generate_json(&self, _model: &str, _system_prompt: &str, _user_prompt: &str) -> CoreResult<String> {
            unreachable!("orchestrator never calls generate_json")
        }
    }

    fn msg(role: MessageRole, content: &str) -> Message {
        Message {
            id: counsel_core::EntityId::new(),
            tenant_id: counsel_core::TenantId::new(),
            conversation_id: counsel_core::EntityId::new(),
            role,
            content: content.to_string(),
            state: MessageState::Success,
            confidence_level: None,
            verification_result: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn does_not_reappend_the_current_query_if_history_already_ends_with_it() {
        let history = vec![msg(MessageRole::User, "hello")];
        let turns = build_messages(&history, "hello");
        assert_eq!(turns.len(), 1);
    }

    #[test]
    fn appends_the_current_query_when_history_ends_with_assistant() {
        let history = vec![msg(MessageRole::User, "hi"), msg(MessageRole::Assistant, "hello")];
        let turns = build_messages(&history, "what now?");
        assert_eq!(turns.len(), 3);
        assert_eq!(turns.last().unwrap().content, "what now?");
    }

    #[test]
    fn history_is_trimmed_to_the_last_twenty_messages() {
        let history: Vec<_> = (0..25).map(|i| msg(MessageRole::Assistant, &i.to_string())).collect();
        let turns = build_messages(&history, "new query");
        assert_eq!(turns.len(), 21);
        assert_eq!(turns[0].content, "5");
    }

    #[tokio::test]
    async fn streams_every_chunk_and_appends_the_disclaimer_last() {
        let model: Arc<dyn ChatModel> = Arc::new(FixedStreamModel(vec!["Hello", " there"]));
        let bus = counsel_events::EventBus::in_memory();
        let channel = Channel::conversation(counsel_core::TenantId::new(), counsel_core::EntityId::new());
        let mut subscription = Box::pin(bus.subscribe(&channel, None));

        let full = stream_response(&model, "advanced-model", "sys", &[], &bus, &channel).await.unwrap();
        assert!(full.starts_with("Hello there"));
        assert!(full.ends_with(DISCLAIMER));

        let first = futures::StreamExt::next(&mut subscription).await.unwrap();
        match first {
            counsel_events::Frame::Data { payload: EventPayload::ContentDelta { text }, .. } => assert_eq!(text, "Hello"),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn knowledge_context_renders_historical_flag() {
        let knowledge = KnowledgeContext {
            sources: vec![RetrievedSource::Legislation {
                act_name: "Law of Property Act 1925".into(),
                section: Some("1".into()),
                content: "text".into(),
                uri: "uri".into(),
                is_historical: true,
            }],
        };
        let decision =
            RouterDecision { intent: "q".into(), sources: vec![], complexity: "simple".into(), reasoning: String::new() };
        let prompt = assemble_system_prompt(None, &knowledge, &decision);
        assert!(prompt.contains("historical provision"));
    }
}
