//! Title generation stage (§4.5 stage 10): runs once, on the first
//! exchange of a conversation that has no title yet.

use std::sync::Arc;

use counsel_core::ports::ChatModel;

use crate::error::{AgentError, Result};

const TITLE_SYSTEM_PROMPT: &str =
    "Generate a short, specific conversation title (max 8 words) summarising the user's question. \
Respond with the title text only, no quotation marks or trailing punctuation.";

/// Whether the title-generation stage should run at all (§4.5 stage 10:
/// "if the conversation has no title and history <= 1 message").
pub fn should_generate(existing_title: Option<&str>, history_len: usize) -> bool {
    existing_title.map(str::trim).unwrap_or_default().is_empty() && history_len <= 1
}

pub struct TitleGenerator {
    model: Arc<dyn ChatModel>,
    model_id: String,
}

impl TitleGenerator {
    pub fn new(model: Arc<dyn ChatModel>, model_id: impl Into<String>) -> Self {
        Self { model, model_id: model_id.into() }
    }

    pub async fn generate(&self, user_text: &str) -> Result<String> {
        let raw = self
            .model
            .generate_json(&self.model_id, TITLE_SYSTEM_PROMPT, user_text)
            .await
            .map_err(|e| AgentError::Model { stage: "title_generation", source: e })?;
        Ok(raw.trim().trim_matches('"').to_string())
    }
}
