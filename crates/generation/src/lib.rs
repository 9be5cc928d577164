//! Generation adapter: turns a finished brief into post text.
//!
//! Degrades instead of crashing: a missing instruction document or API key
//! leaves the adapter running, with every attempt reporting the corresponding
//! [`GenerationError`]. All provider trouble (HTTP errors, schema drift,
//! timeout) collapses into `Provider(detail)`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use interview_core::ports::{GenerationError, GenerationRequest, GeneratorPort};
use llm_client::{ChatMessage, ChatOptions, Client, Role};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct Generator {
    client: Option<Client>,
    instructions: Option<String>,
    model: String,
    timeout: Duration,
}

impl Generator {
    pub fn new(client: Option<Client>, instructions: Option<String>, model: String) -> Self {
        Self { client, instructions, model, timeout: DEFAULT_TIMEOUT }
    }

    /// Builds from the environment: `GROQ_API_KEY` and the instruction file
    /// are both optional, their absence is reported per attempt instead.
    pub fn from_env(model: &str, instructions_path: &Path) -> Self {
        let client = match Client::from_env_groq(model) {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::warn!(error = %e, "generation client unavailable");
                None
            }
        };
        let instructions = load_instructions(instructions_path);
        Self::new(client, instructions, model.to_string())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn load_instructions(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => Some(text),
        Ok(_) => {
            tracing::warn!(path = %path.display(), "instruction document is empty");
            None
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "instruction document not readable");
            None
        }
    }
}

/// Renders the brief as the user turn of the chat.
fn render_brief(request: &GenerationRequest) -> String {
    let mut lines = Vec::new();
    match &request.news_hook {
        Some(hook) => lines.push(format!("News hook: {}", hook)),
        None => lines.push("News hook: none".to_string()),
    }
    if let Some(topic) = &request.topic {
        lines.push(format!("Topic: {}", topic));
    }
    if let Some(link) = &request.link {
        lines.push(format!("Link: {}", link));
    }
    if let Some(release_type) = request.release_type {
        let label = match release_type {
            interview_core::session::ReleaseType::Premiere => "premiere",
            interview_core::session::ReleaseType::AlreadyReleased => "already released",
        };
        lines.push(format!("Release type: {}", label));
    }
    lines.push(format!("Attached photos: {}", request.photo_count));
    lines.join("\n")
}

#[async_trait]
impl GeneratorPort for Generator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let instructions = self.instructions.as_ref().ok_or(GenerationError::MissingInstructions)?;
        let client = self.client.as_ref().ok_or(GenerationError::MissingCredentials)?;

        let messages = vec![
            ChatMessage { role: Role::System, content: instructions.clone() },
            ChatMessage { role: Role::User, content: render_brief(request) },
        ];
        let options = ChatOptions { temperature: Some(0.7) };

        let response = tokio::time::timeout(self.timeout, client.chat(&messages, options))
            .await
            .map_err(|_| GenerationError::Provider("timed out".to_string()))?
            .map_err(|e| GenerationError::Provider(e.to_string()))?;

        if response.trim().is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok(response)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
