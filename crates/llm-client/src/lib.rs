use anyhow::{anyhow, Context, Result};
use reqwest::Client as Http;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Clone, Debug)]
pub enum Provider {
    Groq, // add more later
}

#[derive(Clone, Debug)]
pub struct Client {
    http: Http,
    provider: Provider,
    api_key: String,
    model: String,
    base_url: String, // provider-specific defaulted
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Clone, Debug, Default)]
pub struct ChatOptions {
    pub temperature: Option<f32>,
}

impl Client {
    pub fn new(provider: Provider, api_key: String, model: String) -> Result<Self> {
        let base_url = match provider {
            Provider::Groq => "https://api.groq.com/openai/v1".to_string(),
        };
        Ok(Self {
            http: Http::builder().pool_max_idle_per_host(8).build()?,
            provider,
            api_key,
            model,
            base_url,
        })
    }

    /// Convenience: pick up GROQ_API_KEY from env for Groq.
    pub fn from_env_groq(model: &str) -> Result<Self> {
        let key = std::env::var("GROQ_API_KEY").context("GROQ_API_KEY not set")?;
        Self::new(Provider::Groq, key, model.to_string())
    }

    pub async fn chat(&self, messages: &[ChatMessage], opts: ChatOptions) -> Result<String> {
        match self.provider {
            Provider::Groq => self.chat_groq(messages, opts).await,
        }
    }

    async fn chat_groq(&self, messages: &[ChatMessage], opts: ChatOptions) -> Result<String> {
        // OpenAI-compatible Chat Completions
        let url = format!("{}/chat/completions", self.base_url);

        let msgs: Vec<Value> = messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                };
                json!({ "role": role, "content": m.content })
            })
            .collect();

        let body = json!({
            "model": self.model,
            "messages": msgs,
            "temperature": opts.temperature.unwrap_or(0.7)
        });

        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("request failed")?;

        if !resp.status().is_success() {
            return Err(anyhow!("groq {}: {}", resp.status(), resp.text().await.unwrap_or_default()));
        }

        let v: Value = resp.json().await.context("invalid json")?;
        extract_content(&v)
    }
}

/// One extraction path only; anything off-schema is an error for the caller
/// to classify, not a reason to probe alternative fields.
fn extract_content(v: &Value) -> Result<String> {
    v.pointer("/choices/0/message/content")
        .and_then(|x| x.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("missing choices[0].message.content"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_content_from_chat_completion() {
        let v = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "hello" } }]
        });
        assert_eq!(extract_content(&v).unwrap(), "hello");
    }

    #[test]
    fn off_schema_response_is_an_error() {
        let v = serde_json::json!({ "choices": [{ "text": "legacy shape" }] });
        assert!(extract_content(&v).is_err());
        assert!(extract_content(&serde_json::json!({})).is_err());
    }
}
