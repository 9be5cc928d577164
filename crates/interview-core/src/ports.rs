use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{ReleaseType, Session};

/// Snapshot of the collected fields, built once when the user finishes.
/// Passed by value to the generator and echoed into the log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub news_hook: Option<String>,
    pub topic: Option<String>,
    pub link: Option<String>,
    pub release_type: Option<ReleaseType>,
    pub photo_count: usize,
}

impl GenerationRequest {
    pub fn from_session(session: &Session) -> Self {
        Self {
            news_hook: session.news_hook.clone(),
            topic: session.topic.clone(),
            link: session.link.clone(),
            release_type: session.release_type,
            photo_count: session.photos.len(),
        }
    }
}

/// One finished interview, success or not. Appended to the sink best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<String>,
    #[serde(flatten)]
    pub request: GenerationRequest,
    pub model: String,
    /// Generated text, or the user-visible failure text when generation failed.
    pub raw_output: String,
}

/// Every non-success outcome of the generation call. Schema drift, HTTP
/// failures and timeouts all collapse into `Provider`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("generation credentials are not configured")]
    MissingCredentials,
    #[error("instruction document is not available")]
    MissingInstructions,
    #[error("provider returned an empty response")]
    Empty,
    #[error("provider error: {0}")]
    Provider(String),
}

#[async_trait]
pub trait GeneratorPort: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;

    /// Model identifier recorded verbatim in every log record.
    fn model_id(&self) -> &str;
}

/// Fire-and-forget: implementations swallow their own failures.
#[async_trait]
pub trait LogSinkPort: Send + Sync {
    async fn record(&self, record: LogRecord);
}

// Lets the binary pick a sink at runtime.
#[async_trait]
impl LogSinkPort for Box<dyn LogSinkPort> {
    async fn record(&self, record: LogRecord) {
        (**self).record(record).await
    }
}

#[async_trait]
pub trait OutboundPort: Send + Sync {
    async fn send(&self, reply: protocol::Reply) -> anyhow::Result<()>;
}
