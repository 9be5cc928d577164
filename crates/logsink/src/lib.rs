//! Fire-and-forget event log sink.
//!
//! Every finished interview is appended here, success or failure alike. A
//! broken or unconfigured sink must never reach the user: errors end at a
//! `warn!` line, there are no retries and nothing blocks on the write.

use async_trait::async_trait;
use interview_core::ports::{LogRecord, LogSinkPort};

/// POSTs each record as JSON to a webhook URL.
pub struct HttpLogSink {
    http: reqwest::Client,
    url: String,
}

impl HttpLogSink {
    pub fn new(url: String) -> Self {
        Self { http: reqwest::Client::new(), url }
    }
}

#[async_trait]
impl LogSinkPort for HttpLogSink {
    async fn record(&self, record: LogRecord) {
        let result = self.http.post(&self.url).json(&record).send().await;
        match result {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), "log sink rejected record");
            }
            Err(e) => {
                tracing::warn!(error = %e, "log sink unreachable");
            }
        }
    }
}

/// Stands in when no sink URL is configured.
pub struct NoopLogSink;

#[async_trait]
impl LogSinkPort for NoopLogSink {
    async fn record(&self, record: LogRecord) {
        tracing::debug!(user_id = record.user_id, model = %record.model, "log sink disabled, record dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use interview_core::ports::GenerationRequest;

    fn record() -> LogRecord {
        LogRecord {
            timestamp: Utc::now(),
            user_id: 1,
            user_handle: Some("operator".into()),
            request: GenerationRequest {
                news_hook: Some("hook".into()),
                topic: None,
                link: None,
                release_type: None,
                photo_count: 0,
            },
            model: "m".into(),
            raw_output: "text".into(),
        }
    }

    #[tokio::test]
    async fn unreachable_sink_is_swallowed() {
        // Port 9 discards traffic; the call must still return cleanly.
        let sink = HttpLogSink::new("http://127.0.0.1:9/log".into());
        sink.record(record()).await;
    }

    #[tokio::test]
    async fn noop_sink_accepts_everything() {
        NoopLogSink.record(record()).await;
    }
}
