pub mod dispatch;
pub mod ports;
pub mod session;
pub mod texts;

use std::collections::HashSet;

use anyhow::Result;
use chrono::Utc;
use protocol::{labels, ChoiceSet, InboundEvent, Reply, UserRef};

use ports::{GenerationRequest, GeneratorPort, LogRecord, LogSinkPort, OutboundPort};
use session::{InterviewState, SessionStore, MAX_PHOTOS};

/// Static set of permitted user ids. An empty list means open access, which
/// is how the single-operator deployment runs.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    ids: HashSet<i64>,
}

impl AllowList {
    pub fn open() -> Self {
        Self::default()
    }

    pub fn from_ids<I: IntoIterator<Item = i64>>(ids: I) -> Self {
        Self { ids: ids.into_iter().collect() }
    }

    pub fn permits(&self, user_id: i64) -> bool {
        self.ids.is_empty() || self.ids.contains(&user_id)
    }
}

/// Headless conversation engine: consumes inbound events, walks the per-user
/// interview state machine, emits replies and collaborator calls.
///
/// Callers must serialize events per user id (see [`dispatch::Dispatcher`]);
/// events for distinct users may run concurrently.
pub struct InterviewEngine<G: GeneratorPort, L: LogSinkPort, O: OutboundPort> {
    store: SessionStore,
    generator: G,
    log_sink: L,
    outbound: O,
    allow_list: AllowList,
}

impl<G: GeneratorPort, L: LogSinkPort, O: OutboundPort> InterviewEngine<G, L, O> {
    pub fn new(generator: G, log_sink: L, outbound: O, allow_list: AllowList) -> Self {
        Self { store: SessionStore::new(), generator, log_sink, outbound, allow_list }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Entry point for one inbound event. The access gate runs before any
    /// state machine logic; rejected events touch no session.
    pub async fn handle(&self, event: InboundEvent) -> Result<()> {
        let user = event.user().clone();
        if !self.allow_list.permits(user.id) {
            return self.outbound.send(Reply::plain(user.id, texts::ACCESS_RESTRICTED)).await;
        }

        match event {
            InboundEvent::Reset { user } => self.handle_reset(&user).await,
            InboundEvent::Text { user, text } => self.handle_text(&user, &text).await,
            InboundEvent::Photo { user, file_ref } => self.handle_photo(&user, file_ref).await,
        }
    }

    async fn handle_reset(&self, user: &UserRef) -> Result<()> {
        self.store.reset(user.id);
        self.outbound
            .send(Reply::with_choices(user.id, texts::GREETING, ChoiceSet::HookSkip))
            .await
    }

    async fn handle_text(&self, user: &UserRef, text: &str) -> Result<()> {
        let Some(session) = self.store.get(user.id) else {
            // No active session: no mutation, just point at the reset command.
            return self.outbound.send(Reply::plain(user.id, texts::PROMPT_START)).await;
        };

        match session.state {
            InterviewState::AwaitingHook => self.on_hook_text(user, text).await,
            InterviewState::AwaitingReleaseType => self.on_release_type_text(user, text).await,
            InterviewState::AwaitingTopicChoice => self.on_topic_choice_text(user, text).await,
            InterviewState::AwaitingTopicCustom => self.on_topic_custom_text(user, text).await,
            InterviewState::AwaitingPhotoOrFinish => self.on_collect_text(user, text).await,
        }
    }

    async fn handle_photo(&self, user: &UserRef, file_ref: String) -> Result<()> {
        let Some(session) = self.store.get(user.id) else {
            // Stray photo with no session: drop it.
            return Ok(());
        };

        if session.state != InterviewState::AwaitingPhotoOrFinish {
            // A photo is just invalid input for the current step.
            return self.reprompt(user, session.state).await;
        }

        if session.photos.len() >= MAX_PHOTOS {
            return self
                .outbound
                .send(Reply::with_choices(user.id, texts::PHOTO_CAP, ChoiceSet::Finish))
                .await;
        }

        let count = session.photos.len() + 1;
        self.store.update(user.id, |s| s.photos.push(file_ref));
        self.outbound
            .send(Reply::with_choices(user.id, texts::photo_added(count), ChoiceSet::Finish))
            .await
    }

    async fn on_hook_text(&self, user: &UserRef, text: &str) -> Result<()> {
        let trimmed = text.trim();
        if is_no_hook(trimmed) {
            self.store.update(user.id, |s| {
                s.news_hook = None;
                s.state = InterviewState::AwaitingTopicChoice;
            });
            return self
                .outbound
                .send(Reply::with_choices(user.id, texts::ASK_TOPIC, ChoiceSet::Topics))
                .await;
        }

        if let Some((link, hook)) = extract_link(trimmed) {
            self.store.update(user.id, |s| {
                s.news_hook = Some(hook);
                s.link = Some(link);
                s.state = InterviewState::AwaitingReleaseType;
            });
            return self
                .outbound
                .send(Reply::with_choices(user.id, texts::ASK_RELEASE_TYPE, ChoiceSet::ReleaseType))
                .await;
        }

        // A plain hook already identifies the subject; the topic step is skipped.
        let hook = trimmed.to_string();
        self.store.update(user.id, |s| {
            s.news_hook = Some(hook);
            s.link = None;
            s.release_type = None;
            s.state = InterviewState::AwaitingPhotoOrFinish;
        });
        self.ask_photos(user).await
    }

    async fn on_release_type_text(&self, user: &UserRef, text: &str) -> Result<()> {
        let trimmed = text.trim();
        let choice = if trimmed.eq_ignore_ascii_case(labels::PREMIERE) {
            Some(session::ReleaseType::Premiere)
        } else if trimmed.eq_ignore_ascii_case(labels::ALREADY_RELEASED) {
            Some(session::ReleaseType::AlreadyReleased)
        } else {
            None
        };

        let Some(release_type) = choice else {
            return self.reprompt(user, InterviewState::AwaitingReleaseType).await;
        };

        self.store.update(user.id, |s| {
            s.release_type = Some(release_type);
            s.state = InterviewState::AwaitingPhotoOrFinish;
        });
        self.ask_photos(user).await
    }

    async fn on_topic_choice_text(&self, user: &UserRef, text: &str) -> Result<()> {
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case(labels::CUSTOM_TOPIC) {
            self.store.update(user.id, |s| s.state = InterviewState::AwaitingTopicCustom);
            return self.outbound.send(Reply::plain(user.id, texts::ASK_CUSTOM_TOPIC)).await;
        }

        let Some(topic) = labels::TOPICS.iter().find(|t| trimmed.eq_ignore_ascii_case(t)) else {
            return self.reprompt(user, InterviewState::AwaitingTopicChoice).await;
        };

        let topic = topic.to_string();
        self.store.update(user.id, |s| {
            s.topic = Some(topic);
            s.state = InterviewState::AwaitingPhotoOrFinish;
        });
        self.ask_photos(user).await
    }

    async fn on_topic_custom_text(&self, user: &UserRef, text: &str) -> Result<()> {
        // Verbatim beyond edge trimming, no validation.
        let topic = text.trim().to_string();
        self.store.update(user.id, |s| {
            s.topic = Some(topic);
            s.state = InterviewState::AwaitingPhotoOrFinish;
        });
        self.ask_photos(user).await
    }

    async fn on_collect_text(&self, user: &UserRef, text: &str) -> Result<()> {
        if text.trim().eq_ignore_ascii_case(labels::FINISH) {
            return self.finish(user).await;
        }
        self.reprompt(user, InterviewState::AwaitingPhotoOrFinish).await
    }

    /// The finish transition: snapshot, generate, reply, best-effort log,
    /// discard. Generation failure never aborts the sequence.
    async fn finish(&self, user: &UserRef) -> Result<()> {
        let Some(session) = self.store.get(user.id) else {
            return Ok(());
        };
        let request = GenerationRequest::from_session(&session);

        let raw_output = match self.generator.generate(&request).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(user_id = user.id, error = %err, "generation failed");
                texts::generation_failure(&err)
            }
        };

        // Once finish has started it runs to completion: a delivery failure
        // must not skip the log write or leave the session behind.
        if let Err(e) = self.outbound.send(Reply::plain(user.id, raw_output.clone())).await {
            tracing::warn!(user_id = user.id, error = %e, "failed to deliver generation result");
        }

        self.log_sink
            .record(LogRecord {
                timestamp: Utc::now(),
                user_id: user.id,
                user_handle: user.handle.clone(),
                request,
                model: self.generator.model_id().to_string(),
                raw_output,
            })
            .await;

        self.store.discard(user.id);
        Ok(())
    }

    async fn ask_photos(&self, user: &UserRef) -> Result<()> {
        self.outbound
            .send(Reply::with_choices(user.id, texts::ASK_PHOTOS, ChoiceSet::Finish))
            .await
    }

    /// Re-issues the current step's prompt without advancing.
    async fn reprompt(&self, user: &UserRef, state: InterviewState) -> Result<()> {
        let reply = match state {
            InterviewState::AwaitingHook => {
                Reply::with_choices(user.id, texts::GREETING, ChoiceSet::HookSkip)
            }
            InterviewState::AwaitingReleaseType => {
                Reply::with_choices(user.id, texts::ASK_RELEASE_TYPE, ChoiceSet::ReleaseType)
            }
            InterviewState::AwaitingTopicChoice => {
                Reply::with_choices(user.id, texts::ASK_TOPIC, ChoiceSet::Topics)
            }
            InterviewState::AwaitingTopicCustom => Reply::plain(user.id, texts::ASK_CUSTOM_TOPIC),
            InterviewState::AwaitingPhotoOrFinish => {
                Reply::with_choices(user.id, texts::ASK_PHOTOS, ChoiceSet::Finish)
            }
        };
        self.outbound.send(reply).await
    }
}

/// The "no hook" signal: the button label, the bare token "no" in any case,
/// or empty input.
fn is_no_hook(trimmed: &str) -> bool {
    trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("no")
        || trimmed.eq_ignore_ascii_case(labels::NO_HOOK)
}

/// Scans whitespace-delimited tokens for the first well-formed http(s) link.
/// Returns the link and the hook text with that token removed; a hook that
/// ends up empty falls back to a fixed label. At most one link is recorded.
fn extract_link(text: &str) -> Option<(String, String)> {
    let mut link: Option<String> = None;
    let mut rest: Vec<&str> = Vec::new();

    for token in text.split_whitespace() {
        if link.is_none() && is_link_token(token) {
            link = Some(token.to_string());
        } else {
            rest.push(token);
        }
    }

    let link = link?;
    let hook = if rest.is_empty() { "promotion via link".to_string() } else { rest.join(" ") };
    Some((link, hook))
}

fn is_link_token(token: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| token.strip_prefix(scheme).is_some_and(|rest| !rest.is_empty()))
}

// In-crate mocks for tests and demos.
pub mod mocks {
    use super::*;
    use async_trait::async_trait;
    use crate::ports::GenerationError;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    /// Generator returning a canned outcome.
    pub struct MockGenerator {
        outcome: Mutex<Result<String, GenerationError>>,
    }

    impl MockGenerator {
        pub fn ok<S: Into<String>>(text: S) -> Self {
            Self { outcome: Mutex::new(Ok(text.into())) }
        }

        pub fn failing(err: GenerationError) -> Self {
            Self { outcome: Mutex::new(Err(err)) }
        }
    }

    #[async_trait]
    impl GeneratorPort for MockGenerator {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
            self.outcome.lock().unwrap().clone()
        }

        fn model_id(&self) -> &str {
            "mock-model"
        }
    }

    /// Log sink that keeps every record for later inspection.
    #[derive(Clone, Default)]
    pub struct RecordingSink(pub Arc<Mutex<Vec<LogRecord>>>);

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn records(&self) -> Vec<LogRecord> {
            self.0.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LogSinkPort for RecordingSink {
        async fn record(&self, record: LogRecord) {
            self.0.lock().unwrap().push(record);
        }
    }

    /// Log sink that drops everything, standing in for a broken sink.
    pub struct NullSink;

    #[async_trait]
    impl LogSinkPort for NullSink {
        async fn record(&self, _record: LogRecord) {}
    }

    #[derive(Clone)]
    pub struct ChannelOutbound(pub mpsc::Sender<Reply>);

    #[async_trait]
    impl OutboundPort for ChannelOutbound {
        async fn send(&self, reply: Reply) -> Result<()> {
            self.0.send(reply).await.map_err(|e| anyhow::anyhow!(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_extraction_takes_first_token_only() {
        let (link, hook) =
            extract_link("see https://a.example/x and https://b.example/y too").unwrap();
        assert_eq!(link, "https://a.example/x");
        assert_eq!(hook, "see and https://b.example/y too");
    }

    #[test]
    fn link_only_input_falls_back() {
        let (link, hook) = extract_link("https://example.com").unwrap();
        assert_eq!(link, "https://example.com");
        assert_eq!(hook, "promotion via link");
    }

    #[test]
    fn bare_scheme_is_not_a_link() {
        assert!(extract_link("https:// is how links start").is_none());
        assert!(extract_link("no links here").is_none());
    }

    #[test]
    fn no_hook_signals() {
        assert!(is_no_hook(""));
        assert!(is_no_hook("No"));
        assert!(is_no_hook("NO"));
        assert!(is_no_hook(labels::NO_HOOK));
        assert!(!is_no_hook("nope"));
    }

    #[test]
    fn allow_list_empty_means_open() {
        assert!(AllowList::open().permits(123));
        let gated = AllowList::from_ids([1, 2]);
        assert!(gated.permits(2));
        assert!(!gated.permits(3));
    }
}
