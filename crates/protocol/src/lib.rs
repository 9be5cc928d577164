use serde::{Deserialize, Serialize};

/// Who an inbound event belongs to. `id` is the transport's stable numeric
/// user id; `handle` is the human-readable name, kept only for the log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
}

impl UserRef {
    pub fn new(id: i64) -> Self {
        Self { id, handle: None }
    }

    pub fn with_handle<S: Into<String>>(id: i64, handle: S) -> Self {
        Self { id, handle: Some(handle.into()) }
    }
}

/// Inbound event, already decoded from the transport's wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// The reset command (`/start`): legal from any state, wipes the session.
    Reset { user: UserRef },
    Text { user: UserRef, text: String },
    /// A photo attachment; `file_ref` is opaque to everything but the transport.
    Photo { user: UserRef, file_ref: String },
}

impl InboundEvent {
    pub fn user(&self) -> &UserRef {
        match self {
            InboundEvent::Reset { user } => user,
            InboundEvent::Text { user, .. } => user,
            InboundEvent::Photo { user, .. } => user,
        }
    }

    pub fn reset(user: UserRef) -> Self {
        InboundEvent::Reset { user }
    }

    pub fn text<S: Into<String>>(user: UserRef, text: S) -> Self {
        InboundEvent::Text { user, text: text.into() }
    }

    pub fn photo<S: Into<String>>(user: UserRef, file_ref: S) -> Self {
        InboundEvent::Photo { user, file_ref: file_ref.into() }
    }
}

/// Which fixed-choice keyboard should accompany a reply. `None` on the reply
/// means free input is expected and any previous keyboard is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceSet {
    /// Single "no news hook" shortcut at the hook step.
    HookSkip,
    /// Premiere / already released.
    ReleaseType,
    /// Four fixed topics plus the custom-topic escape hatch.
    Topics,
    /// The finish button while collecting photos.
    Finish,
}

pub mod labels {
    pub const NO_HOOK: &str = "No news hook";
    pub const PREMIERE: &str = "Premiere";
    pub const ALREADY_RELEASED: &str = "Already released";
    pub const TOPICS: [&str; 4] = ["New track", "Upcoming show", "Studio life", "Personal"];
    pub const CUSTOM_TOPIC: &str = "Custom topic";
    pub const FINISH: &str = "Generate post";
}

impl ChoiceSet {
    /// Button labels in display order, one row per label.
    pub fn rows(&self) -> Vec<&'static str> {
        match self {
            ChoiceSet::HookSkip => vec![labels::NO_HOOK],
            ChoiceSet::ReleaseType => vec![labels::PREMIERE, labels::ALREADY_RELEASED],
            ChoiceSet::Topics => {
                let mut rows: Vec<&'static str> = labels::TOPICS.to_vec();
                rows.push(labels::CUSTOM_TOPIC);
                rows
            }
            ChoiceSet::Finish => vec![labels::FINISH],
        }
    }
}

/// Outbound reply for the transport to deliver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub user_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<ChoiceSet>,
}

impl Reply {
    pub fn plain<S: Into<String>>(user_id: i64, text: S) -> Self {
        Self { user_id, text: text.into(), choices: None }
    }

    pub fn with_choices<S: Into<String>>(user_id: i64, text: S, choices: ChoiceSet) -> Self {
        Self { user_id, text: text.into(), choices: Some(choices) }
    }
}
