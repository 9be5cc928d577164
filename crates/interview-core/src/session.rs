use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Hard cap on attached photos; the fourth and later are rejected.
pub const MAX_PHOTOS: usize = 3;

/// The single discriminant deciding which transition runs on the next event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterviewState {
    AwaitingHook,
    AwaitingReleaseType,
    AwaitingTopicChoice,
    AwaitingTopicCustom,
    AwaitingPhotoOrFinish,
}

impl fmt::Display for InterviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InterviewState::AwaitingHook => "awaiting-hook",
            InterviewState::AwaitingReleaseType => "awaiting-release-type",
            InterviewState::AwaitingTopicChoice => "awaiting-topic-choice",
            InterviewState::AwaitingTopicCustom => "awaiting-topic-custom",
            InterviewState::AwaitingPhotoOrFinish => "awaiting-photo-or-finish",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseType {
    Premiere,
    AlreadyReleased,
}

/// Per-user working state of one interview. Fields fill in monotonically as
/// the user advances; the whole record is dropped at finish or replaced on
/// reset. `release_type` is only ever set when `link` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub state: InterviewState,
    pub news_hook: Option<String>,
    pub link: Option<String>,
    pub release_type: Option<ReleaseType>,
    pub topic: Option<String>,
    /// Opaque photo references, insertion order preserved.
    pub photos: Vec<String>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: InterviewState::AwaitingHook,
            news_hook: None,
            link: None,
            release_type: None,
            topic: None,
            photos: Vec::new(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory map of active sessions, one per user id. Holds no cross-user
/// state and performs no I/O; per-user event serialization is the
/// dispatcher's job, the store only guards the map itself.
pub struct SessionStore {
    sessions: Mutex<HashMap<i64, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self { sessions: Mutex::new(HashMap::new()) }
    }

    pub fn get(&self, user_id: i64) -> Option<Session> {
        self.sessions.lock().unwrap().get(&user_id).cloned()
    }

    /// Creates a fresh session at awaiting-hook, replacing any prior one.
    pub fn reset(&self, user_id: i64) -> Session {
        let session = Session::new();
        self.sessions.lock().unwrap().insert(user_id, session.clone());
        session
    }

    /// Applies `mutation` to the user's session, if one exists.
    pub fn update<F>(&self, user_id: i64, mutation: F)
    where
        F: FnOnce(&mut Session),
    {
        if let Some(session) = self.sessions.lock().unwrap().get_mut(&user_id) {
            mutation(session);
        }
    }

    pub fn discard(&self, user_id: i64) {
        self.sessions.lock().unwrap().remove(&user_id);
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().unwrap().is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_replaces_existing_session() {
        let store = SessionStore::new();
        store.reset(1);
        store.update(1, |s| {
            s.news_hook = Some("old hook".into());
            s.state = InterviewState::AwaitingPhotoOrFinish;
            s.photos.push("p1".into());
        });

        let fresh = store.reset(1);
        assert_eq!(fresh.state, InterviewState::AwaitingHook);
        assert_eq!(fresh.news_hook, None);
        assert!(fresh.photos.is_empty());
        assert_eq!(store.get(1), Some(fresh));
    }

    #[test]
    fn update_is_a_noop_without_session() {
        let store = SessionStore::new();
        store.update(7, |s| s.topic = Some("x".into()));
        assert_eq!(store.get(7), None);
    }

    #[test]
    fn discard_removes_only_that_user() {
        let store = SessionStore::new();
        store.reset(1);
        store.reset(2);
        store.discard(1);
        assert_eq!(store.get(1), None);
        assert!(store.get(2).is_some());
    }
}
