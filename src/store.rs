use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::game::Session;
use crate::types::ChatId;

pub type SharedSession = Arc<Mutex<Session>>;

/// One session per chat, created on first reference and kept for the process
/// lifetime. Resets replace the session value under the same key.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<ChatId, SharedSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self, chat: ChatId) -> SharedSession {
        self.sessions
            .entry(chat)
            .or_insert_with(|| Arc::new(Mutex::new(Session::new())))
            .clone()
    }

    pub fn get(&self, chat: ChatId) -> Option<SharedSession> {
        self.sessions.get(&chat).map(|entry| entry.value().clone())
    }

    /// Resets the chat's session, returning the one it replaced.
    pub async fn reset(&self, chat: ChatId) -> Session {
        let session = self.session(chat);
        let mut guard = session.lock().await;
        guard.reset()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Chats with an open lobby or round. Sessions locked by a handler count as active.
    pub fn active_count(&self) -> usize {
        self.sessions
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .try_lock()
                    .map(|session| session.is_started())
                    .unwrap_or(true)
            })
            .count()
    }
}
