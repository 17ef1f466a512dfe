#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use spy_civilians_bot::error::TransportError;
use spy_civilians_bot::game::Session;
use spy_civilians_bot::persistence::SqliteStore;
use spy_civilians_bot::service::{GameService, GameSettings};
use spy_civilians_bot::transport::ChatTransport;
use spy_civilians_bot::types::{Button, ChatId, InboundEvent, Profile, Role, TapRef, UserId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sent {
    Text {
        chat: ChatId,
        html: String,
    },
    Buttons {
        chat: ChatId,
        html: String,
        buttons: Vec<Button>,
    },
    Private {
        user: UserId,
        html: String,
    },
    Answer {
        callback_id: String,
        text: Option<String>,
        alert: bool,
    },
    Edit {
        chat: ChatId,
        html: String,
    },
}

/// Records every outbound call. Private sends to users marked unreachable fail the
/// way a blocked bot does.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    unreachable: Mutex<HashSet<UserId>>,
    admins: Mutex<HashSet<(ChatId, UserId)>>,
}

impl RecordingTransport {
    pub fn mark_unreachable(&self, user: UserId) {
        self.unreachable.lock().unwrap().insert(user);
    }

    pub fn make_admin(&self, chat: ChatId, user: UserId) {
        self.admins.lock().unwrap().insert((chat, user));
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    /// Group messages (plain and with buttons) in send order.
    pub fn texts(&self, chat: ChatId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Text { chat: to, html } | Sent::Buttons { chat: to, html, .. }
                    if to == chat =>
                {
                    Some(html)
                }
                _ => None,
            })
            .collect()
    }

    pub fn last_text(&self, chat: ChatId) -> Option<String> {
        self.texts(chat).pop()
    }

    pub fn texts_containing(&self, chat: ChatId, needle: &str) -> usize {
        self.texts(chat)
            .iter()
            .filter(|text| text.contains(needle))
            .count()
    }

    pub fn last_buttons(&self, chat: ChatId) -> Vec<Button> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Buttons {
                    chat: to, buttons, ..
                } if to == chat => Some(buttons),
                _ => None,
            })
            .last()
            .unwrap_or_default()
    }

    pub fn privates(&self, user: UserId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Private { user: to, html } if to == user => Some(html),
                _ => None,
            })
            .collect()
    }

    pub fn last_answer(&self) -> Option<(Option<String>, bool)> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Answer { text, alert, .. } => Some((text, alert)),
                _ => None,
            })
            .last()
    }

    fn record(&self, sent: Sent) {
        self.sent.lock().unwrap().push(sent);
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(&self, chat: ChatId, html: &str) -> Result<(), TransportError> {
        self.record(Sent::Text {
            chat,
            html: html.to_string(),
        });
        Ok(())
    }

    async fn send_buttons(
        &self,
        chat: ChatId,
        html: &str,
        buttons: &[Button],
    ) -> Result<(), TransportError> {
        self.record(Sent::Buttons {
            chat,
            html: html.to_string(),
            buttons: buttons.to_vec(),
        });
        Ok(())
    }

    async fn send_private(&self, user: UserId, html: &str) -> Result<(), TransportError> {
        if self.unreachable.lock().unwrap().contains(&user) {
            return Err(TransportError::PrivateChatUnavailable(format!(
                "bot was blocked by user {user}"
            )));
        }
        self.record(Sent::Private {
            user,
            html: html.to_string(),
        });
        Ok(())
    }

    async fn answer_tap(
        &self,
        tap: &TapRef,
        text: Option<&str>,
        alert: bool,
    ) -> Result<(), TransportError> {
        self.record(Sent::Answer {
            callback_id: tap.callback_id.clone(),
            text: text.map(str::to_string),
            alert,
        });
        Ok(())
    }

    async fn edit_tapped(&self, tap: &TapRef, html: &str) -> Result<(), TransportError> {
        self.record(Sent::Edit {
            chat: tap.chat,
            html: html.to_string(),
        });
        Ok(())
    }

    async fn is_admin(&self, chat: ChatId, user: UserId) -> Result<bool, TransportError> {
        Ok(self.admins.lock().unwrap().contains(&(chat, user)))
    }
}

pub fn player(id: i64, name: &str) -> Profile {
    Profile::new(UserId(id), name)
}

pub fn quiet_settings() -> GameSettings {
    GameSettings {
        command_cooldown: Duration::ZERO,
        button_cooldown: Duration::ZERO,
        broadcast_delay: Duration::ZERO,
        ..GameSettings::default()
    }
}

pub struct Harness {
    pub service: GameService,
    pub transport: Arc<RecordingTransport>,
    pub store: Arc<SqliteStore>,
    taps: AtomicU64,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(quiet_settings())
    }

    pub fn with_settings(settings: GameSettings) -> Self {
        let transport = Arc::new(RecordingTransport::default());
        let store = Arc::new(SqliteStore::open(":memory:").expect("in-memory store"));
        let service = GameService::new(transport.clone(), store.clone(), store.clone(), settings);
        Self {
            service,
            transport,
            store,
            taps: AtomicU64::new(1),
        }
    }

    pub async fn say(&self, chat: ChatId, sender: &Profile, text: &str) {
        self.service
            .handle(InboundEvent::text(chat, sender.clone(), text))
            .await;
    }

    pub async fn tap(&self, chat: ChatId, sender: &Profile, data: &str) {
        let callback_id = format!("cb-{}", self.taps.fetch_add(1, Ordering::Relaxed));
        self.service
            .handle(InboundEvent::tap(chat, sender.clone(), callback_id, data))
            .await;
    }

    pub async fn with_session<T>(&self, chat: ChatId, inspect: impl FnOnce(&Session) -> T) -> T {
        let session = self.service.sessions().session(chat);
        let guard = session.lock().await;
        inspect(&guard)
    }

    /// Opens a lobby hosted by the first player, sets the discussion length and mode,
    /// and joins everyone.
    pub async fn lobby(&self, chat: ChatId, players: &[Profile], minutes: u32, mode: &str) {
        let host = &players[0];
        self.say(chat, host, "/startgame").await;
        self.say(chat, host, &minutes.to_string()).await;
        self.tap(chat, host, &format!("mode:{mode}")).await;
        for profile in players {
            self.say(chat, profile, "/join").await;
        }
    }

    pub async fn begin(&self, chat: ChatId, players: &[Profile], minutes: u32, mode: &str) {
        self.lobby(chat, players, minutes, mode).await;
        self.say(chat, &players[0], "/begin").await;
    }

    /// Players holding `role` in the current round, in join order.
    pub async fn with_role(&self, chat: ChatId, role: Role) -> Vec<UserId> {
        self.with_session(chat, |session| {
            session
                .players()
                .iter()
                .copied()
                .filter(|player| session.role_of(*player) == Some(role))
                .collect()
        })
        .await
    }
}

pub async fn advance(duration: Duration) {
    tokio::time::sleep(duration).await;
}
