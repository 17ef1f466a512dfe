use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::constants::{BUTTON_COOLDOWN, COMMAND_COOLDOWN, COOLDOWN_PRUNE_EVERY};
use crate::types::{ChatId, UserId};

#[derive(Clone, Copy, Debug)]
pub struct CooldownOptions {
    pub cooldown: Duration,
    pub prune_every: u64,
}

impl CooldownOptions {
    pub fn commands() -> Self {
        Self {
            cooldown: COMMAND_COOLDOWN,
            prune_every: COOLDOWN_PRUNE_EVERY,
        }
    }

    pub fn buttons() -> Self {
        Self {
            cooldown: BUTTON_COOLDOWN,
            prune_every: COOLDOWN_PRUNE_EVERY,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScopeKey {
    pub chat: ChatId,
    pub user: UserId,
    pub action: String,
}

impl ScopeKey {
    pub fn new(chat: ChatId, user: UserId, action: impl Into<String>) -> Self {
        Self {
            chat,
            user,
            action: action.into(),
        }
    }
}

/// Debounce table keyed by (chat, user, action). Safe to share across chats.
pub struct CooldownGuard {
    options: CooldownOptions,
    last_allowed: DashMap<ScopeKey, Instant>,
    calls: AtomicU64,
}

impl CooldownGuard {
    pub fn new(options: CooldownOptions) -> Self {
        Self {
            options,
            last_allowed: DashMap::new(),
            calls: AtomicU64::new(0),
        }
    }

    pub fn allow(&self, key: ScopeKey) -> bool {
        self.allow_at(key, Instant::now())
    }

    /// Returns `false` when the previous permitted action for `key` happened less than
    /// one cooldown ago. A permitted call records `now`; a throttled one does not.
    pub fn allow_at(&self, key: ScopeKey, now: Instant) -> bool {
        let calls = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if self.options.prune_every > 0 && calls % self.options.prune_every == 0 {
            self.prune(now);
        }

        let cooldown = self.options.cooldown;
        let mut allowed = true;
        self.last_allowed
            .entry(key)
            .and_modify(|last| {
                if now.saturating_duration_since(*last) < cooldown {
                    allowed = false;
                } else {
                    *last = now;
                }
            })
            .or_insert(now);
        allowed
    }

    /// Drops entries that can no longer throttle anything.
    pub fn prune(&self, now: Instant) {
        let cooldown = self.options.cooldown;
        self.last_allowed
            .retain(|_, last| now.saturating_duration_since(*last) < cooldown);
    }

    pub fn len(&self) -> usize {
        self.last_allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_allowed.is_empty()
    }
}

/// The two independent namespaces: typed commands and inline-button taps.
pub struct Cooldowns {
    pub commands: CooldownGuard,
    pub buttons: CooldownGuard,
}

impl Cooldowns {
    pub fn new(commands: CooldownOptions, buttons: CooldownOptions) -> Self {
        Self {
            commands: CooldownGuard::new(commands),
            buttons: CooldownGuard::new(buttons),
        }
    }
}

impl Default for Cooldowns {
    fn default() -> Self {
        Self::new(CooldownOptions::commands(), CooldownOptions::buttons())
    }
}
