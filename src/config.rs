use std::time::Duration;

use clap::Parser;

use crate::service::GameSettings;
use crate::types::UserId;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Config {
    /// Bot API token.
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    pub bot_token: String,
    /// User allowed to run `/broadcast`; 0 disables it.
    #[arg(long, env = "OWNER_ID", default_value_t = 0)]
    pub owner_id: i64,
    #[arg(long, env = "PORT", default_value_t = 10000)]
    pub port: u16,
    #[arg(long, env = "DATABASE_PATH", default_value = ".data/spy-civilians.sqlite3")]
    pub database_path: String,
    #[arg(long, env = "COMMAND_COOLDOWN_MS", default_value_t = 1500)]
    pub command_cooldown_ms: u64,
    #[arg(long, env = "BUTTON_COOLDOWN_MS", default_value_t = 750)]
    pub button_cooldown_ms: u64,
    #[arg(long, env = "VOTING_WINDOW_SECS", default_value_t = 120)]
    pub voting_window_secs: u64,
    #[arg(long, env = "BROADCAST_DELAY_MS", default_value_t = 100)]
    pub broadcast_delay_ms: u64,
}

impl Config {
    pub fn game_settings(&self) -> GameSettings {
        GameSettings {
            command_cooldown: Duration::from_millis(self.command_cooldown_ms),
            button_cooldown: Duration::from_millis(self.button_cooldown_ms),
            voting_window: Duration::from_secs(self.voting_window_secs),
            broadcast_delay: Duration::from_millis(self.broadcast_delay_ms),
            owner: (self.owner_id != 0).then_some(UserId(self.owner_id)),
        }
    }
}
