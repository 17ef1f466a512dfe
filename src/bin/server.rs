use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use spy_civilians_bot::config::Config;
use spy_civilians_bot::health::{self, HealthState};
use spy_civilians_bot::persistence::SqliteStore;
use spy_civilians_bot::service::GameService;
use spy_civilians_bot::telegram::{self, TelegramTransport};
use teloxide::Bot;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::parse();

    let store = Arc::new(
        SqliteStore::open(&config.database_path)
            .with_context(|| format!("failed to open database at {}", config.database_path))?,
    );

    let bot = Bot::new(config.bot_token.clone());
    let service = GameService::new(
        Arc::new(TelegramTransport::new(bot.clone())),
        store.clone(),
        store,
        config.game_settings(),
    );

    let health_state = HealthState::new(service.sessions());
    let port = config.port;
    let health = tokio::spawn(async move {
        if let Err(err) = health::serve(port, health_state).await {
            error!(port, error = %err, "health endpoint stopped");
        }
    });

    info!(port, owner_id = config.owner_id, "bot starting");
    telegram::run_dispatcher(bot, service).await;

    health.abort();
    info!("bot stopped");
    Ok(())
}
