mod access;
mod assistant;
mod config;
mod content;
mod error;
mod llm;
mod platform;
mod rate_limit;
mod router;
mod server;
mod stats;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::Bot;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::assistant::Assistant;
use crate::config::Config;
use crate::content::ContentPipeline;
use crate::llm::LlmClient;
use crate::platform::telegram::{self, TelegramChannel};
use crate::rate_limit::RateLimiter;
use crate::stats::Stats;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,channelbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let operator = config.operator();
    info!("Configuration loaded successfully");
    info!("  Model: {}", config.llm.model);
    info!("  Channel: {}", config.telegram.channel_id);
    info!("  Operator: {}", operator);
    info!("  Rate limit window: {}ms", config.rate_limit.window_ms);
    if operator.is_open() {
        warn!("No ADMIN_ID or ADMIN_USERNAME configured, the bot accepts commands from everyone");
    }

    if let Some(port) = config.server.port {
        tokio::spawn(async move {
            if let Err(e) = server::serve(port).await {
                error!("Liveness endpoint stopped: {:#}", e);
            }
        });
    }

    let bot = Bot::new(&config.telegram.bot_token);
    let stats = Arc::new(Stats::new());

    let pipeline = ContentPipeline::new(
        Arc::new(LlmClient::new(&config.llm)),
        Arc::new(TelegramChannel::new(bot.clone(), config.channel())),
        stats.clone(),
    )
    .configured(&config);

    let limiter = RateLimiter::new(config.rate_limit_window(), config.rate_limit.capacity);

    let assistant = Arc::new(
        Assistant::new(operator, limiter, pipeline, stats)
            .with_labels(config.telegram.channel_id.clone(), config.llm.model.clone()),
    );

    info!("Bot is starting...");
    telegram::run(assistant, bot).await?;

    Ok(())
}
