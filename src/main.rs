mod composer;
mod config;
mod llm;
mod mentions;
mod platform;
mod prompt;
mod registry;
mod router;
mod scheduler;
#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::composer::Composer;
use crate::config::Config;
use crate::llm::LlmClient;
use crate::mentions::MentionSelector;
use crate::platform::telegram::{self, TelegramSender};
use crate::platform::ChatSender;
use crate::prompt::{LlmPromptProvider, PromptProvider};
use crate::registry::MemberRegistry;
use crate::router::Router;
use crate::scheduler::tasks::{register_broadcast_jobs, BroadcastJob};
use crate::scheduler::{DailySchedule, Scheduler};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,stressbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Credentials may live in a .env file next to the binary
    let _ = dotenvy::dotenv();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)?;

    info!("Configuration loaded successfully");
    info!("  Provider: {} ({})", config.llm.provider, config.llm.model);
    info!("  Members file: {}", config.registry.path.display());
    info!("  Broadcast chats: {:?}", config.telegram.broadcast_chat_ids);

    let registry = Arc::new(MemberRegistry::load(&config.registry.path));
    info!("Known members: {}", registry.len().await);

    let llm = LlmClient::new(config.llm.clone()).context("Failed to build LLM client")?;
    let provider: Arc<dyn PromptProvider> = Arc::new(LlmPromptProvider::new(llm));
    let composer = Arc::new(Composer::new(
        provider,
        MentionSelector::new(registry.clone()),
        config.messages.clone(),
    ));

    let bot = telegram::build_bot(
        &config.telegram.bot_token,
        Duration::from_secs(config.telegram.send_timeout_secs),
    )?;
    let identity = telegram::fetch_identity(&bot).await?;
    let sender: Arc<dyn ChatSender> = Arc::new(TelegramSender::new(bot.clone()));

    // Daily question
    let mut scheduler = Scheduler::new().await?;
    let schedule = DailySchedule::new(config.schedule.times.iter().copied());
    let job = Arc::new(BroadcastJob::new(
        composer.clone(),
        sender.clone(),
        config.telegram.broadcast_chat_ids.clone(),
    ));
    register_broadcast_jobs(&scheduler, &schedule, job).await?;
    scheduler.start().await?;

    let router = Arc::new(Router::new(
        identity,
        registry,
        composer,
        sender,
        config.messages,
    ));

    info!("Bot is running...");
    telegram::run(router, bot).await?;

    scheduler.shutdown().await?;
    Ok(())
}
