use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::Bot;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wordwatch::config::Config;
use wordwatch::platform::telegram::{self, TelegramEmitter};
use wordwatch::platform::{LogEmitter, MessageInbox};
use wordwatch::scheduler::scan::ScanService;
use wordwatch::scheduler::Scheduler;
use wordwatch::store::WatchStore;
use wordwatch::watch::pipeline::NotificationEmitter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wordwatch=debug".into()),
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

    info!("Configuration loaded successfully");
    info!("  Database: {}", config.store.database_path.display());
    info!("  Watched chats: {:?}", config.telegram.watched_chat_ids);
    info!("  Schedule: {}", config.scan.schedule);
    info!("  Pipeline: {} ({})", config.scan.pipeline, config.scan.mode);
    info!("  Dry run: {}", config.scan.dry_run);

    let store = WatchStore::open(&config.store.database_path)?;
    let bot = Arc::new(Bot::new(&config.telegram.bot_token));
    let inbox = MessageInbox::new(config.scan.max_pending_messages);

    let emitter: Arc<dyn NotificationEmitter> = if config.scan.dry_run {
        Arc::new(LogEmitter)
    } else {
        Arc::new(TelegramEmitter::new(Arc::clone(&bot)))
    };

    let shared_store = Arc::new(store.clone());
    let service = Arc::new(ScanService::new(
        shared_store.clone(),
        shared_store,
        inbox.clone(),
        emitter,
        config.scan.clone(),
    ));

    let mut scheduler = Scheduler::new().await?;
    scheduler.schedule_scan(&config.scan.schedule, service).await?;
    scheduler.start().await?;

    info!("Bot is starting...");
    telegram::run(store, inbox, config.telegram.watched_chat_ids.clone(), bot).await?;

    scheduler.shutdown().await?;
    Ok(())
}
