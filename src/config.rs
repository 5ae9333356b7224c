use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::watch::NotifyMode;

/// Where word matching runs
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScanPipeline {
    /// Load every word and user, match in memory
    InProcess,
    /// One store query per message
    #[default]
    StoreQuery,
}

impl std::fmt::Display for ScanPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanPipeline::InProcess => write!(f, "in_process"),
            ScanPipeline::StoreQuery => write!(f, "store_query"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default = "default_store_config")]
    pub store: StoreConfig,
    #[serde(default = "default_scan_config")]
    pub scan: ScanConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Group chats to watch; empty watches every group the bot is in
    #[serde(default)]
    pub watched_chat_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScanConfig {
    /// Cron expression (with seconds) for the scan job
    #[serde(default = "default_schedule")]
    pub schedule: String,
    #[serde(default)]
    pub pipeline: ScanPipeline,
    #[serde(default)]
    pub mode: NotifyMode,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Inbox bound; the oldest messages are dropped past it
    #[serde(default = "default_max_pending_messages")]
    pub max_pending_messages: usize,
    /// Log notifications instead of sending them
    #[serde(default)]
    pub dry_run: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("wordwatch.db")
}

fn default_schedule() -> String {
    "*/30 * * * * *".to_string()
}

fn default_max_batch_size() -> usize {
    500
}

fn default_max_pending_messages() -> usize {
    10_000
}

fn default_store_config() -> StoreConfig {
    StoreConfig {
        database_path: default_db_path(),
    }
}

fn default_scan_config() -> ScanConfig {
    ScanConfig {
        schedule: default_schedule(),
        pipeline: ScanPipeline::default(),
        mode: NotifyMode::default(),
        max_batch_size: default_max_batch_size(),
        max_pending_messages: default_max_pending_messages(),
        dry_run: false,
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.scan.pipeline == ScanPipeline::StoreQuery && self.scan.mode == NotifyMode::PerMatch {
            anyhow::bail!("scan.mode = \"per_match\" requires scan.pipeline = \"in_process\"");
        }
        if self.scan.max_batch_size == 0 {
            anyhow::bail!("scan.max_batch_size must be at least 1");
        }
        if self.scan.max_pending_messages == 0 {
            anyhow::bail!("scan.max_pending_messages must be at least 1");
        }
        Ok(())
    }
}
