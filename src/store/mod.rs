pub mod users;
pub mod words;

use anyhow::{Context, Result};
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::watch::pattern::PatternCache;

/// Thread-safe SQLite store holding watch words and the user directory
#[derive(Clone)]
pub struct WatchStore {
    conn: Arc<Mutex<Connection>>,
    patterns: Arc<PatternCache>,
}

impl WatchStore {
    /// Open or create the SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // journal_mode PRAGMA always returns the resulting mode, so use query_row
        let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;

        let patterns = Arc::new(PatternCache::new());
        Self::init_connection(&conn, Arc::clone(&patterns))?;

        info!("Watch store initialized at: {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            patterns,
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let patterns = Arc::new(PatternCache::new());
        Self::init_connection(&conn, Arc::clone(&patterns))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            patterns,
        })
    }

    /// Number of distinct words compiled by `word_matches` so far
    pub fn compiled_patterns(&self) -> usize {
        self.patterns.len()
    }

    fn init_connection(conn: &Connection, patterns: Arc<PatternCache>) -> Result<()> {
        // Lets queries use the same word predicate as the in-process matcher.
        // The word varies per row, so compiled patterns live in the shared
        // cache rather than in SQLite aux data.
        conn.create_scalar_function(
            "word_matches",
            2,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            move |ctx| {
                let word: String = ctx.get(0)?;
                let content: String = ctx.get(1)?;
                Ok(patterns.is_match(&word, &content))
            },
        )
        .context("Failed to register word_matches function")?;

        Self::run_migrations(conn)
    }

    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            -- User directory
            CREATE TABLE IF NOT EXISTS users (
                internal_id TEXT PRIMARY KEY,
                external_id TEXT NOT NULL UNIQUE,
                is_bot INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- Watch words; owners are referenced by external id and may be
            -- missing from the directory
            CREATE TABLE IF NOT EXISTS words (
                id TEXT PRIMARY KEY,
                word TEXT NOT NULL,
                owner_external_id TEXT NOT NULL,
                notify_self INTEGER NOT NULL DEFAULT 0,
                notify_from_bot INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_words_owner
                ON words(owner_external_id);
            ",
        )
        .context("Failed to run migrations")?;

        Ok(())
    }
}
