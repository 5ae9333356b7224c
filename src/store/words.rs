use anyhow::{Context, Result};
use async_trait::async_trait;
use uuid::Uuid;

use super::WatchStore;
use crate::watch::pattern::WordPattern;
use crate::watch::pipeline::{MatchedWords, WordCatalog};
use crate::watch::{Message, WatchWord};

impl WatchStore {
    /// Insert a watch word, returning its id. Words that can never match
    /// (bad regex, embedded newline) are rejected.
    pub async fn add_word(&self, word: &WatchWord) -> Result<String> {
        WordPattern::parse(&word.text)
            .with_context(|| format!("Invalid watch word {:?}", word.text))?;

        let id = Uuid::new_v4().to_string();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO words (id, word, owner_external_id, notify_self, notify_from_bot)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                &id,
                &word.text,
                &word.owner_id,
                word.notify_self,
                word.notify_from_bot,
            ],
        )
        .context("Failed to store watch word")?;
        Ok(id)
    }

    /// Load the whole catalog in insertion order
    pub async fn load_words(&self) -> Result<Vec<WatchWord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT word, owner_external_id, notify_self, notify_from_bot
             FROM words
             ORDER BY rowid",
        )?;

        let words = stmt
            .query_map([], |row| {
                Ok(WatchWord {
                    text: row.get(0)?,
                    owner_id: row.get(1)?,
                    notify_self: row.get(2)?,
                    notify_from_bot: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to load watch words")?;

        Ok(words)
    }

    /// Match one message inside SQLite, applying the self/bot policy and
    /// grouping the surviving words per owner.
    ///
    /// An author missing from the directory counts as a non-bot.
    pub async fn find_matching_words(&self, message: &Message) -> Result<Vec<MatchedWords>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            "SELECT group_concat(w.word, char(10) ORDER BY w.rowid) AS matched_words,
                    u.external_id,
                    u.internal_id
             FROM words w
             JOIN users u ON w.owner_external_id = u.external_id
             WHERE word_matches(w.word, ?1)
               AND (w.notify_self OR u.internal_id != ?2)
               AND (w.notify_from_bot OR
                    coalesce((SELECT is_bot FROM users WHERE internal_id = ?2), 0) = 0)
             GROUP BY u.internal_id, u.external_id
             ORDER BY min(w.rowid)",
        )?;

        let matched = stmt
            .query_map(rusqlite::params![&message.content, &message.author_id], |row| {
                Ok(MatchedWords {
                    matched_words: row.get(0)?,
                    owner_external_id: row.get(1)?,
                    owner_internal_id: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to search words for message {}", message.id))?;

        Ok(matched)
    }
}

#[async_trait]
impl WordCatalog for WatchStore {
    async fn load_words(&self) -> Result<Vec<WatchWord>> {
        WatchStore::load_words(self).await
    }

    async fn find_matching_words(&self, message: &Message) -> Result<Vec<MatchedWords>> {
        WatchStore::find_matching_words(self, message).await
    }
}
