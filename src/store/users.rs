use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use super::WatchStore;
use crate::watch::pipeline::UserDirectorySource;
use crate::watch::User;

impl WatchStore {
    /// Insert a user or refresh its external id and bot flag.
    ///
    /// External ids are unique, so when another account still holds
    /// `user.external_id` (a username handed over to a new account) that
    /// account falls back to its internal id in the same transaction.
    pub async fn upsert_user(&self, user: &User) -> Result<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let released = tx
            .execute(
                "UPDATE users SET external_id = internal_id, updated_at = datetime('now')
                 WHERE external_id = ?2 AND internal_id != ?1",
                rusqlite::params![&user.internal_id, &user.external_id],
            )
            .with_context(|| format!("Failed to release external id {}", user.external_id))?;
        if released > 0 {
            info!(
                "External id {} moved to user {}",
                user.external_id, user.internal_id
            );
        }

        tx.execute(
            "INSERT INTO users (internal_id, external_id, is_bot)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(internal_id) DO UPDATE SET
                external_id = excluded.external_id,
                is_bot = excluded.is_bot,
                updated_at = datetime('now')",
            rusqlite::params![&user.internal_id, &user.external_id, user.is_bot],
        )
        .with_context(|| format!("Failed to upsert user {}", user.internal_id))?;

        tx.commit()?;
        Ok(())
    }

    /// Load the whole user directory
    pub async fn load_users(&self) -> Result<Vec<User>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT external_id, internal_id, is_bot
             FROM users
             ORDER BY rowid",
        )?;

        let users = stmt
            .query_map([], |row| {
                Ok(User {
                    external_id: row.get(0)?,
                    internal_id: row.get(1)?,
                    is_bot: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to load users")?;

        Ok(users)
    }
}

#[async_trait]
impl UserDirectorySource for WatchStore {
    async fn load_users(&self) -> Result<Vec<User>> {
        WatchStore::load_users(self).await
    }
}
