use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::config::{ScanConfig, ScanPipeline};
use crate::platform::MessageInbox;
use crate::watch::pipeline::{
    scan_in_process, scan_with_store_query, NotificationEmitter, UserDirectorySource, WordCatalog,
};

/// Periodic job: drain the inbox, match, and hand notifications to the emitter
pub struct ScanService {
    catalog: Arc<dyn WordCatalog>,
    directory: Arc<dyn UserDirectorySource>,
    inbox: MessageInbox,
    emitter: Arc<dyn NotificationEmitter>,
    config: ScanConfig,
    // Keeps overlapping ticks from scanning concurrently
    running: Mutex<()>,
}

impl ScanService {
    pub fn new(
        catalog: Arc<dyn WordCatalog>,
        directory: Arc<dyn UserDirectorySource>,
        inbox: MessageInbox,
        emitter: Arc<dyn NotificationEmitter>,
        config: ScanConfig,
    ) -> Self {
        Self {
            catalog,
            directory,
            inbox,
            emitter,
            config,
            running: Mutex::new(()),
        }
    }

    /// Scan one batch. Returns the number of notifications emitted.
    ///
    /// When the catalog or user directory cannot be loaded the batch goes
    /// back to the inbox for the next tick.
    pub async fn run_once(&self) -> Result<usize> {
        let Ok(_guard) = self.running.try_lock() else {
            debug!("Previous scan still running, skipping tick");
            return Ok(0);
        };

        let batch = self.inbox.drain(self.config.max_batch_size).await;
        if batch.is_empty() {
            return Ok(0);
        }

        let notifications = match self.config.pipeline {
            ScanPipeline::InProcess => {
                match scan_in_process(
                    self.catalog.as_ref(),
                    self.directory.as_ref(),
                    &batch,
                    self.config.mode,
                )
                .await
                {
                    Ok(notifications) => notifications,
                    Err(e) => {
                        let size = batch.len();
                        self.inbox.requeue(batch).await;
                        error!("Scan aborted, requeued {} message(s): {}", size, e);
                        return Err(e.into());
                    }
                }
            }
            ScanPipeline::StoreQuery => scan_with_store_query(self.catalog.as_ref(), &batch).await,
        };

        info!(
            "Scanned {} message(s) via {}: {} notification(s)",
            batch.len(),
            self.config.pipeline,
            notifications.len()
        );

        if !notifications.is_empty() {
            self.emitter.emit(&notifications).await?;
        }

        Ok(notifications.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::WatchStore;
    use crate::watch::tests::{message, user, word};
    use crate::watch::{Notification, NotifyMode};
    use async_trait::async_trait;

    #[derive(Default)]
    struct RecordingEmitter {
        sent: Mutex<Vec<Notification>>,
    }

    #[async_trait]
    impl NotificationEmitter for RecordingEmitter {
        async fn emit(&self, notifications: &[Notification]) -> Result<()> {
            self.sent.lock().await.extend_from_slice(notifications);
            Ok(())
        }
    }

    struct BrokenDirectory;

    #[async_trait]
    impl UserDirectorySource for BrokenDirectory {
        async fn load_users(&self) -> Result<Vec<crate::watch::User>> {
            anyhow::bail!("database is locked")
        }
    }

    fn config(pipeline: ScanPipeline, mode: NotifyMode) -> ScanConfig {
        ScanConfig {
            schedule: "*/30 * * * * *".to_string(),
            pipeline,
            mode,
            max_batch_size: 10,
            max_pending_messages: 100,
            dry_run: false,
        }
    }

    async fn seeded_store() -> WatchStore {
        let store = WatchStore::open_in_memory().unwrap();
        store.upsert_user(&user("alice", "1001", false)).await.unwrap();
        store.upsert_user(&user("bob", "1002", false)).await.unwrap();
        store.add_word(&word("cat", "alice", false, true)).await.unwrap();
        store.add_word(&word("dog", "alice", false, true)).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_run_once_emits_for_each_pipeline() {
        for pipeline in [ScanPipeline::InProcess, ScanPipeline::StoreQuery] {
            let store = Arc::new(seeded_store().await);
            let inbox = MessageInbox::new(100);
            let emitter = Arc::new(RecordingEmitter::default());
            let service = ScanService::new(
                store.clone(),
                store.clone(),
                inbox.clone(),
                emitter.clone(),
                config(pipeline, NotifyMode::PerTarget),
            );

            inbox.push(message("-1:1", "1002", "a cat and a dog")).await;
            inbox.push(message("-1:2", "1001", "my cat")).await;

            assert_eq!(service.run_once().await.unwrap(), 1);
            let sent = emitter.sent.lock().await;
            assert_eq!(sent[0].words, vec!["cat", "dog"]);
            assert_eq!(sent[0].target_internal_id, "1001");
            assert_eq!(inbox.len().await, 0);
        }
    }

    #[tokio::test]
    async fn test_empty_inbox_is_a_no_op() {
        let store = Arc::new(seeded_store().await);
        let emitter = Arc::new(RecordingEmitter::default());
        let service = ScanService::new(
            store.clone(),
            store,
            MessageInbox::new(100),
            emitter.clone(),
            config(ScanPipeline::InProcess, NotifyMode::PerTarget),
        );

        assert_eq!(service.run_once().await.unwrap(), 0);
        assert!(emitter.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_failure_requeues_batch() {
        let store = Arc::new(seeded_store().await);
        let inbox = MessageInbox::new(100);
        let emitter = Arc::new(RecordingEmitter::default());
        let service = ScanService::new(
            store,
            Arc::new(BrokenDirectory),
            inbox.clone(),
            emitter.clone(),
            config(ScanPipeline::InProcess, NotifyMode::PerTarget),
        );

        inbox.push(message("-1:1", "1002", "cat")).await;

        assert!(service.run_once().await.is_err());
        assert_eq!(inbox.len().await, 1);
        assert!(emitter.sent.lock().await.is_empty());
    }
}
