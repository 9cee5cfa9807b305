//! Append-only log of processed candidates.
//!
//! The pipeline only needs three questions answered: has this URL been
//! handled for this campaign, append a record, and how many articles a
//! campaign has produced. [`InMemoryLogStore`] serves tests and embedding
//! callers; [`JsonlLogStore`] keeps one JSON record per line on disk.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::models::{ProcessedRecord, RecordStatus};

pub trait LogStore {
    async fn has_url_been_processed(&self, campaign_id: &str, url: &str) -> Result<bool, StoreError>;

    /// Append a record, returning its 1-based id.
    async fn append_record(&self, record: ProcessedRecord) -> Result<u64, StoreError>;

    /// Articles produced by a campaign; skipped candidates do not count.
    async fn count_for_campaign(&self, campaign_id: &str) -> Result<usize, StoreError>;
}

fn lock(records: &Mutex<Vec<ProcessedRecord>>) -> MutexGuard<'_, Vec<ProcessedRecord>> {
    records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn processed(records: &[ProcessedRecord], campaign_id: &str, url: &str) -> bool {
    records
        .iter()
        .any(|r| r.campaign_id == campaign_id && r.source_url == url)
}

fn produced(records: &[ProcessedRecord], campaign_id: &str) -> usize {
    records
        .iter()
        .filter(|r| r.campaign_id == campaign_id && r.status != RecordStatus::Skipped)
        .count()
}

#[derive(Debug, Default)]
pub struct InMemoryLogStore {
    records: Mutex<Vec<ProcessedRecord>>,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record appended so far.
    pub fn records(&self) -> Vec<ProcessedRecord> {
        lock(&self.records).clone()
    }
}

impl LogStore for InMemoryLogStore {
    async fn has_url_been_processed(&self, campaign_id: &str, url: &str) -> Result<bool, StoreError> {
        Ok(processed(&lock(&self.records), campaign_id, url))
    }

    async fn append_record(&self, record: ProcessedRecord) -> Result<u64, StoreError> {
        let mut records = lock(&self.records);
        records.push(record);
        Ok(records.len() as u64)
    }

    async fn count_for_campaign(&self, campaign_id: &str) -> Result<usize, StoreError> {
        Ok(produced(&lock(&self.records), campaign_id))
    }
}

/// JSON-lines file store. The whole log is loaded at open and appended to in place.
///
/// Records are held behind an async mutex so the lock stays held across the
/// file append; ids follow line order in the file.
#[derive(Debug)]
pub struct JsonlLogStore {
    path: PathBuf,
    records: tokio::sync::Mutex<Vec<ProcessedRecord>>,
}

impl JsonlLogStore {
    /// Open (or start) a log file.
    ///
    /// # Errors
    ///
    /// I/O failures, or [`StoreError::Corrupt`] naming the first bad line.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut records = Vec::new();
        if fs::try_exists(&path).await? {
            let content = fs::read_to_string(&path).await?;
            for (i, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let record = serde_json::from_str(line)
                    .map_err(|source| StoreError::Corrupt { line: i + 1, source })?;
                records.push(record);
            }
        }
        info!(path = %path.display(), records = records.len(), "Opened processed log");
        Ok(Self {
            path,
            records: tokio::sync::Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogStore for JsonlLogStore {
    async fn has_url_been_processed(&self, campaign_id: &str, url: &str) -> Result<bool, StoreError> {
        Ok(processed(&self.records.lock().await, campaign_id, url))
    }

    async fn append_record(&self, record: ProcessedRecord) -> Result<u64, StoreError> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        let mut records = self.records.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path).await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        records.push(record);
        let id = records.len() as u64;
        debug!(id, path = %self.path.display(), "Appended processed record");
        Ok(id)
    }

    async fn count_for_campaign(&self, campaign_id: &str) -> Result<usize, StoreError> {
        Ok(produced(&self.records.lock().await, campaign_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(campaign: &str, url: &str, status: RecordStatus) -> ProcessedRecord {
        ProcessedRecord {
            campaign_id: campaign.to_string(),
            title: "t".to_string(),
            source_url: url.to_string(),
            target_ref: String::new(),
            status,
            tokens_estimate: 0,
            created_at: Utc::now(),
            messages: vec![],
        }
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryLogStore::new();
        assert!(!store.has_url_been_processed("a", "https://x.test/1").await.unwrap());

        assert_eq!(store.append_record(record("a", "https://x.test/1", RecordStatus::Draft)).await.unwrap(), 1);
        assert_eq!(store.append_record(record("a", "https://x.test/2", RecordStatus::Skipped)).await.unwrap(), 2);

        assert!(store.has_url_been_processed("a", "https://x.test/1").await.unwrap());
        assert!(store.has_url_been_processed("a", "https://x.test/2").await.unwrap());
        assert!(!store.has_url_been_processed("b", "https://x.test/1").await.unwrap());
        assert_eq!(store.count_for_campaign("a").await.unwrap(), 1);
        assert_eq!(store.records().len(), 2);
    }

    #[tokio::test]
    async fn test_jsonl_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/processed.jsonl");

        let store = JsonlLogStore::open(&path).await.unwrap();
        store.append_record(record("a", "https://x.test/1", RecordStatus::Published)).await.unwrap();
        store.append_record(record("a", "https://x.test/2", RecordStatus::Draft)).await.unwrap();
        drop(store);

        let reopened = JsonlLogStore::open(&path).await.unwrap();
        assert!(reopened.has_url_been_processed("a", "https://x.test/2").await.unwrap());
        assert_eq!(reopened.count_for_campaign("a").await.unwrap(), 2);
        assert_eq!(reopened.append_record(record("a", "https://x.test/3", RecordStatus::Draft)).await.unwrap(), 3);
        assert_eq!(reopened.path(), path.as_path());
    }

    #[tokio::test]
    async fn test_jsonl_store_reports_corrupt_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed.jsonl");
        std::fs::write(&path, "\n{not json}\n").unwrap();
        let err = JsonlLogStore::open(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { line: 2, .. }));
    }

    #[tokio::test]
    async fn test_jsonl_store_concurrent_appends_keep_line_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed.jsonl");
        let store = JsonlLogStore::open(&path).await.unwrap();

        let (a, b) = tokio::join!(
            store.append_record(record("a", "https://x.test/1", RecordStatus::Draft)),
            store.append_record(record("a", "https://x.test/2", RecordStatus::Draft)),
        );
        let mut ids = vec![a.unwrap(), b.unwrap()];
        ids.sort();
        assert_eq!(ids, vec![1, 2]);

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content.lines().count(), 2);
        let reopened = JsonlLogStore::open(&path).await.unwrap();
        assert_eq!(reopened.count_for_campaign("a").await.unwrap(), 2);
    }
}
