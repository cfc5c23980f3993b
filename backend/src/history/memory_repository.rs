use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

use super::models::{NewScan, ScanRecord};
use super::{HistoryRepository, RepositoryError};

/// Process-local history for development and tests. Lost on restart.
#[derive(Default)]
pub struct MemoryHistoryRepository {
    scans: Mutex<HashMap<String, Vec<ScanRecord>>>,
}

impl MemoryHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryRepository for MemoryHistoryRepository {
    async fn append(&self, user_id: &str, scan: &NewScan) -> Result<ScanRecord, RepositoryError> {
        let mut scans = self
            .scans
            .lock()
            .map_err(|_| RepositoryError::Unavailable("history lock poisoned".to_string()))?;
        let user_scans = scans.entry(user_id.to_string()).or_default();

        // Keep timestamps strictly increasing per user so ordering is total.
        let mut scanned_at = Utc::now();
        if let Some(last) = user_scans.last() {
            if scanned_at <= last.scanned_at {
                scanned_at = last.scanned_at + chrono::Duration::microseconds(1);
            }
        }

        let record = ScanRecord::stamped(user_id, scan, scanned_at);
        user_scans.push(record.clone());
        Ok(record)
    }

    async fn list(&self, user_id: &str) -> Result<Vec<ScanRecord>, RepositoryError> {
        let scans = self
            .scans
            .lock()
            .map_err(|_| RepositoryError::Unavailable("history lock poisoned".to_string()))?;
        let mut records = scans.get(user_id).cloned().unwrap_or_default();
        records.sort_by(|a, b| b.scanned_at.cmp(&a.scanned_at));
        Ok(records)
    }
}
