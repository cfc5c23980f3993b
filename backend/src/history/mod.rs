pub mod dynamodb_repository;
pub mod memory_repository;
pub mod models;
pub mod service;

use async_trait::async_trait;

use models::{NewScan, ScanRecord};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Throttling, timeouts, connection failures. Worth retrying.
    #[error("History store unavailable: {0}")]
    Unavailable(String),
    #[error("DynamoDB error: {0}")]
    DynamoDb(String),
    #[error("Invalid data format: {0}")]
    InvalidData(String),
}

impl RepositoryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, RepositoryError::Unavailable(_))
    }
}

/// Per-user, append-only scan history.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Stores the scan with a timestamp taken at write time.
    async fn append(&self, user_id: &str, scan: &NewScan) -> Result<ScanRecord, RepositoryError>;

    /// All scans for the user, newest first.
    async fn list(&self, user_id: &str) -> Result<Vec<ScanRecord>, RepositoryError>;
}
