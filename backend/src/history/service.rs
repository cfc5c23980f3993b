use shared::{HistoryResponse, HistorySummary, ScanRecordView};
use std::sync::Arc;

use crate::retry::{RetryConfig, retry_with_backoff};

use super::models::{NewScan, ScanRecord};
use super::{HistoryRepository, RepositoryError};

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Scan history storage is unavailable: {0}")]
    StorageUnavailable(#[from] RepositoryError),
}

/// Records scans and reads them back, retrying transient store failures.
#[derive(Clone)]
pub struct HistoryService {
    repo: Arc<dyn HistoryRepository>,
    retry: RetryConfig,
}

impl HistoryService {
    pub fn new(repo: Arc<dyn HistoryRepository>, retry: RetryConfig) -> Self {
        Self { repo, retry }
    }

    pub async fn record(&self, user_id: &str, scan: NewScan) -> Result<ScanRecord, HistoryError> {
        let record = retry_with_backoff(
            &self.retry,
            "history write",
            RepositoryError::is_transient,
            || self.repo.append(user_id, &scan),
        )
        .await?;
        Ok(record)
    }

    /// Newest first. An empty history is `Ok(vec![])`, never an error.
    pub async fn history(&self, user_id: &str) -> Result<Vec<ScanRecordView>, HistoryError> {
        let records = retry_with_backoff(
            &self.retry,
            "history read",
            RepositoryError::is_transient,
            || self.repo.list(user_id),
        )
        .await?;
        Ok(records.iter().map(ScanRecord::to_view).collect())
    }

    /// Records and their summary counts from a single read.
    pub async fn overview(&self, user_id: &str) -> Result<HistoryResponse, HistoryError> {
        let records = self.history(user_id).await?;
        let summary = HistorySummary::from_records(&records);
        Ok(HistoryResponse { records, summary })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::history::memory_repository::MemoryHistoryRepository;
    use async_trait::async_trait;
    use shared::HealthStatus;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Fails the next `failures` calls with the given error, then delegates.
    pub(crate) struct FlakyRepository {
        pub inner: MemoryHistoryRepository,
        pub failures: AtomicU32,
        pub transient: bool,
        pub calls: AtomicU32,
    }

    impl FlakyRepository {
        pub(crate) fn new(failures: u32, transient: bool) -> Self {
            Self {
                inner: MemoryHistoryRepository::new(),
                failures: AtomicU32::new(failures),
                transient,
                calls: AtomicU32::new(0),
            }
        }

        fn trip(&self) -> Result<(), RepositoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining == 0 {
                return Ok(());
            }
            self.failures.store(remaining - 1, Ordering::SeqCst);
            if self.transient {
                Err(RepositoryError::Unavailable("connection reset".into()))
            } else {
                Err(RepositoryError::DynamoDb("ResourceNotFoundException: no table".into()))
            }
        }
    }

    #[async_trait]
    impl HistoryRepository for FlakyRepository {
        async fn append(
            &self,
            user_id: &str,
            scan: &NewScan,
        ) -> Result<ScanRecord, RepositoryError> {
            self.trip()?;
            self.inner.append(user_id, scan).await
        }

        async fn list(&self, user_id: &str) -> Result<Vec<ScanRecord>, RepositoryError> {
            self.trip()?;
            self.inner.list(user_id).await
        }
    }

    pub(crate) fn quick_retry() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            initial_interval: Duration::from_millis(1),
            multiplier: 2.0,
            max_interval: Duration::from_millis(2),
        }
    }

    fn scan(disease: &str, status: HealthStatus) -> NewScan {
        NewScan::new("Rice".into(), disease.into(), 90.0, status)
    }

    #[actix_web::test]
    async fn two_records_come_back_newest_first() {
        let service = HistoryService::new(Arc::new(MemoryHistoryRepository::new()), quick_retry());

        service
            .record("grower@example.com", scan("Leaf Blast", HealthStatus::Infected))
            .await
            .unwrap();
        service
            .record("grower@example.com", scan("healthy", HealthStatus::Healthy))
            .await
            .unwrap();

        let history = service.history("grower@example.com").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].disease, "healthy");
        assert_eq!(history[1].disease, "Leaf Blast");
        for view in &history {
            // YYYY-MM-DD HH:MM
            assert_eq!(view.date.len(), 16);
            assert!(chrono::NaiveDateTime::parse_from_str(&view.date, "%Y-%m-%d %H:%M").is_ok());
        }

        let overview = service.overview("grower@example.com").await.unwrap();
        assert_eq!(overview.records, history);
        assert_eq!(
            overview.summary,
            HistorySummary {
                total: 2,
                healthy: 1,
                infected: 1
            }
        );
    }

    #[actix_web::test]
    async fn overview_reads_the_store_once() {
        let repo = Arc::new(FlakyRepository::new(0, true));
        let service = HistoryService::new(repo.clone(), quick_retry());
        service
            .record("grower@example.com", scan("Brown Spot", HealthStatus::Infected))
            .await
            .unwrap();
        let writes = repo.calls.load(Ordering::SeqCst);

        let overview = service.overview("grower@example.com").await.unwrap();
        assert_eq!(repo.calls.load(Ordering::SeqCst), writes + 1);
        assert_eq!(overview.records.len(), 1);
        assert_eq!(overview.summary.infected, 1);
    }

    #[actix_web::test]
    async fn empty_history_is_not_an_error() {
        let service = HistoryService::new(Arc::new(MemoryHistoryRepository::new()), quick_retry());
        assert!(service.history("new@example.com").await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn transient_failures_are_retried() {
        let repo = Arc::new(FlakyRepository::new(2, true));
        let service = HistoryService::new(repo.clone(), quick_retry());

        service
            .record("grower@example.com", scan("Leaf Blast", HealthStatus::Infected))
            .await
            .unwrap();

        assert_eq!(repo.calls.load(Ordering::SeqCst), 3);
        assert_eq!(repo.inner.list("grower@example.com").await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn exhausted_retries_surface_storage_unavailable() {
        let repo = Arc::new(FlakyRepository::new(10, true));
        let service = HistoryService::new(repo.clone(), quick_retry());

        let err = service.history("grower@example.com").await.unwrap_err();
        assert!(matches!(err, HistoryError::StorageUnavailable(_)));
        assert_eq!(repo.calls.load(Ordering::SeqCst), 3);
    }

    #[actix_web::test]
    async fn permanent_failures_are_not_retried() {
        let repo = Arc::new(FlakyRepository::new(1, false));
        let service = HistoryService::new(repo.clone(), quick_retry());

        let err = service
            .record("grower@example.com", scan("Leaf Blast", HealthStatus::Infected))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HistoryError::StorageUnavailable(RepositoryError::DynamoDb(_))
        ));
        assert_eq!(repo.calls.load(Ordering::SeqCst), 1);
    }
}
