use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, SecondsFormat, Utc};
use shared::HealthStatus;
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use super::models::{NewScan, ScanRecord};
use super::{HistoryRepository, RepositoryError};

const TRANSIENT_CODES: &[&str] = &[
    "ThrottlingException",
    "ProvisionedThroughputExceededException",
    "RequestLimitExceeded",
    "InternalServerError",
    "ServiceUnavailable",
];

/// Table layout: partition key `user_id`, sort key `scanned_at`. The sort key
/// is a fixed-width UTC timestamp followed by `#` and the record id, so
/// lexical order is chronological order.
#[derive(Clone)]
pub struct DynamoDbHistoryRepository {
    client: Client,
    table: String,
}

impl DynamoDbHistoryRepository {
    pub fn new(client: Client, table: String) -> Self {
        Self { client, table }
    }

    fn scan_to_item(record: &ScanRecord) -> HashMap<String, AttributeValue> {
        let mut item = HashMap::new();
        item.insert(
            "user_id".to_string(),
            AttributeValue::S(record.user_id.clone()),
        );
        item.insert(
            "scanned_at".to_string(),
            AttributeValue::S(sort_key(&record.scanned_at, record.id)),
        );
        item.insert("id".to_string(), AttributeValue::S(record.id.to_string()));
        item.insert("plant".to_string(), AttributeValue::S(record.plant.clone()));
        item.insert(
            "disease".to_string(),
            AttributeValue::S(record.disease.clone()),
        );
        item.insert(
            "confidence".to_string(),
            AttributeValue::N(record.confidence.to_string()),
        );
        item.insert(
            "status".to_string(),
            AttributeValue::S(record.status.to_string()),
        );
        item
    }

    fn parse_scan_from_item(
        item: &HashMap<String, AttributeValue>,
    ) -> Result<ScanRecord, RepositoryError> {
        let string = |name: &str| {
            item.get(name)
                .and_then(|v| v.as_s().ok())
                .ok_or_else(|| RepositoryError::InvalidData(format!("Invalid {}", name)))
        };

        let user_id = string("user_id")?.clone();

        let scanned_at = string("scanned_at")?
            .split_once('#')
            .and_then(|(ts, _)| DateTime::parse_from_rfc3339(ts).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| RepositoryError::InvalidData("Invalid scanned_at".to_string()))?;

        let id = Uuid::parse_str(string("id")?)
            .map_err(|_| RepositoryError::InvalidData("Invalid id".to_string()))?;

        let confidence = item
            .get("confidence")
            .and_then(|v| v.as_n().ok())
            .and_then(|s| s.parse::<f32>().ok())
            .ok_or_else(|| RepositoryError::InvalidData("Invalid confidence".to_string()))?;

        let status = HealthStatus::from_str(string("status")?)
            .map_err(|_| RepositoryError::InvalidData("Invalid status".to_string()))?;

        Ok(ScanRecord {
            id,
            user_id,
            plant: string("plant")?.clone(),
            disease: string("disease")?.clone(),
            confidence,
            status,
            scanned_at,
        })
    }
}

pub(crate) fn sort_key(scanned_at: &DateTime<Utc>, id: Uuid) -> String {
    format!(
        "{}#{}",
        scanned_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        id
    )
}

fn sdk_error<E, R>(err: SdkError<E, R>) -> RepositoryError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match &err {
        SdkError::ServiceError(service) => {
            let code = service.err().code().unwrap_or("Unknown");
            let message = service.err().message().unwrap_or_default();
            if TRANSIENT_CODES.contains(&code) {
                RepositoryError::Unavailable(format!("{}: {}", code, message))
            } else {
                RepositoryError::DynamoDb(format!("{}: {}", code, message))
            }
        }
        _ => RepositoryError::Unavailable(err.to_string()),
    }
}

#[async_trait]
impl HistoryRepository for DynamoDbHistoryRepository {
    async fn append(&self, user_id: &str, scan: &NewScan) -> Result<ScanRecord, RepositoryError> {
        let record = ScanRecord::stamped(user_id, scan, Utc::now());

        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(Self::scan_to_item(&record)))
            .send()
            .await
            .map_err(|e| {
                log::error!("DynamoDB put_item failed for user {}: {:?}", user_id, e);
                sdk_error(e)
            })?;

        log::info!(
            "Stored scan {} for {} in '{}'",
            record.id,
            user_id,
            self.table
        );
        Ok(record)
    }

    async fn list(&self, user_id: &str) -> Result<Vec<ScanRecord>, RepositoryError> {
        let mut records = Vec::new();
        let mut start_key = None;

        loop {
            let page = self
                .client
                .query()
                .table_name(&self.table)
                .key_condition_expression("user_id = :user_id")
                .expression_attribute_values(":user_id", AttributeValue::S(user_id.to_string()))
                .scan_index_forward(false)
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| {
                    log::error!("DynamoDB query failed for user {}: {:?}", user_id, e);
                    sdk_error(e)
                })?;

            for item in page.items.unwrap_or_default() {
                records.push(Self::parse_scan_from_item(&item)?);
            }

            match page.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        log::debug!("Loaded {} scans for {}", records.len(), user_id);
        Ok(records)
    }
}
