use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{ClassificationResult, HealthStatus, ScanRecordView};
use uuid::Uuid;

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Fields the caller supplies for a new history entry. The timestamp is
/// assigned by the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewScan {
    pub id: Uuid,
    pub plant: String,
    pub disease: String,
    pub confidence: f32,
    pub status: HealthStatus,
}

impl NewScan {
    pub fn new(plant: String, disease: String, confidence: f32, status: HealthStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            plant,
            disease,
            confidence,
            status,
        }
    }
}

impl From<&ClassificationResult> for NewScan {
    fn from(result: &ClassificationResult) -> Self {
        Self::new(
            result.plant.clone(),
            result.disease.clone(),
            result.confidence,
            result.status,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: Uuid,
    pub user_id: String,
    pub plant: String,
    pub disease: String,
    pub confidence: f32,
    pub status: HealthStatus,
    pub scanned_at: DateTime<Utc>,
}

impl ScanRecord {
    pub fn stamped(user_id: &str, scan: &NewScan, scanned_at: DateTime<Utc>) -> Self {
        Self {
            id: scan.id,
            user_id: user_id.to_string(),
            plant: scan.plant.clone(),
            disease: scan.disease.clone(),
            confidence: scan.confidence,
            status: scan.status,
            scanned_at,
        }
    }

    pub fn to_view(&self) -> ScanRecordView {
        ScanRecordView {
            date: self.scanned_at.format(DATE_FORMAT).to_string(),
            plant: self.plant.clone(),
            disease: self.disease.clone(),
            confidence: self.confidence,
            status: self.status,
        }
    }
}
