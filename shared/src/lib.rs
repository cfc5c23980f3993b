use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub mod session;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum CropCategory {
    Rice,
    Pulses,
}

impl CropCategory {
    pub const ALL: [CropCategory; 2] = [CropCategory::Rice, CropCategory::Pulses];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum HealthStatus {
    Healthy,
    Infected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedLabel {
    pub label: String,
    /// Percentage in [0, 100].
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub crop: CropCategory,
    pub top_label: String,
    pub confidence: f32,
    pub ranked: Vec<RankedLabel>,
    pub plant: String,
    pub disease: String,
    pub status: HealthStatus,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResponse {
    #[serde(flatten)]
    pub result: ClassificationResult,
    pub saved: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecordView {
    /// Minute granularity, `YYYY-MM-DD HH:MM`.
    pub date: String,
    pub plant: String,
    pub disease: String,
    pub confidence: f32,
    pub status: HealthStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub total: usize,
    pub healthy: usize,
    pub infected: usize,
}

impl HistorySummary {
    pub fn from_records(records: &[ScanRecordView]) -> Self {
        let healthy = records
            .iter()
            .filter(|r| r.status == HealthStatus::Healthy)
            .count();
        Self {
            total: records.len(),
            healthy,
            infected: records.len() - healthy,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub records: Vec<ScanRecordView>,
    pub summary: HistorySummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropInfo {
    pub crop: CropCategory,
    pub model_loaded: bool,
    pub labels: usize,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DecodeError,
    ModelUnavailable,
    InferenceFailed,
    StorageUnavailable,
    ValidationError,
    InvalidCredentials,
    ProviderUnavailable,
    Unauthorized,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub kind: ErrorKind,
}

impl ApiError {
    pub fn new(kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind,
        }
    }
}
