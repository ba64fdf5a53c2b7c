use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Per-course progress row, keyed by the course URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CourseRecord {
    pub url: String,
    pub certified: CertifiedStatus,
    pub attempt: i64,
    pub max_attempt: i64,
}

impl CourseRecord {
    /// A course as it enters the ledger: no attempts spent, full budget ahead.
    pub fn fresh(url: String, max_attempt: i64) -> Self {
        Self {
            url,
            certified: CertifiedStatus::NotStarted,
            attempt: 0,
            max_attempt,
        }
    }
}

/// Certification status as stored in the ledger. `NotStarted` and `Certified`
/// carry the sheet's own No/Yes flag; `InProgress` is written only while a
/// batch is running and reset back to `NotStarted` when it settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum CertifiedStatus {
    #[serde(rename = "No")]
    #[sqlx(rename = "No")]
    NotStarted,
    #[serde(rename = "InProgress")]
    #[sqlx(rename = "InProgress")]
    InProgress,
    #[serde(rename = "Yes")]
    #[sqlx(rename = "Yes")]
    Certified,
}

impl CertifiedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertifiedStatus::NotStarted => "No",
            CertifiedStatus::InProgress => "InProgress",
            CertifiedStatus::Certified => "Yes",
        }
    }
}
