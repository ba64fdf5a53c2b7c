pub mod dto;

use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;
use tracing::warn;

use crate::config::AppConfig;
use crate::error::RunError;
use crate::models::CourseRecord;

pub const SHEETS_DOMAIN: &str = "https://docs.google.com/spreadsheets/d/";
const SHEETS_EXPORT_PARAM: &str = "/export?gid=0&format=csv";

#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// One normalized snapshot of the not-yet-certified courses.
    async fn fetch_courses(&self) -> Result<Vec<CourseRecord>, RunError>;
}

/// Catalog client backed by a shared Google Sheet's CSV export.
pub struct SheetsCatalog {
    client: Client,
    sheet_id: String,
    cycle_hours: f64,
    max_attempt_ceiling: i64,
    default_course_hours: f64,
}

impl SheetsCatalog {
    /// Validates the sheet link shape before anything is fetched.
    pub fn new(config: &AppConfig) -> Result<Self, RunError> {
        let sheet_id = sheet_id_from_link(&config.sheet_url)?;
        let client = Client::builder()
            .build()
            .map_err(|e| RunError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self {
            client,
            sheet_id,
            cycle_hours: config.cycle_hours,
            max_attempt_ceiling: config.max_attempt_ceiling,
            default_course_hours: config.default_course_hours,
        })
    }

    pub fn sheet_id(&self) -> &str {
        &self.sheet_id
    }

    fn parse_export(&self, body: &str) -> Result<Vec<CourseRecord>, RunError> {
        let mut reader = csv::Reader::from_reader(body.as_bytes());
        let mut courses = Vec::new();
        for row in reader.deserialize::<dto::SheetRow>() {
            let row =
                row.map_err(|e| RunError::SourceUnavailable(format!("bad sheet row: {}", e)))?;
            if row.url.trim().is_empty() {
                warn!("skipping sheet row with an empty url");
                continue;
            }
            if row.certified.trim() == "Yes" {
                continue;
            }
            courses.push(self.normalize(row));
        }
        Ok(courses)
    }

    fn normalize(&self, row: dto::SheetRow) -> CourseRecord {
        let course_hours = row.course_hour.unwrap_or(self.default_course_hours);
        CourseRecord::fresh(
            row.url.trim().to_string(),
            max_attempt_for(course_hours, self.cycle_hours, self.max_attempt_ceiling),
        )
    }
}

#[async_trait]
impl CatalogClient for SheetsCatalog {
    async fn fetch_courses(&self) -> Result<Vec<CourseRecord>, RunError> {
        let url = format!("{}{}{}", SHEETS_DOMAIN, self.sheet_id, SHEETS_EXPORT_PARAM);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RunError::SourceUnavailable(format!("sheet fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RunError::SourceUnavailable(format!(
                "sheet export returned {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RunError::SourceUnavailable(format!("sheet read failed: {}", e)))?;

        self.parse_export(&body)
    }
}

/// Extracts the sheet id from a full Google Sheets link.
pub fn sheet_id_from_link(link: &str) -> Result<String, RunError> {
    let rest = link
        .strip_prefix(SHEETS_DOMAIN)
        .ok_or_else(|| RunError::InvalidSource(format!("not a Google Sheets link: {}", link)))?;
    let sheet_id = rest.split('/').next().unwrap_or_default();
    if sheet_id.is_empty() {
        return Err(RunError::InvalidSource(format!(
            "link carries no sheet id: {}",
            link
        )));
    }
    Ok(sheet_id.to_string())
}

/// Watch budget for a course: whole cycles that fit in its nominal duration,
/// capped at the configured ceiling.
pub fn max_attempt_for(course_hours: f64, cycle_hours: f64, ceiling: i64) -> i64 {
    ((course_hours / cycle_hours).floor() as i64).clamp(0, ceiling)
}

/// Catalog client serving a preset snapshot. Stands in for the sheet in tests
/// and lets a test swap the snapshot between cycles.
pub struct FixedCatalog {
    snapshot: Mutex<Vec<CourseRecord>>,
}

impl FixedCatalog {
    pub fn new(records: Vec<CourseRecord>) -> Self {
        Self {
            snapshot: Mutex::new(records),
        }
    }

    pub fn set_snapshot(&self, records: Vec<CourseRecord>) {
        *self.snapshot.lock().unwrap() = records;
    }
}

#[async_trait]
impl CatalogClient for FixedCatalog {
    async fn fetch_courses(&self) -> Result<Vec<CourseRecord>, RunError> {
        Ok(self.snapshot.lock().unwrap().clone())
    }
}
