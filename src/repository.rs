use sqlx::SqlitePool;

use crate::error::RunError;
use crate::models::{CertifiedStatus, CourseRecord};

pub const PROGRESS_SUFFIX: &str = "_progress";
const SHEET_ID_PREFIX_LEN: usize = 5;

/// Progress table name for a sheet: a short prefix of the sheet id plus a
/// fixed suffix, so one database can hold a ledger per sheet.
pub fn table_name_for_sheet(sheet_id: &str) -> Result<String, RunError> {
    let prefix: String = sheet_id.chars().take(SHEET_ID_PREFIX_LEN).collect();
    if prefix.len() < SHEET_ID_PREFIX_LEN
        || !prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(RunError::InvalidSource(format!(
            "sheet id cannot name a progress table: {}",
            sheet_id
        )));
    }
    Ok(format!("sheet_{}{}", prefix, PROGRESS_SUFFIX))
}

/// Persistent per-course progress store. Each method is a single transaction;
/// the table name is validated at construction and every value goes through a
/// bind parameter.
pub struct Ledger {
    db: SqlitePool,
    table: String,
}

impl Ledger {
    pub fn new(db: SqlitePool, sheet_id: &str) -> Result<Self, RunError> {
        let table = table_name_for_sheet(sheet_id)?;
        Ok(Self { db, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Creates the progress table when missing. Returns whether it already
    /// existed, so the caller can tell a first run from a resumed one.
    pub async fn init(&self) -> Result<bool, RunError> {
        let existing: Option<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(&self.table)
                .fetch_optional(&self.db)
                .await?;

        if existing.is_some() {
            return Ok(true);
        }

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS "{}" (
                url TEXT,
                certified TEXT,
                attempt INTEGER,
                max_attempt INTEGER
            )
            "#,
            self.table
        ))
        .execute(&self.db)
        .await?;

        Ok(false)
    }

    /// Bulk-overwrites the table contents. First-time population only;
    /// a resumed run reconciles instead so attempt history survives.
    pub async fn replace_all(&self, records: &[CourseRecord]) -> Result<(), RunError> {
        let mut tx = self.db.begin().await?;

        sqlx::query(&format!(r#"DELETE FROM "{}""#, self.table))
            .execute(&mut *tx)
            .await?;

        for record in records {
            sqlx::query(&format!(
                r#"INSERT INTO "{}" (url, certified, attempt, max_attempt) VALUES (?, ?, ?, ?)"#,
                self.table
            ))
            .bind(&record.url)
            .bind(record.certified)
            .bind(record.attempt)
            .bind(record.max_attempt)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Batch-selection query: not-yet-certified courses, most remaining
    /// budget first, least attempted among ties.
    pub async fn select_eligible(&self, limit: usize) -> Result<Vec<String>, RunError> {
        let rows: Vec<(String,)> = sqlx::query_as(&format!(
            r#"
            SELECT url FROM "{}"
            WHERE certified = ?
            ORDER BY max_attempt DESC, attempt ASC
            LIMIT ?
            "#,
            self.table
        ))
        .bind(CertifiedStatus::NotStarted)
        .bind(limit as i64)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(|(url,)| url).collect())
    }

    pub async fn mark_in_progress(&self, urls: &[String]) -> Result<(), RunError> {
        self.set_status(urls, CertifiedStatus::InProgress).await
    }

    pub async fn mark_not_certified(&self, urls: &[String]) -> Result<(), RunError> {
        self.set_status(urls, CertifiedStatus::NotStarted).await
    }

    async fn set_status(&self, urls: &[String], status: CertifiedStatus) -> Result<(), RunError> {
        let mut tx = self.db.begin().await?;
        for url in urls {
            sqlx::query(&format!(
                r#"UPDATE "{}" SET certified = ? WHERE url = ?"#,
                self.table
            ))
            .bind(status)
            .bind(url)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn increment_attempt(&self, urls: &[String]) -> Result<(), RunError> {
        let mut tx = self.db.begin().await?;
        for url in urls {
            sqlx::query(&format!(
                r#"UPDATE "{}" SET attempt = attempt + 1 WHERE url = ?"#,
                self.table
            ))
            .bind(url)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Purges courses whose watch budget is spent and returns their URLs.
    pub async fn delete_expired(&self) -> Result<Vec<String>, RunError> {
        let mut tx = self.db.begin().await?;

        let expired: Vec<(String,)> = sqlx::query_as(&format!(
            r#"SELECT url FROM "{}" WHERE attempt >= max_attempt"#,
            self.table
        ))
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query(&format!(
            r#"DELETE FROM "{}" WHERE attempt >= max_attempt"#,
            self.table
        ))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(expired.into_iter().map(|(url,)| url).collect())
    }

    /// Clears stale in-flight markers left behind by an interrupted run.
    pub async fn reset_in_progress(&self) -> Result<u64, RunError> {
        let result = sqlx::query(&format!(
            r#"UPDATE "{}" SET certified = ? WHERE certified = ?"#,
            self.table
        ))
        .bind(CertifiedStatus::NotStarted)
        .bind(CertifiedStatus::InProgress)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn all_urls(&self) -> Result<Vec<String>, RunError> {
        let rows: Vec<(String,)> =
            sqlx::query_as(&format!(r#"SELECT url FROM "{}""#, self.table))
                .fetch_all(&self.db)
                .await?;
        Ok(rows.into_iter().map(|(url,)| url).collect())
    }

    pub async fn insert(&self, records: &[CourseRecord]) -> Result<(), RunError> {
        let mut tx = self.db.begin().await?;
        for record in records {
            sqlx::query(&format!(
                r#"INSERT INTO "{}" (url, certified, attempt, max_attempt) VALUES (?, ?, ?, ?)"#,
                self.table
            ))
            .bind(&record.url)
            .bind(record.certified)
            .bind(record.attempt)
            .bind(record.max_attempt)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn delete(&self, urls: &[String]) -> Result<(), RunError> {
        let mut tx = self.db.begin().await?;
        for url in urls {
            sqlx::query(&format!(r#"DELETE FROM "{}" WHERE url = ?"#, self.table))
                .bind(url)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, RunError> {
        let (count,): (i64,) =
            sqlx::query_as(&format!(r#"SELECT COUNT(*) FROM "{}""#, self.table))
                .fetch_one(&self.db)
                .await?;
        Ok(count)
    }

    /// Full table contents, in selection order.
    pub async fn fetch_all(&self) -> Result<Vec<CourseRecord>, RunError> {
        let records = sqlx::query_as::<_, CourseRecord>(&format!(
            r#"
            SELECT url, certified, attempt, max_attempt FROM "{}"
            ORDER BY max_attempt DESC, attempt ASC
            "#,
            self.table
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(records)
    }
}
