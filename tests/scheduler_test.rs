use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::SqlitePool;

use llwatcher::catalog::FixedCatalog;
use llwatcher::error::RunError;
use llwatcher::models::CourseRecord;
use llwatcher::playback::PlaybackDriver;
use llwatcher::repository::Ledger;
use llwatcher::services::CycleScheduler;

const SHEET_ID: &str = "abc12XYZtestsheet";

/// Driver double: records every batch it is handed, optionally failing each
/// cycle, and never sleeps.
struct RecordingDriver {
    batches: Mutex<Vec<Vec<String>>>,
    fail: bool,
}

impl RecordingDriver {
    fn new(fail: bool) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            fail,
        }
    }

    fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlaybackDriver for RecordingDriver {
    async fn run_cycle(&self, urls: &[String]) -> Result<(), RunError> {
        self.batches.lock().unwrap().push(urls.to_vec());
        if self.fail {
            Err(RunError::Playback("browser crashed".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Driver double that swaps the catalog snapshot after its first cycle,
/// standing in for a course getting certified (and thus dropped from the
/// sheet feed) while the run is underway.
struct CertifyingDriver {
    catalog: Arc<FixedCatalog>,
    next_snapshot: Mutex<Option<Vec<CourseRecord>>>,
    batches: Mutex<Vec<Vec<String>>>,
}

impl CertifyingDriver {
    fn new(catalog: Arc<FixedCatalog>, next_snapshot: Vec<CourseRecord>) -> Self {
        Self {
            catalog,
            next_snapshot: Mutex::new(Some(next_snapshot)),
            batches: Mutex::new(Vec::new()),
        }
    }

    fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlaybackDriver for CertifyingDriver {
    async fn run_cycle(&self, urls: &[String]) -> Result<(), RunError> {
        self.batches.lock().unwrap().push(urls.to_vec());
        if let Some(snapshot) = self.next_snapshot.lock().unwrap().take() {
            self.catalog.set_snapshot(snapshot);
        }
        Ok(())
    }
}

fn course(url: &str, max_attempt: i64) -> CourseRecord {
    CourseRecord::fresh(url.to_string(), max_attempt)
}

async fn populated_ledger(pool: &SqlitePool, records: &[CourseRecord]) -> Ledger {
    let ledger = Ledger::new(pool.clone(), SHEET_ID).expect("Failed to derive table name");
    ledger.init().await.expect("Failed to create table");
    ledger.replace_all(records).await.expect("Failed to populate");
    ledger
}

#[tokio::test]
async fn run_terminates_once_every_budget_is_spent() {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create database");

    // The sheet keeps listing both courses the whole time; expiry alone must
    // end the run.
    let records = vec![course("long", 2), course("short", 1)];
    let ledger = populated_ledger(&pool, &records).await;
    let inspect = Ledger::new(pool.clone(), SHEET_ID).expect("Failed to derive table name");

    let catalog = Arc::new(FixedCatalog::new(records));
    let driver = Arc::new(RecordingDriver::new(false));

    let scheduler = CycleScheduler::new(ledger, catalog, driver.clone(), 5, 3.0);
    scheduler.run().await.expect("Run should finish cleanly");

    // Highest remaining budget first, and the expired course never comes back.
    assert_eq!(
        driver.batches(),
        vec![
            vec!["long".to_string(), "short".to_string()],
            vec!["long".to_string()],
        ]
    );
    assert_eq!(inspect.count().await.expect("Failed to count"), 0);
}

#[tokio::test]
async fn failed_cycles_still_spend_the_watch_budget() {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create database");

    let records = vec![course("flaky", 2)];
    let ledger = populated_ledger(&pool, &records).await;
    let inspect = Ledger::new(pool.clone(), SHEET_ID).expect("Failed to derive table name");

    let catalog = Arc::new(FixedCatalog::new(records));
    let driver = Arc::new(RecordingDriver::new(true));

    let scheduler = CycleScheduler::new(ledger, catalog, driver.clone(), 5, 3.0);
    scheduler.run().await.expect("Run should finish cleanly");

    // Two cycles happened: the course was settled back to not-certified after
    // the first failure (a row left in-progress would never be re-selected),
    // and each failure cost exactly one attempt.
    assert_eq!(
        driver.batches(),
        vec![vec!["flaky".to_string()], vec!["flaky".to_string()]]
    );
    assert_eq!(inspect.count().await.expect("Failed to count"), 0);
}

#[tokio::test]
async fn courses_dropped_from_the_sheet_leave_the_ledger_mid_run() {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create database");

    let records = vec![course("getting-certified", 5), course("still-watching", 3)];
    let ledger = populated_ledger(&pool, &records).await;
    let inspect = Ledger::new(pool.clone(), SHEET_ID).expect("Failed to derive table name");

    let catalog = Arc::new(FixedCatalog::new(records));
    // After the first cycle the sheet only lists the second course.
    let driver = Arc::new(CertifyingDriver::new(
        catalog.clone(),
        vec![course("still-watching", 3)],
    ));

    let scheduler = CycleScheduler::new(ledger, catalog, driver.clone(), 5, 3.0);
    scheduler.run().await.expect("Run should finish cleanly");

    assert_eq!(
        driver.batches(),
        vec![
            vec!["getting-certified".to_string(), "still-watching".to_string()],
            vec!["still-watching".to_string()],
            vec!["still-watching".to_string()],
        ]
    );
    assert_eq!(inspect.count().await.expect("Failed to count"), 0);
}

#[tokio::test]
async fn batch_size_is_capped_by_the_tab_limit() {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create database");

    let records = vec![course("a", 3), course("b", 2), course("c", 1)];
    let ledger = populated_ledger(&pool, &records).await;

    let catalog = Arc::new(FixedCatalog::new(records));
    let driver = Arc::new(RecordingDriver::new(false));

    let scheduler = CycleScheduler::new(ledger, catalog, driver.clone(), 2, 3.0);
    scheduler.run().await.expect("Run should finish cleanly");

    for batch in driver.batches() {
        assert!(batch.len() <= 2, "batch exceeded the tab limit: {:?}", batch);
    }
}
