use std::collections::HashSet;
use std::sync::Arc;

use chrono::Local;
use tracing::{info, warn};

use crate::catalog::CatalogClient;
use crate::error::RunError;
use crate::playback::PlaybackDriver;
use crate::repository::Ledger;
use crate::services::reconciler;

pub const BREAK_LINE: &str = "----------------------------------------";

/// Drives watch cycles until no eligible course remains: select a batch,
/// hand it to the playback driver for one cycle, settle the outcome, then
/// refresh the ledger from the sheet.
pub struct CycleScheduler {
    ledger: Ledger,
    catalog: Arc<dyn CatalogClient>,
    driver: Arc<dyn PlaybackDriver>,
    max_tabs: usize,
    cycle_hours: f64,
}

impl CycleScheduler {
    pub fn new(
        ledger: Ledger,
        catalog: Arc<dyn CatalogClient>,
        driver: Arc<dyn PlaybackDriver>,
        max_tabs: usize,
        cycle_hours: f64,
    ) -> Self {
        Self {
            ledger,
            catalog,
            driver,
            max_tabs,
            cycle_hours,
        }
    }

    pub async fn run(&self) -> Result<(), RunError> {
        // Courses whose budget ran out this run. The sheet keeps listing them
        // until the operator cleans it up, so they are held out of every
        // refresh; re-inserting would hand an abandoned course a fresh budget.
        let mut exhausted: HashSet<String> = HashSet::new();

        loop {
            let batch = self.ledger.select_eligible(self.max_tabs).await?;
            if batch.is_empty() {
                info!("no eligible courses left, run complete");
                return Ok(());
            }

            self.show_cycle_info(&batch);
            self.ledger.mark_in_progress(&batch).await?;

            match self.driver.run_cycle(&batch).await {
                Ok(()) => {}
                // A failed cycle still spends an attempt, otherwise a broken
                // course would be retried forever.
                Err(RunError::Playback(reason)) => {
                    warn!("playback cycle failed, settling batch anyway: {}", reason);
                }
                Err(other) => return Err(other),
            }

            self.ledger.increment_attempt(&batch).await?;
            self.ledger.mark_not_certified(&batch).await?;
            let expired = self.ledger.delete_expired().await?;
            if !expired.is_empty() {
                info!(purged = expired.len(), "watch budget exhausted for {:?}", expired);
                exhausted.extend(expired);
            }

            let mut snapshot = self.catalog.fetch_courses().await?;
            snapshot.retain(|record| !exhausted.contains(&record.url));
            reconciler::refresh_ledger(&self.ledger, &snapshot).await?;
        }
    }

    fn show_cycle_info(&self, batch: &[String]) {
        let now = Local::now();
        println!("{}", BREAK_LINE);
        println!("Cycle starting at {}", now.format("%I:%M %p"));
        println!("Next cycle will begin after {} hour(s)", self.cycle_hours);
        println!("{}", BREAK_LINE);
        println!("Opening the following courses:");
        for (index, url) in batch.iter().enumerate() {
            println!("{:0>2}: {}", index + 1, url);
        }
        println!("{}", BREAK_LINE);
    }
}
