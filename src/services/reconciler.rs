use std::collections::HashSet;

use tracing::info;

use crate::error::RunError;
use crate::models::CourseRecord;
use crate::repository::Ledger;

#[derive(Debug, Default, PartialEq)]
pub struct RefreshStats {
    pub inserted: usize,
    pub removed: usize,
}

/// Diffs a fresh catalog snapshot against the ledger. The sheet owns
/// membership: URLs it no longer lists are dropped whatever their state.
/// The ledger owns in-flight progress: rows present on both sides are
/// never touched. New URLs enter with a clean attempt budget.
pub async fn refresh_ledger(
    ledger: &Ledger,
    snapshot: &[CourseRecord],
) -> Result<RefreshStats, RunError> {
    let known: HashSet<String> = ledger.all_urls().await?.into_iter().collect();
    let listed: HashSet<&str> = snapshot.iter().map(|r| r.url.as_str()).collect();

    let to_insert: Vec<CourseRecord> = snapshot
        .iter()
        .filter(|r| !known.contains(&r.url))
        .map(|r| CourseRecord::fresh(r.url.clone(), r.max_attempt))
        .collect();

    let to_delete: Vec<String> = known
        .iter()
        .filter(|url| !listed.contains(url.as_str()))
        .cloned()
        .collect();

    if !to_insert.is_empty() {
        ledger.insert(&to_insert).await?;
    }
    if !to_delete.is_empty() {
        ledger.delete(&to_delete).await?;
    }

    let stats = RefreshStats {
        inserted: to_insert.len(),
        removed: to_delete.len(),
    };
    info!(
        inserted = stats.inserted,
        removed = stats.removed,
        "ledger refreshed from sheet"
    );
    Ok(stats)
}
