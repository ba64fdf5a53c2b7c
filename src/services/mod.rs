pub mod reconciler;
pub mod scheduler;

pub use reconciler::{RefreshStats, refresh_ledger};
pub use scheduler::CycleScheduler;
