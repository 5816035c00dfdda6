// dbsync/src/sync/mod.rs
pub(crate) mod logic;
pub mod statements;

pub use logic::{ApplyReport, SyncOrchestrator, SyncOutcome, TableRowCount, select_latest_schema};
