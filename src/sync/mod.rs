//! Incremental sync engine
//!
//! The decision core of the tool:
//! - Watermark persistence at a destination key
//! - Pure planning (strict greater-than selection, full-listing
//!   next-marker candidate)
//! - Bounded-concurrency transfer execution
//! - Run orchestration with commit-after-full-success

mod coordinator;
mod executor;
mod marker;
mod planner;

pub use coordinator::{FailedTransfer, RunReport, SyncCoordinator, SyncOptions};
pub use executor::{destination_key, TransferExecutor, TransferOutcome, TransferResult};
pub use marker::{MarkerStore, SyncMarker};
pub use planner::{plan, SyncPlan};
