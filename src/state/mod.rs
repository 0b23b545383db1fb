//! State module for tracking sweep progress
//!
//! # Components
//!
//! - `Region`: a validated two-letter region code used by the traversal
//! - `Checkpoint`: the durable "last committed page" marker used for resume
//! - `QuotaState` / `QuotaTracker`: the per-process view of the upstream call quota

mod checkpoint;
mod quota;
mod region;

// Re-export main types
pub use checkpoint::Checkpoint;
pub use quota::{QuotaState, QuotaTracker};
pub use region::Region;
