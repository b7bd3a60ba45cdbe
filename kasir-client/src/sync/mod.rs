//! Pending order synchronization
//!
//! - [`SyncState`]: reconciliation policy over the pending order cache
//! - [`Synchronizer`]: async runtime feeding the policy and publishing a view

mod runtime;
mod state;

pub use runtime::{PendingView, SyncHandle, SyncInput, Synchronizer};
pub use state::{FinalizedLog, Reconciled, SyncState};
