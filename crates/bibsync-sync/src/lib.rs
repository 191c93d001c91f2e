//! bibsync Sync - Multi-library synchronization driver
//!
//! Provides:
//! - One sync run over every library of a user (personal plus groups)
//! - Per-library failure isolation
//! - Periodic polling with "sync now" requests and graceful shutdown
//!
//! ## Modules
//!
//! - [`engine`] - Enumerate, plan, merge and persist each library
//! - [`scheduler`] - Interval-driven poll loop with cancellation

pub mod engine;
pub mod scheduler;

pub use engine::{
    ChangeCounts, LibraryOutcome, LibraryStatus, LibrarySummary, SyncEngine, SyncOptions,
    SyncReport,
};
pub use scheduler::PollScheduler;
