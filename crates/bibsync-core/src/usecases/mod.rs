//! Use cases (interactors) for bibsync
//!
//! This module contains the application use cases that orchestrate
//! domain entities and port interfaces. They are consumed in this order for
//! one library per sync cycle: enumerate, plan, merge.
//!
//! ## Use Cases
//!
//! - [`enumerate_libraries`] - Personal library plus one library per group
//! - [`PlanDeltaUseCase`] - Cursor-based delta queries into a `LibrarySyncPlan`
//! - [`merge_snapshot`] - Applies a plan to a local snapshot

pub mod enumerate_libraries;
pub mod merge_snapshot;
pub mod plan_delta;

pub use enumerate_libraries::enumerate_libraries;
pub use merge_snapshot::{merge_snapshot, AppliedAction, EntityKind, MergeOutcome};
pub use plan_delta::PlanDeltaUseCase;
