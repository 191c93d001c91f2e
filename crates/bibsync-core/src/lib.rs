//! bibsync Core - Domain logic for incremental library synchronization
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `Library`, `VersionCursor`, `Collection`, `Item`,
//!   `LibrarySyncPlan`, `LibrarySnapshot`
//! - **Use cases** - `enumerate_libraries`, `PlanDeltaUseCase`, `merge_snapshot`
//! - **Port definitions** - Traits for adapters: `IRemoteLibrary`, `ILibraryStore`
//!
//! # Architecture
//!
//! The domain module contains pure data types and invariants with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain entities through port interfaces and never
//! log or persist on their own; callers decide how results are surfaced.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
