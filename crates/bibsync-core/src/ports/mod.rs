//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteLibrary`] - Delta and fetch queries against the remote library API
//! - [`ILibraryStore`] - Persistent storage for cursors and snapshots

pub mod library_store;
pub mod remote_library;

pub use library_store::{ILibraryStore, StoredLibrary};
pub use remote_library::{DeletedKeys, DeletionsResponse, IRemoteLibrary, VersionsResponse};
