//! Integration tests for bibsync-remote
//!
//! Uses wiremock to simulate the Zotero Web API and verifies end-to-end
//! behavior of the client, delta queries, fetch-by-keys, account queries
//! and the IRemoteLibrary adapter.

mod common;

mod test_account;
mod test_delta;
mod test_fetch;
mod test_provider;
mod test_retry;
