//! Test helpers for workflow unit tests
//!
//! In-memory stand-ins for the Application Server and object storage, plus
//! fixture files on disk. No network is needed.

pub mod mock_api;
pub mod mock_store;

pub use mock_api::MockMediaApi;
pub use mock_store::{MockObjectStore, RecordedPut};

use std::path::PathBuf;

/// Create `name` holding `size` bytes inside a fresh temp dir.
///
/// Keep the returned `TempDir` alive for as long as the file is needed.
pub fn fixture_file(name: &str, size: usize) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    let bytes: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, bytes).unwrap();
    (dir, path)
}
