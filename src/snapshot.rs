// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Crash-safe persistence of the client state.
//!
//! The snapshot is replaced by write-then-rename after every access, so a
//! crash at any point leaves either the previous snapshot or the new one,
//! never a torn file the engine would trust.

use crate::{bucket::Block, BucketSize, LeafId, TreeHeight};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Returned when the snapshot cannot be written.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// A filesystem operation failed.
    #[error("snapshot I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// The state could not be serialized.
    #[error("snapshot serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The temporary file could not be renamed over the target.
    #[error("snapshot rename failure: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// The identifying parameters of an ORAM instance. A snapshot whose
/// metadata does not match the engine's is discarded on load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Logical capacity `N` in blocks.
    pub num_blocks: usize,
    /// Blocks per bucket, `Z`.
    pub bucket_size: BucketSize,
    /// Tree height `L`.
    pub tree_height: TreeHeight,
    /// Number of leaves, `2^L`.
    pub num_leaves: u64,
}

/// One persisted client-state record: position map, stash, and the
/// parameters they were built for.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    /// One leaf id per block index.
    pub position_map: Vec<LeafId>,
    /// Every stashed block, in stash order.
    pub stash_blocks: Vec<Block>,
    /// The parameters of the engine that wrote this snapshot.
    pub metadata: Metadata,
}

/// Atomically replaces the snapshot at `path`.
pub fn save(path: &Path, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(directory)?;
    serde_json::to_writer(&mut file, snapshot)?;
    file.flush()?;
    file.persist(path)?;
    Ok(())
}

/// Loads the snapshot at `path`, returning `None` — with a warning, except
/// for plain absence — whenever the file is missing, torn, or was written
/// for different parameters. The caller then starts fresh.
pub fn load(path: &Path, expected: &Metadata) -> Option<Snapshot> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            log::warn!("could not read snapshot {}: {err}", path.display());
            return None;
        }
    };

    let snapshot: Snapshot = match serde_json::from_slice(&bytes) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            log::warn!("discarding torn snapshot {}: {err}", path.display());
            return None;
        }
    };

    if snapshot.metadata != *expected {
        log::warn!(
            "discarding snapshot {}: metadata mismatch (found {:?}, expected {:?})",
            path.display(),
            snapshot.metadata,
            expected
        );
        return None;
    }

    if snapshot.position_map.len() != expected.num_blocks {
        log::warn!(
            "discarding snapshot {}: {} position entries for {} blocks",
            path.display(),
            snapshot.position_map.len(),
            expected.num_blocks
        );
        return None;
    }

    Some(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_metadata() -> Metadata {
        Metadata {
            num_blocks: 8,
            bucket_size: 4,
            tree_height: 3,
            num_leaves: 8,
        }
    }

    fn test_snapshot() -> Snapshot {
        Snapshot {
            position_map: vec![3, 1, 4, 1, 5, 0, 2, 6],
            stash_blocks: vec![Block::new(2, b"stranded".to_vec())],
            metadata: test_metadata(),
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stash.json");
        let snapshot = test_snapshot();
        save(&path, &snapshot).unwrap();

        let restored = load(&path, &test_metadata()).unwrap();
        assert_eq!(restored.position_map, snapshot.position_map);
        assert_eq!(restored.stash_blocks, snapshot.stash_blocks);
        assert_eq!(restored.metadata, snapshot.metadata);
    }

    #[test]
    fn missing_snapshot_loads_as_none() {
        let dir = tempdir().unwrap();
        assert!(load(&dir.path().join("stash.json"), &test_metadata()).is_none());
    }

    #[test]
    fn torn_snapshot_loads_as_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stash.json");
        save(&path, &test_snapshot()).unwrap();

        // Truncate mid-file, as a crash during a non-atomic write would.
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
        assert!(load(&path, &test_metadata()).is_none());
    }

    #[test]
    fn metadata_mismatch_invalidates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stash.json");
        save(&path, &test_snapshot()).unwrap();

        let mut other = test_metadata();
        other.num_blocks = 16;
        other.tree_height = 4;
        other.num_leaves = 16;
        assert!(load(&path, &other).is_none());
    }

    #[test]
    fn save_replaces_existing_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stash.json");
        save(&path, &test_snapshot()).unwrap();

        let mut second = test_snapshot();
        second.stash_blocks.clear();
        save(&path, &second).unwrap();

        let restored = load(&path, &test_metadata()).unwrap();
        assert!(restored.stash_blocks.is_empty());
    }
}
