// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A local-directory backend: one file per object under a flat root.

use super::{ApiLog, Backend, BackendError};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::thread;

/// Stores each object as a file named after it directly under `root`.
#[derive(Debug)]
pub struct DirectoryBackend {
    root: PathBuf,
}

impl DirectoryBackend {
    /// Opens the backend rooted at `root`, creating the directory if
    /// missing.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn object_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Backend for DirectoryBackend {
    fn read(&self, name: &str) -> (Vec<u8>, ApiLog) {
        match fs::read(self.object_path(name)) {
            Ok(bytes) => (bytes, ApiLog::get(name)),
            Err(err) if err.kind() == ErrorKind::NotFound => (Vec::new(), ApiLog::not_found(name)),
            Err(err) => (Vec::new(), ApiLog::error(name, err.to_string())),
        }
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<ApiLog, BackendError> {
        fs::write(self.object_path(name), bytes)?;
        Ok(ApiLog::put(name))
    }

    // One worker per node; a path is at most L+1 nodes.
    fn read_multiple(&self, names: &[String]) -> Vec<(Vec<u8>, ApiLog)> {
        thread::scope(|scope| {
            let handles: Vec<_> = names
                .iter()
                .map(|name| scope.spawn(move || self.read(name)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("reader thread panicked"))
                .collect()
        })
    }

    fn write_multiple(
        &self,
        objects: &BTreeMap<String, Vec<u8>>,
    ) -> Result<Vec<ApiLog>, BackendError> {
        thread::scope(|scope| {
            let handles: Vec<_> = objects
                .iter()
                .map(|(name, bytes)| scope.spawn(move || self.write(name, bytes)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("writer thread panicked"))
                .collect()
        })
    }

    fn list_names(&self) -> Result<Vec<String>, BackendError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_through_the_filesystem() {
        let dir = tempdir().unwrap();
        let backend = DirectoryBackend::new(dir.path()).unwrap();
        backend.write("13", b"contents").unwrap();
        let (bytes, log) = backend.read("13");
        assert_eq!(bytes, b"contents");
        assert_eq!(log, ApiLog::get("13"));
    }

    #[test]
    fn absence_is_a_value() {
        let dir = tempdir().unwrap();
        let backend = DirectoryBackend::new(dir.path()).unwrap();
        let (bytes, log) = backend.read("99");
        assert!(bytes.is_empty());
        assert_eq!(log, ApiLog::not_found("99"));
    }

    #[test]
    fn multi_read_returns_every_requested_object() {
        let dir = tempdir().unwrap();
        let backend = DirectoryBackend::new(dir.path()).unwrap();
        backend.write("0", b"zero").unwrap();
        backend.write("2", b"two").unwrap();

        let names = vec!["0".to_string(), "1".to_string(), "2".to_string()];
        let mut results = backend.read_multiple(&names);
        results.sort_by(|a, b| a.1.name.cmp(&b.1.name));

        assert_eq!(results[0].0, b"zero");
        assert!(results[1].0.is_empty());
        assert_eq!(results[2].0, b"two");
    }

    #[test]
    fn multi_write_stores_every_object() {
        let dir = tempdir().unwrap();
        let backend = DirectoryBackend::new(dir.path()).unwrap();
        let objects: BTreeMap<String, Vec<u8>> = [
            ("4".to_string(), b"four".to_vec()),
            ("5".to_string(), b"five".to_vec()),
        ]
        .into();
        let logs = backend.write_multiple(&objects).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(backend.read("4").0, b"four");
        assert_eq!(backend.read("5").0, b"five");
    }

    #[test]
    fn list_names_is_sorted_and_complete() {
        let dir = tempdir().unwrap();
        let backend = DirectoryBackend::new(dir.path()).unwrap();
        for name in ["3", "1", "2"] {
            backend.write(name, b"x").unwrap();
        }
        assert_eq!(backend.list_names().unwrap(), vec!["1", "2", "3"]);
    }
}
