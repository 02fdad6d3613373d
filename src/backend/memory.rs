// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! An in-memory backend for tests and simulation.

use super::{ApiLog, Backend, BackendError};
use std::collections::HashMap;
use std::sync::Mutex;

/// A `HashMap`-backed store that also counts per-name reads and writes, so
/// tests can assert on the access pattern the backend observed.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    objects: HashMap<String, Vec<u8>>,
    reads: HashMap<String, u64>,
    writes: HashMap<String, u64>,
}

impl MemoryBackend {
    /// Returns an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns how many times `name` was fetched.
    pub fn read_count(&self, name: &str) -> u64 {
        self.lock().reads.get(name).copied().unwrap_or(0)
    }

    /// Returns how many times `name` was stored.
    pub fn write_count(&self, name: &str) -> u64 {
        self.lock().writes.get(name).copied().unwrap_or(0)
    }

    /// Returns the total number of fetches.
    pub fn total_reads(&self) -> u64 {
        self.lock().reads.values().sum()
    }

    /// Returns the total number of stores.
    pub fn total_writes(&self) -> u64 {
        self.lock().writes.values().sum()
    }

    /// Returns the number of stored objects.
    pub fn object_count(&self) -> usize {
        self.lock().objects.len()
    }
}

impl Backend for MemoryBackend {
    fn read(&self, name: &str) -> (Vec<u8>, ApiLog) {
        let mut inner = self.lock();
        *inner.reads.entry(name.to_string()).or_default() += 1;
        match inner.objects.get(name) {
            Some(bytes) => (bytes.clone(), ApiLog::get(name)),
            None => (Vec::new(), ApiLog::not_found(name)),
        }
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<ApiLog, BackendError> {
        let mut inner = self.lock();
        *inner.writes.entry(name.to_string()).or_default() += 1;
        inner.objects.insert(name.to_string(), bytes.to_vec());
        Ok(ApiLog::put(name))
    }

    fn list_names(&self) -> Result<Vec<String>, BackendError> {
        let mut names: Vec<String> = self.lock().objects.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_objects_read_as_empty_with_not_found_log() {
        let backend = MemoryBackend::new();
        let (bytes, log) = backend.read("42");
        assert!(bytes.is_empty());
        assert_eq!(log, ApiLog::not_found("42"));
    }

    #[test]
    fn written_objects_read_back() {
        let backend = MemoryBackend::new();
        backend.write("7", b"bucket bytes").unwrap();
        let (bytes, log) = backend.read("7");
        assert_eq!(bytes, b"bucket bytes");
        assert_eq!(log, ApiLog::get("7"));
    }

    #[test]
    fn counters_track_operations_per_name() {
        let backend = MemoryBackend::new();
        backend.write("0", b"a").unwrap();
        backend.write("0", b"b").unwrap();
        backend.read("0");
        backend.read("1");

        assert_eq!(backend.write_count("0"), 2);
        assert_eq!(backend.read_count("0"), 1);
        assert_eq!(backend.read_count("1"), 1);
        assert_eq!(backend.total_reads(), 2);
        assert_eq!(backend.total_writes(), 2);
        assert_eq!(backend.object_count(), 1);
    }

    #[test]
    fn list_names_is_sorted() {
        let backend = MemoryBackend::new();
        for name in ["10", "2", "1"] {
            backend.write(name, b"x").unwrap();
        }
        assert_eq!(backend.list_names().unwrap(), vec!["1", "10", "2"]);
    }
}
