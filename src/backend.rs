// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Storage backends: opaque named blobs on an untrusted store.
//!
//! The ORAM engine only ever reads and writes decimal node ids within a flat
//! namespace; logical block indices never reach the backend. Absence of an
//! object is a value, not an error: a node that was never written must be
//! indistinguishable from a cleared one.

mod directory;
mod memory;
mod object_store;

pub use directory::DirectoryBackend;
pub use memory::MemoryBackend;
pub use object_store::{ObjectStoreBackend, ObjectStoreConfig, CREDENTIALS_ENV_VAR};

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Returned when a backend operation fails in a way the engine cannot
/// absorb (writes, listing, configuration).
#[derive(Debug, Error)]
pub enum BackendError {
    /// A filesystem operation failed.
    #[error("backend I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// An HTTP request failed outright (connection, deadline, TLS).
    #[error("backend HTTP failure: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote store answered with an unexpected status.
    #[error("backend rejected {name}: status {status}")]
    UnexpectedStatus {
        /// The object the request addressed.
        name: String,
        /// The HTTP status code received.
        status: u16,
    },

    /// The credentials file could not be parsed.
    #[error("malformed credentials: {0}")]
    InvalidCredentials(String),

    /// No credentials file location was configured.
    #[error("ORAM_STORE_CREDENTIALS is not set")]
    MissingCredentials,
}

/// The verb of one observable backend operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogVerb {
    /// An object fetch.
    Get,
    /// An object store.
    Put,
    /// A failed operation, absorbed by the engine.
    Error,
}

impl fmt::Display for LogVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogVerb::Get => f.write_str("GET"),
            LogVerb::Put => f.write_str("PUT"),
            LogVerb::Error => f.write_str("ERROR"),
        }
    }
}

/// A short structured record of one backend operation, returned to the
/// caller for observability. Logs never carry payloads or key material.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApiLog {
    /// What the backend did.
    pub verb: LogVerb,
    /// The object the operation addressed.
    pub name: String,
    /// Optional context, e.g. "not found" or an error message.
    pub detail: Option<String>,
}

impl ApiLog {
    /// Records a successful fetch of `name`.
    pub fn get(name: &str) -> Self {
        Self {
            verb: LogVerb::Get,
            name: name.to_string(),
            detail: None,
        }
    }

    /// Records a fetch of `name` that found nothing.
    pub fn not_found(name: &str) -> Self {
        Self {
            verb: LogVerb::Get,
            name: name.to_string(),
            detail: Some("not found".to_string()),
        }
    }

    /// Records a successful store of `name`.
    pub fn put(name: &str) -> Self {
        Self {
            verb: LogVerb::Put,
            name: name.to_string(),
            detail: None,
        }
    }

    /// Records a failed operation on `name`.
    pub fn error(name: &str, detail: impl Into<String>) -> Self {
        Self {
            verb: LogVerb::Error,
            name: name.to_string(),
            detail: Some(detail.into()),
        }
    }
}

/// Read/write opaque named blobs; list names.
///
/// Implementations provide the atomic `read`/`write`; the multi-object
/// operations default to sequential dispatch and may be overridden with
/// parallel dispatch. `read_multiple` results are *not* required to come
/// back in input order — the engine identifies buckets by their content.
pub trait Backend: Send + Sync {
    /// Fetches the object at `name`. Absence and read failures both yield an
    /// empty byte vector plus a log describing what happened; a read never
    /// fails the access.
    fn read(&self, name: &str) -> (Vec<u8>, ApiLog);

    /// Overwrites or creates the object at `name`.
    fn write(&self, name: &str, bytes: &[u8]) -> Result<ApiLog, BackendError>;

    /// Fetches several objects; result order is unspecified.
    fn read_multiple(&self, names: &[String]) -> Vec<(Vec<u8>, ApiLog)> {
        names.iter().map(|name| self.read(name)).collect()
    }

    /// Stores several objects; the first failure aborts.
    fn write_multiple(
        &self,
        objects: &BTreeMap<String, Vec<u8>>,
    ) -> Result<Vec<ApiLog>, BackendError> {
        objects
            .iter()
            .map(|(name, bytes)| self.write(name, bytes))
            .collect()
    }

    /// Lists every object name in ascending order. Unused by the ORAM
    /// engine itself; exposed for collaborators sharing the namespace.
    fn list_names(&self) -> Result<Vec<String>, BackendError>;
}
