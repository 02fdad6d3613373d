// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A remote object-store backend speaking plain HTTP.
//!
//! Objects live at `{endpoint}/{bucket}/{name}`; GET fetches, PUT stores,
//! and a GET of the bucket URL lists names as a JSON array. Credentials come
//! from an explicit configuration record, not ambient globals: the only
//! environment variable involved names the credentials *file*.

use super::{ApiLog, Backend, BackendError};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::thread;
use std::time::Duration;
use std::{env, fs};

/// Environment variable naming the credentials file consulted by
/// [`ObjectStoreConfig::from_env`].
pub const CREDENTIALS_ENV_VAR: &str = "ORAM_STORE_CREDENTIALS";

// Per-request deadline; a breach on write is a fatal access failure.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the remote object store.
#[derive(Clone, Debug, Deserialize)]
pub struct ObjectStoreConfig {
    /// Base URL of the store, e.g. `https://store.example.com`.
    pub endpoint: String,
    /// The flat namespace holding the ORAM tree.
    pub bucket: String,
    /// Optional bearer token sent with every request.
    #[serde(default)]
    pub token: Option<String>,
}

impl ObjectStoreConfig {
    /// Loads the configuration from a JSON credentials file.
    pub fn from_file(path: &Path) -> Result<Self, BackendError> {
        let bytes = fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|err| BackendError::InvalidCredentials(err.to_string()))
    }

    /// Loads the configuration from the file named by
    /// [`CREDENTIALS_ENV_VAR`].
    pub fn from_env() -> Result<Self, BackendError> {
        let path = env::var(CREDENTIALS_ENV_VAR).map_err(|_| BackendError::MissingCredentials)?;
        Self::from_file(Path::new(&path))
    }
}

/// Remote object-store backend over a blocking HTTP client.
#[derive(Debug)]
pub struct ObjectStoreBackend {
    client: Client,
    config: ObjectStoreConfig,
}

impl ObjectStoreBackend {
    /// Builds a backend for the store described by `config`.
    pub fn new(config: ObjectStoreConfig) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    fn bucket_url(&self) -> String {
        format!(
            "{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.bucket
        )
    }

    fn object_url(&self, name: &str) -> String {
        format!("{}/{}", self.bucket_url(), name)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl Backend for ObjectStoreBackend {
    fn read(&self, name: &str) -> (Vec<u8>, ApiLog) {
        let request = self.authorize(self.client.get(self.object_url(name)));
        match request.send() {
            Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                (Vec::new(), ApiLog::not_found(name))
            }
            Ok(response) if response.status().is_success() => match response.bytes() {
                Ok(bytes) => (bytes.to_vec(), ApiLog::get(name)),
                Err(err) => (Vec::new(), ApiLog::error(name, err.to_string())),
            },
            Ok(response) => (
                Vec::new(),
                ApiLog::error(name, format!("status {}", response.status())),
            ),
            Err(err) => (Vec::new(), ApiLog::error(name, err.to_string())),
        }
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<ApiLog, BackendError> {
        let request = self
            .authorize(self.client.put(self.object_url(name)))
            .body(bytes.to_vec());
        let response = request.send()?;
        if !response.status().is_success() {
            return Err(BackendError::UnexpectedStatus {
                name: name.to_string(),
                status: response.status().as_u16(),
            });
        }
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
        let response = self.authorize(self.client.get(self.bucket_url())).send()?;
        if !response.status().is_success() {
            return Err(BackendError::UnexpectedStatus {
                name: self.config.bucket.clone(),
                status: response.status().as_u16(),
            });
        }
        let mut names: Vec<String> = response.json()?;
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn test_config() -> ObjectStoreConfig {
        ObjectStoreConfig {
            endpoint: "https://store.example.com/".to_string(),
            bucket: "oram-bucket".to_string(),
            token: None,
        }
    }

    #[test]
    fn object_urls_are_flat_under_the_bucket() {
        let backend = ObjectStoreBackend::new(test_config()).unwrap();
        assert_eq!(
            backend.object_url("42"),
            "https://store.example.com/oram-bucket/42"
        );
        assert_eq!(backend.bucket_url(), "https://store.example.com/oram-bucket");
    }

    #[test]
    fn config_parses_from_credentials_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{"endpoint": "http://127.0.0.1:9000", "bucket": "tree", "token": "secret"}"#,
        )
        .unwrap();
        let config = ObjectStoreConfig::from_file(file.path()).unwrap();
        assert_eq!(config.endpoint, "http://127.0.0.1:9000");
        assert_eq!(config.bucket, "tree");
        assert_eq!(config.token.as_deref(), Some("secret"));
    }

    #[test]
    fn config_token_is_optional() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"endpoint": "http://127.0.0.1:9000", "bucket": "tree"}"#)
            .unwrap();
        let config = ObjectStoreConfig::from_file(file.path()).unwrap();
        assert!(config.token.is_none());
    }

    #[test]
    fn malformed_credentials_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"endpoint\": 7}").unwrap();
        assert!(matches!(
            ObjectStoreConfig::from_file(file.path()),
            Err(BackendError::InvalidCredentials(_))
        ));
    }
}
