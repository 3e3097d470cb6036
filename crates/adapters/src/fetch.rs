// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote workflow fetching

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use skein_workflow::RemoteRef;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from remote fetching
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("unexpected status {status} fetching {url}")]
    Status { status: u16, url: String },
    #[error("cache I/O error: {0}")]
    Cache(#[from] std::io::Error),
}

/// A fetched workflow document and where it came from.
#[derive(Debug, Clone)]
pub struct FetchedWorkflow {
    pub bytes: Vec<u8>,
    pub source_url: String,
}

/// Fetches workflow documents referenced by `github:` refs.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    async fn fetch(
        &self,
        reference: &RemoteRef,
        no_cache: bool,
    ) -> Result<FetchedWorkflow, FetchError>;
}

/// Fetcher backed by raw.githubusercontent.com.
///
/// Successful fetches are cached on disk keyed by URL; `no_cache` skips
/// the cache read but still refreshes the entry.
pub struct GithubFetcher {
    http: reqwest::Client,
    cache_dir: Option<PathBuf>,
}

impl GithubFetcher {
    pub fn new(cache_dir: Option<PathBuf>) -> Self {
        Self {
            http: reqwest::Client::new(),
            cache_dir,
        }
    }

    fn url_for(reference: &RemoteRef) -> String {
        format!(
            "https://raw.githubusercontent.com/{}/{}/{}/{}",
            reference.owner,
            reference.repo,
            reference.revision(),
            reference.file_path()
        )
    }

    fn cache_path(&self, url: &str) -> Option<PathBuf> {
        let dir = self.cache_dir.as_ref()?;
        let digest = Sha256::digest(url.as_bytes());
        Some(dir.join(format!("{digest:x}.yaml")))
    }
}

#[async_trait]
impl Fetcher for GithubFetcher {
    async fn fetch(
        &self,
        reference: &RemoteRef,
        no_cache: bool,
    ) -> Result<FetchedWorkflow, FetchError> {
        let url = Self::url_for(reference);

        if !no_cache {
            if let Some(path) = self.cache_path(&url) {
                if path.is_file() {
                    tracing::debug!(%url, "remote workflow served from cache");
                    return Ok(FetchedWorkflow {
                        bytes: std::fs::read(path)?,
                        source_url: url,
                    });
                }
            }
        }

        tracing::info!(%url, "fetching remote workflow");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?
            .to_vec();

        if let Some(path) = self.cache_path(&url) {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &bytes)?;
        }

        Ok(FetchedWorkflow {
            bytes,
            source_url: url,
        })
    }
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeFetcher;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Fake fetcher serving canned documents keyed by stringified ref.
    #[derive(Clone, Default)]
    pub struct FakeFetcher {
        inner: Arc<Mutex<FakeState>>,
    }

    #[derive(Default)]
    struct FakeState {
        documents: HashMap<String, Vec<u8>>,
        fetches: Vec<(String, bool)>,
    }

    impl FakeFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, reference: &str, bytes: &[u8]) {
            self.inner
                .lock()
                .documents
                .insert(reference.to_string(), bytes.to_vec());
        }

        /// (reference, no_cache) pairs in call order.
        pub fn fetches(&self) -> Vec<(String, bool)> {
            self.inner.lock().fetches.clone()
        }
    }

    #[async_trait]
    impl Fetcher for FakeFetcher {
        async fn fetch(
            &self,
            reference: &RemoteRef,
            no_cache: bool,
        ) -> Result<FetchedWorkflow, FetchError> {
            let key = reference.to_string();
            let mut state = self.inner.lock();
            state.fetches.push((key.clone(), no_cache));
            match state.documents.get(&key) {
                Some(bytes) => Ok(FetchedWorkflow {
                    bytes: bytes.clone(),
                    source_url: format!("fake://{key}"),
                }),
                None => Err(FetchError::Status {
                    status: 404,
                    url: key,
                }),
            }
        }
    }
}

#[cfg(test)]
#[path = "fetch_tests.rs"]
mod tests;
