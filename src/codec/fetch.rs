//! codec::fetch
//!
//! Loading of documents named by remote `$ref`s.
//!
//! # Addresses
//!
//! The part of a `$ref` before `#` is an address:
//! - `http://` / `https://` - fetched over HTTP
//! - `file://` or an absolute path - read from disk
//! - anything else - relative to the referring document, or to the
//!   configured working directory for the top-level document
//!
//! # Example
//!
//! ```
//! use schemaref::codec::fetch::{MockFetcher, RefAddress, RefFetcher};
//! use serde_json::json;
//! use std::path::Path;
//!
//! # tokio_test::block_on(async {
//! let fetcher = MockFetcher::new();
//! fetcher.insert("/schemas/car.json", json!({"title": "Car"}));
//!
//! let address = RefAddress::resolve("car.json", None, Path::new("/schemas")).unwrap();
//! let doc = fetcher.fetch(&address).await.unwrap();
//! assert_eq!(doc["title"], "Car");
//! # });
//! ```

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use super::CodecError;
use crate::core::config::DEFAULT_HTTP_TIMEOUT;
use crate::core::sync::lock;

/// Location of a remote document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefAddress {
    Http(Url),
    File(PathBuf),
}

impl RefAddress {
    /// Classify the address part of a `$ref`.
    ///
    /// # Errors
    ///
    /// [`CodecError::UnresolvableRef`] for a malformed URL.
    pub fn resolve(raw: &str, base: Option<&RefAddress>, cwd: &Path) -> Result<Self, CodecError> {
        let unresolvable = |_| CodecError::UnresolvableRef(raw.to_string());

        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Url::parse(raw).map(RefAddress::Http).map_err(unresolvable);
        }
        if let Some(path) = raw.strip_prefix("file://") {
            return Ok(RefAddress::File(normalize(Path::new(path))));
        }
        if Path::new(raw).is_absolute() {
            return Ok(RefAddress::File(normalize(Path::new(raw))));
        }

        match base {
            Some(RefAddress::Http(url)) => url.join(raw).map(RefAddress::Http).map_err(unresolvable),
            Some(RefAddress::File(path)) => {
                let dir = path.parent().unwrap_or(cwd);
                Ok(RefAddress::File(normalize(&dir.join(raw))))
            }
            None => Ok(RefAddress::File(normalize(&cwd.join(raw)))),
        }
    }

    /// Cache key.
    pub fn key(&self) -> String {
        match self {
            RefAddress::Http(url) => url.to_string(),
            RefAddress::File(path) => path.display().to_string(),
        }
    }
}

impl std::fmt::Display for RefAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Split a `$ref` into its address and fragment.
pub fn split_ref(reference: &str) -> (&str, &str) {
    match reference.split_once('#') {
        Some((address, fragment)) => (address, fragment),
        None => (reference, ""),
    }
}

/// Lexically resolve `.` and `..` without touching the file system.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Source of remote documents.
#[async_trait]
pub trait RefFetcher: Send + Sync {
    /// Load and parse the document at `address`.
    ///
    /// # Errors
    ///
    /// [`CodecError::Fetch`] if the document cannot be loaded or is not JSON.
    async fn fetch(&self, address: &RefAddress) -> Result<Value, CodecError>;
}

/// Fetcher for files and HTTP(S).
#[derive(Debug, Clone)]
pub struct DefaultFetcher {
    client: reqwest::Client,
}

impl DefaultFetcher {
    pub fn new(timeout: Duration) -> Result<Self, CodecError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CodecError::Fetch {
                address: String::new(),
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }

    /// Fetcher with the default timeout.
    pub fn with_default_timeout() -> Result<Self, CodecError> {
        Self::new(DEFAULT_HTTP_TIMEOUT)
    }
}

#[async_trait]
impl RefFetcher for DefaultFetcher {
    async fn fetch(&self, address: &RefAddress) -> Result<Value, CodecError> {
        let failed = |message: String| CodecError::Fetch {
            address: address.key(),
            message,
        };
        tracing::debug!(%address, "fetching referenced document");

        match address {
            RefAddress::Http(url) => {
                let response = self
                    .client
                    .get(url.clone())
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| failed(e.to_string()))?;
                response.json::<Value>().await.map_err(|e| failed(e.to_string()))
            }
            RefAddress::File(path) => {
                let contents = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| failed(e.to_string()))?;
                serde_json::from_str(&contents).map_err(|e| failed(e.to_string()))
            }
        }
    }
}

/// In-memory fetcher for tests.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    inner: Arc<Mutex<MockFetcherInner>>,
}

#[derive(Debug, Default)]
struct MockFetcherInner {
    /// Documents by address key.
    documents: HashMap<String, Value>,
    /// Address keys in request order.
    requests: Vec<String>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `document` for the address with this key.
    pub fn insert(&self, key: impl Into<String>, document: Value) {
        lock(&self.inner).documents.insert(key.into(), document);
    }

    /// Every fetch so far, in order.
    pub fn requests(&self) -> Vec<String> {
        lock(&self.inner).requests.clone()
    }
}

#[async_trait]
impl RefFetcher for MockFetcher {
    async fn fetch(&self, address: &RefAddress) -> Result<Value, CodecError> {
        let key = address.key();
        let mut inner = lock(&self.inner);
        inner.requests.push(key.clone());
        inner
            .documents
            .get(&key)
            .cloned()
            .ok_or_else(|| CodecError::Fetch {
                address: key,
                message: "no such document".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    mod addresses {
        use super::*;

        #[test]
        fn http_kept_as_url() {
            let a = RefAddress::resolve("https://example.com/car.json", None, Path::new("/")).unwrap();
            assert_eq!(a.key(), "https://example.com/car.json");
        }

        #[test]
        fn relative_to_http_base() {
            let base = RefAddress::resolve("https://example.com/schemas/car.json", None, Path::new("/"))
                .unwrap();
            let a = RefAddress::resolve("wheel.json", Some(&base), Path::new("/")).unwrap();
            assert_eq!(a.key(), "https://example.com/schemas/wheel.json");
        }

        #[test]
        fn file_url_and_absolute_path() {
            let a = RefAddress::resolve("file:///tmp/./car.json", None, Path::new("/")).unwrap();
            assert_eq!(a, RefAddress::File(PathBuf::from("/tmp/car.json")));

            let b = RefAddress::resolve("/tmp/car.json", None, Path::new("/other")).unwrap();
            assert_eq!(a, b);
        }

        #[test]
        fn relative_to_file_base_then_cwd() {
            let base = RefAddress::File(PathBuf::from("/schemas/fleet/car.json"));
            let a = RefAddress::resolve("../shared/wheel.json", Some(&base), Path::new("/cwd")).unwrap();
            assert_eq!(a, RefAddress::File(PathBuf::from("/schemas/shared/wheel.json")));

            let b = RefAddress::resolve("wheel.json", None, Path::new("/cwd")).unwrap();
            assert_eq!(b, RefAddress::File(PathBuf::from("/cwd/wheel.json")));
        }

        #[test]
        fn split_ref_parts() {
            assert_eq!(split_ref("#/definitions/Car"), ("", "/definitions/Car"));
            assert_eq!(split_ref("car.json#/definitions/Car"), ("car.json", "/definitions/Car"));
            assert_eq!(split_ref("car.json"), ("car.json", ""));
            assert_eq!(split_ref("#car"), ("", "car"));
        }
    }

    mod mock {
        use super::*;

        #[tokio::test]
        async fn serves_and_records() {
            let fetcher = MockFetcher::new();
            fetcher.insert("/a.json", json!({"title": "A"}));

            let a = RefAddress::File(PathBuf::from("/a.json"));
            let b = RefAddress::File(PathBuf::from("/b.json"));

            assert_eq!(fetcher.fetch(&a).await.unwrap()["title"], "A");
            assert!(matches!(fetcher.fetch(&b).await, Err(CodecError::Fetch { .. })));
            assert_eq!(fetcher.requests(), ["/a.json", "/b.json"]);
        }
    }

    mod default_fetcher {
        use super::*;

        #[tokio::test]
        async fn reads_files() {
            let dir = tempfile::TempDir::new().unwrap();
            let path = dir.path().join("car.json");
            std::fs::write(&path, r#"{"title": "Car"}"#).unwrap();

            let fetcher = DefaultFetcher::with_default_timeout().unwrap();
            let doc = fetcher.fetch(&RefAddress::File(path)).await.unwrap();
            assert_eq!(doc, json!({"title": "Car"}));
        }

        #[tokio::test]
        async fn missing_file_is_fetch_error() {
            let fetcher = DefaultFetcher::with_default_timeout().unwrap();
            let err = fetcher
                .fetch(&RefAddress::File(PathBuf::from("/nonexistent/car.json")))
                .await
                .unwrap_err();
            assert!(err.to_string().contains("/nonexistent/car.json"));
        }
    }
}
