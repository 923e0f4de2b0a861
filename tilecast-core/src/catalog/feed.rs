//! Catalog feed access: backend API, bundled fallback file and export.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use super::{CatalogError, MediaSource};
use crate::config::FeedConfig;

/// Backend endpoint serving the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedEndpoint {
    /// Current catalog as stored by the backend
    Streams,
    /// Forces the backend to re-derive and re-validate the catalog
    Resync,
}

impl FeedEndpoint {
    /// Path of the endpoint relative to the feed base URL.
    pub fn path(&self) -> &'static str {
        match self {
            FeedEndpoint::Streams => "api/streams",
            FeedEndpoint::Resync => "api/resync",
        }
    }
}

impl fmt::Display for FeedEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Source of raw catalog documents.
///
/// Implementations return the undecoded JSON document; shape validation is
/// left to [`super::normalize`].
#[async_trait]
pub trait CatalogFeed: Send + Sync {
    /// Fetches the raw catalog from the given endpoint.
    ///
    /// # Errors
    /// - `CatalogError::Http` - Backend answered with a non-success status
    /// - `CatalogError::Network` - Backend could not be reached
    /// - `CatalogError::Parse` - Body is not valid JSON
    async fn fetch(&self, endpoint: FeedEndpoint) -> Result<Value, CatalogError>;

    /// Base URL relative stream links resolve against, if any.
    fn base_url(&self) -> Option<&Url> {
        None
    }
}

/// Catalog feed backed by the launcher's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpCatalogFeed {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpCatalogFeed {
    /// Creates a feed client from configuration.
    ///
    /// # Errors
    /// - `CatalogError::Validation` - Base URL is not a valid absolute URL
    /// - `CatalogError::Network` - HTTP client could not be built
    pub fn new(config: &FeedConfig) -> Result<Self, CatalogError> {
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| CatalogError::Validation {
            reason: format!("invalid feed base URL {}: {e}", config.base_url),
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| CatalogError::Network {
                url: base_url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self { client, base_url })
    }

    /// Full URL of an endpoint.
    ///
    /// # Errors
    /// - `CatalogError::Validation` - Endpoint cannot be joined onto the base URL
    pub fn endpoint_url(&self, endpoint: FeedEndpoint) -> Result<Url, CatalogError> {
        self.base_url
            .join(endpoint.path())
            .map_err(|e| CatalogError::Validation {
                reason: format!("cannot build {endpoint} URL: {e}"),
            })
    }
}

#[async_trait]
impl CatalogFeed for HttpCatalogFeed {
    async fn fetch(&self, endpoint: FeedEndpoint) -> Result<Value, CatalogError> {
        let url = self.endpoint_url(endpoint)?;
        tracing::debug!("Fetching catalog from {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| CatalogError::Network {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| CatalogError::Parse {
                reason: format!("{url}: {e}"),
            })
    }

    fn base_url(&self) -> Option<&Url> {
        Some(&self.base_url)
    }
}

/// Loads the bundled fallback catalog document from disk.
///
/// # Errors
/// - `CatalogError::Io` - File cannot be read
/// - `CatalogError::Parse` - File is not valid JSON
pub async fn load_local_catalog(path: &Path) -> Result<Value, CatalogError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CatalogError::Io {
            operation: "read".to_string(),
            path: path.display().to_string(),
            source,
        })?;

    serde_json::from_str(&contents).map_err(|e| CatalogError::Parse {
        reason: format!("{}: {e}", path.display()),
    })
}

/// Writes the catalog as pretty-printed JSON in the feed's own shape.
///
/// The exported file can be served back as a fallback catalog.
///
/// # Errors
/// - `CatalogError::Parse` - Catalog cannot be serialized
/// - `CatalogError::Io` - File cannot be written
pub async fn export_catalog(sources: &[MediaSource], path: &Path) -> Result<(), CatalogError> {
    let json = serde_json::to_string_pretty(sources).map_err(|e| CatalogError::Parse {
        reason: e.to_string(),
    })?;

    tokio::fs::write(path, json)
        .await
        .map_err(|source| CatalogError::Io {
            operation: "write".to_string(),
            path: path.display().to_string(),
            source,
        })?;

    tracing::info!("Exported {} sources to {}", sources.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{StreamVariant, normalize};

    #[test]
    fn test_endpoint_urls_append_to_base() {
        let config = FeedConfig {
            base_url: "http://tv.local:8080/launcher".to_string(),
            ..FeedConfig::default()
        };
        let feed = HttpCatalogFeed::new(&config).unwrap();

        assert_eq!(
            feed.endpoint_url(FeedEndpoint::Streams).unwrap().as_str(),
            "http://tv.local:8080/launcher/api/streams"
        );
        assert_eq!(
            feed.endpoint_url(FeedEndpoint::Resync).unwrap().as_str(),
            "http://tv.local:8080/launcher/api/resync"
        );
    }

    #[test]
    fn test_invalid_base_url_is_validation_error() {
        let config = FeedConfig {
            base_url: "not a url".to_string(),
            ..FeedConfig::default()
        };

        assert!(matches!(
            HttpCatalogFeed::new(&config),
            Err(CatalogError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_export_then_load_local() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let sources = vec![MediaSource {
            name: "News".to_string(),
            group: "TV".to_string(),
            logo_url: Some("http://a/logo.png".to_string()),
            streams: vec![StreamVariant::new("n1", "http://a/news.m3u8", true)],
        }];

        export_catalog(&sources, &path).await.unwrap();
        let text = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(text.contains("\n  {"), "export should be indented");

        let raw = load_local_catalog(&path).await.unwrap();
        assert_eq!(normalize(&raw).unwrap(), sources);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_io_error() {
        let result = load_local_catalog(Path::new("/nonexistent/tilecast.json")).await;
        assert!(matches!(result, Err(CatalogError::Io { .. })));
    }
}
