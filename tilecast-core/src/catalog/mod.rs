//! Media catalog: feed fetching, normalization and the catalog service.
//!
//! The backend serves a loosely typed JSON array of sources. This module turns
//! it into validated [`MediaSource`] values, keeps only transports the player
//! recognizes, and owns the "populate sources" workflow used by the launcher.

mod feed;
mod normalize;
mod service;
mod transport;

use serde::{Serialize, Serializer};

pub use feed::{CatalogFeed, FeedEndpoint, HttpCatalogFeed, export_catalog, load_local_catalog};
pub use normalize::{normalize, normalize_with_base};
pub use service::{CatalogService, SourceGroup, display_name, variant_labels};
pub use transport::TransportType;

/// Group name used for sources whose feed entry has no group.
pub const DEFAULT_GROUP: &str = "Other";

/// A selectable media source (channel, station or on-demand title).
///
/// Always holds at least one stream variant once produced by [`normalize`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaSource {
    pub name: String,
    pub group: String,
    #[serde(rename = "logo", serialize_with = "serialize_logo")]
    pub logo_url: Option<String>,
    pub streams: Vec<StreamVariant>,
}

impl MediaSource {
    /// Returns whether any variant is currently marked available.
    pub fn has_available_stream(&self) -> bool {
        self.streams.iter().any(|stream| stream.available)
    }

    /// Returns the group used for display, falling back to [`DEFAULT_GROUP`].
    pub fn display_group(&self) -> &str {
        if self.group.is_empty() {
            DEFAULT_GROUP
        } else {
            &self.group
        }
    }
}

/// One playable rendition of a source, such as a mirror or quality level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamVariant {
    pub id: String,
    pub link: String,
    pub available: bool,
    #[serde(skip)]
    pub transport: TransportType,
}

impl StreamVariant {
    /// Creates a variant, classifying its transport from the link.
    pub fn new(id: impl Into<String>, link: impl Into<String>, available: bool) -> Self {
        let link = link.into();
        let transport = TransportType::classify(&link);
        Self {
            id: id.into(),
            link,
            available,
            transport,
        }
    }
}

fn serialize_logo<S: Serializer>(logo: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(logo.as_deref().unwrap_or(""))
}

/// Errors raised while fetching or validating the catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog validation failed: {reason}")]
    Validation { reason: String },

    #[error("HTTP error {status} from {url}")]
    Http { url: String, status: u16 },

    #[error("Network error for {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Failed to parse catalog: {reason}")]
    Parse { reason: String },

    #[error("I/O error during {operation} on {path}: {source}")]
    Io {
        operation: String,
        path: String,
        #[source]
        source: std::io::Error,
    },
}
