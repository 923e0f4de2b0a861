//! Catalog service: the "populate sources" workflow and its status line.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::feed::{CatalogFeed, FeedEndpoint, load_local_catalog};
use super::normalize::{normalize, normalize_with_base};
use super::{CatalogError, MediaSource};
use crate::config::FeedConfig;
use crate::probe::AvailabilityProbe;

/// Maximum characters of a source name shown on a tile.
const TILE_NAME_LIMIT: usize = 30;

/// Sources sharing a group, in feed order.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceGroup<'a> {
    pub name: &'a str,
    pub sources: Vec<&'a MediaSource>,
}

impl SourceGroup<'_> {
    /// Header label with the number of visible sources, e.g. `News (3)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.sources.len())
    }
}

/// Owns the current catalog and refreshes it from a feed.
///
/// A failed refresh leaves the previous catalog in place and only updates
/// the status line.
pub struct CatalogService {
    feed: Arc<dyn CatalogFeed>,
    probe: AvailabilityProbe,
    fallback_catalog: Option<PathBuf>,
    sources: Vec<MediaSource>,
    status: String,
    fetched_at: Option<DateTime<Utc>>,
}

impl CatalogService {
    /// Creates a service with an empty catalog.
    pub fn new(feed: Arc<dyn CatalogFeed>, probe: AvailabilityProbe, config: &FeedConfig) -> Self {
        Self {
            feed,
            probe,
            fallback_catalog: config.fallback_catalog.clone(),
            sources: Vec::new(),
            status: String::new(),
            fetched_at: None,
        }
    }

    /// Loads the bundled fallback catalog if no network fetch succeeded yet.
    ///
    /// Returns the number of sources now in the catalog. Fallback entries are
    /// not probed; they are shown as the feed asserted them.
    ///
    /// # Errors
    /// - `CatalogError::Io` - Fallback file cannot be read
    /// - `CatalogError::Parse` - Fallback file is not valid JSON
    /// - `CatalogError::Validation` - Fallback document is not an array
    pub async fn load_fallback(&mut self) -> Result<usize, CatalogError> {
        if self.fetched_at.is_some() {
            return Ok(self.sources.len());
        }
        let Some(path) = self.fallback_catalog.clone() else {
            return Ok(self.sources.len());
        };

        let raw = load_local_catalog(&path).await?;
        self.sources = normalize(&raw)?;
        self.status = format!("Loaded {} streams from local catalog", self.sources.len());
        tracing::info!("Loaded fallback catalog from {}", path.display());

        Ok(self.sources.len())
    }

    /// Fetches, normalizes and probes the catalog from the given endpoint.
    ///
    /// # Errors
    /// - `CatalogError::Http` / `CatalogError::Network` - Feed unreachable
    /// - `CatalogError::Parse` - Response is not JSON
    /// - `CatalogError::Validation` - Response is not an array
    pub async fn refresh(&mut self, endpoint: FeedEndpoint) -> Result<&[MediaSource], CatalogError> {
        self.status = format!("Fetching stream list from {endpoint}...");
        tracing::info!("Refreshing catalog from {}", endpoint);

        let fetched = match self.fetch_normalized(endpoint).await {
            Ok(sources) => sources,
            Err(e) => {
                self.status = format!("Failed to load streams: {e}");
                tracing::warn!("Catalog refresh failed, keeping previous catalog: {}", e);
                return Err(e);
            }
        };

        self.fetched_at = Some(Utc::now());
        if fetched.is_empty() {
            self.sources = Vec::new();
            self.status = "No supported streams found from API.".to_string();
            return Ok(&self.sources);
        }

        self.sources = self.probe.probe_catalog(fetched).await;
        self.status = format!("Loaded {} streams", self.sources.len());
        Ok(&self.sources)
    }

    async fn fetch_normalized(
        &self,
        endpoint: FeedEndpoint,
    ) -> Result<Vec<MediaSource>, CatalogError> {
        let raw = self.feed.fetch(endpoint).await?;
        normalize_with_base(&raw, self.feed.base_url())
    }

    /// Current catalog.
    pub fn sources(&self) -> &[MediaSource] {
        &self.sources
    }

    /// Current status line.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Time of the last successful network refresh.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    /// Finds a source by exact name.
    pub fn find(&self, name: &str) -> Option<&MediaSource> {
        self.sources.iter().find(|source| source.name == name)
    }

    /// Groups the catalog by display group, in order of first appearance.
    pub fn groups(&self) -> Vec<SourceGroup<'_>> {
        let mut groups: Vec<SourceGroup<'_>> = Vec::new();
        for source in &self.sources {
            let name = source.display_group();
            match groups.iter_mut().find(|group| group.name == name) {
                Some(group) => group.sources.push(source),
                None => groups.push(SourceGroup {
                    name,
                    sources: vec![source],
                }),
            }
        }
        groups
    }
}

/// Tile label for a source name, truncated with an ellipsis.
pub fn display_name(name: &str) -> String {
    if name.chars().count() > TILE_NAME_LIMIT {
        let truncated: String = name.chars().take(TILE_NAME_LIMIT).collect();
        format!("{truncated}…")
    } else {
        name.to_string()
    }
}

/// Picker labels for the variants of a source, e.g. `hd 0 (unavailable)`.
pub fn variant_labels(source: &MediaSource) -> Vec<String> {
    source
        .streams
        .iter()
        .enumerate()
        .map(|(index, stream)| {
            let suffix = if stream.available { "" } else { " (unavailable)" };
            format!("{} {index}{suffix}", stream.id)
        })
        .collect()
}
