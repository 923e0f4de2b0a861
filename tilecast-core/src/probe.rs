//! Stream availability probing.
//!
//! Lightweight `HEAD` checks decide which catalog sources are shown. A probe
//! never fails from the caller's point of view: every error resolves to
//! "unavailable".

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::catalog::MediaSource;
use crate::config::ProbeConfig;

/// Reasons a single probe could not confirm a URL.
#[derive(Debug, thiserror::Error)]
pub enum ProbeFailure {
    #[error("probe timed out for {url}")]
    Timeout { url: String },

    #[error("probe request failed for {url}: {reason}")]
    Request { url: String, reason: String },
}

/// Existence check against a single URL.
#[async_trait]
pub trait UrlProbe: Send + Sync {
    /// Returns whether the URL answered with a success or redirect status.
    ///
    /// # Errors
    /// - `ProbeFailure::Timeout` - No answer within the configured timeout
    /// - `ProbeFailure::Request` - Connection refused, DNS failure, invalid URL
    async fn probe(&self, url: &str) -> Result<bool, ProbeFailure>;
}

/// `HEAD` request probe over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpUrlProbe {
    client: reqwest::Client,
}

impl HttpUrlProbe {
    /// Creates a probe honoring the configured timeout.
    pub fn new(config: &ProbeConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default probe client: {}", e);
                reqwest::Client::new()
            });
        Self { client }
    }
}

#[async_trait]
impl UrlProbe for HttpUrlProbe {
    async fn probe(&self, url: &str) -> Result<bool, ProbeFailure> {
        let response = self.client.head(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeFailure::Timeout {
                    url: url.to_string(),
                }
            } else {
                ProbeFailure::Request {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        Ok(status.is_success() || status.is_redirection())
    }
}

/// Availability checks over a catalog, with feed-asserted short-circuiting.
#[derive(Clone)]
pub struct AvailabilityProbe {
    probe: Arc<dyn UrlProbe>,
    max_concurrent: usize,
}

impl AvailabilityProbe {
    /// Creates an availability probe over the given URL probe.
    pub fn new(probe: Arc<dyn UrlProbe>, config: &ProbeConfig) -> Self {
        Self {
            probe,
            max_concurrent: config.max_concurrent.max(1),
        }
    }

    /// Creates an availability probe issuing real `HEAD` requests.
    pub fn http(config: &ProbeConfig) -> Self {
        Self::new(Arc::new(HttpUrlProbe::new(config)), config)
    }

    /// Checks one URL, skipping the network when the feed already asserted it.
    ///
    /// A feed assertion may be stale; trusting it keeps probe volume down.
    pub async fn is_available(&self, url: &str, asserted: bool) -> bool {
        if asserted {
            return true;
        }

        match self.probe.probe(url).await {
            Ok(available) => {
                tracing::debug!("Probe {} -> {}", url, available);
                available
            }
            Err(e) => {
                tracing::debug!("Probe failed, treating as unavailable: {}", e);
                false
            }
        }
    }

    /// Probes every variant of every source concurrently.
    ///
    /// Each variant's `available` flag is overwritten with its probe result.
    /// Sources without any available variant are dropped; the order of the
    /// remaining sources is preserved.
    pub async fn probe_catalog(&self, mut sources: Vec<MediaSource>) -> Vec<MediaSource> {
        let checks: Vec<(usize, usize, String, bool)> = sources
            .iter()
            .enumerate()
            .flat_map(|(source_index, source)| {
                source
                    .streams
                    .iter()
                    .enumerate()
                    .map(move |(variant_index, variant)| {
                        (
                            source_index,
                            variant_index,
                            variant.link.clone(),
                            variant.available,
                        )
                    })
            })
            .collect();

        let total = checks.len();
        let results: Vec<(usize, usize, bool)> = stream::iter(checks)
            .map(|(source_index, variant_index, link, asserted)| async move {
                let available = self.is_available(&link, asserted).await;
                (source_index, variant_index, available)
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        for (source_index, variant_index, available) in results {
            sources[source_index].streams[variant_index].available = available;
        }

        let visible: Vec<MediaSource> = sources
            .into_iter()
            .filter(MediaSource::has_available_stream)
            .collect();

        tracing::info!(
            "Probed {} variants, {} sources visible",
            total,
            visible.len()
        );

        visible
    }
}

impl std::fmt::Debug for AvailabilityProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvailabilityProbe")
            .field("max_concurrent", &self.max_concurrent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::catalog::StreamVariant;

    /// Probe answering from a fixed set of live URLs and counting calls.
    struct StaticProbe {
        live: HashSet<String>,
        calls: AtomicUsize,
    }

    impl StaticProbe {
        fn new(live: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                live: live.iter().map(|s| s.to_string()).collect(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl UrlProbe for StaticProbe {
        async fn probe(&self, url: &str) -> Result<bool, ProbeFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.contains("refused") {
                return Err(ProbeFailure::Request {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                });
            }
            Ok(self.live.contains(url))
        }
    }

    fn source(name: &str, variants: &[(&str, bool)]) -> MediaSource {
        MediaSource {
            name: name.to_string(),
            group: String::new(),
            logo_url: None,
            streams: variants
                .iter()
                .enumerate()
                .map(|(i, (link, available))| StreamVariant::new(i.to_string(), *link, *available))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_asserted_availability_skips_network() {
        let url_probe = StaticProbe::new(&[]);
        let probe = AvailabilityProbe::new(url_probe.clone(), &ProbeConfig::default());

        assert!(probe.is_available("http://dead.example/x.m3u8", true).await);
        assert_eq!(url_probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_probe_errors_resolve_to_false() {
        let url_probe = StaticProbe::new(&[]);
        let probe = AvailabilityProbe::new(url_probe.clone(), &ProbeConfig::default());

        assert!(!probe.is_available("http://refused.example/x.m3u8", false).await);
        assert_eq!(url_probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_probe_catalog_hides_sources_without_live_variants() {
        let url_probe = StaticProbe::new(&["http://a/live.m3u8"]);
        let probe = AvailabilityProbe::new(url_probe.clone(), &ProbeConfig::default());

        let sources = vec![
            source("dead", &[("http://a/dead.m3u8", false), ("http://refused/x.mpd", false)]),
            source("live", &[("http://a/dead2.m3u8", false), ("http://a/live.m3u8", false)]),
            source("asserted", &[("http://a/other.mp3", true)]),
        ];

        let visible = probe.probe_catalog(sources).await;
        let names: Vec<&str> = visible.iter().map(|s| s.name.as_str()).collect();

        assert_eq!(names, vec!["live", "asserted"]);
        assert!(!visible[0].streams[0].available);
        assert!(visible[0].streams[1].available);
        assert_eq!(url_probe.calls.load(Ordering::SeqCst), 4);
    }
}
