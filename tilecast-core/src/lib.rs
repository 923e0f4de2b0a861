//! Tilecast Core - Catalog and adaptive playback functionality
//!
//! This crate provides the building blocks of the Tilecast launcher: catalog
//! fetching and normalization, stream availability probing, and the adaptive
//! playback controller with failure recovery that drives external playback
//! engines.

pub mod catalog;
pub mod config;
pub mod playback;
pub mod probe;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use catalog::{CatalogError, CatalogService, MediaSource, StreamVariant, TransportType};
pub use config::TilecastConfig;
pub use playback::{
    EngineAdapter, EngineError, EngineErrorKind, EngineEvent, PlaybackController, PlaybackError,
    PlayerHandle, spawn_player,
};
pub use probe::{AvailabilityProbe, HttpUrlProbe, UrlProbe};

/// Errors that can bubble up from any Tilecast subsystem.
#[derive(Debug, thiserror::Error)]
pub enum TilecastError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TilecastError {
    /// Returns a user-friendly error message suitable for a status line.
    pub fn user_message(&self) -> String {
        match self {
            TilecastError::Catalog(e) => match e {
                CatalogError::Validation { .. } => {
                    "Failed to load streams: API response is not an array.".to_string()
                }
                CatalogError::Http { url, status } => {
                    format!("Failed to load streams: HTTP error {status} from {url}")
                }
                CatalogError::Network { url, .. } => {
                    format!("Failed to load streams: could not reach {url}")
                }
                _ => "Failed to load streams".to_string(),
            },
            TilecastError::Playback(e) => match e {
                PlaybackError::UnsupportedTransport { transport, .. } => {
                    format!("Unsupported stream type: \"{transport}\"")
                }
                _ => "Playback error occurred".to_string(),
            },
            TilecastError::Configuration { .. } => "Configuration error occurred".to_string(),
            TilecastError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            TilecastError::Configuration { .. }
                | TilecastError::Playback(PlaybackError::VariantNotFound { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, TilecastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_for_validation_error() {
        let error = TilecastError::from(CatalogError::Validation {
            reason: "expected array".to_string(),
        });

        assert_eq!(
            error.user_message(),
            "Failed to load streams: API response is not an array."
        );
        assert!(!error.is_user_error());
    }

    #[test]
    fn test_user_message_for_unsupported_transport() {
        let error = TilecastError::from(PlaybackError::UnsupportedTransport {
            transport: TransportType::Unknown,
            link: "http://example.com/a.mp4".to_string(),
        });

        assert_eq!(error.user_message(), "Unsupported stream type: \"unknown\"");
    }

    #[test]
    fn test_variant_not_found_is_user_error() {
        let error = TilecastError::from(PlaybackError::VariantNotFound {
            source_name: "News".to_string(),
            index: 4,
        });

        assert!(error.is_user_error());
    }
}
