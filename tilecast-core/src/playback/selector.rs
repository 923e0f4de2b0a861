//! Engine selection by transport type.

use std::collections::HashMap;
use std::sync::Arc;

use super::PlaybackError;
use super::engine::{EngineFactory, EngineKind};
use crate::catalog::TransportType;

/// Maps transport types to registered engine factories.
#[derive(Default, Clone)]
pub struct EngineSelector {
    factories: HashMap<EngineKind, Arc<dyn EngineFactory>>,
}

impl EngineSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under its own engine kind, replacing any previous one.
    pub fn with_factory(mut self, factory: Arc<dyn EngineFactory>) -> Self {
        self.register(factory);
        self
    }

    pub fn register(&mut self, factory: Arc<dyn EngineFactory>) {
        self.factories.insert(factory.kind(), factory);
    }

    /// Returns the factory able to play `transport`.
    ///
    /// # Errors
    /// - `PlaybackError::UnsupportedTransport` - Transport is unknown or no
    ///   engine for its family is registered
    pub fn select(
        &self,
        transport: TransportType,
        link: &str,
    ) -> Result<&dyn EngineFactory, PlaybackError> {
        EngineKind::for_transport(transport)
            .and_then(|kind| self.factories.get(&kind))
            .map(|factory| factory.as_ref())
            .ok_or_else(|| PlaybackError::UnsupportedTransport {
                transport,
                link: link.to_string(),
            })
    }

    /// Engine kinds with a registered factory.
    pub fn supported_kinds(&self) -> Vec<EngineKind> {
        let mut kinds: Vec<EngineKind> = self.factories.keys().copied().collect();
        kinds.sort_by_key(|kind| kind.as_str());
        kinds
    }
}

impl std::fmt::Debug for EngineSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSelector")
            .field("kinds", &self.supported_kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::test_mocks::{CallJournal, MockEngineFactory};

    #[test]
    fn test_select_by_transport() {
        let journal = CallJournal::new();
        let selector = EngineSelector::new()
            .with_factory(MockEngineFactory::new(EngineKind::Hls, journal.clone()))
            .with_factory(MockEngineFactory::new(EngineKind::Dash, journal));

        let factory = selector.select(TransportType::Hls, "a.m3u8").unwrap();
        assert_eq!(factory.kind(), EngineKind::Hls);

        let factory = selector.select(TransportType::Dash, "a.mpd").unwrap();
        assert_eq!(factory.kind(), EngineKind::Dash);
    }

    #[test]
    fn test_unknown_or_unregistered_is_unsupported() {
        let selector = EngineSelector::new()
            .with_factory(MockEngineFactory::new(EngineKind::Hls, CallJournal::new()));

        assert!(matches!(
            selector.select(TransportType::Unknown, "a.mp4"),
            Err(PlaybackError::UnsupportedTransport {
                transport: TransportType::Unknown,
                ..
            })
        ));
        assert!(matches!(
            selector.select(TransportType::Progressive, "a.mp3"),
            Err(PlaybackError::UnsupportedTransport { .. })
        ));
    }
}
