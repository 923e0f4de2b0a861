//! Playback engine contract.
//!
//! Decoding and networking live in external engines (a native media player, a
//! browser HLS/DASH library). Each one is bound through [`EngineAdapter`] so
//! the controller logic is written and tested once. Engine callbacks are
//! delivered as [`EngineEvent`]s on a channel and processed on the
//! controller's task, never inline.

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::catalog::TransportType;

/// Identifier of one playback session, unique per controller.
pub type SessionId = u64;

/// Engine family selected from a transport type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKind {
    Hls,
    Dash,
    Progressive,
}

impl EngineKind {
    /// Engine family able to play the transport, if any.
    pub fn for_transport(transport: TransportType) -> Option<Self> {
        match transport {
            TransportType::Hls => Some(EngineKind::Hls),
            TransportType::Dash => Some(EngineKind::Dash),
            TransportType::Progressive => Some(EngineKind::Progressive),
            TransportType::Unknown => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Hls => "hls",
            EngineKind::Dash => "dash",
            EngineKind::Progressive => "progressive",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse engine playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Buffering,
    Ready,
    Ended,
}

/// Classified engine failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    /// Resource missing (HTTP 404 and friends)
    NotFound,
    /// Host unreachable or connection refused
    ConnectionRefused,
    /// Other I/O failure while loading
    Io,
    /// Decoder, DRM or anything else the retry loop cannot fix
    Other,
}

/// Error reported by a playback engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineError {
    /// Creates an error with a structured kind supplied by the adapter.
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classifies an engine error from its message text.
    ///
    /// Fallback for engines without structured error codes. Message matching
    /// is fragile across engine versions and locales, so adapters should
    /// prefer [`EngineError::new`] whenever a code is available.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        let kind = if lower.contains("404") || lower.contains("not found") {
            EngineErrorKind::NotFound
        } else if lower.contains("unable to connect") || lower.contains("connection refused") {
            EngineErrorKind::ConnectionRefused
        } else if lower.contains("i/o") || lower.contains("io error") || lower.contains("ioexception")
        {
            EngineErrorKind::Io
        } else {
            EngineErrorKind::Other
        };

        Self { kind, message }
    }

    /// Whether the retry coordinator should react to this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self.kind, EngineErrorKind::Other)
    }
}

/// Callback payloads emitted by an engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Error(EngineError),
    StateChanged(PlaybackState),
    IsPlayingChanged(bool),
}

/// Engine event stamped with the session that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub session: SessionId,
    pub event: EngineEvent,
}

/// Sender handed to an engine adapter for its callbacks.
#[derive(Debug, Clone)]
pub struct EngineEventSender {
    session: SessionId,
    sender: mpsc::UnboundedSender<SessionEvent>,
}

impl EngineEventSender {
    pub fn new(session: SessionId, sender: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { session, sender }
    }

    /// Session the engine belongs to.
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Queues an event for the controller.
    ///
    /// Returns false once the controller is gone; engines may ignore that.
    pub fn send(&self, event: EngineEvent) -> bool {
        self.sender
            .send(SessionEvent {
                session: self.session,
                event,
            })
            .is_ok()
    }
}

/// Binding to one concrete playback engine instance.
///
/// All methods are called from the controller's task. `release` must be
/// idempotent: releasing an already released engine is a no-op.
pub trait EngineAdapter: Send {
    fn set_source(&mut self, url: &str);
    fn prepare(&mut self);
    fn play(&mut self);
    fn release(&mut self);

    /// Playback position within the media.
    fn current_position(&self) -> Duration;
    /// Position up to which media has been downloaded.
    fn buffered_position(&self) -> Duration;
    /// Engine's rolling throughput estimate in bits per second.
    fn bitrate_estimate(&self) -> f64;

    fn playback_speed(&self) -> f32;
    fn set_speed(&mut self, factor: f32);
    fn is_playing(&self) -> bool;
}

/// Constructs engines of one family.
pub trait EngineFactory: Send + Sync {
    fn kind(&self) -> EngineKind;

    /// Builds a fresh engine wired to the given event sender.
    fn create(&self, events: EngineEventSender) -> Box<dyn EngineAdapter>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_classification() {
        let cases = [
            ("Response code: 404", EngineErrorKind::NotFound),
            ("HTTP/1.1 Not Found", EngineErrorKind::NotFound),
            ("Unable to connect to host", EngineErrorKind::ConnectionRefused),
            ("java.io.IOException: stream closed", EngineErrorKind::Io),
            ("Decoder init failed", EngineErrorKind::Other),
        ];

        for (message, kind) in cases {
            assert_eq!(EngineError::from_message(message).kind, kind, "{message}");
        }
    }

    #[test]
    fn test_only_other_is_non_fatal() {
        assert!(EngineError::new(EngineErrorKind::Io, "x").is_fatal());
        assert!(EngineError::new(EngineErrorKind::ConnectionRefused, "x").is_fatal());
        assert!(!EngineError::new(EngineErrorKind::Other, "x").is_fatal());
    }

    #[test]
    fn test_event_sender_stamps_session() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sender = EngineEventSender::new(7, tx);

        assert!(sender.send(EngineEvent::IsPlayingChanged(true)));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.session, 7);
        assert_eq!(event.event, EngineEvent::IsPlayingChanged(true));

        drop(rx);
        assert!(!sender.send(EngineEvent::IsPlayingChanged(false)));
    }

    #[test]
    fn test_unknown_transport_has_no_engine() {
        assert_eq!(EngineKind::for_transport(TransportType::Unknown), None);
        assert_eq!(
            EngineKind::for_transport(TransportType::Progressive),
            Some(EngineKind::Progressive)
        );
    }
}
