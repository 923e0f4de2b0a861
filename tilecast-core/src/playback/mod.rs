//! Adaptive playback with failure recovery.
//!
//! [`PlaybackController`] is a synchronous state machine over one engine at a
//! time; [`spawn_player`] runs it on its own task and exposes it through a
//! cloneable [`PlayerHandle`].

pub mod bandwidth;
pub mod controller;
pub mod driver;
pub mod engine;
pub mod rate;
pub mod response;
pub mod retry;
pub mod selector;
pub mod session;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_mocks;

pub use bandwidth::{BandwidthEstimator, BandwidthSample};
pub use controller::{PlaybackController, PlayerSnapshot};
pub use driver::{PlayerCommand, PlayerHandle, spawn_player};
pub use engine::{
    EngineAdapter, EngineError, EngineErrorKind, EngineEvent, EngineEventSender, EngineFactory,
    EngineKind, PlaybackState, SessionEvent, SessionId,
};
pub use rate::{AdaptiveRateController, SpeedMode};
pub use response::ResponseTimeTracker;
pub use retry::{RetryAction, RetryCoordinator, RetryState};
pub use selector::EngineSelector;
pub use session::PlaybackSession;

use crate::catalog::TransportType;

/// Errors surfaced by playback operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlaybackError {
    #[error("Unsupported stream type \"{transport}\" for {link}")]
    UnsupportedTransport {
        transport: TransportType,
        link: String,
    },

    #[error("Source {source_name} has no variant {index}")]
    VariantNotFound { source_name: String, index: usize },

    #[error("No active playback session")]
    NoActiveSession,

    #[error("Player driver has shut down")]
    DriverShutdown,
}
