//! Command definitions for the player actor.

use tokio::sync::oneshot;

use crate::catalog::MediaSource;
use crate::playback::{PlaybackError, PlayerSnapshot, SessionId, SpeedMode};

/// Requests processed by the player actor, each with its response channel.
#[derive(Debug)]
pub enum PlayerCommand {
    /// Start playback of one variant of a source.
    Select {
        source: MediaSource,
        variant_index: usize,
        responder: oneshot::Sender<Result<SessionId, PlaybackError>>,
    },
    /// Switch between automatic and manual speed.
    SetSpeedMode {
        mode: SpeedMode,
        responder: oneshot::Sender<()>,
    },
    /// Reissue the current source immediately.
    Reload {
        responder: oneshot::Sender<Result<(), PlaybackError>>,
    },
    /// Read the controller state.
    Snapshot {
        responder: oneshot::Sender<PlayerSnapshot>,
    },
    /// Close the player view, releasing the engine.
    Close { responder: oneshot::Sender<()> },
    /// Close and stop the actor.
    Shutdown { responder: oneshot::Sender<()> },
}
