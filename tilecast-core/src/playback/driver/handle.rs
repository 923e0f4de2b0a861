//! Handle for communicating with the player actor.

use tokio::sync::{mpsc, oneshot, watch};

use super::commands::PlayerCommand;
use crate::catalog::MediaSource;
use crate::playback::{PlaybackError, PlayerSnapshot, SessionId, SpeedMode};

/// Cloneable async front end of a running player.
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    sender: mpsc::Sender<PlayerCommand>,
    diagnostics: watch::Receiver<String>,
}

impl PlayerHandle {
    pub fn new(sender: mpsc::Sender<PlayerCommand>, diagnostics: watch::Receiver<String>) -> Self {
        Self {
            sender,
            diagnostics,
        }
    }

    /// Selects a variant of a source, tearing down whatever was playing.
    ///
    /// # Errors
    /// - `PlaybackError::VariantNotFound` - Source has no such variant
    /// - `PlaybackError::UnsupportedTransport` - No engine for the variant
    /// - `PlaybackError::DriverShutdown` - Actor is no longer running
    pub async fn select(
        &self,
        source: MediaSource,
        variant_index: usize,
    ) -> Result<SessionId, PlaybackError> {
        let (responder, rx) = oneshot::channel();
        let cmd = PlayerCommand::Select {
            source,
            variant_index,
            responder,
        };

        self.sender
            .send(cmd)
            .await
            .map_err(|_| PlaybackError::DriverShutdown)?;

        rx.await.map_err(|_| PlaybackError::DriverShutdown)?
    }

    /// Switches the speed mode.
    ///
    /// # Errors
    /// - `PlaybackError::DriverShutdown` - Actor is no longer running
    pub async fn set_speed_mode(&self, mode: SpeedMode) -> Result<(), PlaybackError> {
        let (responder, rx) = oneshot::channel();
        self.sender
            .send(PlayerCommand::SetSpeedMode { mode, responder })
            .await
            .map_err(|_| PlaybackError::DriverShutdown)?;

        rx.await.map_err(|_| PlaybackError::DriverShutdown)
    }

    /// Reissues the current source.
    ///
    /// # Errors
    /// - `PlaybackError::NoActiveSession` - Nothing is playing
    /// - `PlaybackError::DriverShutdown` - Actor is no longer running
    pub async fn reload(&self) -> Result<(), PlaybackError> {
        let (responder, rx) = oneshot::channel();
        self.sender
            .send(PlayerCommand::Reload { responder })
            .await
            .map_err(|_| PlaybackError::DriverShutdown)?;

        rx.await.map_err(|_| PlaybackError::DriverShutdown)?
    }

    /// Current controller state.
    ///
    /// # Errors
    /// - `PlaybackError::DriverShutdown` - Actor is no longer running
    pub async fn snapshot(&self) -> Result<PlayerSnapshot, PlaybackError> {
        let (responder, rx) = oneshot::channel();
        self.sender
            .send(PlayerCommand::Snapshot { responder })
            .await
            .map_err(|_| PlaybackError::DriverShutdown)?;

        rx.await.map_err(|_| PlaybackError::DriverShutdown)
    }

    /// Closes the player view. The actor keeps running.
    ///
    /// # Errors
    /// - `PlaybackError::DriverShutdown` - Actor is no longer running
    pub async fn close(&self) -> Result<(), PlaybackError> {
        let (responder, rx) = oneshot::channel();
        self.sender
            .send(PlayerCommand::Close { responder })
            .await
            .map_err(|_| PlaybackError::DriverShutdown)?;

        rx.await.map_err(|_| PlaybackError::DriverShutdown)
    }

    /// Stops the actor after releasing any engine.
    ///
    /// # Errors
    /// - `PlaybackError::DriverShutdown` - Actor already stopped
    pub async fn shutdown(&self) -> Result<(), PlaybackError> {
        let (responder, rx) = oneshot::channel();
        self.sender
            .send(PlayerCommand::Shutdown { responder })
            .await
            .map_err(|_| PlaybackError::DriverShutdown)?;

        rx.await.map_err(|_| PlaybackError::DriverShutdown)
    }

    /// Subscribes to the diagnostics label, updated on every tick.
    pub fn diagnostics(&self) -> watch::Receiver<String> {
        self.diagnostics.clone()
    }

    /// Checks if the actor is still accepting commands.
    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }
}
