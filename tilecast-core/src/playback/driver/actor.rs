//! Actor implementation for the player.

use std::time::Instant;

use tokio::sync::{mpsc, watch};

use super::commands::PlayerCommand;
use super::handle::PlayerHandle;
use crate::config::PlaybackConfig;
use crate::playback::{EngineSelector, PlaybackController, SessionEvent};

/// Spawns the player actor and returns its handle.
///
/// The actor owns a [`PlaybackController`] and processes commands, engine
/// events and timer expiry one at a time on a single task.
///
/// # Examples
/// ```rust,no_run
/// # #[tokio::main]
/// # async fn main() {
/// use tilecast_core::config::PlaybackConfig;
/// use tilecast_core::playback::{EngineSelector, spawn_player};
///
/// let handle = spawn_player(PlaybackConfig::default(), EngineSelector::new());
/// let snapshot = handle.snapshot().await.unwrap();
/// assert!(snapshot.session.is_none());
/// # }
/// ```
pub fn spawn_player(config: PlaybackConfig, selector: EngineSelector) -> PlayerHandle {
    let (sender, receiver) = mpsc::channel(32);
    let (event_sender, event_receiver) = mpsc::unbounded_channel();
    let (diagnostics_sender, diagnostics_receiver) = watch::channel(String::new());
    let controller = PlaybackController::new(config, selector, event_sender);

    tokio::spawn(async move {
        run_player_loop(controller, receiver, event_receiver, diagnostics_sender).await;
    });

    PlayerHandle::new(sender, diagnostics_receiver)
}

/// Runs the player loop until shutdown or until every handle is dropped.
async fn run_player_loop(
    mut controller: PlaybackController,
    mut receiver: mpsc::Receiver<PlayerCommand>,
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    diagnostics: watch::Sender<String>,
) {
    loop {
        let deadline = controller.next_deadline();

        tokio::select! {
            command = receiver.recv() => {
                let Some(command) = command else {
                    break;
                };
                if !handle_command(&mut controller, command) {
                    break;
                }
            }
            Some(event) = events.recv() => {
                controller.handle_event(event, now());
            }
            () = sleep_until(deadline) => {
                controller.poll(now());
            }
        }

        publish(&controller, &diagnostics);
    }

    controller.close();
    publish(&controller, &diagnostics);
    tracing::debug!("Player actor stopped");
}

/// Applies one command. Returns false when the actor should stop.
fn handle_command(controller: &mut PlaybackController, command: PlayerCommand) -> bool {
    match command {
        PlayerCommand::Select {
            source,
            variant_index,
            responder,
        } => {
            let result = controller.select(&source, variant_index, now());
            let _ = responder.send(result);
        }
        PlayerCommand::SetSpeedMode { mode, responder } => {
            controller.set_speed_mode(mode, now());
            let _ = responder.send(());
        }
        PlayerCommand::Reload { responder } => {
            let _ = responder.send(controller.reload(now()));
        }
        PlayerCommand::Snapshot { responder } => {
            let _ = responder.send(controller.snapshot());
        }
        PlayerCommand::Close { responder } => {
            controller.close();
            let _ = responder.send(());
        }
        PlayerCommand::Shutdown { responder } => {
            controller.close();
            let _ = responder.send(());
            return false;
        }
    }
    true
}

fn publish(controller: &PlaybackController, diagnostics: &watch::Sender<String>) {
    diagnostics.send_if_modified(|label| {
        if label.as_str() == controller.diagnostics() {
            return false;
        }
        label.clear();
        label.push_str(controller.diagnostics());
        true
    });
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

/// Current time on tokio's clock, so paused-time tests drive the timers.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::catalog::{MediaSource, StreamVariant};
    use crate::playback::test_mocks::{CallJournal, MockEngineFactory};
    use crate::playback::{
        EngineError, EngineEvent, EngineKind, PlaybackError, RetryState, SpeedMode,
    };

    fn player() -> (PlayerHandle, Arc<MockEngineFactory>, CallJournal) {
        let journal = CallJournal::new();
        let hls = MockEngineFactory::new(EngineKind::Hls, journal.clone());
        let selector = EngineSelector::new().with_factory(hls.clone());
        let handle = spawn_player(PlaybackConfig::default(), selector);
        (handle, hls, journal)
    }

    fn news() -> MediaSource {
        MediaSource {
            name: "News".to_string(),
            group: "TV".to_string(),
            logo_url: None,
            streams: vec![StreamVariant::new("hd", "http://a/news.m3u8", true)],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_fires_after_interval() {
        let (handle, hls, journal) = player();
        handle.select(news(), 0).await.unwrap();
        let engine = hls.last_engine().unwrap();

        engine.emit(EngineEvent::Error(EngineError::from_message("404 Not Found")));
        engine.emit(EngineEvent::Error(EngineError::from_message("404 Not Found")));
        tokio::time::sleep(Duration::from_millis(100)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert!(matches!(
            snapshot.retry,
            RetryState::Scheduled {
                attempt_count: 0,
                ..
            }
        ));

        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(journal.count("hls#1 set_source http://a/news.m3u8"), 2);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_playing_cancels_retry_and_reports_response_time() {
        let (handle, hls, journal) = player();
        handle.select(news(), 0).await.unwrap();
        let engine = hls.last_engine().unwrap();

        engine.emit(EngineEvent::Error(EngineError::from_message("404 Not Found")));
        tokio::time::sleep(Duration::from_millis(1000)).await;
        engine.emit(EngineEvent::IsPlayingChanged(true));
        tokio::time::sleep(Duration::from_millis(5000)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.retry, RetryState::Idle);
        assert!(snapshot.response_time.unwrap() > Duration::ZERO);
        assert!(snapshot.diagnostics.contains("Response: "));
        assert_eq!(snapshot.status, "Playing News.");
        assert_eq!(journal.count("hls#1 set_source http://a/news.m3u8"), 1);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_diagnostics_are_published() {
        let (handle, hls, _journal) = player();
        let mut diagnostics = handle.diagnostics();

        handle.select(news(), 0).await.unwrap();
        hls.last_engine().unwrap().set_bitrate(4_000_000.0);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(diagnostics.has_changed().unwrap());
        let label = diagnostics.borrow_and_update().clone();
        assert_eq!(label, "  4.00 Mbps |   0.00 s | A");

        handle.set_speed_mode(SpeedMode::Manual(1.0)).await.unwrap();
        assert!(diagnostics.borrow().ends_with("| D"));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_releases_engine() {
        let (handle, _hls, journal) = player();
        handle.select(news(), 0).await.unwrap();

        handle.shutdown().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(journal.count("hls#1 release"), 1);
        assert!(!handle.is_running());
        assert!(matches!(
            handle.select(news(), 0).await,
            Err(PlaybackError::DriverShutdown)
        ));
    }

    #[tokio::test]
    async fn test_errors_are_returned_not_fatal() {
        let (handle, _hls, _journal) = player();

        assert!(matches!(
            handle.reload().await,
            Err(PlaybackError::NoActiveSession)
        ));
        assert!(matches!(
            handle.select(news(), 9).await,
            Err(PlaybackError::VariantNotFound { index: 9, .. })
        ));
        assert!(handle.is_running());

        handle.shutdown().await.unwrap();
    }
}
