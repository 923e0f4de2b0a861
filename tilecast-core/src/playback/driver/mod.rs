//! Async driver running a [`super::PlaybackController`] on its own task.
//!
//! All controller mutation happens on the driver task: commands from
//! [`PlayerHandle`], engine callbacks and both timers are multiplexed into a
//! single loop, so the controller never needs a lock.

pub mod actor;
pub mod commands;
pub mod handle;

pub use actor::spawn_player;
pub use commands::PlayerCommand;
pub use handle::PlayerHandle;
