//! End-to-end tests for Tilecast
//!
//! These tests follow a user from catalog fetch over real HTTP through
//! source selection, failure recovery and diagnostics.

#[path = "../support/feed_server.rs"]
mod feed_server;

mod playback_workflow;
