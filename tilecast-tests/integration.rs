//! Integration tests for Tilecast
//!
//! These tests exercise the catalog workflow over real HTTP against a local
//! backend, the player actor over mock engines, and the controller against
//! simulated engines.

#[path = "support/feed_server.rs"]
mod feed_server;

#[path = "integration/catalog_workflow.rs"]
mod catalog_workflow;
#[path = "integration/player_driver.rs"]
mod player_driver;
#[path = "integration/simulation.rs"]
mod simulation;
