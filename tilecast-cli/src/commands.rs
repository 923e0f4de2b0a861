//! CLI command implementations

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use tilecast_core::catalog::{
    FeedEndpoint, HttpCatalogFeed, display_name, export_catalog, variant_labels,
};
use tilecast_core::{
    AvailabilityProbe, CatalogService, HttpUrlProbe, MediaSource, StreamVariant, TilecastConfig,
    UrlProbe,
};
use tilecast_sim::{NetworkProfile, PlaybackScenario};
use url::Url;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch, probe and list the stream catalog
    List,
    /// Ask the backend to re-derive the catalog, then list it
    Resync,
    /// Write the current catalog to a JSON file
    Export {
        /// Destination file
        #[arg(short, long, default_value = "catalog.json")]
        output: PathBuf,
    },
    /// Check whether a single stream URL answers
    Probe {
        /// Stream URL to check
        url: String,
    },
    /// Run the adaptive controller against a simulated network
    Simulate {
        /// Simulated seconds to run
        #[arg(short, long, default_value = "30")]
        seconds: u64,
        /// Seed for network jitter
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Number of initial loads answered with a 404
        #[arg(long, default_value = "0")]
        fail_first: u32,
        /// Mean network bandwidth in bits per second
        #[arg(short, long, default_value = "4000000")]
        bandwidth: f64,
        /// Relative bandwidth jitter in [0, 1]
        #[arg(long, default_value = "0.3")]
        jitter: f64,
        /// Stream link to simulate; its suffix picks the engine
        #[arg(long, default_value = "http://sim.local/channel.m3u8")]
        link: String,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::List => list_sources(FeedEndpoint::Streams).await,
        Commands::Resync => list_sources(FeedEndpoint::Resync).await,
        Commands::Export { output } => export_sources(output).await,
        Commands::Probe { url } => probe_url(url).await,
        Commands::Simulate {
            seconds,
            seed,
            fail_first,
            bandwidth,
            jitter,
            link,
        } => run_simulation(seconds, seed, fail_first, bandwidth, jitter, link),
    }
}

/// Builds a catalog service from environment configuration and populates it.
///
/// A failed network refresh falls back to the bundled catalog, if configured.
async fn populate_catalog(endpoint: FeedEndpoint) -> Result<CatalogService> {
    let config = TilecastConfig::from_env();
    let feed = HttpCatalogFeed::new(&config.feed).context("invalid feed configuration")?;
    let probe = AvailabilityProbe::http(&config.probe);
    let mut service = CatalogService::new(Arc::new(feed), probe, &config.feed);

    let refreshed = service.refresh(endpoint).await.map(<[MediaSource]>::len);
    if let Err(e) = refreshed {
        tracing::warn!("Catalog refresh failed: {}", e);
        let loaded = service
            .load_fallback()
            .await
            .context("fallback catalog could not be loaded")?;
        if loaded == 0 {
            bail!("{}", service.status());
        }
    }

    Ok(service)
}

/// List the catalog grouped the way the launcher shows it
///
/// # Errors
/// - `CatalogError` - Feed unreachable and no fallback catalog available
pub async fn list_sources(endpoint: FeedEndpoint) -> Result<()> {
    let service = populate_catalog(endpoint).await?;

    println!("{}", service.status());
    println!("{:-<60}", "");

    if service.sources().is_empty() {
        println!("No streams to show.");
        return Ok(());
    }

    for group in service.groups() {
        println!("{}", group.label());
        for source in &group.sources {
            println!("  {}", display_name(&source.name));
            for label in variant_labels(source) {
                println!("      {label}");
            }
        }
    }

    Ok(())
}

/// Export the current catalog to disk
///
/// # Errors
/// - `CatalogError` - Catalog could not be loaded or the file not written
pub async fn export_sources(output: PathBuf) -> Result<()> {
    let service = populate_catalog(FeedEndpoint::Streams).await?;

    export_catalog(service.sources(), &output).await?;
    println!(
        "Exported {} sources to {}",
        service.sources().len(),
        output.display()
    );

    Ok(())
}

/// Probe a single URL with a `HEAD` request
///
/// # Errors
/// - `url::ParseError` - URL is not absolute
pub async fn probe_url(url: String) -> Result<()> {
    Url::parse(&url).with_context(|| format!("not a valid URL: {url}"))?;

    let config = TilecastConfig::from_env();
    let probe = HttpUrlProbe::new(&config.probe);

    match probe.probe(&url).await {
        Ok(true) => println!("available    {url}"),
        Ok(false) => println!("unavailable  {url}"),
        Err(e) => println!("unavailable  {url} ({e})"),
    }

    Ok(())
}

/// Run a deterministic playback simulation and print every diagnostics tick
///
/// # Errors
/// - `SimulationError::InvalidProfile` - Bandwidth or jitter out of range
/// - `SimulationError::Playback` - Link has no supported engine
pub fn run_simulation(
    seconds: u64,
    seed: u64,
    fail_first: u32,
    bandwidth: f64,
    jitter: f64,
    link: String,
) -> Result<()> {
    let network = NetworkProfile::builder()
        .bandwidth_bps(bandwidth)
        .jitter(jitter)
        .seed(seed)
        .build()?;

    let source = MediaSource {
        name: "Simulated".to_string(),
        group: String::new(),
        logo_url: None,
        streams: vec![StreamVariant::new("sim", link, true)],
    };

    println!("Simulating {seconds}s of playback (seed {seed})");
    println!("{:-<60}", "");

    let report = PlaybackScenario::new(network)
        .playback_config(TilecastConfig::from_env().playback)
        .duration(Duration::from_secs(seconds))
        .fail_first(fail_first)
        .run(&source, 0)?;

    for tick in &report.ticks {
        println!("{:>6.1}s  {}", tick.elapsed.as_secs_f64(), tick.diagnostics);
    }

    println!("{:-<60}", "");
    println!("Source loads: {}", report.source_loads);
    println!("Stalls: {}", report.stalls);
    if let Some(response) = report.response_time {
        println!("Response time: {:.2} s", response.as_secs_f64());
    }
    println!("{}", report.final_status);

    Ok(())
}
