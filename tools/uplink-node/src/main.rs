// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Greenhouse sensing node CLI
//!
//! Samples the sensors on a fixed interval and pushes each sample to the
//! collector as a CoAP POST over UDP.
//!
//! # Usage
//!
//! ```bash
//! # Run with defaults (simulated tomato bed, 20 s interval)
//! uplink-node
//!
//! # Using configuration file
//! uplink-node --config node.toml
//!
//! # Single sample, then exit
//! uplink-node --endpoint coap://10.0.0.5/sensor/send-data --once
//!
//! # Show the encoded request without sending
//! uplink-node encode --endpoint coap://10.0.0.5/a --payload '{"t":1}'
//! ```

mod config;
mod link;
mod payload;
mod simulator;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use coap_uplink::{
    decode_message, encode_request, hex_dump, DispatchHandle, DispatchStatsSnapshot, Dispatcher,
    EncoderProfile, EndpointUri, QueryMode, ReadinessSignal, SendOutcome, UdpTransport,
};
use crossbeam::channel::{self, RecvTimeoutError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::config::{NodeConfig, SourceKind};
use crate::link::{LinkMonitor, RouteProbe};
use crate::payload::TelemetryPayload;
use crate::simulator::{DataSource, FixedSource, GreenhouseSimulator};

/// Greenhouse sensing node
#[derive(Parser, Debug)]
#[command(name = "uplink-node")]
#[command(author = "naskel.com")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Greenhouse sensing node - periodic CoAP telemetry over UDP")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Collector endpoint (scheme://host[:port]/path[?query])
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Node identifier
    #[arg(long)]
    node_id: Option<String>,

    /// Plant profile for the simulator
    #[arg(long)]
    plant: Option<String>,

    /// Seconds between samples
    #[arg(short, long)]
    interval: Option<u64>,

    /// Simulator RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Send one sample and exit
    #[arg(long)]
    once: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encode a request and print it without sending
    Encode {
        /// Collector endpoint
        #[arg(short, long)]
        endpoint: String,

        /// Payload text
        #[arg(short, long, default_value = "")]
        payload: String,

        #[arg(long, value_enum, default_value = "general")]
        profile: ProfileArg,

        #[arg(long, value_enum, default_value = "skip")]
        query: QueryArg,
    },

    /// Generate example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "node.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProfileArg {
    Simplified,
    General,
}

impl From<ProfileArg> for EncoderProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Simplified => EncoderProfile::Simplified,
            ProfileArg::General => EncoderProfile::General,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum QueryArg {
    Skip,
    UriQuery,
}

impl From<QueryArg> for QueryMode {
    fn from(arg: QueryArg) -> Self {
        match arg {
            QueryArg::Skip => QueryMode::Skip,
            QueryArg::UriQuery => QueryMode::UriQuery,
        }
    }
}

fn main() -> Result<()> {
    let mut args = Args::parse();

    // Initialize logging (library `log` records are bridged)
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Some(cmd) = args.command.take() {
        return match cmd {
            Commands::Encode {
                endpoint,
                payload,
                profile,
                query,
            } => cmd_encode(&endpoint, payload.as_bytes(), profile.into(), query.into()),
            Commands::GenConfig { output } => cmd_gen_config(output),
            Commands::Validate { config } => cmd_validate(config),
        };
    }

    let config = build_config(&args)?;
    run(config, args.once)
}

fn build_config(args: &Args) -> Result<NodeConfig> {
    let mut config = match args.config {
        Some(ref path) => NodeConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => NodeConfig::default(),
    };

    // Command line overrides file values
    if let Some(ref endpoint) = args.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(ref node_id) = args.node_id {
        config.node_id = node_id.clone();
    }
    if let Some(ref plant) = args.plant {
        config.plant_type = plant.clone();
    }
    if let Some(interval) = args.interval {
        config.sample_interval_secs = interval;
    }
    if args.seed.is_some() {
        config.simulator_seed = args.seed;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn run(config: NodeConfig, once: bool) -> Result<()> {
    tracing::info!(
        node_id = %config.node_id,
        zone = %config.zone_id,
        plant = %config.plant_type,
        endpoint = %config.endpoint,
        interval_secs = config.sample_interval_secs,
        "Starting sensing node"
    );

    let mut source: Box<dyn DataSource> = match config.source {
        SourceKind::Simulator => Box::new(
            GreenhouseSimulator::new(&config.plant_type, config.simulator_seed)
                .with_utc_offset(config.utc_offset_hours),
        ),
        SourceKind::Fixed => Box::new(FixedSource::default()),
    };

    // Readiness follows the route to the collector
    let uri = EndpointUri::parse(&config.endpoint).context("Invalid endpoint")?;
    let target = UdpTransport::from_config(&config.uplink)
        .resolve(uri.host(), uri.port())
        .context("Collector address")?;
    let signal = ReadinessSignal::shared();
    let mut monitor = LinkMonitor::spawn(
        RouteProbe::new(target),
        Arc::clone(&signal),
        config.link_probe_interval(),
    )
    .context("Failed to start link monitor")?;

    let dispatcher = Dispatcher::new(config.uplink.clone(), Arc::clone(&signal))
        .context("Failed to create dispatcher")?;

    // Setup Ctrl+C handler
    // stop_tx stays alive here so a failed handler install does not end the loop
    let (stop_tx, stop_rx) = channel::bounded::<()>(1);
    let handler_tx = stop_tx.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, shutting down...");
        let _ = handler_tx.try_send(());
    }) {
        tracing::warn!(error = %e, "Ctrl+C handler not installed");
    }

    // Upper bound for one dispatch to finish
    let drain_timeout = config.uplink.network_timeout() + config.uplink.send_timeout();
    let mut pending: Option<DispatchHandle> = None;
    let mut cycle: u64 = 0;

    loop {
        cycle += 1;
        if let Some(mut previous) = pending.take() {
            if previous.try_outcome().is_none() {
                tracing::warn!(cycle, "Previous send still in flight");
            }
        }

        let readings = source.read_all();
        let body = TelemetryPayload::new(&config.api_key, &config.node_id, &readings)
            .to_bytes()
            .context("Failed to serialize payload")?;

        tracing::info!(
            cycle,
            temperature = readings.temperature,
            humidity = readings.humidity,
            soil_moisture = readings.soil_moisture,
            light = readings.light,
            "Sending sensor data"
        );
        tracing::debug!(payload = %String::from_utf8_lossy(&body), "Payload");

        let handle = dispatcher.dispatch(config.endpoint.clone(), body);

        if once {
            let outcome = handle.join();
            report_outcome(&outcome);
            monitor.stop();
            print_stats(&dispatcher.stats().snapshot());
            return outcome.map(|_| ()).context("Send failed");
        }
        pending = Some(handle);

        match stop_rx.recv_timeout(config.sample_interval()) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    if let Some(mut last) = pending {
        if last.wait_timeout(drain_timeout).is_none() {
            tracing::warn!("Last send did not finish before shutdown");
        }
    }
    monitor.stop();

    println!("\nFinal Statistics:");
    print_stats(&dispatcher.stats().snapshot());
    Ok(())
}

fn report_outcome(outcome: &SendOutcome) {
    match outcome {
        Ok(report) => tracing::info!(
            destination = %report.destination,
            bytes = report.bytes_sent,
            "Sensor data sent"
        ),
        Err(e) => tracing::error!(error = %e, "Sensor data not sent"),
    }
}

fn cmd_encode(
    endpoint: &str,
    payload: &[u8],
    profile: EncoderProfile,
    query_mode: QueryMode,
) -> Result<()> {
    let uri = EndpointUri::parse(endpoint).context("Invalid endpoint")?;
    let config = coap_uplink::UplinkConfig {
        profile,
        query_mode,
        ..Default::default()
    };

    let mut buf = vec![0u8; config.buffer_capacity];
    let len = encode_request(&uri, payload, &mut buf, &config.request_options())
        .context("Encoding failed")?;
    let bytes = &buf[..len];

    println!("Destination: {}:{}", uri.host(), uri.port());
    println!("Length:      {} bytes", len);
    println!("Hex:         {}", hex_dump(bytes, usize::MAX));

    let msg = decode_message(bytes).context("Encoded message does not decode")?;
    for option in &msg.options {
        println!(
            "  option {:>2}: {}",
            option.number,
            String::from_utf8_lossy(&option.value)
        );
    }
    if !msg.payload.is_empty() {
        println!("  payload:   {}", String::from_utf8_lossy(&msg.payload));
    }
    Ok(())
}

fn cmd_gen_config(output: PathBuf) -> Result<()> {
    let config = NodeConfig {
        simulator_seed: Some(42),
        ..Default::default()
    };

    let toml_str = toml::to_string_pretty(&config).context("Failed to serialize config")?;

    // Add comments
    let content = format!(
        r#"# Sensing node configuration
# Generated by uplink-node gen-config

{}
"#,
        toml_str
    );

    std::fs::write(&output, content)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> Result<()> {
    match NodeConfig::from_file(&config_path) {
        Ok(config) => {
            println!("Configuration valid!");
            println!();
            println!("Node:     {} (zone {})", config.node_id, config.zone_id);
            println!("Plant:    {}", config.plant_type);
            println!("Endpoint: {}", config.endpoint);
            println!(
                "Encoding: {:?}, query {:?}, {} byte buffer",
                config.uplink.profile, config.uplink.query_mode, config.uplink.buffer_capacity
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_stats(stats: &DispatchStatsSnapshot) {
    println!("--- Uplink Statistics ---");
    println!(
        "  {} attempts, {} sent ({}), {} failed over {:?}",
        stats.attempts,
        stats.sent,
        format_bytes(stats.bytes_sent as u64),
        stats.failures(),
        Duration::from_secs(stats.uptime.as_secs())
    );
    println!(
        "  parse {}, encode {}, address {}, transmit {}, network unavailable {}",
        stats.parse_errors,
        stats.encode_errors,
        stats.address_errors,
        stats.transmit_errors,
        stats.network_unavailable
    );
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
