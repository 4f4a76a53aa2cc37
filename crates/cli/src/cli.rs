//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Telemetry Bridge - stream simulated vehicle telemetry to MQTT
#[derive(Parser, Debug)]
#[command(
    name = "telemetry-bridge",
    author,
    version,
    about = "Simulator to MQTT telemetry bridge",
    long_about = "Starts a vehicle simulation scenario, drives its autopilot and \n\
                  publishes electrics telemetry (fuel, rpm, gear, speed, ...) to an \n\
                  MQTT broker at a fixed period."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BRIDGE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "BRIDGE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the simulation and publish until interrupted
    Run(RunArgs),

    /// Interactive control console (start, stop, ai, reset, ...)
    Console(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments shared by `run` and `console`
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults if missing
    #[arg(short, long, default_value = "bridge.toml", env = "BRIDGE_CONFIG")]
    pub config: PathBuf,

    /// Simulator backend
    #[arg(long, value_enum, default_value = "beamng", env = "BRIDGE_SIMULATOR")]
    pub simulator: SimulatorKind,

    /// Broker backend
    #[arg(long, value_enum, default_value = "mqtt", env = "BRIDGE_BROKER")]
    pub broker: BrokerKind,

    /// Override simulator host from configuration
    #[arg(long, env = "BEAMNG_HOST")]
    pub sim_host: Option<String>,

    /// Override simulator port from configuration
    #[arg(long, env = "BEAMNG_PORT")]
    pub sim_port: Option<u16>,

    /// Override MQTT broker host from configuration
    #[arg(long, env = "MQTT_HOST")]
    pub broker_host: Option<String>,

    /// Override MQTT broker port from configuration
    #[arg(long, env = "MQTT_PORT")]
    pub broker_port: Option<u16>,

    /// Override the publish period in milliseconds
    #[arg(long, env = "BRIDGE_PERIOD_MS")]
    pub period_ms: Option<u64>,

    /// Validate configuration and exit without connecting
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "BRIDGE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "bridge.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; built-in defaults if missing
    #[arg(short, long, default_value = "bridge.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Also print the topic list
    #[arg(long)]
    pub topics: bool,
}

/// Simulator backend
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulatorKind {
    /// In-process mock vehicle
    Mock,
    /// BeamNG over its TCP control protocol
    Beamng,
}

/// Broker backend
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrokerKind {
    /// MQTT broker
    Mqtt,
    /// Log messages instead of sending them
    Log,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
