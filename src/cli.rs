//! CLI arguments and subcommands for package-exporter.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Package manager selection
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PackageManagerArg {
    /// Probe apt-get, then yum
    Auto,
    Apt,
    Yum,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "package-exporter",
    about = "Prometheus exporter for pending APT/YUM package updates",
    long_about = "Prometheus exporter for pending APT/YUM package updates.\n\n\
                  Reports pending updates per repository origin, obsolete or autoremovable \
                  packages and whether a reboot is required. Every scrape runs the package \
                  manager's read-only inspection commands again.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Path under which to expose metrics
    #[arg(long)]
    pub metrics_path: Option<String>,

    /// Metric name prefix
    #[arg(long)]
    pub namespace: Option<String>,

    /// Package manager to report on
    #[arg(long, value_enum)]
    pub package_manager: Option<PackageManagerArg>,

    /// Log level
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Disable /health endpoint
    #[arg(long)]
    pub disable_health: bool,

    /// Disable internal scrape_* metrics
    #[arg(long)]
    pub disable_telemetry: bool,

    /// TLS certificate (PEM), requires --tls-key
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// TLS private key (PEM), requires --tls-cert
    #[arg(long)]
    pub tls_key: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check which package manager is used and whether its tools are present
    Check,

    /// Generate configuration files
    Config {
        /// Output file path
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Run collection cycles and print the package state
    Test {
        /// Number of test iterations
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: usize,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,
    },
}
