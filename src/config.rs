//! Configuration loading, merging and validation.
//!
//! Precedence: CLI (if provided) > config file > defaults.

use anyhow::{bail, Context, Result};
use package_exporter::metrics::DEFAULT_NAMESPACE;
use package_exporter::{PackageFamily, ToolPaths};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, level_filters::LevelFilter};

use crate::cli::{Args, ConfigFormat, LogLevel, PackageManagerArg};

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9888;
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

const DEFAULT_CONFIG_LOCATIONS: &[&str] = &[
    "/etc/package-exporter/config.yaml",
    "/etc/package-exporter/config.yml",
    "/etc/package-exporter/config.json",
    "/etc/package-exporter/config.toml",
    "./package-exporter.yaml",
    "./package-exporter.yml",
    "./package-exporter.json",
    "./package-exporter.toml",
];

/// Exporter configuration as read from file and CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,
    #[serde(alias = "metrics-path")]
    pub metrics_path: Option<String>,
    #[serde(alias = "tls-cert")]
    pub tls_cert: Option<PathBuf>,
    #[serde(alias = "tls-key")]
    pub tls_key: Option<PathBuf>,

    // Metrics
    pub namespace: Option<String>,
    /// "auto" | "apt" | "yum"
    #[serde(alias = "package-manager")]
    pub package_manager: Option<String>,

    // Package manager tools (argument lists are fixed)
    #[serde(alias = "apt-get-path")]
    pub apt_get_path: Option<PathBuf>,
    #[serde(alias = "yum-path")]
    pub yum_path: Option<PathBuf>,
    #[serde(alias = "needs-restarting-path")]
    pub needs_restarting_path: Option<PathBuf>,
    #[serde(alias = "reboot-required-file")]
    pub reboot_required_file: Option<PathBuf>,

    // Feature flags
    #[serde(alias = "enable-health")]
    pub enable_health: Option<bool>,
    #[serde(alias = "enable-telemetry")]
    pub enable_telemetry: Option<bool>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let tools = ToolPaths::default();
        Self {
            port: Some(DEFAULT_PORT),
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            metrics_path: Some(DEFAULT_METRICS_PATH.to_string()),
            tls_cert: None,
            tls_key: None,
            namespace: Some(DEFAULT_NAMESPACE.to_string()),
            package_manager: Some("auto".into()),
            apt_get_path: Some(tools.apt_get),
            yum_path: Some(tools.yum),
            needs_restarting_path: Some(tools.needs_restarting),
            reboot_required_file: Some(tools.reboot_required_file),
            enable_health: Some(true),
            enable_telemetry: Some(true),
            log_level: Some("info".into()),
        }
    }
}

impl Config {
    pub fn bind(&self) -> &str {
        self.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn metrics_path(&self) -> &str {
        self.metrics_path.as_deref().unwrap_or(DEFAULT_METRICS_PATH)
    }

    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }

    /// Paths of the tools, falling back to the standard locations.
    pub fn tool_paths(&self) -> ToolPaths {
        let defaults = ToolPaths::default();
        ToolPaths {
            apt_get: self.apt_get_path.clone().unwrap_or(defaults.apt_get),
            yum: self.yum_path.clone().unwrap_or(defaults.yum),
            needs_restarting: self
                .needs_restarting_path
                .clone()
                .unwrap_or(defaults.needs_restarting),
            reboot_required_file: self
                .reboot_required_file
                .clone()
                .unwrap_or(defaults.reboot_required_file),
        }
    }

    /// `None` means the family is probed at startup.
    pub fn package_family(&self) -> Result<Option<PackageFamily>> {
        match self.package_manager.as_deref().unwrap_or("auto") {
            "auto" => Ok(None),
            "apt" => Ok(Some(PackageFamily::Apt)),
            "yum" => Ok(Some(PackageFamily::Yum)),
            other => bail!("Invalid package_manager '{other}', expected 'auto', 'apt' or 'yum'"),
        }
    }

    pub fn log_level(&self) -> Result<LevelFilter> {
        let level = self.log_level.as_deref().unwrap_or("info");
        level
            .parse()
            .with_context(|| format!("Invalid log_level '{level}'"))
    }
}

fn is_valid_namespace(namespace: &str) -> bool {
    let mut chars = namespace.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<()> {
    let path = cfg.metrics_path();
    if !path.starts_with('/') || path == "/" {
        bail!("metrics_path '{path}' must start with '/' and must not be '/'");
    }
    if path == "/doc" || path == "/health" {
        bail!("metrics_path '{path}' collides with a built-in endpoint");
    }

    if !is_valid_namespace(cfg.namespace()) {
        bail!(
            "namespace '{}' is not a valid Prometheus metric name prefix",
            cfg.namespace()
        );
    }

    if cfg.tls_cert.is_some() != cfg.tls_key.is_some() {
        bail!("tls_cert and tls_key must be set together");
    }

    cfg.package_family()?;
    cfg.log_level()?;
    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults
pub fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(port) = args.port {
        config.port = Some(port);
    }
    if let Some(path) = &args.metrics_path {
        config.metrics_path = Some(path.clone());
    }
    if let Some(namespace) = &args.namespace {
        config.namespace = Some(namespace.clone());
    }
    if let Some(pm) = args.package_manager {
        config.package_manager = Some(
            match pm {
                PackageManagerArg::Auto => "auto",
                PackageManagerArg::Apt => "apt",
                PackageManagerArg::Yum => "yum",
            }
            .into(),
        );
    }
    if let Some(level) = args.log_level {
        config.log_level = Some(
            match level {
                LogLevel::Off => "off",
                LogLevel::Error => "error",
                LogLevel::Warn => "warn",
                LogLevel::Info => "info",
                LogLevel::Debug => "debug",
                LogLevel::Trace => "trace",
            }
            .into(),
        );
    }
    if args.tls_cert.is_some() {
        config.tls_cert = args.tls_cert.clone();
    }
    if args.tls_key.is_some() {
        config.tls_key = args.tls_key.clone();
    }

    // Feature flags
    if args.disable_health {
        config.enable_health = Some(false);
    }
    if args.disable_telemetry {
        config.enable_telemetry = Some(false);
    }

    Ok(config)
}

/// Loads the config file given on the CLI or the first one found in the
/// default locations. No file at all means defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                bail!("Config file not found: {}", p.display());
            }
            p.to_path_buf()
        }
        None => match DEFAULT_CONFIG_LOCATIONS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
        {
            Some(p) => p,
            None => return Ok(Config::default()),
        },
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = parse_config(&content, &path)?;
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

/// Parses config content, choosing the format by file extension (YAML by default).
pub fn parse_config(content: &str, path: &Path) -> Result<Config> {
    let config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?,
        Some("toml") => toml::from_str(content)
            .with_context(|| format!("Invalid TOML in {}", path.display()))?,
        _ => serde_yaml::from_str(content)
            .with_context(|| format!("Invalid YAML in {}", path.display()))?,
    };
    Ok(config)
}

/// Renders the configuration in the requested format
pub fn render_config(config: &Config, format: ConfigFormat) -> Result<String> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<()> {
    println!("{}", render_config(config, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["package-exporter", "--no-config"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(validate_effective_config(&config).is_ok());
        assert_eq!(config.port(), 9888);
        assert_eq!(config.metrics_path(), "/metrics");
        assert_eq!(config.package_family().unwrap(), None);
    }

    #[test]
    fn test_cli_overrides() {
        let config = resolve_config(&args(&[
            "--port",
            "9100",
            "--metrics-path",
            "/packages",
            "--package-manager",
            "yum",
            "--disable-telemetry",
        ]))
        .unwrap();
        assert_eq!(config.port(), 9100);
        assert_eq!(config.metrics_path(), "/packages");
        assert_eq!(config.package_family().unwrap(), Some(PackageFamily::Yum));
        assert_eq!(config.enable_telemetry, Some(false));
        assert_eq!(config.enable_health, Some(true));
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config::default();
        config.metrics_path = Some("metrics".into());
        assert!(validate_effective_config(&config).is_err());

        let mut config = Config::default();
        config.namespace = Some("9packages".into());
        assert!(validate_effective_config(&config).is_err());

        let mut config = Config::default();
        config.tls_cert = Some(PathBuf::from("/etc/ssl/cert.pem"));
        assert!(validate_effective_config(&config).is_err());

        let mut config = Config::default();
        config.package_manager = Some("dnf".into());
        assert!(validate_effective_config(&config).is_err());

        let mut config = Config::default();
        config.log_level = Some("loud".into());
        assert!(validate_effective_config(&config).is_err());
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "port: 9999\npackage-manager: apt\nreboot_required_file: /tmp/reboot-required"
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.port(), 9999);
        assert_eq!(config.package_family().unwrap(), Some(PackageFamily::Apt));
        assert_eq!(
            config.tool_paths().reboot_required_file,
            PathBuf::from("/tmp/reboot-required")
        );
        // unset keys fall back to the standard locations
        assert_eq!(config.tool_paths().apt_get, PathBuf::from("/usr/bin/apt-get"));
    }

    #[test]
    fn test_parse_json_and_toml() {
        let config = parse_config(r#"{"namespace": "pkg"}"#, Path::new("c.json")).unwrap();
        assert_eq!(config.namespace(), "pkg");

        let config = parse_config("metrics_path = \"/pkg\"\n", Path::new("c.toml")).unwrap();
        assert_eq!(config.metrics_path(), "/pkg");
    }

    #[test]
    fn test_packaged_config_is_valid() {
        let content = include_str!("../demos/package-exporter.yaml");
        let config = parse_config(content, Path::new("package-exporter.yaml")).unwrap();
        assert!(validate_effective_config(&config).is_ok());
        assert_eq!(config.port(), DEFAULT_PORT);
    }

    #[test]
    fn test_missing_explicit_config_file() {
        assert!(load_config(Some(Path::new("/nonexistent/package-exporter.yaml"))).is_err());
    }

    #[test]
    fn test_render_config_round_trips_through_yaml() {
        let yaml = render_config(&Config::default(), ConfigFormat::Yaml).unwrap();
        let parsed = parse_config(&yaml, Path::new("c.yaml")).unwrap();
        assert_eq!(parsed.port(), DEFAULT_PORT);
        assert_eq!(parsed.namespace(), DEFAULT_NAMESPACE);
    }
}
