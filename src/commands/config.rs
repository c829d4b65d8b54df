//! Config command implementation.
//!
//! Writes a default configuration file in the requested format.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates a default configuration file
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> Result<()> {
    let mut content = render_config(&Config::default(), format)?;
    if commented {
        if let ConfigFormat::Yaml = format {
            content = add_config_comments(&content);
        }
    }

    match output {
        Some(path) => {
            fs::write(&path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("✅ Configuration written to {}", path.display());
        }
        None => print!("{content}"),
    }
    Ok(())
}

/// Prefixes known YAML keys with a short explanation.
fn add_config_comments(yaml: &str) -> String {
    let comments: &[(&str, &str)] = &[
        ("port:", "# HTTP listen port"),
        ("bind:", "# Bind address"),
        ("metrics_path:", "# Path of the Prometheus metrics endpoint"),
        ("tls_cert:", "# TLS certificate and key (PEM), both or neither"),
        ("namespace:", "# Prefix of every exported metric name"),
        ("package_manager:", "# auto (probe apt-get, then yum), apt or yum"),
        (
            "apt_get_path:",
            "# Tool locations; argument lists are fixed",
        ),
        (
            "reboot_required_file:",
            "# File whose presence means a reboot is required (apt)",
        ),
        ("enable_health:", "# Serve /health"),
        ("enable_telemetry:", "# Export scrape_* self metrics"),
        ("log_level:", "# off, error, warn, info, debug or trace"),
    ];

    let mut out = String::from("# package-exporter configuration\n\n");
    for line in yaml.lines() {
        if let Some((_, comment)) = comments.iter().find(|(key, _)| line.starts_with(key)) {
            out.push_str(comment);
            out.push('\n');
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}
