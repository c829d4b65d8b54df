//! Prometheus gauges for package state.
//!
//! Gauges are registered into a registry built for a single scrape, so
//! labels from earlier cycles never linger and concurrent scrapes share
//! nothing.

use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};

use crate::model::{sorted_counts, AptSnapshot, OriginCounts, PackageSnapshot, YumSnapshot};

/// Prefix of every exported metric name.
pub const DEFAULT_NAMESPACE: &str = "package_exporter";

fn bool_gauge(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Gauges exported on yum managed hosts.
#[derive(Clone)]
pub struct YumMetrics {
    pub packages_pending: GaugeVec,
    pub packages_obsolete: GaugeVec,
    pub reboot_required: Gauge,
}

impl YumMetrics {
    /// Creates and registers the yum gauges with the registry.
    pub fn new(registry: &Registry, namespace: &str) -> prometheus::Result<Self> {
        let packages_pending = GaugeVec::new(
            Opts::new(
                "yum_packages_pending",
                "Number of packages pending for update by YUM",
            )
            .namespace(namespace),
            &["origin"],
        )?;
        let packages_obsolete = GaugeVec::new(
            Opts::new("yum_packages_obsolete", "Number of obsolete packages").namespace(namespace),
            &["origin"],
        )?;
        let reboot_required =
            Gauge::with_opts(Opts::new("yum_reboot_required", "Reboot required").namespace(namespace))?;

        registry.register(Box::new(packages_pending.clone()))?;
        registry.register(Box::new(packages_obsolete.clone()))?;
        registry.register(Box::new(reboot_required.clone()))?;

        Ok(Self {
            packages_pending,
            packages_obsolete,
            reboot_required,
        })
    }

    pub fn set(&self, snapshot: &YumSnapshot) {
        set_per_origin(&self.packages_pending, &snapshot.pending);
        set_per_origin(&self.packages_obsolete, &snapshot.obsolete);
        self.reboot_required
            .set(bool_gauge(snapshot.reboot_required));
    }
}

fn set_per_origin(gauge: &GaugeVec, counts: &OriginCounts) {
    for (key, count) in sorted_counts(counts) {
        gauge
            .with_label_values(&[key.origin.as_str()])
            .set(count as f64);
    }
}

/// Gauges exported on apt managed hosts.
#[derive(Clone)]
pub struct AptMetrics {
    pub packages_pending: GaugeVec,
    pub autoremove_pending: Gauge,
    pub reboot_required: Gauge,
}

impl AptMetrics {
    /// Creates and registers the apt gauges with the registry.
    pub fn new(registry: &Registry, namespace: &str) -> prometheus::Result<Self> {
        let packages_pending = GaugeVec::new(
            Opts::new(
                "apt_packages_pending",
                "Number of packages pending for update by APT",
            )
            .namespace(namespace),
            &["origin", "arch"],
        )?;
        let autoremove_pending = Gauge::with_opts(
            Opts::new(
                "apt_autoremove_pending",
                "Number of pending autoremove packages by APT",
            )
            .namespace(namespace),
        )?;
        let reboot_required =
            Gauge::with_opts(Opts::new("apt_reboot_required", "Reboot required").namespace(namespace))?;

        registry.register(Box::new(packages_pending.clone()))?;
        registry.register(Box::new(autoremove_pending.clone()))?;
        registry.register(Box::new(reboot_required.clone()))?;

        Ok(Self {
            packages_pending,
            autoremove_pending,
            reboot_required,
        })
    }

    pub fn set(&self, snapshot: &AptSnapshot) {
        for (key, count) in sorted_counts(&snapshot.pending) {
            let arch = key.arch.as_deref().unwrap_or_default();
            self.packages_pending
                .with_label_values(&[key.origin.as_str(), arch])
                .set(count as f64);
        }
        self.autoremove_pending.set(snapshot.autoremove as f64);
        self.reboot_required
            .set(bool_gauge(snapshot.reboot_required));
    }
}

/// Registers the gauges of the snapshot's family and sets their values.
pub fn record_snapshot(
    registry: &Registry,
    namespace: &str,
    snapshot: &PackageSnapshot,
) -> prometheus::Result<()> {
    match snapshot {
        PackageSnapshot::Yum(s) => YumMetrics::new(registry, namespace)?.set(s),
        PackageSnapshot::Apt(s) => AptMetrics::new(registry, namespace)?.set(s),
    }
    Ok(())
}

/// Self-monitoring gauges of the exporter.
#[derive(Clone)]
pub struct TelemetryMetrics {
    pub scrape_duration: Gauge,
    pub scrape_success: Gauge,
    pub parse_skipped_lines: Gauge,
}

impl TelemetryMetrics {
    pub fn new(registry: &Registry, namespace: &str) -> prometheus::Result<Self> {
        let scrape_duration = Gauge::with_opts(
            Opts::new(
                "scrape_duration_seconds",
                "Time spent running the package manager commands for this scrape",
            )
            .namespace(namespace),
        )?;
        let scrape_success = Gauge::with_opts(
            Opts::new(
                "scrape_success",
                "Whether the package state collection succeeded (1) or failed (0)",
            )
            .namespace(namespace),
        )?;
        let parse_skipped_lines = Gauge::with_opts(
            Opts::new(
                "parse_skipped_lines",
                "Package manager output lines skipped because they could not be parsed",
            )
            .namespace(namespace),
        )?;

        registry.register(Box::new(scrape_duration.clone()))?;
        registry.register(Box::new(scrape_success.clone()))?;
        registry.register(Box::new(parse_skipped_lines.clone()))?;

        Ok(Self {
            scrape_duration,
            scrape_success,
            parse_skipped_lines,
        })
    }

    pub fn set(&self, duration_seconds: f64, snapshot: Option<&PackageSnapshot>) {
        self.scrape_duration.set(duration_seconds);
        self.scrape_success.set(bool_gauge(snapshot.is_some()));
        self.parse_skipped_lines
            .set(snapshot.map_or(0, PackageSnapshot::skipped_lines) as f64);
    }
}

/// Encodes everything in the registry in the Prometheus text format.
pub fn encode(registry: &Registry) -> prometheus::Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
