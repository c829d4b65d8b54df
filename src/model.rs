//! Normalized package records and the per-cycle aggregated snapshot.

use ahash::AHashMap as HashMap;
use serde::{Deserialize, Serialize};

use crate::error::CollectError;

/// One package reported by the package manager as pending or obsolete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub name: String,
    /// Repository the package comes from. Comma-joined when apt can fetch it
    /// from several repositories.
    pub origin: String,
    /// Only reported by apt.
    pub arch: Option<String>,
}

impl PackageRecord {
    pub fn key(&self) -> OriginKey {
        OriginKey {
            origin: self.origin.clone(),
            arch: self.arch.clone(),
        }
    }
}

/// Grouping key: the origin alone for yum, origin and architecture for apt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OriginKey {
    pub origin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
}

impl OriginKey {
    pub fn new(origin: impl Into<String>, arch: Option<&str>) -> Self {
        Self {
            origin: origin.into(),
            arch: arch.map(str::to_string),
        }
    }
}

/// Package count per origin group.
pub type OriginCounts = HashMap<OriginKey, u64>;

/// Records extracted from one command output, plus the lines that looked
/// like records but could not be parsed.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub records: Vec<PackageRecord>,
    pub anomalies: Vec<CollectError>,
}

impl ParseOutcome {
    pub fn skipped(&self) -> u64 {
        self.anomalies.len() as u64
    }
}

/// Tallies records per origin group. Every record counts once, so a package
/// listed under two origin lines is counted in both groups.
pub fn count_by_origin(records: &[PackageRecord]) -> OriginCounts {
    let mut counts = OriginCounts::new();
    for record in records {
        *counts.entry(record.key()).or_insert(0) += 1;
    }
    counts
}

/// Returns the groups ordered by key, for stable output.
pub fn sorted_counts(counts: &OriginCounts) -> Vec<(&OriginKey, u64)> {
    let mut sorted: Vec<_> = counts.iter().map(|(k, v)| (k, *v)).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    sorted
}

/// State of a yum managed host for one collection cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YumSnapshot {
    pub pending: OriginCounts,
    pub obsolete: OriginCounts,
    pub reboot_required: bool,
    pub skipped_lines: u64,
}

/// State of an apt managed host for one collection cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AptSnapshot {
    pub pending: OriginCounts,
    pub autoremove: u64,
    pub reboot_required: bool,
    pub skipped_lines: u64,
}

/// Result of one collection cycle. Never cached or compared across cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSnapshot {
    Yum(YumSnapshot),
    Apt(AptSnapshot),
}

impl PackageSnapshot {
    pub fn pending_total(&self) -> u64 {
        let pending = match self {
            PackageSnapshot::Yum(s) => &s.pending,
            PackageSnapshot::Apt(s) => &s.pending,
        };
        pending.values().sum()
    }

    pub fn reboot_required(&self) -> bool {
        match self {
            PackageSnapshot::Yum(s) => s.reboot_required,
            PackageSnapshot::Apt(s) => s.reboot_required,
        }
    }

    pub fn skipped_lines(&self) -> u64 {
        match self {
            PackageSnapshot::Yum(s) => s.skipped_lines,
            PackageSnapshot::Apt(s) => s.skipped_lines,
        }
    }
}
