//! Package manager family selection.
//!
//! The family is resolved once at startup and turned into an immutable
//! [`Collector`] that every scrape uses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::apt::{self, AptCollector};
use crate::error::{CollectError, Result};
use crate::model::PackageSnapshot;
use crate::runner::{run_checked, CommandRunner, CommandSpec, ExitPolicy};
use crate::yum::{self, YumCollector};

/// Supported package manager families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageFamily {
    /// Debian family
    Apt,
    /// Red Hat family
    Yum,
}

impl fmt::Display for PackageFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageFamily::Apt => write!(f, "apt"),
            PackageFamily::Yum => write!(f, "yum"),
        }
    }
}

/// Locations of the executables and files the collectors read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPaths {
    pub apt_get: PathBuf,
    pub yum: PathBuf,
    pub needs_restarting: PathBuf,
    pub reboot_required_file: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            apt_get: PathBuf::from(apt::APT_GET_PATH),
            yum: PathBuf::from(yum::YUM_PATH),
            needs_restarting: PathBuf::from(yum::NEEDS_RESTARTING_PATH),
            reboot_required_file: PathBuf::from(apt::REBOOT_REQUIRED_PATH),
        }
    }
}

impl ToolPaths {
    /// Version queries used to probe each family, in probing order.
    pub fn probes(&self) -> [(PackageFamily, CommandSpec); 2] {
        [
            (
                PackageFamily::Apt,
                CommandSpec::new(self.apt_get.clone(), apt::VERSION_ARGS),
            ),
            (
                PackageFamily::Yum,
                CommandSpec::new(self.yum.clone(), yum::VERSION_ARGS),
            ),
        ]
    }
}

/// Probes apt first, then yum. The first version query that runs and exits
/// 0 selects the family.
pub fn detect_family(runner: &dyn CommandRunner, paths: &ToolPaths) -> Result<PackageFamily> {
    let mut failures = Vec::new();
    for (family, spec) in paths.probes() {
        match run_checked(runner, &spec, ExitPolicy::Success) {
            Ok(_) => {
                info!("Detected {} package manager ({})", family, spec.program.display());
                return Ok(family);
            }
            Err(e) => {
                debug!("{} probe failed: {}", family, e);
                failures.push(e.to_string());
            }
        }
    }
    Err(CollectError::NoPackageManager(failures.join("; ")))
}

/// The collection pipeline of the selected family.
#[derive(Debug, Clone)]
pub enum Collector {
    Apt(AptCollector),
    Yum(YumCollector),
}

impl Collector {
    pub fn new(family: PackageFamily, paths: &ToolPaths) -> Self {
        match family {
            PackageFamily::Apt => Collector::Apt(AptCollector::new(
                paths.apt_get.clone(),
                paths.reboot_required_file.clone(),
            )),
            PackageFamily::Yum => Collector::Yum(YumCollector::new(
                paths.yum.clone(),
                paths.needs_restarting.clone(),
            )),
        }
    }

    pub fn family(&self) -> PackageFamily {
        match self {
            Collector::Apt(_) => PackageFamily::Apt,
            Collector::Yum(_) => PackageFamily::Yum,
        }
    }

    /// Runs one collection cycle. Blocks until every command has finished.
    pub fn collect(&self, runner: &dyn CommandRunner) -> Result<PackageSnapshot> {
        match self {
            Collector::Apt(c) => c.collect(runner).map(PackageSnapshot::Apt),
            Collector::Yum(c) => c.collect(runner).map(PackageSnapshot::Yum),
        }
    }
}
