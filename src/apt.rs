//! Debian family: pending upgrades and autoremovable packages from apt-get
//! simulations.
//!
//! `apt-get --just-print dist-upgrade` reports each upgrade as
//!
//! ```text
//! Inst libfoo [1.0] (1.1 Ubuntu:20.04/focal-updates, Ubuntu:20.04/focal-security [amd64])
//! ```
//!
//! where the parenthesised group holds the candidate version, the origins it
//! can be fetched from and the architecture.

use std::path::PathBuf;
use tracing::{debug, warn};

use crate::error::{CollectError, Result};
use crate::model::{count_by_origin, AptSnapshot, PackageRecord, ParseOutcome};
use crate::reboot;
use crate::runner::{run_checked, CommandRunner, CommandSpec, ExitPolicy};

pub const APT_GET_PATH: &str = "/usr/bin/apt-get";
pub const REBOOT_REQUIRED_PATH: &str = "/run/reboot-required";

const DIST_UPGRADE_ARGS: &[&str] = &["--just-print", "dist-upgrade"];
const AUTOREMOVE_ARGS: &[&str] = &["--just-print", "autoremove"];
pub const VERSION_ARGS: &[&str] = &["--version"];

const INSTALL_MARKER: &str = "Inst";
const REMOVE_MARKER: &str = "Remv";

fn starts_with_token(line: &str, token: &str) -> bool {
    line.split_whitespace().next() == Some(token)
}

fn malformed(line: &str, reason: &'static str) -> CollectError {
    CollectError::Parse {
        line: line.to_string(),
        reason,
    }
}

/// Parses a single `Inst` line into a package record.
pub fn parse_inst_line(line: &str) -> Result<PackageRecord> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some(INSTALL_MARKER) {
        return Err(malformed(line, "not an Inst line"));
    }
    let name = tokens
        .next()
        .ok_or_else(|| malformed(line, "missing package name"))?;

    let open = line
        .find('(')
        .ok_or_else(|| malformed(line, "missing version and origin group"))?;
    let close = line[open..]
        .find(')')
        .map(|i| open + i)
        .ok_or_else(|| malformed(line, "unterminated version and origin group"))?;

    // version first, architecture last, origins in between
    let group: Vec<&str> = line[open + 1..close].split_whitespace().collect();
    let (arch, origins) = match group.split_first() {
        Some((_version, rest)) => rest
            .split_last()
            .ok_or_else(|| malformed(line, "missing architecture"))?,
        None => return Err(malformed(line, "empty version and origin group")),
    };

    let arch = arch.trim_matches(|c: char| c == '[' || c == ']');
    if arch.is_empty() {
        return Err(malformed(line, "missing architecture"));
    }

    let origin = origins
        .iter()
        .map(|o| o.trim_end_matches(','))
        .filter(|o| !o.is_empty())
        .collect::<Vec<_>>()
        .join(",");

    Ok(PackageRecord {
        name: name.to_string(),
        origin,
        arch: Some(arch.to_string()),
    })
}

/// Parses `apt-get --just-print dist-upgrade` output.
pub fn parse_dist_upgrade(output: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    for line in output
        .lines()
        .filter(|l| starts_with_token(l, INSTALL_MARKER))
    {
        match parse_inst_line(line) {
            Ok(record) => outcome.records.push(record),
            Err(e) => outcome.anomalies.push(e),
        }
    }
    outcome
}

/// Counts the `Remv` lines of `apt-get --just-print autoremove` output.
pub fn count_autoremove(output: &str) -> u64 {
    output
        .lines()
        .filter(|l| starts_with_token(l, REMOVE_MARKER))
        .count() as u64
}

/// Collects apt state from the two simulations and the reboot marker file.
#[derive(Debug, Clone)]
pub struct AptCollector {
    dist_upgrade: CommandSpec,
    autoremove: CommandSpec,
    reboot_marker: PathBuf,
}

impl AptCollector {
    pub fn new(apt_get: impl Into<PathBuf>, reboot_marker: impl Into<PathBuf>) -> Self {
        let apt_get = apt_get.into();
        Self {
            dist_upgrade: CommandSpec::new(apt_get.clone(), DIST_UPGRADE_ARGS),
            autoremove: CommandSpec::new(apt_get, AUTOREMOVE_ARGS),
            reboot_marker: reboot_marker.into(),
        }
    }

    /// Runs one full collection cycle. Any failing step fails the whole cycle.
    pub fn collect(&self, runner: &dyn CommandRunner) -> Result<AptSnapshot> {
        let output = run_checked(runner, &self.dist_upgrade, ExitPolicy::Success)?;
        let pending = parse_dist_upgrade(&output.stdout);
        for anomaly in &pending.anomalies {
            warn!("Skipping apt output line: {}", anomaly);
        }

        let output = run_checked(runner, &self.autoremove, ExitPolicy::Success)?;
        let autoremove = count_autoremove(&output.stdout);

        let reboot_required = reboot::marker_file_present(&self.reboot_marker);

        let snapshot = AptSnapshot {
            pending: count_by_origin(&pending.records),
            autoremove,
            reboot_required,
            skipped_lines: pending.skipped(),
        };
        debug!(
            "apt: {} pending in {} origin/arch groups, {} autoremovable, reboot required: {}",
            pending.records.len(),
            snapshot.pending.len(),
            autoremove,
            reboot_required
        );
        Ok(snapshot)
    }
}

impl Default for AptCollector {
    fn default() -> Self {
        Self::new(APT_GET_PATH, REBOOT_REQUIRED_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OriginKey;
    use crate::runner::testing::ScriptedRunner;

    const DIST_UPGRADE: &str = "NOTE: This is only a simulation!
      apt-get needs root privileges for real execution.
      Keep also in mind that locking is deactivated,
      so don't depend on the relevance to the real current situation!
Reading package lists...
Building dependency tree...
Reading state information...
Calculating upgrade...
The following packages will be upgraded:
  libfoo openssl
2 upgraded, 1 newly installed, 0 to remove and 0 not upgraded.
Inst libfoo [1.0] (1.1 Ubuntu:20.04/focal-updates [amd64])
Inst openssl [1.1.1f-1ubuntu2.19] (1.1.1f-1ubuntu2.20 Ubuntu:20.04/focal-updates, Ubuntu:20.04/focal-security [amd64])
Inst linux-headers-5.4.0-170 (5.4.0-170.188 Ubuntu:20.04/focal-updates, Ubuntu:20.04/focal-security [all])
Conf libfoo (1.1 Ubuntu:20.04/focal-updates [amd64])
Conf openssl (1.1.1f-1ubuntu2.20 Ubuntu:20.04/focal-updates, Ubuntu:20.04/focal-security [amd64])
";

    const AUTOREMOVE: &str = "NOTE: This is only a simulation!
Reading package lists...
The following packages will be REMOVED:
  linux-headers-5.4.0-150 linux-headers-5.4.0-150-generic linux-image-5.4.0-150-generic
0 upgraded, 0 newly installed, 3 to remove and 0 not upgraded.
Remv linux-headers-5.4.0-150-generic [5.4.0-150.167]
Remv linux-headers-5.4.0-150 [5.4.0-150.167]
Remv linux-image-5.4.0-150-generic [5.4.0-150.167]
";

    fn key(origin: &str, arch: &str) -> OriginKey {
        OriginKey::new(origin, Some(arch))
    }

    #[test]
    fn test_parse_single_origin() {
        let record =
            parse_inst_line("Inst libfoo [1.0] (1.1 Ubuntu:20.04/focal-updates [amd64])").unwrap();
        assert_eq!(record.name, "libfoo");
        assert_eq!(record.origin, "Ubuntu:20.04/focal-updates");
        assert_eq!(record.arch.as_deref(), Some("amd64"));
        assert_eq!(record.key(), key("Ubuntu:20.04/focal-updates", "amd64"));
    }

    #[test]
    fn test_parse_multiple_origins() {
        let record = parse_inst_line(
            "Inst openssl [1.1.1f-1ubuntu2.19] (1.1.1f-1ubuntu2.20 Ubuntu:20.04/focal-updates, Ubuntu:20.04/focal-security [amd64])",
        )
        .unwrap();
        assert_eq!(
            record.origin,
            "Ubuntu:20.04/focal-updates,Ubuntu:20.04/focal-security"
        );
        assert_eq!(record.arch.as_deref(), Some("amd64"));
    }

    #[test]
    fn test_parse_origins_without_commas() {
        let record = parse_inst_line(
            "Inst openssl (3.0 Ubuntu:20.04/focal-updates Ubuntu:20.04/focal-security [amd64])",
        )
        .unwrap();
        assert_eq!(
            record.origin,
            "Ubuntu:20.04/focal-updates,Ubuntu:20.04/focal-security"
        );
    }

    #[test]
    fn test_parse_without_origin() {
        let record = parse_inst_line("Inst localpkg [0.9] (1.0 [amd64])").unwrap();
        assert_eq!(record.origin, "");
        assert_eq!(record.arch.as_deref(), Some("amd64"));
    }

    #[test]
    fn test_malformed_inst_lines() {
        for line in [
            "Inst libfoo",
            "Inst libfoo [1.0]",
            "Inst libfoo [1.0] ()",
            "Inst libfoo [1.0] (1.1)",
            "Inst libfoo [1.0] (1.1 Ubuntu:20.04/focal-updates [amd64]",
            "Inst",
        ] {
            assert!(
                matches!(parse_inst_line(line), Err(CollectError::Parse { .. })),
                "{line} should not parse"
            );
        }
    }

    #[test]
    fn test_parse_dist_upgrade() {
        let outcome = parse_dist_upgrade(DIST_UPGRADE);
        assert_eq!(outcome.records.len(), 3);
        assert!(outcome.anomalies.is_empty());

        let counts = count_by_origin(&outcome.records);
        assert_eq!(counts.len(), 3);
        assert_eq!(counts[&key("Ubuntu:20.04/focal-updates", "amd64")], 1);
        assert_eq!(
            counts[&key(
                "Ubuntu:20.04/focal-updates,Ubuntu:20.04/focal-security",
                "amd64"
            )],
            1
        );
        assert_eq!(
            counts[&key(
                "Ubuntu:20.04/focal-updates,Ubuntu:20.04/focal-security",
                "all"
            )],
            1
        );
    }

    #[test]
    fn test_parse_dist_upgrade_skips_malformed_lines() {
        let output = "Inst libfoo [1.0] (1.1 Debian:12/stable [amd64])\nInst held-back-notice\n";
        let outcome = parse_dist_upgrade(output);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.skipped(), 1);
    }

    #[test]
    fn test_inst_must_be_a_whole_token() {
        let outcome = parse_dist_upgrade("Installing foo (1.0 Debian:12/stable [amd64])\n");
        assert!(outcome.records.is_empty());
        assert!(outcome.anomalies.is_empty());
    }

    #[test]
    fn test_count_autoremove() {
        assert_eq!(count_autoremove(AUTOREMOVE), 3);
        assert_eq!(count_autoremove(""), 0);
        assert_eq!(count_autoremove("Reading package lists...\n"), 0);
    }

    #[test]
    fn test_empty_output() {
        let outcome = parse_dist_upgrade("");
        assert!(outcome.records.is_empty());
        assert!(outcome.anomalies.is_empty());
    }

    #[test]
    fn test_collect() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("reboot-required");
        std::fs::write(&marker, "").unwrap();

        let runner = ScriptedRunner::new()
            .exit("/usr/bin/apt-get --just-print dist-upgrade", 0, DIST_UPGRADE)
            .exit("/usr/bin/apt-get --just-print autoremove", 0, AUTOREMOVE);

        let snapshot = AptCollector::new(APT_GET_PATH, &marker)
            .collect(&runner)
            .unwrap();
        assert_eq!(snapshot.pending.values().sum::<u64>(), 3);
        assert_eq!(snapshot.autoremove, 3);
        assert!(snapshot.reboot_required);
        assert_eq!(snapshot.skipped_lines, 0);
    }

    #[test]
    fn test_collect_without_reboot_marker() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new()
            .exit("/usr/bin/apt-get --just-print dist-upgrade", 0, "")
            .exit("/usr/bin/apt-get --just-print autoremove", 0, "");

        let snapshot = AptCollector::new(APT_GET_PATH, dir.path().join("reboot-required"))
            .collect(&runner)
            .unwrap();
        assert!(snapshot.pending.is_empty());
        assert_eq!(snapshot.autoremove, 0);
        assert!(!snapshot.reboot_required);
    }

    #[test]
    fn test_collect_fails_on_nonzero_exit() {
        let runner = ScriptedRunner::new()
            .exit("/usr/bin/apt-get --just-print dist-upgrade", 0, DIST_UPGRADE)
            .exit("/usr/bin/apt-get --just-print autoremove", 100, "");

        let err = AptCollector::default().collect(&runner).unwrap_err();
        assert!(matches!(
            err,
            CollectError::UnexpectedExit {
                code: Some(100),
                ..
            }
        ));
    }

    #[test]
    fn test_collect_fails_when_apt_get_is_missing() {
        let runner = ScriptedRunner::new();
        let err = AptCollector::default().collect(&runner).unwrap_err();
        assert!(matches!(err, CollectError::Launch { .. }));
        assert_eq!(runner.calls().len(), 1);
    }
}
