//! Red Hat family: pending updates and obsolete packages reported by yum.
//!
//! Both listings print one package per line as `name.arch  version  repo`.
//! The obsoletes listing adds an indented continuation line naming the
//! installed package being obsoleted.

use std::path::PathBuf;
use tracing::{debug, warn};

use crate::error::{CollectError, Result};
use crate::model::{count_by_origin, PackageRecord, ParseOutcome, YumSnapshot};
use crate::reboot;
use crate::runner::{run_checked, CommandRunner, CommandSpec, ExitPolicy};

pub const YUM_PATH: &str = "/usr/bin/yum";
pub const NEEDS_RESTARTING_PATH: &str = "/bin/needs-restarting";

/// Exit status of `yum check-update` when updates are available.
pub const UPDATES_AVAILABLE: i32 = 100;

const CHECK_UPDATE_ARGS: &[&str] = &["check-update", "--quiet"];
const LIST_OBSOLETES_ARGS: &[&str] = &["list", "obsoletes", "--quiet"];
const NEEDS_RESTARTING_ARGS: &[&str] = &["-r"];
pub const VERSION_ARGS: &[&str] = &["--version"];

const CONTINUATION_INDENT: &str = "    ";

/// Parses `yum check-update --quiet` output.
pub fn parse_check_update(output: &str) -> ParseOutcome {
    parse_listing(output, false)
}

/// Parses `yum list obsoletes --quiet` output, ignoring indented
/// continuation lines.
pub fn parse_obsoletes(output: &str) -> ParseOutcome {
    parse_listing(output, true)
}

fn parse_listing(output: &str, skip_continuations: bool) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    for line in output.lines() {
        // the version column always holds a dot, headers and blank lines don't
        if !line.contains('.') {
            continue;
        }
        if skip_continuations && line.starts_with(CONTINUATION_INDENT) {
            continue;
        }
        match parse_line(line) {
            Ok(record) => outcome.records.push(record),
            Err(e) => outcome.anomalies.push(e),
        }
    }
    outcome
}

fn parse_line(line: &str) -> Result<PackageRecord> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 3 {
        return Err(CollectError::Parse {
            line: line.to_string(),
            reason: "expected name, version and repository columns",
        });
    }
    Ok(PackageRecord {
        name: fields[0].to_string(),
        origin: fields[2].to_string(),
        arch: None,
    })
}

/// Collects yum state by running the listing commands and the reboot probe.
#[derive(Debug, Clone)]
pub struct YumCollector {
    check_update: CommandSpec,
    list_obsoletes: CommandSpec,
    needs_restarting: CommandSpec,
}

impl YumCollector {
    pub fn new(yum: impl Into<PathBuf>, needs_restarting: impl Into<PathBuf>) -> Self {
        let yum = yum.into();
        Self {
            check_update: CommandSpec::new(yum.clone(), CHECK_UPDATE_ARGS),
            list_obsoletes: CommandSpec::new(yum, LIST_OBSOLETES_ARGS),
            needs_restarting: CommandSpec::new(needs_restarting, NEEDS_RESTARTING_ARGS),
        }
    }

    /// Runs one full collection cycle. Any failing step fails the whole cycle.
    pub fn collect(&self, runner: &dyn CommandRunner) -> Result<YumSnapshot> {
        let pending = self.pending_packages(runner)?;
        let obsolete = self.obsolete_packages(runner)?;
        let reboot_required = reboot::probe_exit_code(runner, &self.needs_restarting);

        let skipped_lines = warn_anomalies(&pending) + warn_anomalies(&obsolete);
        let snapshot = YumSnapshot {
            pending: count_by_origin(&pending.records),
            obsolete: count_by_origin(&obsolete.records),
            reboot_required,
            skipped_lines,
        };
        debug!(
            "yum: {} pending in {} origins, {} obsolete, reboot required: {}",
            pending.records.len(),
            snapshot.pending.len(),
            obsolete.records.len(),
            reboot_required
        );
        Ok(snapshot)
    }

    fn pending_packages(&self, runner: &dyn CommandRunner) -> Result<ParseOutcome> {
        let output = run_checked(
            runner,
            &self.check_update,
            ExitPolicy::AcceptCodes(&[UPDATES_AVAILABLE]),
        )?;
        Ok(parse_check_update(&output.stdout))
    }

    fn obsolete_packages(&self, runner: &dyn CommandRunner) -> Result<ParseOutcome> {
        let output = run_checked(runner, &self.list_obsoletes, ExitPolicy::Success)?;
        Ok(parse_obsoletes(&output.stdout))
    }
}

impl Default for YumCollector {
    fn default() -> Self {
        Self::new(YUM_PATH, NEEDS_RESTARTING_PATH)
    }
}

fn warn_anomalies(outcome: &ParseOutcome) -> u64 {
    for anomaly in &outcome.anomalies {
        warn!("Skipping yum output line: {}", anomaly);
    }
    outcome.skipped()
}
