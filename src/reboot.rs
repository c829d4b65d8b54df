//! Pending-reboot indicators.

use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

use crate::runner::{CommandRunner, CommandSpec};

/// Checks for a marker file such as `/run/reboot-required`.
///
/// Errors other than "not found" are reported as "not required".
pub fn marker_file_present(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(_) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => {
            warn!(
                "Cannot stat reboot marker {}: {}, assuming no reboot required",
                path.display(),
                e
            );
            false
        }
    }
}

/// Runs a probe that exits 0 when no reboot is required and non-zero otherwise.
///
/// A probe that cannot be launched has no exit code and therefore reports a
/// required reboot.
pub fn probe_exit_code(runner: &dyn CommandRunner, spec: &CommandSpec) -> bool {
    match runner.run(spec) {
        Ok(output) => {
            debug!("{} exited with {:?}", spec, output.code);
            !output.success()
        }
        Err(e) => {
            warn!("Reboot probe failed: {}", e);
            true
        }
    }
}
