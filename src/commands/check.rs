//! Check command implementation.
//!
//! Validates that the package manager tools the exporter needs are present
//! and reports which family would be used.

use anyhow::{bail, Result};
use package_exporter::{detect_family, CommandRunner, PackageFamily};
use std::path::Path;

use crate::config::Config;

fn report_path(label: &str, path: &Path) -> bool {
    if path.exists() {
        println!("   ✅ {label}: {}", path.display());
        true
    } else {
        println!("   ❌ {label}: {} not found", path.display());
        false
    }
}

/// Validates system requirements and configuration
pub fn command_check(config: &Config, runner: &dyn CommandRunner) -> Result<()> {
    println!("🔍 Package Exporter - System Check");
    println!("==================================");

    let paths = config.tool_paths();

    println!("\n📦 Detecting package manager...");
    let family = match config.package_family()? {
        Some(family) => {
            println!("   ✅ {family} (configured)");
            Some(family)
        }
        None => match detect_family(runner, &paths) {
            Ok(family) => {
                println!("   ✅ {family} (detected)");
                Some(family)
            }
            Err(e) => {
                println!("   ❌ {e}");
                None
            }
        },
    };

    let mut all_ok = family.is_some();

    println!("\n🛠  Checking tools...");
    match family {
        Some(PackageFamily::Apt) => {
            all_ok &= report_path("apt-get", &paths.apt_get);
            if paths.reboot_required_file.exists() {
                println!(
                    "   ⚠️  reboot marker present: {}",
                    paths.reboot_required_file.display()
                );
            } else {
                println!(
                    "   ✅ reboot marker absent: {}",
                    paths.reboot_required_file.display()
                );
            }
        }
        Some(PackageFamily::Yum) => {
            all_ok &= report_path("yum", &paths.yum);
            // a missing probe reports a pending reboot on every scrape
            all_ok &= report_path("needs-restarting", &paths.needs_restarting);
        }
        None => {
            report_path("apt-get", &paths.apt_get);
            report_path("yum", &paths.yum);
        }
    }

    println!();
    if all_ok {
        println!("✅ All checks passed");
        Ok(())
    } else {
        bail!("System check failed")
    }
}
