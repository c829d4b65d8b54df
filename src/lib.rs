//! Package state collection for package-exporter.
//!
//! Runs the read-only inspection commands of apt or yum, parses their
//! output into per-origin package counts and maps those onto Prometheus
//! gauges. Every collection cycle starts from scratch; nothing is cached.

pub mod apt;
pub mod error;
pub mod family;
pub mod metrics;
pub mod model;
pub mod reboot;
pub mod runner;
pub mod yum;

pub use error::CollectError;
pub use family::{detect_family, Collector, PackageFamily, ToolPaths};
pub use model::{AptSnapshot, OriginKey, PackageRecord, PackageSnapshot, YumSnapshot};
pub use runner::{CommandRunner, SystemRunner};
