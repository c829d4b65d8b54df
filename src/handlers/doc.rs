//! Documentation endpoint handler.
//!
//! This module provides the `/doc` endpoint handler that displays
//! documentation for the exporter.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::{debug, instrument};

use crate::handlers::health::FOOTER_TEXT;
use crate::state::SharedState;

/// Handler for the /doc endpoint.
#[instrument(skip(state))]
pub async fn doc_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /doc request");

    let version = env!("CARGO_PKG_VERSION");
    let ns = state.config.namespace();
    let doc = format!(
        r#"PACKAGE EXPORTER - DOCUMENTATION
================================

VERSION: {version}
DESCRIPTION: Prometheus exporter for pending APT/YUM package updates
ACTIVE PACKAGE MANAGER: {family}

HTTP ENDPOINTS
--------------
GET {metrics_path:<12} - Prometheus metrics endpoint (runs the package manager on every request)
GET /health       - Health check with collection statistics (plain text)
GET /doc          - This documentation (plain text)
GET /             - Landing page

AVAILABLE METRICS
-----------------
YUM (Red Hat family):
{ns}_yum_packages_pending{{origin}}        - Packages pending for update per repository
{ns}_yum_packages_obsolete{{origin}}       - Obsolete packages per repository
{ns}_yum_reboot_required                 - 1 if needs-restarting -r reports a pending reboot

APT (Debian family):
{ns}_apt_packages_pending{{origin,arch}}   - Packages pending for update per origin and architecture
{ns}_apt_autoremove_pending              - Packages apt-get autoremove would remove
{ns}_apt_reboot_required                 - 1 if /run/reboot-required exists

Exporter:
{ns}_scrape_duration_seconds             - Time spent collecting package state
{ns}_scrape_success                      - 1 if the collection succeeded
{ns}_parse_skipped_lines                 - Output lines that could not be parsed

CONFIGURATION
-------------
Config file locations (in order):
1. CLI specified: -c /path/to/config.yaml
2. System config: /etc/package-exporter/config.{{yaml,yml,json,toml}}
3. Current directory: ./package-exporter.{{yaml,yml,json,toml}}

Key configuration options:
- port: HTTP listen port (default: 9888)
- bind: Bind address (default: 0.0.0.0)
- metrics_path: Metrics endpoint path (default: /metrics)
- namespace: Metric name prefix (default: package_exporter)
- package_manager: auto, apt or yum (default: auto)

{FOOTER_TEXT}
"#,
        family = state.collector.family(),
        metrics_path = state.config.metrics_path(),
    );

    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        doc,
    )
}
