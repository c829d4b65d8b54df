//! Metrics endpoint handler for Prometheus scraping.
//!
//! Every request runs a complete collection cycle on a blocking thread and
//! encodes the result from a registry private to that request.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use package_exporter::metrics::{self, TelemetryMetrics};
use package_exporter::PackageSnapshot;
use prometheus::Registry;
use std::time::Instant;
use tracing::{debug, error, instrument};

use crate::config::Config;
use crate::state::SharedState;

/// Error type for metrics endpoint failures.
#[derive(Debug)]
pub enum MetricsError {
    CollectionAborted,
    EncodingFailed,
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> Response {
        let message = match self {
            MetricsError::CollectionAborted => "Package state collection aborted",
            MetricsError::EncodingFailed => "Failed to encode metrics",
        };
        (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
    }
}

/// Handler for the metrics endpoint.
#[instrument(skip(state))]
pub async fn metrics_handler(State(state): State<SharedState>) -> Result<Response, MetricsError> {
    let start = Instant::now();
    debug!("Processing metrics request");

    let cycle_state = state.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        cycle_state
            .collector
            .collect(cycle_state.runner.as_ref())
    })
    .await
    .map_err(|e| {
        error!("Collection task failed: {}", e);
        MetricsError::CollectionAborted
    })?;
    let duration = start.elapsed().as_secs_f64();

    let snapshot = match outcome {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            error!(
                "Error collecting {} metrics: {}",
                state.collector.family(),
                e
            );
            None
        }
    };

    state.health_stats.record_collection(
        snapshot.as_ref().map(PackageSnapshot::pending_total),
        duration,
    );

    let body = render_metrics(&state.config, snapshot.as_ref(), duration).map_err(|e| {
        error!("Failed to encode Prometheus metrics: {}", e);
        MetricsError::EncodingFailed
    })?;

    debug!(
        "Metrics request completed: {} bytes, {:.3}ms",
        body.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response())
}

/// Encodes one cycle. A failed cycle (`None`) exports no package gauges.
pub fn render_metrics(
    config: &Config,
    snapshot: Option<&PackageSnapshot>,
    duration_seconds: f64,
) -> prometheus::Result<String> {
    let registry = Registry::new();
    let namespace = config.namespace();

    if let Some(snapshot) = snapshot {
        metrics::record_snapshot(&registry, namespace, snapshot)?;
    }
    if config.enable_telemetry.unwrap_or(true) {
        TelemetryMetrics::new(&registry, namespace)?.set(duration_seconds, snapshot);
    }

    metrics::encode(&registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health_stats::HealthStats;
    use crate::state::AppState;
    use package_exporter::error::Result as CollectResult;
    use package_exporter::runner::{CommandOutput, CommandSpec};
    use package_exporter::{CollectError, Collector, CommandRunner, PackageFamily};
    use std::path::PathBuf;
    use std::sync::Arc;

    /// Answers every command with the same output.
    struct StaticRunner {
        code: i32,
        stdout: &'static str,
    }

    impl CommandRunner for StaticRunner {
        fn run(&self, _spec: &CommandSpec) -> CollectResult<CommandOutput> {
            Ok(CommandOutput {
                stdout: self.stdout.to_string(),
                stderr: String::new(),
                code: Some(self.code),
            })
        }
    }

    struct MissingRunner;

    impl CommandRunner for MissingRunner {
        fn run(&self, spec: &CommandSpec) -> CollectResult<CommandOutput> {
            Err(CollectError::Launch {
                command: spec.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            })
        }
    }

    fn state(family: PackageFamily, runner: Arc<dyn CommandRunner>) -> SharedState {
        let config = Config {
            reboot_required_file: Some(PathBuf::from("/nonexistent/reboot-required")),
            ..Config::default()
        };
        let collector = Collector::new(family, &config.tool_paths());
        Arc::new(AppState {
            config: Arc::new(config),
            collector,
            runner,
            health_stats: Arc::new(HealthStats::new()),
        })
    }

    async fn body(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_apt_scrape() {
        let output = "Inst libfoo [1.0] (1.1 Ubuntu:20.04/focal-updates [amd64])\n\
                      Remv libold [0.9]\nRemv libolder [0.8]\nRemv liboldest [0.7]\n";
        let state = state(
            PackageFamily::Apt,
            Arc::new(StaticRunner {
                code: 0,
                stdout: output,
            }),
        );

        let response = metrics_handler(State(state.clone())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let text = body(response).await;

        assert!(text.contains("package_exporter_apt_autoremove_pending 3"));
        assert!(text.contains("package_exporter_apt_reboot_required 0"));
        assert!(text.contains("origin=\"Ubuntu:20.04/focal-updates\""));
        assert!(text.contains("package_exporter_scrape_success 1"));
        assert!(!state.health_stats.last_collection_failed());
    }

    #[tokio::test]
    async fn test_failed_scrape_exports_no_package_gauges() {
        let state = state(PackageFamily::Yum, Arc::new(MissingRunner));

        let response = metrics_handler(State(state.clone())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let text = body(response).await;

        assert!(!text.contains("yum_"));
        assert!(text.contains("package_exporter_scrape_success 0"));
        assert!(state.health_stats.last_collection_failed());
    }

    #[test]
    fn test_render_without_telemetry() {
        let config = Config {
            enable_telemetry: Some(false),
            ..Config::default()
        };
        let text = render_metrics(&config, None, 1.0).unwrap();
        assert!(text.is_empty());
    }
}
