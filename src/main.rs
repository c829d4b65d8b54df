//! package-exporter
//!
//! Prometheus exporter for pending APT/YUM package updates. Every scrape
//! runs the package manager's read-only inspection commands, so the
//! exported values always describe the host at request time.

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use package_exporter::{detect_family, CollectError, Collector, CommandRunner, SystemRunner};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::{net::TcpListener, signal};
use tracing::{error, info, level_filters::LevelFilter};

mod cli;
mod commands;
mod config;
mod handlers;
mod health_stats;
mod state;

use cli::{Args, Commands};
use commands::{command_check, command_config, command_test};
use config::{resolve_config, show_config, validate_effective_config, Config};
use handlers::{doc_handler, health_handler, metrics_handler, root_handler};
use health_stats::HealthStats;
use state::AppState;

/// Initializes tracing logging subsystem with configured log level
fn setup_logging(level: LevelFilter) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Logging initialized with level: {}", level);
    Ok(())
}

/// Uses the configured family or probes for one. Runs once per process.
fn build_collector(config: &Config, runner: &dyn CommandRunner) -> Result<Collector> {
    let paths = config.tool_paths();
    let family = match config.package_family()? {
        Some(family) => {
            info!("Using configured package manager: {}", family);
            family
        }
        None => {
            let family = detect_family(runner, &paths)?;
            info!("Detected package manager: {}", family);
            family
        }
    };
    Ok(Collector::new(family, &paths))
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

fn build_router(state: state::SharedState) -> Router {
    let config = state.config.clone();
    let mut app = Router::new()
        .route(config.metrics_path(), get(metrics_handler))
        .route("/", get(root_handler))
        .route("/doc", get(doc_handler));

    if config.enable_health.unwrap_or(true) {
        app = app.route("/health", get(health_handler));
    }

    app.with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {e:#}");
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format);
    }

    let config = resolve_config(&args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {e:#}");
        std::process::exit(1);
    }

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);

    // Subcommands that need no logging or collector
    match &args.command {
        Some(Commands::Config {
            output,
            format,
            commented,
        }) => return command_config(output.clone(), *format, *commented),
        Some(Commands::Check) => return command_check(&config, runner.as_ref()),
        _ => {}
    }

    setup_logging(config.log_level()?)?;

    let collector = match build_collector(&config, runner.as_ref()) {
        Ok(collector) => collector,
        Err(e) => {
            if let Some(CollectError::NoPackageManager(_)) = e.downcast_ref::<CollectError>() {
                error!("No supported package manager found: {:#}", e);
            } else {
                error!("Failed to select package manager: {:#}", e);
            }
            std::process::exit(1);
        }
    };

    if let Some(Commands::Test { iterations, format }) = &args.command {
        return command_test(&collector, runner.as_ref(), *iterations, *format);
    }

    info!("Starting package-exporter");

    let addr: SocketAddr = format!("{}:{}", config.bind(), config.port())
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.bind(), config.port()))?;
    let tls = match (&config.tls_cert, &config.tls_key) {
        (Some(cert), Some(key)) => Some(
            RustlsConfig::from_pem_file(cert, key)
                .await
                .context("Failed to load TLS certificate or key")?,
        ),
        _ => None,
    };
    let metrics_path = config.metrics_path().to_string();

    let state = Arc::new(AppState {
        config: Arc::new(config),
        collector,
        runner,
        health_stats: Arc::new(HealthStats::new()),
    });
    let app = build_router(state);

    match tls {
        Some(tls) => {
            let handle = axum_server::Handle::new();
            let shutdown_handle = handle.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                shutdown_handle.graceful_shutdown(Some(Duration::from_secs(10)));
            });

            info!("package-exporter listening on https://{}{}", addr, metrics_path);
            axum_server::bind_rustls(addr, tls)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .context("Server error")?;
        }
        None => {
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {addr}"))?;
            info!("package-exporter listening on http://{}{}", addr, metrics_path);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("Server error")?;
        }
    }

    info!("package-exporter stopped gracefully");
    Ok(())
}
