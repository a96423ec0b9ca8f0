//! Grid Splitter - split remote images into expiring tiles.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use grid_splitter::{
    config::{Cli, Command, ServeConfig, SweepConfig},
    server::{create_router, RouterConfig},
    spawn_cleanup_task, HttpFetcher, Reclaimer, SplitService,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Sweep(config) => run_sweep(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Grid Splitter v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Output directory: {}", config.output_dir.display());
    info!("  Fetch timeout: {}s", config.fetch_timeout);
    info!("  Cleanup interval: {}s", config.cleanup_interval);
    match config.base_url {
        Some(ref base_url) => info!("  Base URL: {}", base_url),
        None => info!("  Base URL: from request Host header"),
    }

    let fetcher = match HttpFetcher::new(config.fetch_timeout()) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let service = Arc::new(SplitService::new(fetcher, &config.output_dir));

    if let Err(e) = service.store().ensure_root().await {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    // Tiles left over from a previous run may already be due
    service.sweep().await;
    spawn_cleanup_task(Arc::clone(&service), config.cleanup_interval());

    let router = create_router(service, build_router_config(&config));
    let addr = config.bind_address();

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/api/health", addr);
    info!(
        "    curl -X POST http://{}/api/split-image -H 'Content-Type: application/json' \\",
        addr
    );
    info!("         -d '{{\"imageUrl\":\"https://example.com/photo.png\",\"grid\":\"2x2\"}}'");
    info!("");

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "grid_splitter=debug,tower_http=debug"
    } else {
        "grid_splitter=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new().with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    if let Some(ref base_url) = config.base_url {
        router_config = router_config.with_base_url(base_url.clone());
    }

    router_config
}

// =============================================================================
// Sweep Command
// =============================================================================

async fn run_sweep(config: SweepConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("Sweeping {}", config.output_dir.display());

    match Reclaimer::new(&config.output_dir).sweep().await {
        Ok(report) => {
            println!("  Records scanned:   {}", report.scanned);
            println!("  Tiles removed:     {}", report.removed);
            println!("  Orphans removed:   {}", report.orphaned);
            println!("  Orphans pending:   {}", report.pending);
            println!("  Records skipped:   {}", report.skipped);
            println!("  Removal failures:  {}", report.failed);

            if report.failed > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
