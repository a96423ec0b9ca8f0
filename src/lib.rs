//! # Grid Splitter
//!
//! Fetches an image by URL, cuts it into a `columns x rows` grid of equally
//! sized tiles, and serves the tiles over HTTP until they expire.
//!
//! ## Features
//!
//! - **Format preserving**: tiles keep the source format (JPEG, PNG, WebP,
//!   GIF, TIFF, BMP), anything else falls back to JPEG
//! - **Self-describing storage**: every tile has a JSON sidecar with its
//!   expiry, so the content directory survives restarts
//! - **Background expiry**: expired tiles are swept at startup and then on a
//!   fixed interval
//!
//! ## Architecture
//!
//! - [`tile`] - Grid geometry, format table and the splitter
//! - [`store`] - Artifact store and expiry reclaimer
//! - [`fetch`] - Source image retrieval
//! - [`service`] - Create-and-split flow and the cleanup task
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use grid_splitter::{create_router, HttpFetcher, RouterConfig, SplitService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = HttpFetcher::new(Duration::from_secs(30))?;
//!     let service = Arc::new(SplitService::new(fetcher, "output"));
//!     service.store().ensure_root().await?;
//!
//!     let router = create_router(service, RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod server;
pub mod service;
pub mod store;
pub mod tile;

// Re-export commonly used types
pub use config::{Cli, Command, ServeConfig, SweepConfig};
pub use error::{FetchError, SplitError, StoreError, SweepError, TileError, ValidationError};
pub use fetch::{HttpFetcher, ImageFetcher, DEFAULT_FETCH_TIMEOUT_SECS};
pub use server::{create_router, AppState, ErrorResponse, RouterConfig, SplitResponse};
pub use service::{
    spawn_cleanup_task, SplitOutcome, SplitRequest, SplitService, DEFAULT_CLEANUP_INTERVAL_SECS,
};
pub use store::{ArtifactStore, ExpiryRecord, Reclaimer, Retention, SweepReport, TileArtifact};
pub use tile::{GridSpec, SessionId, SplitOutput, Splitter, TileEncoder, MAX_GRID_DIMENSION};
