//! Router configuration for the grid splitter.
//!
//! # Route Structure
//!
//! ```text
//! POST /api/split-image      - Fetch and split an image
//! GET  /api/health           - Health check
//! GET  /images/{filename}    - Stored tiles (static files)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use grid_splitter::fetch::HttpFetcher;
//! use grid_splitter::server::{create_router, RouterConfig};
//! use grid_splitter::SplitService;
//!
//! let fetcher = HttpFetcher::new(Duration::from_secs(30))?;
//! let service = Arc::new(SplitService::new(fetcher, "output"));
//!
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//! let router = create_router(service, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, split_image_handler, AppState};
use crate::fetch::ImageFetcher;
use crate::service::SplitService;
use crate::store::PUBLIC_PATH_PREFIX;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,

    /// Public base URL reported in create responses (None = from request)
    pub base_url: Option<String>,
}

impl RouterConfig {
    /// Create a router configuration.
    ///
    /// By default CORS allows any origin, tracing is enabled and the base
    /// URL is taken from each request.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
            base_url: None,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Report this base URL instead of deriving it from the request.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// Stored tiles are served from the service's content directory under
/// `/images`.
pub fn create_router<F>(service: Arc<SplitService<F>>, config: RouterConfig) -> Router
where
    F: ImageFetcher + 'static,
{
    let images = ServeDir::new(service.store().root());
    let app_state = AppState::new(service).with_base_url(config.base_url.clone());

    let cors = build_cors_layer(&config);

    let router = Router::new()
        .route("/api/split-image", post(split_image_handler::<F>))
        .route("/api/health", get(health_handler))
        .with_state(app_state)
        .nest_service(PUBLIC_PATH_PREFIX, images)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}
