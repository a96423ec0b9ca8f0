//! HTTP server layer for the grid splitter.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │   POST /api/split-image     GET /api/health     GET /images/*   │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  extract    │  │  handlers   │  │        routes           │  │
//! │  │ (json/form/ │  │ (requests,  │  │  (router config, CORS,  │  │
//! │  │  multipart) │  │  errors)    │  │   static tiles)         │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod extract;
pub mod handlers;
pub mod routes;

pub use extract::{ExpiresInDays, SplitBody};
pub use handlers::{
    health_handler, split_image_handler, AppState, ErrorResponse, HealthResponse, SplitResponse,
};
pub use routes::{create_router, RouterConfig};
