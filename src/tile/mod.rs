//! Tiling layer.
//!
//! This module cuts a decoded image into a grid of equally sized tiles and
//! re-encodes each tile in the source format, or in JPEG when the source
//! format has no encoder.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │                Splitter                 │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  GridSpec /  │  │   TileEncoder   │  │
//! │  │  TileLayout  │  │  (decode →      │  │
//! │  │  (geometry)  │  │   crop/encode)  │  │
//! │  └──────────────┘  └────────┬────────┘  │
//! └─────────────────────────────┼───────────┘
//!                               ▼
//!                     ┌──────────────────┐
//!                     │   FORMAT_TABLE   │
//!                     │ (encode policies)│
//!                     └──────────────────┘
//! ```
//!
//! # Components
//!
//! - [`Splitter`]: entry point, produces a [`SplitOutput`]
//! - [`GridSpec`]: validated `columns x rows`, parsed from `"CxR"`
//! - [`TileLayout`]: tile rectangles for a grid on a concrete image size
//! - [`TileEncoder`]: decodes sources and encodes tiles
//! - [`FORMAT_TABLE`]: extension and encoder parameters per format
//! - [`SessionId`]: filename namespace of one split
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use grid_splitter::tile::{GridSpec, Splitter};
//!
//! let bytes = std::fs::read("photo.png").unwrap();
//! let grid: GridSpec = "3x2".parse().unwrap();
//!
//! let output = Splitter::new().split(&bytes, grid, Utc::now()).unwrap();
//! for encoded in &output.tiles {
//!     println!(
//!         "{}",
//!         output.session_id.tile_filename(
//!             encoded.tile.column,
//!             encoded.tile.row,
//!             encoded.format.extension,
//!         )
//!     );
//! }
//! ```

mod encoder;
mod format;
mod grid;
mod session;
mod splitter;

pub use encoder::{SourceImage, TileEncoder};
pub use format::{
    detect_format, format_name, lookup, resolve, DetectedFormat, EncodePolicy, FormatPolicy,
    ResolvedFormat, DEFAULT_TILE_QUALITY, FALLBACK_POLICY, FORMAT_TABLE, PNG_COMPRESSION_LEVEL,
};
pub use grid::{GridSpec, Tile, TileLayout, MAX_GRID_DIMENSION};
pub use session::{SessionId, SESSION_PREFIX};
pub use splitter::{EncodedTile, SplitOutput, Splitter};
