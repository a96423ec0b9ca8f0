//! Grid splitter.
//!
//! Turns the bytes of one source image into a set of encoded tiles:
//!
//! ```text
//! bytes ──► detect format ──► decode ──► layout(grid) ──► crop + encode × N
//!                │                                              │
//!                └── resolve(format) ── FormatPolicy ───────────┘
//! ```
//!
//! Splitting is pure computation over buffers; writing tiles to disk is the
//! job of [`ArtifactStore`](crate::store::ArtifactStore).

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::TileError;

use super::encoder::TileEncoder;
use super::format::{detect_format, resolve, FormatPolicy};
use super::grid::{GridSpec, Tile};
use super::session::SessionId;

/// One encoded tile.
#[derive(Debug, Clone)]
pub struct EncodedTile {
    pub tile: Tile,

    /// Policy the tile was encoded with; the fallback row if the source
    /// format could not be kept
    pub format: &'static FormatPolicy,

    pub data: Bytes,
}

/// Result of splitting one image.
#[derive(Debug, Clone)]
pub struct SplitOutput {
    pub session_id: SessionId,

    /// Format detected in the source, even when tiles were written in the
    /// fallback format
    pub original_format: &'static str,

    /// True when tiles are stored in the fallback format
    pub fallback: bool,

    pub source_width: u32,
    pub source_height: u32,

    /// Tiles in row-major order
    pub tiles: Vec<EncodedTile>,
}

/// Splits images into grids of re-encoded tiles.
#[derive(Debug, Clone, Default)]
pub struct Splitter {
    encoder: TileEncoder,
}

impl Splitter {
    pub fn new() -> Self {
        Self {
            encoder: TileEncoder::new(),
        }
    }

    /// Split `source` into `grid` tiles.
    ///
    /// The session id is derived from `created_at`. This is CPU-bound; async
    /// callers should run it on the blocking pool.
    ///
    /// # Errors
    ///
    /// - [`TileError::Decode`] if the bytes are not a decodable image
    /// - [`TileError::Geometry`] if the grid is finer than the image
    /// - [`TileError::Encode`] if any tile fails to encode; no tiles are
    ///   returned in that case
    pub fn split(
        &self,
        source: &[u8],
        grid: GridSpec,
        created_at: DateTime<Utc>,
    ) -> Result<SplitOutput, TileError> {
        let detected = detect_format(source).ok_or_else(|| TileError::Decode {
            message: "unrecognized image format".to_string(),
        })?;

        let decoded = self.encoder.decode(source, detected)?;
        let layout = grid.layout(decoded.width, decoded.height)?;
        let resolved = resolve(detected.name);

        debug!(
            format = detected.name,
            width = decoded.width,
            height = decoded.height,
            grid = %grid,
            tile_width = layout.tile_width(),
            tile_height = layout.tile_height(),
            fallback = resolved.fallback,
            "Splitting image"
        );

        let tiles = layout
            .tiles()
            .map(|tile| {
                let data = self.encoder.encode(&decoded.image, &tile, resolved.policy)?;
                Ok(EncodedTile {
                    tile,
                    format: resolved.policy,
                    data,
                })
            })
            .collect::<Result<Vec<_>, TileError>>()?;

        Ok(SplitOutput {
            session_id: SessionId::from_timestamp(created_at),
            original_format: detected.name,
            fallback: resolved.fallback,
            source_width: decoded.width,
            source_height: decoded.height,
            tiles,
        })
    }
}
