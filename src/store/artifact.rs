//! Artifact store.
//!
//! Tiles live in one flat content directory next to their sidecar records:
//!
//! ```text
//! output/
//! ├── split_1714557600000_0_0.png
//! ├── split_1714557600000_0_0.png.info
//! ├── split_1714557600000_1_0.png
//! └── split_1714557600000_1_0.png.info
//! ```
//!
//! The directory is the only source of truth. Nothing about stored tiles is
//! kept in memory between calls.
//!
//! # Write order
//!
//! The sidecar is written before the tile. A crash between the two writes
//! leaves a sidecar without data, which the [`Reclaimer`](super::Reclaimer)
//! removes once its orphan grace period has passed. Until then a sweep treats
//! the missing tile as a write in progress and keeps the sidecar.
//!
//! If the sidecar is gone by the time the tile is written, the record had
//! already expired and was swept; the tile is removed again so it is never
//! left without a record.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::tile::{EncodedTile, SessionId, SplitOutput};

use super::record::{sidecar_name, ExpiryRecord};

/// URL path under which the content directory is served.
pub const PUBLIC_PATH_PREFIX: &str = "/images";

/// Public position of a tile in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TilePosition {
    pub x: u32,
    pub y: u32,
}

/// A tile persisted in the content directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileArtifact {
    pub filename: String,

    /// Path relative to the server root, e.g. `/images/split_1_0_0.png`
    pub url: String,

    pub position: TilePosition,

    /// Format the bytes are stored in
    pub format: String,

    #[serde(skip)]
    pub created_at: DateTime<Utc>,

    #[serde(skip)]
    pub expires_at: DateTime<Utc>,
}

/// Writes tiles and their sidecar records into a content directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The content directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the content directory if it does not exist.
    pub async fn ensure_root(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StoreError::CreateDir {
                path: self.root.clone(),
                message: e.to_string(),
            })
    }

    /// Persist one tile and its sidecar record.
    ///
    /// The tile is stored as `{session}_{column}_{row}.{ext}`. If writing the
    /// tile fails after its sidecar was written, the sidecar is removed again
    /// so the pair is never half-present.
    pub async fn persist(
        &self,
        session: &SessionId,
        encoded: &EncodedTile,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<TileArtifact, StoreError> {
        let filename = session.tile_filename(
            encoded.tile.column,
            encoded.tile.row,
            encoded.format.extension,
        );
        let data_path = self.root.join(&filename);
        let sidecar_path = self.root.join(sidecar_name(&filename));

        let record = ExpiryRecord::new(created_at, expires_at, encoded.format.tag);
        let record_json = record.to_json().map_err(|e| StoreError::Record {
            message: e.to_string(),
        })?;

        write_file(&sidecar_path, &record_json).await?;

        if let Err(e) = write_file(&data_path, &encoded.data).await {
            if let Err(cleanup) = fs::remove_file(&sidecar_path).await {
                warn!(
                    "Failed to remove sidecar {} after failed tile write: {}",
                    sidecar_path.display(),
                    cleanup
                );
            }
            return Err(e);
        }

        if let Ok(false) = fs::try_exists(&sidecar_path).await {
            match fs::remove_file(&data_path).await {
                Ok(()) => debug!("Removed tile {} swept during its write", filename),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(
                    "Failed to remove tile {} without sidecar: {}",
                    data_path.display(),
                    e
                ),
            }
        }

        debug!(
            filename = %filename,
            bytes = encoded.data.len(),
            expires_at = %expires_at,
            "Stored tile"
        );

        Ok(TileArtifact {
            url: format!("{}/{}", PUBLIC_PATH_PREFIX, filename),
            filename,
            position: TilePosition {
                x: encoded.tile.column,
                y: encoded.tile.row,
            },
            format: encoded.format.tag.to_string(),
            created_at,
            expires_at,
        })
    }

    /// Persist every tile of a split, in order.
    ///
    /// Stops at the first failure. Tiles already written keep their sidecars
    /// and are reclaimed when they expire.
    pub async fn persist_all(
        &self,
        output: &SplitOutput,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Vec<TileArtifact>, StoreError> {
        let mut artifacts = Vec::with_capacity(output.tiles.len());
        for encoded in &output.tiles {
            artifacts.push(
                self.persist(&output.session_id, encoded, created_at, expires_at)
                    .await?,
            );
        }
        Ok(artifacts)
    }
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    fs::write(path, contents)
        .await
        .map_err(|e| StoreError::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}
