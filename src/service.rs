//! Split service.
//!
//! Ties the fetcher, the splitter and the content directory together:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                            SplitService                            │
//! │                                                                    │
//! │  create_split()                                                    │
//! │    1. Stamp createdAt, compute expiresAt                           │
//! │    2. ImageFetcher::fetch(imageUrl)                                │
//! │    3. Splitter::split() on the blocking pool                       │
//! │    4. ArtifactStore::persist_all()                                 │
//! │                                                                    │
//! │  sweep() ──► Reclaimer::sweep()   (startup + every interval)       │
//! └────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::error::SplitError;
use crate::fetch::ImageFetcher;
use crate::store::{ArtifactStore, Reclaimer, Retention, SweepReport, TileArtifact};
use crate::tile::{GridSpec, SessionId, Splitter};

/// Default interval between background sweeps (1 hour).
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 3600;

// =============================================================================
// Requests and outcomes
// =============================================================================

/// A validated create request.
#[derive(Debug, Clone)]
pub struct SplitRequest {
    pub image_url: String,
    pub grid: GridSpec,
    pub retention: Retention,
}

/// Manifest of a completed split.
#[derive(Debug, Clone)]
pub struct SplitOutcome {
    pub session_id: SessionId,
    pub grid: GridSpec,

    /// Format detected in the source image
    pub original_format: &'static str,

    pub retention: Retention,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,

    /// Stored tiles in row-major order
    pub artifacts: Vec<TileArtifact>,
}

// =============================================================================
// Split Service
// =============================================================================

/// Creates splits and reclaims expired tiles.
///
/// # Type Parameters
///
/// * `F` - The fetcher used to retrieve source images
pub struct SplitService<F: ImageFetcher> {
    fetcher: F,
    splitter: Splitter,
    store: ArtifactStore,
    reclaimer: Reclaimer,
}

impl<F: ImageFetcher> SplitService<F> {
    /// Create a service storing tiles under `content_dir`.
    pub fn new(fetcher: F, content_dir: impl Into<PathBuf>) -> Self {
        let content_dir = content_dir.into();
        Self {
            fetcher,
            splitter: Splitter::new(),
            store: ArtifactStore::new(content_dir.clone()),
            reclaimer: Reclaimer::new(content_dir),
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Fetch, split and store one image.
    ///
    /// The expiry is fixed here and never recomputed. Nothing is written
    /// unless every tile encoded successfully.
    ///
    /// # Errors
    ///
    /// - [`SplitError::Validation`] if the retention overflows the calendar
    /// - [`SplitError::Fetch`] if the source image cannot be retrieved
    /// - [`SplitError::Tile`] if decoding, geometry or encoding fails
    /// - [`SplitError::Store`] if tiles cannot be written
    pub async fn create_split(&self, request: SplitRequest) -> Result<SplitOutcome, SplitError> {
        let created_at = Utc::now().trunc_subsecs(3);
        let expires_at = request.retention.expires_at(created_at)?;

        let source = self.fetcher.fetch(&request.image_url).await?;

        let splitter = self.splitter.clone();
        let grid = request.grid;
        let output = tokio::task::spawn_blocking(move || splitter.split(&source, grid, created_at))
            .await
            .map_err(|e| SplitError::Task {
                message: e.to_string(),
            })??;

        let artifacts = self
            .store
            .persist_all(&output, created_at, expires_at)
            .await?;

        info!(
            session_id = %output.session_id,
            grid = %grid,
            tiles = artifacts.len(),
            original_format = output.original_format,
            fallback = output.fallback,
            expires_at = %expires_at,
            "Created split"
        );

        Ok(SplitOutcome {
            session_id: output.session_id,
            grid,
            original_format: output.original_format,
            retention: request.retention,
            created_at,
            expires_at,
            artifacts,
        })
    }

    /// Run one sweep, logging rather than returning failures.
    pub async fn sweep(&self) -> Option<SweepReport> {
        match self.reclaimer.sweep().await {
            Ok(report) => Some(report),
            Err(e) => {
                error!("Cleanup sweep failed: {}", e);
                None
            }
        }
    }
}

/// Spawn the background sweep loop.
///
/// The first sweep happens one `period` after spawning; callers run the
/// startup sweep themselves. A failed sweep is logged and the loop carries on.
pub fn spawn_cleanup_task<F>(service: Arc<SplitService<F>>, period: Duration) -> JoinHandle<()>
where
    F: ImageFetcher + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Starting cleanup task with interval: {:?}", period);

        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            service.sweep().await;
        }
    })
}
