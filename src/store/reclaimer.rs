//! Expiry sweeps over the content directory.
//!
//! A sweep reads every sidecar record, and for each expired one deletes the
//! tile and then the sidecar. The reclaimer holds no state between sweeps, so
//! sweeps are idempotent and safe to run concurrently with each other and with
//! writers: a file that disappears under a sweep is treated as already gone.
//!
//! A sidecar whose tile is missing is normally a write still in flight, since
//! the store writes the sidecar first. Such a sidecar is only deleted once it
//! has been expired for longer than the orphan grace period.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::SweepError;

use super::record::{artifact_name, ExpiryRecord};

/// Default time an expired sidecar without a tile is left alone (1 hour).
///
/// Must exceed the longest create request, measured from its timestamp to
/// the last tile write.
pub const DEFAULT_ORPHAN_GRACE_SECS: i64 = 3600;

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Sidecar records examined
    pub scanned: usize,

    /// Expired tiles removed together with their sidecar
    pub removed: usize,

    /// Expired sidecars whose tile was already missing
    pub orphaned: usize,

    /// Expired sidecars without a tile, kept until the grace period passes
    pub pending: usize,

    /// Records left alone because they were unreadable or malformed
    pub skipped: usize,

    /// Expired records that could not be deleted; retried next sweep
    pub failed: usize,
}

impl SweepReport {
    /// Total number of expired records this sweep deleted.
    pub fn reclaimed(&self) -> usize {
        self.removed + self.orphaned
    }
}

enum Outcome {
    Live,
    Removed,
    Orphaned,
    Pending,
    Vanished,
}

/// Deletes expired tiles and their sidecars.
#[derive(Debug, Clone)]
pub struct Reclaimer {
    root: PathBuf,
    orphan_grace: TimeDelta,
}

impl Reclaimer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            orphan_grace: TimeDelta::seconds(DEFAULT_ORPHAN_GRACE_SECS),
        }
    }

    /// Set how long an expired sidecar without a tile is kept.
    pub fn with_orphan_grace(mut self, grace: TimeDelta) -> Self {
        self.orphan_grace = grace;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn orphan_grace(&self) -> TimeDelta {
        self.orphan_grace
    }

    /// Sweep against the current time.
    pub async fn sweep(&self) -> Result<SweepReport, SweepError> {
        self.sweep_at(Utc::now()).await
    }

    /// Sweep, treating records with `expiresAt <= now` as expired.
    ///
    /// A missing content directory yields an empty report. Problems with
    /// individual records are logged and counted; only failing to list the
    /// directory is returned as an error.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport, SweepError> {
        let mut report = SweepReport::default();

        let sidecars = match self.list_sidecars().await {
            Ok(sidecars) => sidecars,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Content directory {} does not exist yet", self.root.display());
                return Ok(report);
            }
            Err(e) => {
                return Err(SweepError::ListDirectory {
                    path: self.root.clone(),
                    message: e.to_string(),
                })
            }
        };

        for (sidecar_path, data_path) in sidecars {
            report.scanned += 1;
            match reclaim(&sidecar_path, &data_path, now, self.orphan_grace).await {
                Ok(Outcome::Live) | Ok(Outcome::Vanished) => {}
                Ok(Outcome::Removed) => report.removed += 1,
                Ok(Outcome::Orphaned) => report.orphaned += 1,
                Ok(Outcome::Pending) => report.pending += 1,
                Err(e @ SweepError::Remove { .. }) => {
                    warn!("{}", e);
                    report.failed += 1;
                }
                Err(e) => {
                    warn!("Skipping record: {}", e);
                    report.skipped += 1;
                }
            }
        }

        if report.reclaimed() > 0 {
            info!("Cleaned up {} expired tiles", report.reclaimed());
        }

        Ok(report)
    }

    /// Snapshot of `(sidecar, tile)` path pairs in the content directory.
    async fn list_sidecars(&self) -> std::io::Result<Vec<(PathBuf, PathBuf)>> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut pairs = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(data_name) = artifact_name(name) {
                pairs.push((entry.path(), self.root.join(data_name)));
            }
        }

        pairs.sort();
        Ok(pairs)
    }
}

async fn reclaim(
    sidecar_path: &Path,
    data_path: &Path,
    now: DateTime<Utc>,
    orphan_grace: TimeDelta,
) -> Result<Outcome, SweepError> {
    let bytes = match fs::read(sidecar_path).await {
        Ok(bytes) => bytes,
        // Deleted by a concurrent sweep since the listing
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Outcome::Vanished),
        Err(e) => {
            return Err(SweepError::ReadRecord {
                path: sidecar_path.to_path_buf(),
                message: e.to_string(),
            })
        }
    };

    let record = ExpiryRecord::from_json(&bytes).map_err(|e| SweepError::MalformedRecord {
        path: sidecar_path.to_path_buf(),
        message: e.to_string(),
    })?;

    if !record.is_expired(now) {
        return Ok(Outcome::Live);
    }

    // The sidecar is kept until the tile is gone, so a failed delete is
    // retried on the next sweep.
    let orphaned = match fs::remove_file(data_path).await {
        Ok(()) => {
            info!("Deleted expired tile {}", data_path.display());
            false
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            if now < record.expires_at + orphan_grace {
                debug!(
                    "Tile for {} not written yet, keeping sidecar",
                    sidecar_path.display()
                );
                return Ok(Outcome::Pending);
            }
            true
        }
        Err(e) => {
            return Err(SweepError::Remove {
                path: data_path.to_path_buf(),
                message: e.to_string(),
            })
        }
    };

    match fs::remove_file(sidecar_path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Outcome::Vanished),
        Err(e) => {
            return Err(SweepError::Remove {
                path: sidecar_path.to_path_buf(),
                message: e.to_string(),
            })
        }
    }

    if orphaned {
        debug!("Deleted orphaned sidecar {}", sidecar_path.display());
        Ok(Outcome::Orphaned)
    } else {
        Ok(Outcome::Removed)
    }
}
