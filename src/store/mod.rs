//! Artifact storage and expiry.
//!
//! - [`ArtifactStore`]: writes tiles and their sidecar records
//! - [`Reclaimer`]: deletes tiles whose sidecar record has expired
//! - [`ExpiryRecord`] / [`Retention`]: the sidecar format and retention window
//!
//! Both sides work purely from the content directory, so a restarted process
//! picks up where the previous one left off.

mod artifact;
mod reclaimer;
mod record;

pub use artifact::{ArtifactStore, TileArtifact, TilePosition, PUBLIC_PATH_PREFIX};
pub use reclaimer::{Reclaimer, SweepReport, DEFAULT_ORPHAN_GRACE_SECS};
pub use record::{
    artifact_name, sidecar_name, ExpiryRecord, Retention, DEFAULT_EXPIRES_IN_DAYS, SIDECAR_SUFFIX,
};
