//! Split session identifiers.
//!
//! A session id namespaces the files of one split: `split_{unix_millis}`.
//! Sessions are never stored on their own; the id only survives as the
//! filename prefix of its artifacts.

use std::fmt;

use chrono::{DateTime, Utc};

/// Prefix shared by every session id.
pub const SESSION_PREFIX: &str = "split_";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Derive the session id for a split created at `created_at`.
    pub fn from_timestamp(created_at: DateTime<Utc>) -> Self {
        Self(format!("{}{}", SESSION_PREFIX, created_at.timestamp_millis()))
    }

    /// Filename of the tile at (`column`, `row`).
    pub fn tile_filename(&self, column: u32, row: u32, extension: &str) -> String {
        format!("{}_{}_{}.{}", self.0, column, row, extension)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
