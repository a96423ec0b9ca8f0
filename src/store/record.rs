//! Sidecar expiry records.
//!
//! Each tile `X` has a sidecar `X.info` holding a JSON object:
//!
//! ```json
//! {"createdAt":"2024-05-01T10:00:00.000Z","expiresAt":"2024-05-02T10:00:00.000Z","format":"png"}
//! ```
//!
//! Timestamps are written with millisecond precision and a `Z` suffix; any
//! RFC 3339 timestamp is accepted on read.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Suffix appended to a tile filename to name its sidecar.
pub const SIDECAR_SUFFIX: &str = ".info";

/// Retention applied when a request does not specify one.
pub const DEFAULT_EXPIRES_IN_DAYS: f64 = 1.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Creation and expiry metadata of one tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryRecord {
    #[serde(with = "iso8601")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "iso8601")]
    pub expires_at: DateTime<Utc>,

    /// Format the tile bytes are stored in
    pub format: String,
}

impl ExpiryRecord {
    pub fn new(
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            created_at,
            expires_at,
            format: format.into(),
        }
    }

    /// A record is expired once `now` reaches its deadline (inclusive).
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Sidecar filename for a tile filename.
pub fn sidecar_name(filename: &str) -> String {
    format!("{}{}", filename, SIDECAR_SUFFIX)
}

/// Tile filename a sidecar belongs to, or `None` if `name` is not a sidecar.
pub fn artifact_name(name: &str) -> Option<&str> {
    name.strip_suffix(SIDECAR_SUFFIX).filter(|s| !s.is_empty())
}

// =============================================================================
// Retention
// =============================================================================

/// How long tiles are kept, given in (possibly fractional) days.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Retention {
    days: f64,
    delta: TimeDelta,
}

impl Retention {
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidExpiry`] for negative, non-finite or
    /// unrepresentably large values.
    pub fn from_days(days: f64) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidExpiry {
            value: days.to_string(),
        };

        if !days.is_finite() || days < 0.0 {
            return Err(invalid());
        }

        let millis = (days * MILLIS_PER_DAY).round();
        if millis > i64::MAX as f64 {
            return Err(invalid());
        }
        let delta = TimeDelta::try_milliseconds(millis as i64).ok_or_else(invalid)?;

        Ok(Self { days, delta })
    }

    pub fn days(&self) -> f64 {
        self.days
    }

    /// Absolute deadline for tiles created at `created_at`.
    pub fn expires_at(&self, created_at: DateTime<Utc>) -> Result<DateTime<Utc>, ValidationError> {
        created_at
            .checked_add_signed(self.delta)
            .ok_or_else(|| ValidationError::InvalidExpiry {
                value: self.days.to_string(),
            })
    }
}

impl Default for Retention {
    fn default() -> Self {
        Self {
            days: DEFAULT_EXPIRES_IN_DAYS,
            delta: TimeDelta::days(1),
        }
    }
}

/// Serde adapter writing `DateTime<Utc>` as ISO 8601 with milliseconds.
mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
