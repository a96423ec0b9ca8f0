use std::path::PathBuf;

use thiserror::Error;

/// Errors in a create request that the caller can correct.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    /// The `imageUrl` field is absent or empty
    #[error("Missing required parameter imageUrl")]
    MissingImageUrl,

    /// The `grid` field is absent or does not look like `<cols>x<rows>`
    #[error("Invalid grid parameter {value:?}. Examples: \"2x2\", \"3x3\"")]
    InvalidGrid { value: String },

    /// The grid parsed but a dimension is outside `1..=max`
    #[error("Grid must be between 1x1 and {max}x{max}, got {value}")]
    GridOutOfRange { value: String, max: u32 },

    /// `expiresInDays` is not a finite, non-negative number
    #[error("Invalid expiresInDays {value:?}: must be a non-negative number of days")]
    InvalidExpiry { value: String },

    /// The body could not be read in any accepted encoding
    #[error("Malformed request body: {message}")]
    MalformedBody { message: String },
}

impl ValidationError {
    /// Name of the request field the error refers to.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ValidationError::MissingImageUrl => Some("imageUrl"),
            ValidationError::InvalidGrid { .. } | ValidationError::GridOutOfRange { .. } => {
                Some("grid")
            }
            ValidationError::InvalidExpiry { .. } => Some("expiresInDays"),
            ValidationError::MalformedBody { .. } => None,
        }
    }
}

/// Errors from retrieving the source image.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The URL could not be parsed or is not http(s)
    #[error("Invalid image URL {url:?}: {message}")]
    InvalidUrl { url: String, message: String },

    /// The request did not complete within the fetch timeout
    #[error("Timed out after {timeout_secs}s fetching {url}")]
    Timeout { url: String, timeout_secs: u64 },

    /// The upstream answered with a non-success status
    #[error("Upstream returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Connection, TLS or body transfer failure
    #[error("Failed to fetch {url}: {message}")]
    Request { url: String, message: String },
}

/// Errors from decoding the source image or encoding tiles.
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// The bytes are not an image the codec can identify or parse
    #[error("Failed to decode image: {message}")]
    Decode { message: String },

    /// The grid is finer than the image, so tiles would have zero size
    #[error(
        "Grid {columns}x{rows} is too fine for a {width}x{height} image (tile size would be zero)"
    )]
    Geometry {
        columns: u32,
        rows: u32,
        width: u32,
        height: u32,
    },

    /// Re-encoding one tile failed; the whole split is abandoned
    #[error("Failed to encode tile ({column}, {row}) as {format}: {message}")]
    Encode {
        column: u32,
        row: u32,
        format: &'static str,
        message: String,
    },
}

/// Errors writing artifacts into the content directory.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The content directory could not be created
    #[error("Failed to create content directory {}: {message}", path.display())]
    CreateDir { path: PathBuf, message: String },

    /// A tile or sidecar file could not be written
    #[error("Failed to write {}: {message}", path.display())]
    Write { path: PathBuf, message: String },

    /// The sidecar record could not be serialized
    #[error("Failed to serialize sidecar record: {message}")]
    Record { message: String },
}

/// Errors met while sweeping the content directory.
///
/// Per-record variants are logged and skipped; only `ListDirectory` ends a
/// sweep early.
#[derive(Debug, Clone, Error)]
pub enum SweepError {
    /// The content directory could not be listed
    #[error("Failed to list content directory {}: {message}", path.display())]
    ListDirectory { path: PathBuf, message: String },

    /// A sidecar file exists but could not be read
    #[error("Failed to read sidecar {}: {message}", path.display())]
    ReadRecord { path: PathBuf, message: String },

    /// A sidecar file was read but is not a valid record
    #[error("Malformed sidecar {}: {message}", path.display())]
    MalformedRecord { path: PathBuf, message: String },

    /// An expired file could not be deleted
    #[error("Failed to remove {}: {message}", path.display())]
    Remove { path: PathBuf, message: String },
}

/// Errors surfaced by the create-and-split flow.
#[derive(Debug, Clone, Error)]
pub enum SplitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Tile(#[from] TileError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The blocking tiling task panicked or was cancelled
    #[error("Tiling task failed: {message}")]
    Task { message: String },
}
