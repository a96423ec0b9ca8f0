//! Format detection and per-format encode policy.
//!
//! Every supported output format is one entry in [`FORMAT_TABLE`]. Adding a
//! format means adding a row, not another match arm in the encoder.
//!
//! | detected | extension | encode policy |
//! |----------|-----------|---------------|
//! | jpeg     | jpg       | quality 90    |
//! | png      | png       | level 9       |
//! | webp     | webp      | lossless      |
//! | gif      | gif       | default       |
//! | tiff     | tiff      | LZW           |
//! | avif     | avif      | unavailable   |
//! | heif     | heic      | unavailable   |
//! | bmp      | bmp       | default       |
//! | other    | jpg       | JPEG q90 (fallback) |

use image::ImageFormat;

/// Quality used by every lossy policy in the table.
pub const DEFAULT_TILE_QUALITY: u8 = 90;

/// PNG deflate level used for PNG tiles.
pub const PNG_COMPRESSION_LEVEL: u8 = 9;

/// Encoder parameters for one output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodePolicy {
    Jpeg { quality: u8 },
    Png { compression_level: u8 },
    WebP { quality: u8 },
    Gif,
    TiffLzw,
    Avif { quality: u8 },
    Heic { quality: u8 },
    Bmp,
}

/// One row of the format table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatPolicy {
    /// Canonical format name, recorded on artifacts
    pub tag: &'static str,

    /// Other names that resolve to this row
    pub aliases: &'static [&'static str],

    /// File extension of stored tiles
    pub extension: &'static str,

    /// How tiles are encoded
    pub encode: EncodePolicy,

    /// Whether this build carries an encoder for the format.
    ///
    /// Rows without one resolve to [`FALLBACK_POLICY`].
    pub encodable: bool,
}

/// Formats tiles can be written in.
///
/// The AVIF and HEIF rows are recognised but not usable in this build: there
/// is neither a decoder nor an encoder for them, so such sources fail with a
/// decode error before the JPEG fallback is reached.
pub static FORMAT_TABLE: &[FormatPolicy] = &[
    FormatPolicy {
        tag: "jpeg",
        aliases: &["jpg"],
        extension: "jpg",
        encode: EncodePolicy::Jpeg {
            quality: DEFAULT_TILE_QUALITY,
        },
        encodable: true,
    },
    FormatPolicy {
        tag: "png",
        aliases: &[],
        extension: "png",
        encode: EncodePolicy::Png {
            compression_level: PNG_COMPRESSION_LEVEL,
        },
        encodable: true,
    },
    FormatPolicy {
        tag: "webp",
        aliases: &[],
        extension: "webp",
        // Only lossless WebP is available, so the quality is not applied
        encode: EncodePolicy::WebP {
            quality: DEFAULT_TILE_QUALITY,
        },
        encodable: true,
    },
    FormatPolicy {
        tag: "gif",
        aliases: &[],
        extension: "gif",
        encode: EncodePolicy::Gif,
        encodable: true,
    },
    FormatPolicy {
        tag: "tiff",
        aliases: &["tif"],
        extension: "tiff",
        encode: EncodePolicy::TiffLzw,
        encodable: true,
    },
    // Detected by magic bytes only; see the table docs
    FormatPolicy {
        tag: "avif",
        aliases: &[],
        extension: "avif",
        encode: EncodePolicy::Avif {
            quality: DEFAULT_TILE_QUALITY,
        },
        encodable: false,
    },
    FormatPolicy {
        tag: "heif",
        aliases: &["heic"],
        extension: "heic",
        encode: EncodePolicy::Heic {
            quality: DEFAULT_TILE_QUALITY,
        },
        encodable: false,
    },
    FormatPolicy {
        tag: "bmp",
        aliases: &[],
        extension: "bmp",
        encode: EncodePolicy::Bmp,
        encodable: true,
    },
];

/// Policy used when the source format has no encodable row.
pub static FALLBACK_POLICY: FormatPolicy = FormatPolicy {
    tag: "jpeg",
    aliases: &["jpg"],
    extension: "jpg",
    encode: EncodePolicy::Jpeg {
        quality: DEFAULT_TILE_QUALITY,
    },
    encodable: true,
};

/// Look up a table row by name or alias (case-insensitive).
pub fn lookup(name: &str) -> Option<&'static FormatPolicy> {
    FORMAT_TABLE.iter().find(|policy| {
        policy.tag.eq_ignore_ascii_case(name)
            || policy.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    })
}

/// The policy tiles of a source in `name` format are written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedFormat {
    pub policy: &'static FormatPolicy,

    /// True when the source format could not be kept
    pub fallback: bool,
}

/// Resolve the output policy for a detected source format.
pub fn resolve(name: &str) -> ResolvedFormat {
    match lookup(name) {
        Some(policy) if policy.encodable => ResolvedFormat {
            policy,
            fallback: false,
        },
        _ => ResolvedFormat {
            policy: &FALLBACK_POLICY,
            fallback: true,
        },
    }
}

// =============================================================================
// Detection
// =============================================================================

/// ISO-BMFF brands identifying HEIF/HEIC containers.
const HEIF_BRANDS: &[&[u8; 4]] = &[b"heic", b"heix", b"hevc", b"hevx", b"mif1", b"msf1"];

/// A detected source format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedFormat {
    /// Format name reported to callers (e.g. "png", "ico")
    pub name: &'static str,

    /// Codec format, when the codec knows it
    pub image_format: Option<ImageFormat>,
}

/// Identify the format of an encoded image from its magic bytes.
///
/// Returns `None` when nothing matches.
pub fn detect_format(bytes: &[u8]) -> Option<DetectedFormat> {
    if let Ok(format) = image::guess_format(bytes) {
        return Some(DetectedFormat {
            name: format_name(format),
            image_format: Some(format),
        });
    }

    if is_heif(bytes) {
        return Some(DetectedFormat {
            name: "heif",
            image_format: None,
        });
    }

    None
}

fn is_heif(bytes: &[u8]) -> bool {
    if bytes.len() < 12 || &bytes[4..8] != b"ftyp" {
        return false;
    }
    HEIF_BRANDS.iter().any(|brand| &bytes[8..12] == *brand)
}

/// Lower-case name for a codec format.
pub fn format_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Png => "png",
        ImageFormat::WebP => "webp",
        ImageFormat::Gif => "gif",
        ImageFormat::Tiff => "tiff",
        ImageFormat::Avif => "avif",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Ico => "ico",
        ImageFormat::Pnm => "pnm",
        ImageFormat::Tga => "tga",
        ImageFormat::Dds => "dds",
        ImageFormat::Hdr => "hdr",
        ImageFormat::OpenExr => "exr",
        ImageFormat::Farbfeld => "farbfeld",
        ImageFormat::Qoi => "qoi",
        _ => "unknown",
    }
}
