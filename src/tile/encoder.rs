//! Tile encoder.
//!
//! Decodes the source image once and re-encodes cropped regions according to
//! an [`EncodePolicy`] row from the format table.
//!
//! # Design Decisions
//!
//! - **Always re-encode**: tiles are cropped from decoded pixels and encoded
//!   from scratch, never sliced from the compressed source.
//!
//! - **Colour conversion**: encoders that cannot store the decoded colour type
//!   (e.g. alpha in JPEG) receive a converted image; transparency is lost in
//!   that case.
//!
//! - **WebP**: the pure-Rust WebP encoder is lossless only, so the quality
//!   setting of the WebP row has no effect on output size.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use tiff::encoder::colortype::RGBA8;
use tiff::encoder::{Compression, TiffEncoder};

use super::format::{DetectedFormat, EncodePolicy, FormatPolicy};
use super::grid::Tile;
use crate::error::TileError;

/// A decoded source image.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub image: DynamicImage,
    pub width: u32,
    pub height: u32,
    pub format: DetectedFormat,
}

/// Stateless encoder for tiles.
#[derive(Debug, Clone, Default)]
pub struct TileEncoder {}

impl TileEncoder {
    pub fn new() -> Self {
        Self {}
    }

    /// Decode source bytes whose format was already detected.
    ///
    /// # Errors
    ///
    /// Returns [`TileError::Decode`] if the codec has no decoder for the
    /// format or the data is corrupt.
    pub fn decode(&self, source: &[u8], format: DetectedFormat) -> Result<SourceImage, TileError> {
        let image_format = format.image_format.ok_or_else(|| TileError::Decode {
            message: format!("no decoder available for {} images", format.name),
        })?;

        let reader = ImageReader::with_format(Cursor::new(source), image_format);
        let image = reader.decode().map_err(|e| TileError::Decode {
            message: e.to_string(),
        })?;

        Ok(SourceImage {
            width: image.width(),
            height: image.height(),
            image,
            format,
        })
    }

    /// Crop `tile` out of `source` and encode it with `policy`.
    pub fn encode(
        &self,
        source: &DynamicImage,
        tile: &Tile,
        policy: &FormatPolicy,
    ) -> Result<Bytes, TileError> {
        let region = source.crop_imm(tile.left, tile.top, tile.width, tile.height);

        encode_region(&region, policy.encode).map_err(|message| TileError::Encode {
            column: tile.column,
            row: tile.row,
            format: policy.tag,
            message,
        })
    }
}

/// Encode a whole image with the given policy.
fn encode_region(image: &DynamicImage, policy: EncodePolicy) -> Result<Bytes, String> {
    let mut output = Vec::new();

    match policy {
        EncodePolicy::Jpeg { quality } => {
            // JPEG has no alpha channel
            let rgb = image.to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut output, quality);
            encoder.encode_image(&rgb).map_err(|e| e.to_string())?;
        }
        EncodePolicy::Png { compression_level } => {
            let encoder = PngEncoder::new_with_quality(
                &mut output,
                CompressionType::Level(compression_level),
                FilterType::Adaptive,
            );
            image.write_with_encoder(encoder).map_err(|e| e.to_string())?;
        }
        EncodePolicy::WebP { .. } => {
            let encoder = WebPEncoder::new_lossless(&mut output);
            image.write_with_encoder(encoder).map_err(|e| e.to_string())?;
        }
        EncodePolicy::Gif => write_with_format(image, ImageFormat::Gif, &mut output)?,
        EncodePolicy::Bmp => write_with_format(image, ImageFormat::Bmp, &mut output)?,
        EncodePolicy::TiffLzw => {
            let rgba = image.to_rgba8();
            let mut cursor = Cursor::new(&mut output);
            let mut encoder = TiffEncoder::new(&mut cursor)
                .map_err(|e| e.to_string())?
                .with_compression(Compression::Lzw);
            encoder
                .write_image::<RGBA8>(rgba.width(), rgba.height(), rgba.as_raw())
                .map_err(|e| e.to_string())?;
        }
        EncodePolicy::Avif { .. } | EncodePolicy::Heic { .. } => {
            return Err(format!("no encoder available for {:?}", policy));
        }
    }

    Ok(Bytes::from(output))
}

fn write_with_format(
    image: &DynamicImage,
    format: ImageFormat,
    output: &mut Vec<u8>,
) -> Result<(), String> {
    image
        .write_to(Cursor::new(output), format)
        .map_err(|e| e.to_string())
}

// =============================================================================
// Tests
// =============================================================================
