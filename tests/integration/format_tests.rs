//! Format handling tests.
//!
//! Tests verify:
//! - Each directly encodable format round-trips through a split
//! - Formats without an encoder fall back to JPEG tiles
//! - LZW compression on TIFF tiles

use axum::http::StatusCode;
use image::ImageFormat;
use serde_json::json;

use grid_splitter::ExpiryRecord;

use super::test_utils::{
    body_json, encode, gradient_image, gradient_rgba_image, json_request, MockFetcher, TestApp,
};

const IMAGE_URL: &str = "https://images.example.com/source";

async fn split_as(format: ImageFormat) -> (TestApp, serde_json::Value) {
    let image = match format {
        ImageFormat::Ico => gradient_rgba_image(32, 24),
        _ => gradient_image(32, 24),
    };
    let source = encode(&image, format);
    let app = TestApp::new(MockFetcher::new().with_image(IMAGE_URL, source));

    let response = app
        .send(json_request(json!({ "imageUrl": IMAGE_URL, "grid": "2x2" })))
        .await;
    assert_eq!(response.status(), StatusCode::OK, "format {:?}", format);

    let body = body_json(response).await;
    (app, body)
}

#[tokio::test]
async fn test_formats_are_preserved() {
    let cases = [
        (ImageFormat::Jpeg, "jpeg", "jpg"),
        (ImageFormat::Png, "png", "png"),
        (ImageFormat::WebP, "webp", "webp"),
        (ImageFormat::Gif, "gif", "gif"),
        (ImageFormat::Tiff, "tiff", "tiff"),
        (ImageFormat::Bmp, "bmp", "bmp"),
    ];

    for (format, tag, ext) in cases {
        let (app, body) = split_as(format).await;
        assert_eq!(body["originalFormat"], tag);

        for tile in body["tiles"].as_array().unwrap() {
            let filename = tile["filename"].as_str().unwrap();
            assert!(filename.ends_with(&format!(".{}", ext)), "{}", filename);
            assert_eq!(tile["format"], tag);

            let data = std::fs::read(app.root().join(filename)).unwrap();
            assert_eq!(image::guess_format(&data).unwrap(), format);

            let decoded = image::load_from_memory(&data).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (16, 12));

            let sidecar = std::fs::read(app.root().join(format!("{}.info", filename))).unwrap();
            assert_eq!(ExpiryRecord::from_json(&sidecar).unwrap().format, tag);
        }
    }
}

#[tokio::test]
async fn test_unencodable_format_falls_back_to_jpeg() {
    let (app, body) = split_as(ImageFormat::Ico).await;

    assert_eq!(body["originalFormat"], "ico");
    for tile in body["tiles"].as_array().unwrap() {
        let filename = tile["filename"].as_str().unwrap();
        assert!(filename.ends_with(".jpg"));
        assert_eq!(tile["format"], "jpeg");

        let data = std::fs::read(app.root().join(filename)).unwrap();
        assert_eq!(image::guess_format(&data).unwrap(), ImageFormat::Jpeg);

        let sidecar = std::fs::read(app.root().join(format!("{}.info", filename))).unwrap();
        assert_eq!(ExpiryRecord::from_json(&sidecar).unwrap().format, "jpeg");
    }
}

#[tokio::test]
async fn test_tiff_tiles_use_lzw() {
    let (app, body) = split_as(ImageFormat::Tiff).await;

    let filename = body["tiles"][0]["filename"].as_str().unwrap();
    let data = std::fs::read(app.root().join(filename)).unwrap();

    let mut decoder = tiff::decoder::Decoder::new(std::io::Cursor::new(data)).unwrap();
    let compression = decoder
        .get_tag_u32(tiff::tags::Tag::Compression)
        .unwrap();
    assert_eq!(compression, 5, "expected LZW compression tag");
}
