//! Test utilities for integration tests.
//!
//! This module provides an in-memory fetcher, image builders, and helpers for
//! building requests against the router.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use grid_splitter::error::FetchError;
use grid_splitter::fetch::ImageFetcher;
use grid_splitter::{create_router, RouterConfig, SplitService};

// =============================================================================
// Mock Fetcher
// =============================================================================

/// Serves images from memory and counts requests.
///
/// Unknown URLs answer like an upstream 404.
#[derive(Clone, Default)]
pub struct MockFetcher {
    images: Arc<HashMap<String, Bytes>>,
    request_count: Arc<AtomicUsize>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, url: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Arc::make_mut(&mut self.images).insert(url.into(), data.into());
        self
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

// =============================================================================
// Images
// =============================================================================

pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
pub const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);

/// A `size x size` image with one solid colour per quadrant:
/// red top-left, green top-right, blue bottom-left, yellow bottom-right.
pub fn quadrant_image(size: u32) -> DynamicImage {
    let half = size / 2;
    DynamicImage::ImageRgb8(RgbImage::from_fn(size, size, |x, y| {
        match (x < half, y < half) {
            (true, true) => RED,
            (false, true) => GREEN,
            (true, false) => BLUE,
            (false, false) => YELLOW,
        }
    }))
}

/// A gradient image, for formats where solid colours compress oddly.
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, 128])
    }))
}

/// RGBA variant of [`gradient_image`], for formats that only carry RGBA (ICO).
pub fn gradient_rgba_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 7 % 256) as u8, (y * 13 % 256) as u8, 128, 255])
    }))
}

pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    image
        .write_to(Cursor::new(&mut buf), format)
        .expect("test image should encode");
    buf
}

pub fn quadrant_png(size: u32) -> Vec<u8> {
    encode(&quadrant_image(size), ImageFormat::Png)
}

// =============================================================================
// Router Harness
// =============================================================================

pub struct TestApp {
    pub router: Router,
    pub service: Arc<SplitService<MockFetcher>>,
    pub fetcher: MockFetcher,
    pub dir: TempDir,
}

impl TestApp {
    pub fn new(fetcher: MockFetcher) -> Self {
        Self::with_config(fetcher, RouterConfig::new().with_tracing(false))
    }

    pub fn with_config(fetcher: MockFetcher, config: RouterConfig) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let service = Arc::new(SplitService::new(fetcher.clone(), dir.path()));
        let router = create_router(Arc::clone(&service), config);
        Self {
            router,
            service,
            fetcher,
            dir,
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        use tower::ServiceExt;
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    /// Names of all files in the content directory, sorted.
    pub fn files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.root())
            .expect("content dir readable")
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

// =============================================================================
// Requests and Responses
// =============================================================================

pub fn json_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/split-image")
        .header(header::HOST, "localhost:3000")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn form_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/split-image")
        .header(header::HOST, "localhost:3000")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn multipart_request(fields: &[(&str, &str)]) -> Request<Body> {
    const BOUNDARY: &str = "grid-splitter-test-boundary";

    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        ));
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));

    Request::builder()
        .method("POST")
        .uri("/api/split-image")
        .header(header::HOST, "localhost:3000")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_bytes(response: Response) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("response body should be JSON")
}
