//! Image fetching: URL → decoded, normalised, transport-ready image.
//!
//! The dominant latency and failure source of the whole pipeline. Every URL
//! is fully independent: one fetch never blocks or aborts another, and a
//! failure here is an [`ItemError`] the orchestrator logs and drops.
//!
//! ## Format normalisation
//!
//! Dimensions come from the decoded pixels — HTTP headers lie or are absent.
//! The transport copy is re-encoded so the description service only ever
//! sees two mime types: bodies the origin declared as PNG or GIF become
//! PNG (lossless, keeps any alpha), everything else becomes JPEG. JPEG has
//! no alpha channel, so that path flattens to RGB8 first.

use crate::error::ItemError;
use crate::output::FetchedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat};
use reqwest::header::CONTENT_TYPE;
use std::io::Cursor;
use std::time::Duration;
use tracing::debug;

/// Fetch one image and build its [`FetchedImage`] record.
///
/// # Errors
/// [`ItemError::Http`] on a non-2xx status, [`ItemError::Timeout`] /
/// [`ItemError::Network`] on transport failures, [`ItemError::Decode`] when
/// the body is not a decodable image.
pub async fn fetch_image(
    client: &reqwest::Client,
    url: &str,
    timeout_secs: u64,
) -> Result<FetchedImage, ItemError> {
    let response = client
        .get(url)
        .timeout(Duration::from_secs(timeout_secs))
        .send()
        .await
        .map_err(|e| map_transport_error(url, timeout_secs, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ItemError::Http {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    // The declared type only steers re-encoding; it is never trusted for
    // dimensions. Missing header defaults to the JPEG path.
    let declared = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("image/jpeg")
        .to_ascii_lowercase();

    let raw = response
        .bytes()
        .await
        .map_err(|e| map_transport_error(url, timeout_secs, e))?;

    let decoded = image::load_from_memory(&raw).map_err(|e| ItemError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let (width, height) = (decoded.width(), decoded.height());

    let (reencoded, mime_type) = reencode(&decoded, &declared).map_err(|e| ItemError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let encoded_payload = STANDARD.encode(&reencoded);
    debug!(
        "Fetched {} ({}x{}, {} → {} bytes base64)",
        url,
        width,
        height,
        raw.len(),
        encoded_payload.len()
    );

    Ok(FetchedImage {
        source_url: url.to_string(),
        raw_bytes: raw.to_vec(),
        width,
        height,
        encoded_payload,
        mime_type: mime_type.to_string(),
    })
}

/// Re-encode to one of the two canonical transport formats.
fn reencode(
    img: &DynamicImage,
    declared: &str,
) -> Result<(Vec<u8>, &'static str), image::ImageError> {
    let mut buf = Vec::new();
    if declared.contains("image/png") || declared.contains("image/gif") {
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        Ok((buf, "image/png"))
    } else {
        // JPEG cannot carry alpha
        DynamicImage::ImageRgb8(img.to_rgb8()).write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)?;
        Ok((buf, "image/jpeg"))
    }
}

fn map_transport_error(url: &str, timeout_secs: u64, e: reqwest::Error) -> ItemError {
    if e.is_timeout() {
        ItemError::Timeout {
            url: url.to_string(),
            secs: timeout_secs,
        }
    } else {
        ItemError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn png_declared_reencodes_as_png() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255])));
        let (bytes, mime) = reencode(&img, "image/png").expect("encode");
        assert_eq!(mime, "image/png");
        let round = image::load_from_memory(&bytes).expect("decode");
        assert_eq!((round.width(), round.height()), (4, 3));
    }

    #[test]
    fn gif_declared_reencodes_as_png() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])));
        let (_, mime) = reencode(&img, "image/gif").expect("encode");
        assert_eq!(mime, "image/png");
    }

    #[test]
    fn anything_else_reencodes_as_jpeg() {
        // RGBA input must flatten cleanly for the JPEG path.
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(5, 5, Rgba([200, 100, 50, 128])));
        for declared in ["image/jpeg", "image/webp", "application/octet-stream"] {
            let (bytes, mime) = reencode(&img, declared).expect("encode");
            assert_eq!(mime, "image/jpeg");
            let round = image::load_from_memory(&bytes).expect("decode");
            assert_eq!((round.width(), round.height()), (5, 5));
        }
    }
}
