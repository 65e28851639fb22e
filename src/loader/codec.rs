//! Decode and thumbnail collaborator.
//!
//! The loader never touches pixel formats directly. It asks an [`ImageCodec`]
//! to turn bytes into an RGBA surface and to shrink that surface into an
//! encoded preview. [`RasterCodec`] is the implementation backed by the
//! `image` crate.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageBuffer, Rgba};
use serde::{Deserialize, Serialize};

use crate::constants::THUMBNAIL_JPEG_QUALITY;
use crate::error::LoadError;

/// Decoded pixel surface, RGBA8, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// RGBA pixel data (width * height * 4 bytes)
    pub pixels: Vec<u8>,
}

/// Small encoded preview of a panorama.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thumbnail {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// MIME type of `data`
    pub mime_type: String,
    /// Encoded image bytes
    pub data: Vec<u8>,
}

/// Platform decode/resize collaborator.
pub trait ImageCodec {
    /// Decode encoded bytes into an RGBA surface.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, LoadError>;

    /// Resize `image` to exactly `width` x `height` and encode it.
    fn thumbnail(
        &self,
        image: &DecodedImage,
        width: u32,
        height: u32,
    ) -> Result<Thumbnail, LoadError>;
}

/// Codec backed by the `image` crate. Thumbnails are JPEG.
#[derive(Debug, Clone)]
pub struct RasterCodec {
    quality: u8,
}

impl Default for RasterCodec {
    fn default() -> Self {
        Self {
            quality: THUMBNAIL_JPEG_QUALITY,
        }
    }
}

impl RasterCodec {
    /// Create a codec with the default thumbnail quality.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with a custom JPEG quality (1-100).
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

impl ImageCodec for RasterCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, LoadError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| LoadError::Decode(e.to_string()))?
            .to_rgba8();

        let (width, height) = img.dimensions();
        log::trace!("RasterCodec: decoded {}x{} image", width, height);

        Ok(DecodedImage {
            width,
            height,
            pixels: img.into_raw(),
        })
    }

    fn thumbnail(
        &self,
        image: &DecodedImage,
        width: u32,
        height: u32,
    ) -> Result<Thumbnail, LoadError> {
        let view: ImageBuffer<Rgba<u8>, &[u8]> =
            ImageBuffer::from_raw(image.width, image.height, image.pixels.as_slice()).ok_or_else(
                || {
                    LoadError::Decode(format!(
                        "pixel buffer does not match {}x{}",
                        image.width, image.height
                    ))
                },
            )?;

        let resized = image::imageops::resize(&view, width, height, FilterType::Triangle);
        let rgb = DynamicImage::ImageRgba8(resized).to_rgb8();

        let mut data = Vec::new();
        JpegEncoder::new_with_quality(Cursor::new(&mut data), self.quality)
            .encode_image(&rgb)
            .map_err(|e| LoadError::Encode(e.to_string()))?;

        Ok(Thumbnail {
            width,
            height,
            mime_type: "image/jpeg".to_string(),
            data,
        })
    }
}

/// Thumbnail size preserving the aspect ratio of `width` x `height`, with
/// the longer axis clamped to `max_size`. Never upscales.
///
/// Landscape images clamp the width; square and portrait images clamp the
/// height.
pub fn thumbnail_dimensions(width: u32, height: u32, max_size: u32) -> (f64, f64) {
    let (width, height, max_size) = (f64::from(width), f64::from(height), f64::from(max_size));
    let ratio = width / height;
    if ratio > 1.0 {
        let w = max_size.min(width);
        (w, w / ratio)
    } else {
        let h = max_size.min(height);
        (h * ratio, h)
    }
}

/// [`thumbnail_dimensions`] rounded to whole pixels, at least 1x1.
pub fn thumbnail_pixel_size(width: u32, height: u32, max_size: u32) -> (u32, u32) {
    let (w, h) = thumbnail_dimensions(width, height, max_size.max(1));
    let round = |v: f64| (v.round() as u32).max(1);
    (round(w), round(h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, Rgba([200, 100, 50, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_decode_png() {
        let decoded = RasterCodec::new().decode(&png(8, 4)).unwrap();
        assert_eq!((decoded.width, decoded.height), (8, 4));
        assert_eq!(decoded.pixels.len(), 8 * 4 * 4);
        assert_eq!(&decoded.pixels[..4], &[200, 100, 50, 255]);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = RasterCodec::new().decode(b"not an image").unwrap_err();
        assert!(matches!(err, LoadError::Decode(_)));
    }

    #[test]
    fn test_thumbnail_is_jpeg() {
        let codec = RasterCodec::new();
        let decoded = codec.decode(&png(40, 20)).unwrap();
        let thumb = codec.thumbnail(&decoded, 10, 5).unwrap();
        assert_eq!((thumb.width, thumb.height), (10, 5));
        assert_eq!(thumb.mime_type, "image/jpeg");
        assert_eq!(&thumb.data[..3], &[0xFF, 0xD8, 0xFF]);

        let reread = image::load_from_memory(&thumb.data).unwrap();
        assert_eq!((reread.width(), reread.height()), (10, 5));
    }

    #[test]
    fn test_thumbnail_rejects_short_buffer() {
        let broken = DecodedImage {
            width: 10,
            height: 10,
            pixels: vec![0; 12],
        };
        assert!(RasterCodec::new().thumbnail(&broken, 2, 2).is_err());
    }

    #[test]
    fn test_dimensions_branches() {
        // Landscape clamps width
        assert_eq!(thumbnail_dimensions(4000, 2000, 256), (256.0, 128.0));
        // Portrait clamps height
        assert_eq!(thumbnail_dimensions(1000, 2000, 200), (100.0, 200.0));
        // Square takes the height branch
        assert_eq!(thumbnail_dimensions(500, 500, 256), (256.0, 256.0));
        // Small images are not upscaled
        assert_eq!(thumbnail_dimensions(100, 50, 256), (100.0, 50.0));
    }

    #[test]
    fn test_pixel_size_never_zero() {
        assert_eq!(thumbnail_pixel_size(10000, 1, 100), (100, 1));
        assert_eq!(thumbnail_pixel_size(1, 1, 0), (1, 1));
    }

    proptest! {
        #[test]
        fn thumbnail_preserves_aspect_ratio(
            width in 1u32..10_000,
            height in 1u32..10_000,
            max_size in 1u32..1024,
        ) {
            let (w, h) = thumbnail_dimensions(width, height, max_size);
            let source = f64::from(width) / f64::from(height);
            prop_assert!(((w / h) - source).abs() <= 1e-3 * source.max(1.0));
            prop_assert!(w <= f64::from(max_size) + 1e-9);
            prop_assert!(h <= f64::from(max_size) + 1e-9);
        }

        #[test]
        fn pixel_size_within_bounds(
            width in 1u32..10_000,
            height in 1u32..10_000,
            max_size in 1u32..1024,
        ) {
            let (w, h) = thumbnail_pixel_size(width, height, max_size);
            prop_assert!(w >= 1 && h >= 1);
            prop_assert!(w <= max_size.max(1) && h <= max_size.max(1));
            prop_assert!(w <= width && h <= height);
        }
    }
}
