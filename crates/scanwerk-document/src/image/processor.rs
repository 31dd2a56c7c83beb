// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: the capture-side raster. Builds colour images from camera
// frames or image files, applies orientation, and encodes the results.

use image::{DynamicImage, ImageFormat, RgbImage};
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::{PixelFormat, RawFrame, Rotation, Size};
use tracing::{debug, info, instrument};

use crate::frame::convert::{encode_frame, to_rgb};

/// A single in-memory image moving through the capture path.
///
/// Each transformation consumes `self` and returns the transformed processor,
/// so steps chain:
///
/// ```ignore
/// let png = ImageProcessor::from_frame(&still)?
///     .rotate(Rotation::Deg90)
///     .to_png_bytes()?;
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let img = image::open(path.as_ref()).map_err(|err| {
            ScanwerkError::ImageError(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self { image: img })
    }

    /// Decode encoded bytes (PNG, JPEG, ...).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data)
            .map_err(|err| ScanwerkError::ImageError(format!("failed to decode image: {}", err)))?;
        debug!(width = img.width(), height = img.height(), "Image decoded from bytes");
        Ok(Self { image: img })
    }

    /// Reconstruct a colour image from a raw camera frame.
    #[instrument(skip_all, fields(seq = frame.sequence(), format = ?frame.format()))]
    pub fn from_frame(frame: &RawFrame) -> Result<Self> {
        let rgb = to_rgb(frame)?;
        debug!(width = rgb.width(), height = rgb.height(), "Frame converted to RGB");
        Ok(Self {
            image: DynamicImage::ImageRgb8(rgb),
        })
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    /// Consume the processor, yielding 8-bit RGB.
    pub fn into_rgb8(self) -> RgbImage {
        self.image.into_rgb8()
    }

    // -- Transformations (consume self, return new Self) ------------------------

    /// Rotate clockwise by a right angle. Lossless.
    #[instrument(skip(self), fields(degrees = rotation.degrees()))]
    pub fn rotate(self, rotation: Rotation) -> Self {
        let image = match rotation {
            Rotation::Deg0 => return self,
            Rotation::Deg90 => self.image.rotate90(),
            Rotation::Deg180 => self.image.rotate180(),
            Rotation::Deg270 => self.image.rotate270(),
        };
        debug!(width = image.width(), height = image.height(), "Rotation applied");
        Self { image }
    }

    /// Convert to 8-bit luma.
    pub fn grayscale(self) -> Self {
        Self {
            image: DynamicImage::ImageLuma8(self.image.to_luma8()),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Re-encode as a raw camera frame, e.g. to replay a still as preview.
    pub fn to_frame(&self, format: PixelFormat, sequence: u64) -> Result<RawFrame> {
        encode_frame(&self.image.to_rgb8(), format, sequence)
    }

    /// Write to a file; the format follows the extension.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        self.image.save(path.as_ref()).map_err(|err| {
            ScanwerkError::ImageError(format!(
                "failed to save image to {}: {}",
                path.as_ref().display(),
                err
            ))
        })
    }
}

/// Encode a `DynamicImage` into `format`.
pub fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| ScanwerkError::ImageError(format!("image encoding failed: {}", err)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn marked_image() -> DynamicImage {
        // 4x2, red marker in the top-left corner.
        let mut img = RgbImage::from_pixel(4, 2, Rgb([255, 255, 255]));
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn quarter_turn_is_clockwise() {
        let rotated = ImageProcessor::from_dynamic(marked_image())
            .rotate(Rotation::Deg90)
            .into_rgb8();
        assert_eq!(rotated.dimensions(), (2, 4));
        // Top-left moves to top-right under a clockwise turn.
        assert_eq!(rotated.get_pixel(1, 0).0, [255, 0, 0]);
    }

    #[test]
    fn zero_rotation_is_identity() {
        let rotated = ImageProcessor::from_dynamic(marked_image()).rotate(Rotation::Deg0);
        assert_eq!(rotated.size(), Size::new(4, 2));
        assert_eq!(rotated.into_rgb8().get_pixel(0, 0).0, [255, 0, 0]);
    }

    #[test]
    fn png_round_trip() {
        let processor = ImageProcessor::from_dynamic(marked_image());
        let png = processor.to_png_bytes().unwrap();
        assert_eq!(&png[1..4], b"PNG");
        let decoded = ImageProcessor::from_bytes(&png).unwrap();
        assert_eq!(decoded.size(), Size::new(4, 2));
    }

    #[test]
    fn frame_round_trip_keeps_geometry() {
        let processor = ImageProcessor::from_dynamic(marked_image());
        let frame = processor.to_frame(PixelFormat::Bgr24, 5).unwrap();
        assert_eq!(frame.data()[..3], [0, 0, 255]);
        let back = ImageProcessor::from_frame(&frame).unwrap();
        assert_eq!(back.into_rgb8().get_pixel(0, 0).0, [255, 0, 0]);
    }

    #[test]
    fn garbage_bytes_are_an_image_error() {
        assert!(matches!(
            ImageProcessor::from_bytes(b"not an image"),
            Err(ScanwerkError::ImageError(_))
        ));
    }
}
