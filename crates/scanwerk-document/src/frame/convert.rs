// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw camera buffers to `image` rasters, and back for synthetic sources.

use image::{GrayImage, Luma, Rgb, RgbImage};
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::{PixelFormat, RawFrame, Size};

/// Extract 8-bit luma from a frame.
///
/// For `Gray8` and `Nv21` this is a copy of the first `w * h` bytes; packed
/// colour formats are reduced with integer BT.601 weights.
pub fn to_luma(frame: &RawFrame) -> Result<GrayImage> {
    let Size { width, height } = frame.size();
    let pixels = width as usize * height as usize;
    let data = frame.data();

    let luma = match frame.format() {
        PixelFormat::Gray8 | PixelFormat::Nv21 => data[..pixels].to_vec(),
        format => {
            let (stride, order) = packed_layout(format);
            data.chunks_exact(stride)
                .take(pixels)
                .map(|px| {
                    let (r, g, b) = order.rgb(px);
                    luma_of(r, g, b)
                })
                .collect()
        }
    };

    GrayImage::from_raw(width, height, luma).ok_or_else(|| {
        ScanwerkError::ImageError(format!("luma buffer does not fit {}x{}", width, height))
    })
}

/// Decode a frame to RGB.
///
/// NV21 chroma is shared by each 2x2 block; rows or columns past the end of
/// a truncated chroma plane decode as neutral grey chroma.
pub fn to_rgb(frame: &RawFrame) -> Result<RgbImage> {
    let Size { width, height } = frame.size();
    let data = frame.data();

    let image = match frame.format() {
        PixelFormat::Gray8 => RgbImage::from_fn(width, height, |x, y| {
            let v = data[(y * width + x) as usize];
            Rgb([v, v, v])
        }),
        PixelFormat::Nv21 => {
            let luma_len = width as usize * height as usize;
            let stride = width as usize;
            RgbImage::from_fn(width, height, |x, y| {
                let luma = data[y as usize * stride + x as usize];
                let chroma = luma_len + (y as usize / 2) * stride + (x as usize / 2) * 2;
                let v = data.get(chroma).copied().unwrap_or(128);
                let u = data.get(chroma + 1).copied().unwrap_or(128);
                Rgb(yuv_to_rgb(luma, u, v))
            })
        }
        format => {
            let (stride, order) = packed_layout(format);
            RgbImage::from_fn(width, height, |x, y| {
                let offset = (y * width + x) as usize * stride;
                let (r, g, b) = order.rgb(&data[offset..offset + stride]);
                Rgb([r, g, b])
            })
        }
    };
    Ok(image)
}

/// Encode an RGB raster into a frame of the requested layout.
///
/// Used by replay sources and tests to stand in for a camera. NV21 chroma is
/// the average over each 2x2 block.
pub fn encode_frame(image: &RgbImage, format: PixelFormat, sequence: u64) -> Result<RawFrame> {
    let (width, height) = image.dimensions();
    let size = Size::new(width, height);

    let data = match format {
        PixelFormat::Gray8 => image.pixels().map(|p| luma_of(p[0], p[1], p[2])).collect(),
        PixelFormat::Rgb24 => image.as_raw().clone(),
        PixelFormat::Bgr24 => image.pixels().flat_map(|p| [p[2], p[1], p[0]]).collect(),
        PixelFormat::Rgba32 => image.pixels().flat_map(|p| [p[0], p[1], p[2], 255]).collect(),
        PixelFormat::Bgra32 => image.pixels().flat_map(|p| [p[2], p[1], p[0], 255]).collect(),
        PixelFormat::Nv21 => encode_nv21(image),
    };

    RawFrame::new(data, size, format, sequence)
}

fn encode_nv21(image: &RgbImage) -> Vec<u8> {
    let (width, height) = image.dimensions();
    let size = Size::new(width, height);
    let mut data = Vec::with_capacity(PixelFormat::Nv21.buffer_len(size));
    data.extend(image.pixels().map(|p| luma_of(p[0], p[1], p[2])));

    // Chroma rows are filled block by block and then cut to the exact
    // buffer length, which drops the tail for odd sizes.
    for by in (0..height).step_by(2) {
        for bx in (0..width).step_by(2) {
            let (mut sum_u, mut sum_v, mut n) = (0.0f32, 0.0f32, 0.0f32);
            for y in by..(by + 2).min(height) {
                for x in bx..(bx + 2).min(width) {
                    let Rgb([r, g, b]) = *image.get_pixel(x, y);
                    let (u, v) = rgb_to_uv(r, g, b);
                    sum_u += u;
                    sum_v += v;
                    n += 1.0;
                }
            }
            data.push(clamp_u8(sum_v / n));
            if bx + 1 < width {
                data.push(clamp_u8(sum_u / n));
            }
        }
    }
    data.resize(PixelFormat::Nv21.buffer_len(size), 128);
    data
}

#[derive(Debug, Clone, Copy)]
enum ChannelOrder {
    Rgb,
    Bgr,
}

impl ChannelOrder {
    fn rgb(self, px: &[u8]) -> (u8, u8, u8) {
        match self {
            Self::Rgb => (px[0], px[1], px[2]),
            Self::Bgr => (px[2], px[1], px[0]),
        }
    }
}

/// Bytes per pixel and channel order for the packed formats.
fn packed_layout(format: PixelFormat) -> (usize, ChannelOrder) {
    match format {
        PixelFormat::Rgb24 => (3, ChannelOrder::Rgb),
        PixelFormat::Bgr24 => (3, ChannelOrder::Bgr),
        PixelFormat::Rgba32 => (4, ChannelOrder::Rgb),
        PixelFormat::Bgra32 => (4, ChannelOrder::Bgr),
        // Planar formats never reach here; treat them as single-byte grey.
        PixelFormat::Gray8 | PixelFormat::Nv21 => (1, ChannelOrder::Rgb),
    }
}

fn luma_of(r: u8, g: u8, b: u8) -> u8 {
    ((77 * r as u32 + 150 * g as u32 + 29 * b as u32 + 128) >> 8) as u8
}

/// Full-range BT.601.
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;
    [
        clamp_u8(y + 1.402 * v),
        clamp_u8(y - 0.344_136 * u - 0.714_136 * v),
        clamp_u8(y + 1.772 * u),
    ]
}

fn rgb_to_uv(r: u8, g: u8, b: u8) -> (f32, f32) {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let u = -0.168_736 * r - 0.331_264 * g + 0.5 * b + 128.0;
    let v = 0.5 * r - 0.418_688 * g - 0.081_312 * b + 128.0;
    (u, v)
}

fn clamp_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Convenience for tests and synthetic sources.
pub fn gray_to_rgb(gray: &GrayImage) -> RgbImage {
    RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
        let Luma([v]) = *gray.get_pixel(x, y);
        Rgb([v, v, v])
    })
}
