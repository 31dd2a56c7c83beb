// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanwerk-document: image analysis for the Scanwerk document scanner.
//
// Provides raw frame handling (pixel conversion, size negotiation, buffer
// pooling), the geometry engine (corner ordering, rescaling, homography and
// warp), the per-tick edge/contour detector with its overlay renderer, and the
// rectification output stage (perspective crop, document-mode binarization).

pub mod detect;
pub mod frame;
pub mod geometry;
pub mod image;
pub mod scan;

// Re-export the primary structs so callers can use `scanwerk_document::ContourDetector` etc.
pub use detect::{ContourDetector, Detection, DetectionReport};
pub use frame::pool::FramePool;
pub use geometry::quad::ScaledQuad;
pub use self::image::processor::ImageProcessor;
pub use scan::rectify::{RectifiedImage, Rectifier};
