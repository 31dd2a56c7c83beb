// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Edge/contour detection and the live overlay drawn from its results.

pub mod contours;
pub mod overlay;

pub use contours::{Candidate, ContourDetector, Detection, DetectionReport};
pub use overlay::render_overlay;
