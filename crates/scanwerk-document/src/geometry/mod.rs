// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry engine: corner ordering, rescaling, polygon tests, and the
// four-point perspective transform.

pub mod perspective;
pub mod polygon;
pub mod quad;

pub use perspective::{PerspectiveTransform, perspective_transform, warp};
pub use quad::{ScaledQuad, order_corners};
