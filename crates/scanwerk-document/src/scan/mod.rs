// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rectification output stage: perspective crop plus optional document-mode
// binarization.

pub mod rectify;

pub use rectify::{RectifiedImage, Rectifier};
