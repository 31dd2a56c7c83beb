// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw frame handling: pixel format conversion, preview/picture size
// negotiation, working-resolution sizing, and reusable frame buffers.

pub mod convert;
pub mod pool;
pub mod sizing;

pub use pool::FramePool;
pub use sizing::{choose_preview_config, optimal_size, resize_ratio, working_size};
