// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fixed-size pool of preview frame buffers.

use scanwerk_core::error::{Result, ScanwerkError};
use tracing::{debug, warn};

/// Reusable byte buffers, all exactly `buffer_len` long.
///
/// Buffers are handed to the camera collaborator to fill and come back once
/// the frame has been processed. A buffer whose length no longer matches
/// (e.g. after a preview size change) is dropped instead of being pooled.
#[derive(Debug)]
pub struct FramePool {
    buffers: Vec<Vec<u8>>,
    buffer_len: usize,
    capacity: usize,
}

impl FramePool {
    /// Preallocate `capacity` zeroed buffers of `buffer_len` bytes.
    pub fn new(buffer_len: usize, capacity: usize) -> Result<Self> {
        let mut pool = Self {
            buffers: Vec::with_capacity(capacity),
            buffer_len,
            capacity,
        };
        for _ in 0..capacity {
            let buffer = pool.allocate()?;
            pool.buffers.push(buffer);
        }
        debug!(buffer_len, capacity, "Frame pool allocated");
        Ok(pool)
    }

    /// Take a buffer, allocating a fresh one when the pool is empty.
    pub fn acquire(&mut self) -> Result<Vec<u8>> {
        match self.buffers.pop() {
            Some(buffer) => Ok(buffer),
            None => {
                debug!(buffer_len = self.buffer_len, "Frame pool empty; allocating");
                self.allocate()
            }
        }
    }

    /// Return a buffer. Wrong-length buffers and any beyond capacity are
    /// dropped.
    pub fn release(&mut self, buffer: Vec<u8>) {
        if buffer.len() != self.buffer_len {
            debug!(
                len = buffer.len(),
                expected = self.buffer_len,
                "Dropping stale frame buffer"
            );
            return;
        }
        if self.buffers.len() < self.capacity {
            self.buffers.push(buffer);
        }
    }

    /// Switch to a new buffer length, discarding every pooled buffer and
    /// preallocating replacements.
    pub fn reconfigure(&mut self, buffer_len: usize) -> Result<()> {
        if buffer_len == self.buffer_len {
            return Ok(());
        }
        self.buffers.clear();
        self.buffer_len = buffer_len;
        for _ in 0..self.capacity {
            let buffer = self.allocate()?;
            self.buffers.push(buffer);
        }
        debug!(buffer_len, "Frame pool reconfigured");
        Ok(())
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    /// Buffers currently idle in the pool.
    pub fn available(&self) -> usize {
        self.buffers.len()
    }

    fn allocate(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(self.buffer_len).map_err(|err| {
            warn!(buffer_len = self.buffer_len, %err, "Frame buffer allocation failed");
            ScanwerkError::BufferAllocation(format!("{} bytes: {}", self.buffer_len, err))
        })?;
        buffer.resize(self.buffer_len, 0);
        Ok(buffer)
    }
}
