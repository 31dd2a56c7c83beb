// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Channel-backed overlay and result sinks.

use image::RgbaImage;
use scanwerk_document::RectifiedImage;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::debug;

use crate::traits::{OverlaySink, ResultSink};

/// Forwards every overlay (or its absence) to a channel.
#[derive(Debug, Clone)]
pub struct ChannelOverlaySink {
    tx: UnboundedSender<Option<RgbaImage>>,
}

/// Forwards finished captures to a channel.
#[derive(Debug, Clone)]
pub struct ChannelResultSink {
    tx: UnboundedSender<RectifiedImage>,
}

pub fn overlay_channel() -> (ChannelOverlaySink, UnboundedReceiver<Option<RgbaImage>>) {
    let (tx, rx) = unbounded_channel();
    (ChannelOverlaySink { tx }, rx)
}

pub fn result_channel() -> (ChannelResultSink, UnboundedReceiver<RectifiedImage>) {
    let (tx, rx) = unbounded_channel();
    (ChannelResultSink { tx }, rx)
}

impl OverlaySink for ChannelOverlaySink {
    fn present_overlay(&self, overlay: Option<&RgbaImage>) {
        if self.tx.send(overlay.cloned()).is_err() {
            debug!("Overlay receiver dropped; discarding overlay");
        }
    }
}

impl ResultSink for ChannelResultSink {
    fn deliver(&self, result: &RectifiedImage) {
        if self.tx.send(result.clone()).is_err() {
            debug!("Result receiver dropped; discarding capture");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage};
    use scanwerk_core::types::OutputMode;

    #[test]
    fn overlays_arrive_in_order() {
        let (sink, mut rx) = overlay_channel();
        sink.present_overlay(None);
        sink.present_overlay(Some(&RgbaImage::new(3, 2)));
        assert!(rx.try_recv().unwrap().is_none());
        assert_eq!(rx.try_recv().unwrap().unwrap().dimensions(), (3, 2));
    }

    #[test]
    fn closed_receiver_is_not_an_error() {
        let (sink, rx) = result_channel();
        drop(rx);
        sink.deliver(&RectifiedImage {
            image: DynamicImage::ImageLuma8(GrayImage::new(1, 1)),
            mode: OutputMode::Document,
            png: Vec::new(),
        });
    }
}
