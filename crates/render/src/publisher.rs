//! Throttled hand-off of in-progress rasters to the presentation layer.

use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use glam::UVec2;
use image::RgbaImage;
use parking_lot::RwLock;
use tracing::{error, trace};

use crate::frames::{DisplayImage, Frames};
use crate::scene::PartialRender;

/// Latest-wins rate limiter: anything arriving sooner than `min_interval`
/// after the last accepted event is dropped, never queued.
#[derive(Debug, Clone)]
pub struct Throttle {
    min_interval: Duration,
    last: Instant,
}

impl Throttle {
    #[must_use]
    pub fn new(min_interval: Duration, start: Instant) -> Self {
        Self {
            min_interval,
            last: start,
        }
    }

    pub fn accept(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last) < self.min_interval {
            return false;
        }
        self.last = now;
        true
    }
}

/// Consumes partial render notifications until the channel closes.
///
/// Accepted notifications copy the full buffer into a reusable raster,
/// upload it and swap it into [`Frames::partial`]. Once the generation ends
/// the partial image is reset to a transparent `size` image so only the
/// completed image remains visible. Returns the number of accepted publishes.
pub fn publish_partials(
    frames: &RwLock<Frames>,
    partial_renders: Receiver<PartialRender>,
    size: UVec2,
    min_interval: Duration,
) -> usize {
    let mut scratch = RgbaImage::new(size.x, size.y);
    let mut throttle = Throttle::new(min_interval, Instant::now());
    let mut accepted = 0;
    for partial in partial_renders {
        if !throttle.accept(Instant::now()) {
            continue;
        }
        {
            let frames = frames.read();
            if frames.full.dimensions() != scratch.dimensions() {
                continue;
            }
            scratch.copy_from_slice(&frames.full);
        }
        match DisplayImage::upload(&scratch) {
            Ok(image) => {
                frames.write().partial = image;
                accepted += 1;
                trace!(rendered = partial.rendered, total = partial.total, "published partial render");
            }
            Err(err) => error!("failed to publish partial render: {err}"),
        }
    }
    frames.write().partial = DisplayImage::transparent(size);
    accepted
}
