//! Parallel per-pixel rasterization in randomized order.
//!
//! One generator thread walks a random permutation of the pixels and feeds a
//! bounded job queue, a pool of workers turns jobs into colors, and the
//! calling thread collects the colors into the full resolution buffer. The
//! random order makes an unfinished pass look like a sparse preview of the
//! whole image instead of a few finished scanlines.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use glam::{UVec2, Vec2};
use image::Rgba;
use parking_lot::{Mutex, RwLock};

use crate::cancel::CancelToken;
use crate::config::RendererConfig;
use crate::error::Result;
use crate::frames::Frames;
use crate::scene::{PartialRender, RenderArgs};

/// A single pixel waiting to be evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelJob<J> {
    pub pixel: UVec2,
    /// `pixel` divided by the raster size, in `[0, 1)`.
    pub pixel01: Vec2,
    pub data: J,
}

/// Color resolved for one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelResult {
    pub pixel: UVec2,
    pub color: Rgba<u8>,
}

pub struct PixelJobScheduler {
    workers: usize,
    pixel_batch: usize,
    permutation: Mutex<Arc<[usize]>>,
}

impl PixelJobScheduler {
    #[must_use]
    pub fn new(workers: usize, pixel_batch: usize) -> Self {
        Self {
            workers: workers.max(1),
            pixel_batch: pixel_batch.max(1),
            permutation: Mutex::new(Arc::from(Vec::new())),
        }
    }

    #[must_use]
    pub fn from_config(config: &RendererConfig) -> Self {
        Self::new(config.workers, config.pixel_batch)
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Traversal order for `pixel_count` pixels.
    ///
    /// The same permutation is handed out again for as long as the pixel
    /// count does not change.
    pub fn permutation(&self, pixel_count: usize) -> Arc<[usize]> {
        let mut cached = self.permutation.lock();
        if cached.len() != pixel_count {
            let mut order: Vec<usize> = (0..pixel_count).collect();
            fastrand::shuffle(&mut order);
            *cached = Arc::from(order);
        }
        Arc::clone(&cached)
    }

    /// Rasterizes `args.frames.full` in place.
    ///
    /// `gen_job` runs on the generator thread and prepares per-pixel input,
    /// `process_job` runs on the workers and resolves it to a color. Every
    /// pixel batch the buffer lock is released, cancellation is checked and
    /// a [`PartialRender`] is sent. The partial channel is closed on return.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RenderError::Cancelled`] if `args.cancel` fires
    /// before the pass completes.
    pub fn render<J, G, P>(&self, args: RenderArgs<'_>, gen_job: G, process_job: P) -> Result<()>
    where
        J: Send,
        G: Fn(UVec2, Vec2) -> J + Sync,
        P: Fn(UVec2, Vec2, J) -> Rgba<u8> + Sync,
    {
        let RenderArgs {
            cancel,
            frames,
            partial_renders,
            ..
        } = args;

        let size = {
            let mut frames = frames.write();
            frames.clear_full();
            UVec2::new(frames.full.width(), frames.full.height())
        };
        let total = size.x as usize * size.y as usize;
        let order = self.permutation(total);

        let outcome = thread::scope(|scope| {
            let (jobs, job_queue) = crossbeam_channel::bounded::<PixelJob<J>>(0);
            let (results, result_queue) = crossbeam_channel::bounded::<PixelResult>(self.workers);

            let (order, gen_job, process_job, cancel) = (&order, &gen_job, &process_job, &cancel);
            scope.spawn(move || generate(order, size, gen_job, &jobs, cancel));
            for _ in 0..self.workers {
                let job_queue = job_queue.clone();
                let results = results.clone();
                scope.spawn(move || work(&job_queue, &results, process_job));
            }
            drop(job_queue);
            drop(results);

            self.collect(result_queue, frames, cancel, partial_renders.as_ref(), total)
        });
        drop(partial_renders);
        outcome
    }

    fn collect(
        &self,
        results: Receiver<PixelResult>,
        frames: &RwLock<Frames>,
        cancel: &CancelToken,
        partial_renders: Option<&Sender<PartialRender>>,
        total: usize,
    ) -> Result<()> {
        let mut rendered = 0;
        let mut guard = frames.write();
        for result in &results {
            guard.full.put_pixel(result.pixel.x, result.pixel.y, result.color);
            rendered += 1;
            if rendered % self.pixel_batch == 0 {
                drop(guard);
                thread::yield_now();
                cancel.check()?;
                if let Some(partial_renders) = partial_renders {
                    // A gone publisher only means nobody is watching.
                    let _ = partial_renders.send(PartialRender { rendered, total });
                }
                guard = frames.write();
            }
        }
        drop(guard);
        // The queue also drains early when the generator stops on cancellation.
        cancel.check()
    }
}

fn generate<J, G>(
    order: &[usize],
    size: UVec2,
    gen_job: &G,
    jobs: &Sender<PixelJob<J>>,
    cancel: &CancelToken,
) where
    G: Fn(UVec2, Vec2) -> J,
{
    let extent = size.as_vec2();
    for &index in order {
        let index = index as u32;
        let pixel = UVec2::new(index % size.x, index / size.x);
        let pixel01 = pixel.as_vec2() / extent;
        let job = PixelJob {
            pixel,
            pixel01,
            data: gen_job(pixel, pixel01),
        };
        let queued = crossbeam_channel::select! {
            recv(cancel.done()) -> _ => false,
            send(jobs, job) -> sent => sent.is_ok(),
        };
        if !queued {
            break;
        }
    }
}

fn work<J, P>(jobs: &Receiver<PixelJob<J>>, results: &Sender<PixelResult>, process_job: &P)
where
    P: Fn(UVec2, Vec2, J) -> Rgba<u8>,
{
    for job in jobs {
        let color = process_job(job.pixel, job.pixel01, job.data);
        if results.send(PixelResult { pixel: job.pixel, color }).is_err() {
            break;
        }
    }
}
