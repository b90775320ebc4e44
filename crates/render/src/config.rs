use std::time::Duration;

/// Number of collected pixels between two lock releases / partial publishes.
pub const DEFAULT_PIXEL_BATCH: usize = 1000;

/// Minimum time between two accepted partial publishes.
pub const DEFAULT_PARTIAL_RENDER_EVERY: Duration = Duration::from_millis(250);

/// Tunables of a [`crate::Renderer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererConfig {
    /// Partial renders arriving faster than this are dropped.
    pub partial_render_every: Duration,
    /// Size of the pixel worker pool.
    pub workers: usize,
    /// Pixels collected between batch boundaries.
    pub pixel_batch: usize,
    /// Whether the camera follows the pointer continuously while panning.
    pub smooth_camera: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            partial_render_every: DEFAULT_PARTIAL_RENDER_EVERY,
            workers: default_workers(),
            pixel_batch: DEFAULT_PIXEL_BATCH,
            smooth_camera: false,
        }
    }
}

impl RendererConfig {
    #[must_use]
    pub fn with_partial_render_every(mut self, every: Duration) -> Self {
        self.partial_render_every = every;
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    #[must_use]
    pub fn with_pixel_batch(mut self, pixel_batch: usize) -> Self {
        self.pixel_batch = pixel_batch.max(1);
        self
    }

    #[must_use]
    pub fn with_smooth_camera(mut self, smooth_camera: bool) -> Self {
        self.smooth_camera = smooth_camera;
        self
    }
}

/// One worker per available core.
#[must_use]
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}
