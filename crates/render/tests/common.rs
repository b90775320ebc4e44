#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec2;
use image::Rgba;
use render::{
    Bounds2, Dimensions, PixelJobScheduler, RenderArgs, RenderError, Renderer, RendererConfig, Result,
    Scene, SceneState,
};

pub const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);

/// Counts `Scene::render` calls across every scene sharing it.
#[derive(Default)]
pub struct Probe {
    pub calls: AtomicUsize,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub completed: AtomicUsize,
    pub cancelled: AtomicUsize,
    /// Renders that started while a partial image was still visible.
    pub stale_partials: AtomicUsize,
}

impl Probe {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Scene painting every pixel with one color, optionally slowly.
pub struct SolidScene {
    pub color: Rgba<u8>,
    pub delay: Duration,
    pub fail_with: Option<String>,
    pub probe: Arc<Probe>,
    scheduler: PixelJobScheduler,
}

impl SolidScene {
    pub fn new(color: Rgba<u8>, probe: &Arc<Probe>) -> Self {
        Self {
            color,
            delay: Duration::ZERO,
            fail_with: None,
            probe: Arc::clone(probe),
            scheduler: PixelJobScheduler::new(4, 1000),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_owned());
        self
    }
}

impl Scene for SolidScene {
    fn dimensions(&self) -> Dimensions {
        Dimensions::Two
    }

    fn render(&self, args: RenderArgs<'_>) -> Result<()> {
        let probe = &self.probe;
        probe.calls.fetch_add(1, Ordering::SeqCst);
        let active = probe.active.fetch_add(1, Ordering::SeqCst) + 1;
        probe.max_active.fetch_max(active, Ordering::SeqCst);
        if !args.frames.read().partial.is_transparent() {
            probe.stale_partials.fetch_add(1, Ordering::SeqCst);
        }

        let outcome = match &self.fail_with {
            Some(message) => Err(RenderError::SceneRender(message.clone())),
            None => self.scheduler.render(
                args,
                |_, _| (),
                |_, _, ()| {
                    if !self.delay.is_zero() {
                        std::thread::sleep(self.delay);
                    }
                    self.color
                },
            ),
        };

        probe.active.fetch_sub(1, Ordering::SeqCst);
        match &outcome {
            Ok(()) => probe.completed.fetch_add(1, Ordering::SeqCst),
            Err(RenderError::Cancelled) => probe.cancelled.fetch_add(1, Ordering::SeqCst),
            Err(_) => 0,
        };
        outcome
    }
}

pub fn scene_state() -> SceneState {
    SceneState::new(Bounds2::from_center(Vec2::ZERO, Vec2::splat(10.0)))
}

pub fn config() -> RendererConfig {
    RendererConfig::default()
        .with_workers(4)
        .with_partial_render_every(Duration::ZERO)
}

pub fn renderer(scene: SolidScene) -> Renderer {
    Renderer::new(Arc::new(scene), scene_state(), config())
}

/// Spins until `condition` holds, failing the test after a few seconds.
pub fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(1));
    }
}
