//! The scene rendering contract and the state snapshot it consumes.
//!
//! A scene evaluates an implicit surface per pixel. The renderer never looks
//! inside it: it hands over a [`RenderArgs`] bundle and expects the scene to
//! drive a [`crate::PixelJobScheduler`] with it.

use crossbeam_channel::Sender;
use glam::{UVec2, Vec2};
use parking_lot::RwLock;

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::frames::Frames;
use crate::view::ViewState;

/// Axis aligned rectangle of the 2D world that is visible on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds2 {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds2 {
    #[must_use]
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn from_center(center: Vec2, half_size: Vec2) -> Self {
        Self::new(center - half_size, center + half_size)
    }

    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    #[must_use]
    pub fn translated(&self, delta: Vec2) -> Self {
        Self::new(self.min + delta, self.max + delta)
    }

    /// World point under a normalized screen coordinate.
    ///
    /// Screen `y` grows downwards while world `y` grows upwards, so `(0, 0)`
    /// maps to the top-left corner `(min.x, max.y)`.
    #[must_use]
    pub fn point_at(&self, pixel01: Vec2) -> Vec2 {
        let size = self.size();
        Vec2::new(self.min.x + pixel01.x * size.x, self.max.y - pixel01.y * size.y)
    }
}

/// Dimensionality reported by a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimensions {
    Two,
    Three,
}

/// Camera and view parameters of one render generation.
///
/// Copied by value when a generation starts so the UI thread can keep
/// mutating the live state while the render is in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneState {
    /// Render resolution is the screen size divided by this factor.
    pub res_inv: u32,
    /// Visible region of a 2D scene.
    pub bounds: Bounds2,
}

impl SceneState {
    #[must_use]
    pub fn new(bounds: Bounds2) -> Self {
        Self { res_inv: 1, bounds }
    }

    #[must_use]
    pub fn with_res_inv(mut self, res_inv: u32) -> Self {
        self.res_inv = res_inv.max(1);
        self
    }

    /// Pixel dimensions of the raster rendered for `screen_size`.
    #[must_use]
    pub fn render_size(&self, screen_size: UVec2) -> UVec2 {
        screen_size / self.res_inv.max(1)
    }

    /// Moves a 2D view so the content follows a pointer drag of `delta`
    /// screen pixels.
    #[must_use]
    pub fn panned(&self, delta: Vec2, screen_size: UVec2) -> Self {
        if screen_size.x == 0 || screen_size.y == 0 {
            return self.clone();
        }
        let world_per_pixel = self.bounds.size() / screen_size.as_vec2();
        let shift = Vec2::new(-delta.x * world_per_pixel.x, delta.y * world_per_pixel.y);
        Self {
            bounds: self.bounds.translated(shift),
            ..self.clone()
        }
    }
}

/// Progress notification sent to the partial result publisher once per
/// pixel batch. The pixels themselves stay in [`Frames::full`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialRender {
    pub rendered: usize,
    pub total: usize,
}

/// Everything a scene receives for one render generation.
pub struct RenderArgs<'a> {
    pub cancel: CancelToken,
    /// Snapshot taken when the generation started.
    pub state: SceneState,
    /// Live state lock. Must be taken before `frames` when both are needed.
    pub state_lock: &'a RwLock<ViewState>,
    /// Cached image lock, also guarding the full resolution buffer.
    pub frames: &'a RwLock<Frames>,
    /// Closed by the scheduler when the pass ends, cancelled or not.
    pub partial_renders: Option<Sender<PartialRender>>,
}

/// An implicit surface that can be rasterized by the renderer.
pub trait Scene: Send + Sync {
    fn dimensions(&self) -> Dimensions;

    /// Rasterizes the scene into `args.frames.full`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RenderError::Cancelled`] when `args.cancel` fires
    /// before the pass completes, or any scene specific failure.
    fn render(&self, args: RenderArgs<'_>) -> Result<()>;
}
