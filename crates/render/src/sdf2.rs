//! Reference 2D distance field scene.

use glam::{UVec2, Vec2};
use image::Rgba;

use crate::error::Result;
use crate::scene::{Dimensions, RenderArgs, Scene};
use crate::scheduler::PixelJobScheduler;

const INSIDE: Rgba<u8> = Rgba([235, 160, 60, 255]);
const OUTSIDE: Rgba<u8> = Rgba([40, 70, 120, 255]);
const SURFACE: Rgba<u8> = Rgba([250, 250, 250, 255]);
const ISOLINE_FREQUENCY: f32 = 40.0;

/// Signed distance to a circle.
#[must_use]
pub fn circle(p: Vec2, center: Vec2, radius: f32) -> f32 {
    (p - center).length() - radius
}

/// Signed distance to a box with rounded corners.
#[must_use]
pub fn rounded_box(p: Vec2, center: Vec2, half_extents: Vec2, radius: f32) -> f32 {
    let q = (p - center).abs() - half_extents + Vec2::splat(radius);
    q.max(Vec2::ZERO).length() + q.x.max(q.y).min(0.0) - radius
}

/// Scene shading a 2D signed distance function over the view bounds.
///
/// Negative distances are inside. The zero isoline is drawn one pixel wide
/// and faint isolines show the distance field around it.
pub struct Sdf2Scene<F> {
    sdf: F,
    scheduler: PixelJobScheduler,
}

impl<F> Sdf2Scene<F>
where
    F: Fn(Vec2) -> f32 + Send + Sync,
{
    pub fn new(sdf: F, scheduler: PixelJobScheduler) -> Self {
        Self { sdf, scheduler }
    }

    pub fn distance(&self, p: Vec2) -> f32 {
        (self.sdf)(p)
    }
}

impl<F> Scene for Sdf2Scene<F>
where
    F: Fn(Vec2) -> f32 + Send + Sync,
{
    fn dimensions(&self) -> Dimensions {
        Dimensions::Two
    }

    fn render(&self, args: RenderArgs<'_>) -> Result<()> {
        let bounds = args.state.bounds;
        let size = {
            let frames = args.frames.read();
            UVec2::new(frames.full.width(), frames.full.height())
        };
        let footprint = if size.x == 0 {
            0.0
        } else {
            bounds.size().x / size.x as f32
        };
        self.scheduler.render(
            args,
            |_, pixel01| bounds.point_at(pixel01),
            |_, _, point| shade(self.distance(point), footprint),
        )
    }
}

fn shade(distance: f32, footprint: f32) -> Rgba<u8> {
    if distance.abs() <= footprint {
        return SURFACE;
    }
    let base = if distance < 0.0 { INSIDE } else { OUTSIDE };
    let isoline = 0.85 + 0.15 * (distance * ISOLINE_FREQUENCY).cos();
    let falloff = (-distance.abs() * 0.5).exp().mul_add(0.3, 0.7);
    let factor = isoline * falloff;
    Rgba([
        (f32::from(base[0]) * factor) as u8,
        (f32::from(base[1]) * factor) as u8,
        (f32::from(base[2]) * factor) as u8,
        255,
    ])
}
