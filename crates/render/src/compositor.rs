//! Per-frame compositing of the completed and partial renders.

use glam::{Affine2, UVec2, Vec2};
use image::{Rgba, RgbaImage};

use crate::coordinator::Renderer;
use crate::frames::DisplayImage;
use crate::view::ViewState;

/// Surface the presentation layer draws into.
pub trait DrawTarget {
    /// Draws `image` with `transform` mapping image pixels to target pixels.
    fn draw_image(&mut self, image: &DisplayImage, transform: Affine2);
}

/// Offset previewing a pan that has not been rerendered yet, in render
/// pixels. Zero with camera smoothing, where the render itself follows.
#[must_use]
pub fn pan_offset(view: &ViewState) -> Vec2 {
    if view.smooth_camera {
        return Vec2::ZERO;
    }
    view.interaction
        .pan_delta()
        .map_or(Vec2::ZERO, |delta| delta / view.scene.res_inv.max(1) as f32)
}

/// Scale stretching an `image` sized raster over the screen.
#[must_use]
pub fn fit_scale(screen_size: UVec2, image_size: UVec2) -> Vec2 {
    if image_size.x == 0 || image_size.y == 0 {
        return Vec2::ONE;
    }
    screen_size.as_vec2() / image_size.as_vec2()
}

impl Renderer {
    /// Draws the last completed render and overlays the partial one.
    ///
    /// Safe to call while a generation is rendering in the background.
    pub fn draw<T: DrawTarget + ?Sized>(&self, target: &mut T) {
        let state = self.inner.state.read();
        let frames = self.inner.frames.read();
        if let Some(completed) = &frames.completed {
            let transform = Affine2::from_scale(fit_scale(state.screen_size, completed.size()))
                * Affine2::from_translation(pan_offset(&state));
            target.draw_image(completed, transform);
        }
        let transform = Affine2::from_scale(fit_scale(state.screen_size, frames.partial.size()));
        target.draw_image(&frames.partial, transform);
    }
}

/// Software [`DrawTarget`] backed by an RGBA raster.
///
/// Images are sampled nearest-neighbour and blended source-over.
#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    #[must_use]
    pub fn new(size: UVec2) -> Self {
        Self {
            image: RgbaImage::new(size.x, size.y),
        }
    }

    pub fn clear(&mut self, color: Rgba<u8>) {
        self.image.pixels_mut().for_each(|pixel| *pixel = color);
    }

    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    #[must_use]
    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

impl DrawTarget for Canvas {
    fn draw_image(&mut self, image: &DisplayImage, transform: Affine2) {
        let source = image.pixels();
        let (width, height) = source.dimensions();
        if width == 0 || height == 0 || transform.matrix2.determinant() == 0.0 {
            return;
        }
        let inverse = transform.inverse();
        for (x, y, pixel) in self.image.enumerate_pixels_mut() {
            let at = inverse.transform_point2(Vec2::new(x as f32 + 0.5, y as f32 + 0.5));
            if at.x < 0.0 || at.y < 0.0 {
                continue;
            }
            let (sx, sy) = (at.x as u32, at.y as u32);
            if sx < width && sy < height {
                blend_over(pixel, *source.get_pixel(sx, sy));
            }
        }
    }
}

fn blend_over(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let src_alpha = u32::from(src[3]);
    match src_alpha {
        0 => {}
        255 => *dst = src,
        _ => {
            let dst_alpha = u32::from(dst[3]) * (255 - src_alpha) / 255;
            let out_alpha = src_alpha + dst_alpha;
            for channel in 0..3 {
                let mixed = u32::from(src[channel]) * src_alpha + u32::from(dst[channel]) * dst_alpha;
                dst[channel] = (mixed / out_alpha) as u8;
            }
            dst[3] = out_alpha as u8;
        }
    }
}
