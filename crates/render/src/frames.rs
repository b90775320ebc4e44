//! Images guarded by the cached image lock.

use std::sync::Arc;

use glam::UVec2;
use image::RgbaImage;

use crate::error::{RenderError, Result};

/// Alpha written to every pixel of the full buffer before a pass starts.
pub const UNPAINTED_ALPHA: u8 = 0;

/// Immutable image in the presentation layer's format.
#[derive(Debug, Clone)]
pub struct DisplayImage {
    pixels: Arc<RgbaImage>,
}

impl DisplayImage {
    /// Converts a raster into a displayable image.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::PresentationUpload`] for empty rasters, which
    /// cannot back a texture.
    pub fn upload(raster: &RgbaImage) -> Result<Self> {
        let (width, height) = raster.dimensions();
        if width == 0 || height == 0 {
            return Err(RenderError::PresentationUpload { width, height });
        }
        Ok(Self {
            pixels: Arc::new(raster.clone()),
        })
    }

    #[must_use]
    pub fn transparent(size: UVec2) -> Self {
        Self {
            pixels: Arc::new(RgbaImage::new(size.x, size.y)),
        }
    }

    #[must_use]
    pub fn size(&self) -> UVec2 {
        let (width, height) = self.pixels.dimensions();
        UVec2::new(width, height)
    }

    #[must_use]
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.pixels.pixels().all(|pixel| pixel[3] == 0)
    }
}

/// The cached images plus the full resolution buffer of the active generation.
#[derive(Debug)]
pub struct Frames {
    /// Last image of a generation that ran to completion.
    pub completed: Option<DisplayImage>,
    /// Latest throttled snapshot of `full`, transparent between generations.
    pub partial: DisplayImage,
    /// Written in place by the active generation's collector.
    pub full: RgbaImage,
}

impl Frames {
    #[must_use]
    pub fn new() -> Self {
        Self {
            completed: None,
            partial: DisplayImage::transparent(UVec2::ZERO),
            full: RgbaImage::new(0, 0),
        }
    }

    /// Makes `full` match `size`, returning whether the old buffer was reused.
    pub fn prepare_full(&mut self, size: UVec2) -> bool {
        if self.full.dimensions() == (size.x, size.y) {
            return true;
        }
        self.full = RgbaImage::new(size.x, size.y);
        false
    }

    /// Marks every pixel of `full` as not yet painted.
    pub fn clear_full(&mut self) {
        for pixel in self.full.pixels_mut() {
            pixel[3] = UNPAINTED_ALPHA;
        }
    }
}

impl Default for Frames {
    fn default() -> Self {
        Self::new()
    }
}
