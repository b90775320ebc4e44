#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
//! # Interactive implicit surface renderer
//!
//! CPU rasterization of a scene described by an implicit surface, kept
//! responsive while the camera or the resolution changes.
//!
//! ## Key Components
//!
//! -   **Generations:** [`Renderer`] owns the single in-flight render. A
//!     rerender request either waits for nothing (slot free), is dropped
//!     (slot busy, not forced) or cancels the running generation and takes
//!     over once it has vacated (slot busy, forced).
//! -   **Scheduling:** [`PixelJobScheduler`] evaluates pixels on a worker pool
//!     in a random order, so an unfinished pass already shows the whole
//!     picture at low density.
//! -   **Partial renders:** [`publisher`] forwards in-progress rasters to the
//!     presentation layer at a throttled rate.
//! -   **Compositing:** [`Renderer::draw`] draws the last completed image,
//!     shifted by a pending pan and scaled to the screen, with the partial
//!     image on top.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use glam::{UVec2, Vec2};
//! use render::{sdf2, Bounds2, PixelJobScheduler, Renderer, RendererConfig, SceneState};
//!
//! let config = RendererConfig::default();
//! let scene = sdf2::Sdf2Scene::new(
//!     |p| sdf2::circle(p, Vec2::ZERO, 1.0),
//!     PixelJobScheduler::from_config(&config),
//! );
//! let state = SceneState::new(Bounds2::from_center(Vec2::ZERO, Vec2::splat(2.0)));
//! let renderer = Renderer::new(Arc::new(scene), state, config);
//! if let Some(render) = renderer.update(UVec2::new(640, 480)) {
//!     render.join()?;
//! }
//! ```

pub mod cancel;
pub mod compositor;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod frames;
pub mod publisher;
pub mod scene;
pub mod scheduler;
pub mod sdf2;
pub mod view;

pub use cancel::CancelToken;
pub use compositor::{Canvas, DrawTarget};
pub use config::RendererConfig;
pub use coordinator::{Callback, RenderHandle, Renderer};
pub use error::{RenderError, Result};
pub use frames::{DisplayImage, Frames};
pub use scene::{Bounds2, Dimensions, PartialRender, RenderArgs, Scene, SceneState};
pub use scheduler::{PixelJob, PixelJobScheduler, PixelResult};
pub use view::{Interaction, ViewState};
