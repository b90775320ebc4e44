#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::cast_possible_wrap, clippy::cast_precision_loss)]
//! # Headless renderer driver
//!
//! Drives a [`render::Renderer`] through the same calls an interactive front
//! end makes: a first presentation tick, a pan that is previewed and then
//! rerendered, and a resolution change that supersedes a render in flight.
//! The final composited frame is written to a PNG file.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use glam::{IVec2, UVec2, Vec2};
use render::sdf2::{self, Sdf2Scene};
use render::{Bounds2, Canvas, PixelJobScheduler, Renderer, RendererConfig, SceneState};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Renders a 2D distance field scene without a window")]
struct Args {
    /// Screen width in pixels.
    #[arg(long, default_value_t = 320)]
    width: u32,
    /// Screen height in pixels.
    #[arg(long, default_value_t = 240)]
    height: u32,
    /// Resolution divisor of the final render.
    #[arg(long, default_value_t = 1)]
    res_inv: u32,
    /// Minimum interval between partial render uploads, in milliseconds.
    #[arg(long, default_value_t = 250)]
    partial_ms: u64,
    /// Worker threads evaluating pixels. Defaults to the available cores.
    #[arg(long)]
    workers: Option<usize>,
    /// Rerender continuously while panning instead of previewing the drag.
    #[arg(long)]
    smooth_camera: bool,
    /// Where the composited frame is written.
    #[arg(long, default_value = "render.png")]
    output: PathBuf,
}

impl Args {
    fn config(&self) -> RendererConfig {
        let config = RendererConfig::default()
            .with_partial_render_every(Duration::from_millis(self.partial_ms))
            .with_smooth_camera(self.smooth_camera);
        match self.workers {
            Some(workers) => config.with_workers(workers),
            None => config,
        }
    }
}

fn scene_sdf(p: Vec2) -> f32 {
    let disc = sdf2::circle(p, Vec2::new(-0.6, 0.0), 0.5);
    let slab = sdf2::rounded_box(p, Vec2::new(0.5, 0.1), Vec2::new(0.6, 0.35), 0.1);
    disc.min(slab)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = args.config();
    let screen = UVec2::new(args.width, args.height);
    tracing::info!(?screen, workers = config.workers, "starting headless render");

    let scene = Sdf2Scene::new(scene_sdf, PixelJobScheduler::from_config(&config));
    let aspect = args.width as f32 / args.height.max(1) as f32;
    let state = SceneState::new(Bounds2::from_center(Vec2::ZERO, Vec2::new(1.5 * aspect, 1.5)))
        .with_res_inv(args.res_inv.saturating_mul(4));
    let renderer = Renderer::new(Arc::new(scene), state, config);

    if let Some(first) = renderer.update(screen) {
        first.join().context("first render failed")?;
    }

    let anchor = (screen / 2).as_ivec2();
    renderer.begin_pan(anchor);
    let drag = anchor + IVec2::new(screen.x as i32 / 8, 0);
    if let Some(follow) = renderer.set_pointer(drag) {
        follow.join().context("render following the pointer failed")?;
    }
    let mut preview = Canvas::new(screen);
    renderer.draw(&mut preview);
    let uncovered = preview.image().pixels().filter(|p| p[3] == 0).count();
    tracing::info!(uncovered, "pan previewed");
    if let Some(pan) = renderer.end_pan(drag) {
        pan.join().context("render after pan failed")?;
    }
    tracing::info!(bounds = ?renderer.cached_bounds(), "pan rendered");

    // Two quick resolution changes: whichever generation takes the slot
    // second supersedes the other.
    let coarse = renderer.set_res_inv(args.res_inv.saturating_mul(2));
    let full = renderer.set_res_inv(args.res_inv);
    let mut completed = 0;
    for (label, render) in [("coarse", coarse), ("full", full)] {
        match render.join() {
            Ok(()) => completed += 1,
            Err(err) if err.is_cancelled() => tracing::info!(render = label, "render superseded"),
            Err(err) => return Err(err).with_context(|| format!("{label} render failed")),
        }
    }
    anyhow::ensure!(completed > 0, "every resolution change was superseded");

    let mut canvas = Canvas::new(screen);
    renderer.draw(&mut canvas);
    canvas
        .into_image()
        .save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    tracing::info!(output = %args.output.display(), "frame written");
    Ok(())
}
