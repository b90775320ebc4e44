//! Render generations: at most one in flight, newer ones supersede older ones.
//!
//! Two locks guard the shared data: the state lock ([`ViewState`]) and the
//! cached image lock ([`Frames`]). Whenever both are held at once, the state
//! lock is taken first. The presentation thread follows the same order in
//! [`Renderer::draw`](crate::Renderer::draw), which is what keeps the pair
//! deadlock free. A third, binary lock is the rendering slot: whoever holds it
//! is the active generation.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use glam::{IVec2, UVec2};
use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::{debug, error, info, warn};

use crate::cancel::CancelToken;
use crate::config::RendererConfig;
use crate::error::{RenderError, Result};
use crate::frames::{DisplayImage, Frames};
use crate::publisher;
use crate::scene::{Bounds2, Dimensions, RenderArgs, Scene, SceneState};
use crate::view::{Interaction, ViewState};

/// Invoked once a generation ends, whatever the outcome.
pub type Callback = Box<dyn FnOnce(&Result<()>) + Send>;

/// Interactive renderer of an implicit surface scene.
///
/// Cloning yields another handle to the same renderer.
#[derive(Clone)]
pub struct Renderer {
    pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
    config: RendererConfig,
    scene: RwLock<Arc<dyn Scene>>,
    pub(crate) state: RwLock<ViewState>,
    pub(crate) frames: RwLock<Frames>,
    rendering: Mutex<()>,
}

/// Background thread of one rerender request.
#[must_use = "dropping the handle detaches the render thread"]
pub struct RenderHandle {
    thread: JoinHandle<Result<()>>,
}

impl RenderHandle {
    /// Waits for the generation and returns its outcome.
    ///
    /// # Errors
    ///
    /// The same outcome the completion callbacks saw, or
    /// [`RenderError::SceneRender`] if the render thread panicked.
    pub fn join(self) -> Result<()> {
        self.thread
            .join()
            .unwrap_or_else(|_| Err(RenderError::SceneRender("render thread panicked".into())))
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}

impl Renderer {
    #[must_use]
    pub fn new(scene: Arc<dyn Scene>, state: SceneState, config: RendererConfig) -> Self {
        let view = ViewState::new(state, config.smooth_camera);
        Self {
            inner: Arc::new(Inner {
                config,
                scene: RwLock::new(scene),
                state: RwLock::new(view),
                frames: RwLock::new(Frames::new()),
                rendering: Mutex::new(()),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RendererConfig {
        &self.inner.config
    }

    /// Discards any running generation and starts a new one in the background.
    pub fn rerender(&self, callbacks: Vec<Callback>) -> RenderHandle {
        self.rerender_opt(true, callbacks)
    }

    /// Starts a new generation in the background.
    ///
    /// If another generation holds the rendering slot, the request is
    /// dropped unless `force_cancel` is set, in which case the running
    /// generation is cancelled and the new one starts once it has vacated.
    ///
    /// Calling this before the first [`Renderer::update`] logs
    /// [`RenderError::BeforeFirstRender`] but still renders; the completed
    /// generation installs the first image.
    pub fn rerender_opt(&self, force_cancel: bool, callbacks: Vec<Callback>) -> RenderHandle {
        if self.inner.frames.read().completed.is_none() {
            warn!("{}", RenderError::BeforeFirstRender);
        }
        let inner = Arc::clone(&self.inner);
        let thread = thread::spawn(move || {
            let outcome = inner.run_generation(force_cancel);
            for callback in callbacks {
                callback(&outcome);
            }
            outcome
        });
        RenderHandle { thread }
    }

    /// Presentation tick.
    ///
    /// The first call installs a transparent placeholder image; any change
    /// of the screen size triggers a forced rerender.
    pub fn update(&self, screen_size: UVec2) -> Option<RenderHandle> {
        {
            let mut state = self.inner.state.write();
            let mut frames = self.inner.frames.write();
            if state.screen_size == screen_size && frames.completed.is_some() {
                return None;
            }
            state.screen_size = screen_size;
            if frames.completed.is_none() {
                frames.completed = Some(DisplayImage::transparent(state.render_size()));
            }
        }
        Some(self.rerender(Vec::new()))
    }

    pub fn set_screen_size(&self, screen_size: UVec2) {
        self.inner.state.write().screen_size = screen_size;
    }

    /// Changes the resolution factor and rerenders.
    pub fn set_res_inv(&self, res_inv: u32) -> RenderHandle {
        self.inner.state.write().scene.res_inv = res_inv.max(1);
        self.rerender(Vec::new())
    }

    pub fn set_smooth_camera(&self, smooth_camera: bool) {
        self.inner.state.write().smooth_camera = smooth_camera;
    }

    /// Replaces the scene. Takes effect with the next generation.
    pub fn set_scene(&self, scene: Arc<dyn Scene>) {
        *self.inner.scene.write() = scene;
    }

    pub fn set_scene_state(&self, scene_state: SceneState) {
        self.inner.state.write().scene = scene_state;
    }

    #[must_use]
    pub fn scene_state(&self) -> SceneState {
        self.inner.state.read().scene.clone()
    }

    #[must_use]
    pub fn interaction(&self) -> Interaction {
        self.inner.state.read().interaction
    }

    pub fn begin_pan(&self, anchor: IVec2) {
        let mut state = self.inner.state.write();
        state.interaction = Interaction {
            pointer: anchor,
            pan_start: Some(anchor),
            pan_stop: None,
        };
    }

    /// Records the pointer position. With camera smoothing a running pan
    /// rerenders right away.
    pub fn set_pointer(&self, pointer: IVec2) -> Option<RenderHandle> {
        let follow = {
            let mut state = self.inner.state.write();
            state.interaction.pointer = pointer;
            state.smooth_camera && state.interaction.is_panning() && state.interaction.pan_stop.is_none()
        };
        follow.then(|| self.rerender(Vec::new()))
    }

    /// Finishes a pan: moves the view and rerenders it.
    ///
    /// The compositor keeps previewing the drag until a generation that
    /// rendered the moved view completes, which then clears the pan anchors.
    /// That need not be the generation started here.
    pub fn end_pan(&self, stop: IVec2) -> Option<RenderHandle> {
        {
            let mut state = self.inner.state.write();
            if !state.interaction.is_panning() {
                return None;
            }
            state.interaction.pointer = stop;
            state.interaction.pan_stop = Some(stop);
            let delta = state.interaction.pan_delta()?;
            if state.dimensions != Some(Dimensions::Three) {
                state.scene = state.scene.panned(delta, state.screen_size);
            }
        }
        Some(self.rerender(Vec::new()))
    }

    #[must_use]
    pub fn completed_image(&self) -> Option<DisplayImage> {
        self.inner.frames.read().completed.clone()
    }

    #[must_use]
    pub fn partial_image(&self) -> DisplayImage {
        self.inner.frames.read().partial.clone()
    }

    /// View bounds of the last completed 2D render.
    #[must_use]
    pub fn cached_bounds(&self) -> Option<Bounds2> {
        self.inner.state.read().cached_bounds
    }

    #[must_use]
    pub fn cached_dimensions(&self) -> Option<Dimensions> {
        self.inner.state.read().dimensions
    }
}

impl Inner {
    /// Claims the rendering slot.
    ///
    /// The slot is probed and the new token installed under one state lock
    /// section, so a forced request that finds the slot busy always cancels
    /// the generation that holds it or is waiting for it.
    fn claim_slot(&self, force_cancel: bool) -> Option<(MutexGuard<'_, ()>, CancelToken)> {
        let cancel = CancelToken::new();
        {
            let mut state = self.state.write();
            if let Some(slot) = self.rendering.try_lock() {
                // Supersedes a forced request still waiting for the slot.
                state.render_cancel.cancel();
                state.render_cancel = cancel.clone();
                return Some((slot, cancel));
            }
            if !force_cancel {
                debug!("render already in progress, request dropped");
                return None;
            }
            state.render_cancel.cancel();
            state.render_cancel = cancel.clone();
        }
        debug!("cancelled running render, waiting for it to vacate");
        Some((self.rendering.lock(), cancel))
    }

    fn run_generation(&self, force_cancel: bool) -> Result<()> {
        let Some((_slot, cancel)) = self.claim_slot(force_cancel) else {
            return Ok(());
        };
        if cancel.is_cancelled() {
            debug!("render superseded before it started");
            return Err(RenderError::Cancelled);
        }

        let (snapshot, ended_pan, render_size) = {
            let state = self.state.read();
            let render_size = state.render_size();
            let snapshot = state.snapshot();
            // Set once `end_pan` has moved the view, so this snapshot shows the pan.
            let ended_pan = state.interaction.pan_stop.map(|_| state.interaction);
            let mut frames = self.frames.write();
            if !frames.prepare_full(render_size) {
                debug!(width = render_size.x, height = render_size.y, "allocated full render buffer");
            }
            (snapshot, ended_pan, render_size)
        };
        let scene = Arc::clone(&self.scene.read());

        let started = Instant::now();
        let (partial_renders, partial_queue) = crossbeam_channel::bounded(0);
        let rendered = thread::scope(|scope| {
            scope.spawn(|| {
                publisher::publish_partials(
                    &self.frames,
                    partial_queue,
                    render_size,
                    self.config.partial_render_every,
                )
            });
            scene.render(RenderArgs {
                cancel,
                state: snapshot.clone(),
                state_lock: &self.state,
                frames: &self.frames,
                partial_renders: Some(partial_renders),
            })
        });
        if let Err(err) = rendered {
            if err.is_cancelled() {
                debug!("render superseded");
            } else {
                error!("error rendering: {err}");
            }
            return Err(err);
        }

        let upload_started = Instant::now();
        let uploaded = DisplayImage::upload(&self.frames.read().full);
        let image = match uploaded {
            Ok(image) => image,
            Err(err) => {
                error!("error sending render to display: {err}");
                return Err(err);
            }
        };
        info!(
            cpu = ?upload_started.duration_since(started),
            upload = ?upload_started.elapsed(),
            width = render_size.x,
            height = render_size.y,
            "render finished"
        );

        let dimensions = scene.dimensions();
        {
            let mut state = self.state.write();
            state.dimensions = Some(dimensions);
            state.cached_bounds = (dimensions == Dimensions::Two).then_some(snapshot.bounds);
            if let Some(pan) = ended_pan {
                let current = state.interaction;
                if current.pan_start == pan.pan_start && current.pan_stop == pan.pan_stop {
                    state.interaction.pan_start = None;
                    state.interaction.pan_stop = None;
                }
            }
            // Installed in the same state lock section as the anchor reset.
            self.frames.write().completed = Some(image);
        }
        Ok(())
    }
}
