//! Live scene/camera state guarded by the renderer's state lock.

use glam::{IVec2, UVec2, Vec2};

use crate::cancel::CancelToken;
use crate::scene::{Bounds2, Dimensions, SceneState};

/// Pointer state handed over by the input layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Interaction {
    /// Current pointer position in screen pixels.
    pub pointer: IVec2,
    /// Where the running pan started, if any.
    pub pan_start: Option<IVec2>,
    /// Where the pan was released; set until the rerender it triggered lands.
    pub pan_stop: Option<IVec2>,
}

impl Interaction {
    #[must_use]
    pub fn is_panning(&self) -> bool {
        self.pan_start.is_some()
    }

    /// Screen-space drag since the pan started.
    #[must_use]
    pub fn pan_delta(&self) -> Option<Vec2> {
        let start = self.pan_start?;
        let cursor = self.pan_stop.unwrap_or(self.pointer);
        Some((cursor - start).as_vec2())
    }
}

/// Everything behind the state lock.
#[derive(Debug)]
pub struct ViewState {
    pub scene: SceneState,
    pub interaction: Interaction,
    pub screen_size: UVec2,
    pub smooth_camera: bool,
    pub(crate) render_cancel: CancelToken,
    // Only updated when a generation completes.
    pub(crate) dimensions: Option<Dimensions>,
    pub(crate) cached_bounds: Option<Bounds2>,
}

impl ViewState {
    #[must_use]
    pub fn new(scene: SceneState, smooth_camera: bool) -> Self {
        Self {
            scene,
            interaction: Interaction::default(),
            screen_size: UVec2::ZERO,
            smooth_camera,
            render_cancel: CancelToken::new(),
            dimensions: None,
            cached_bounds: None,
        }
    }

    #[must_use]
    pub fn render_size(&self) -> UVec2 {
        self.scene.render_size(self.screen_size)
    }

    /// State a new generation renders.
    ///
    /// With camera smoothing the pending pan is already applied, so a 2D view
    /// follows the pointer while the drag is still in progress.
    #[must_use]
    pub fn snapshot(&self) -> SceneState {
        if self.smooth_camera
            && self.interaction.pan_stop.is_none()
            && self.dimensions == Some(Dimensions::Two)
        {
            if let Some(delta) = self.interaction.pan_delta() {
                return self.scene.panned(delta, self.screen_size);
            }
        }
        self.scene.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> ViewState {
        let mut view = ViewState::new(
            SceneState::new(Bounds2::new(Vec2::ZERO, Vec2::new(10.0, 10.0))),
            true,
        );
        view.screen_size = UVec2::new(10, 10);
        view
    }

    #[test]
    fn pan_delta_prefers_stop_anchor() {
        let mut interaction = Interaction {
            pointer: IVec2::new(7, 7),
            pan_start: Some(IVec2::new(2, 3)),
            pan_stop: None,
        };
        assert_eq!(interaction.pan_delta(), Some(Vec2::new(5.0, 4.0)));
        interaction.pan_stop = Some(IVec2::new(3, 3));
        assert_eq!(interaction.pan_delta(), Some(Vec2::new(1.0, 0.0)));
        assert_eq!(Interaction::default().pan_delta(), None);
    }

    #[test]
    fn smooth_snapshot_applies_pending_pan_for_2d_scenes() {
        let mut view = view();
        view.interaction.pan_start = Some(IVec2::ZERO);
        view.interaction.pointer = IVec2::new(2, 0);
        assert_eq!(view.snapshot(), view.scene, "dimensions unknown before first render");

        view.dimensions = Some(Dimensions::Two);
        assert_eq!(view.snapshot().bounds.min, Vec2::new(-2.0, 0.0));

        view.interaction.pan_stop = Some(IVec2::new(2, 0));
        assert_eq!(view.snapshot(), view.scene);
    }

    #[test]
    fn snapshot_without_smoothing_is_a_copy() {
        let mut view = view();
        view.smooth_camera = false;
        view.dimensions = Some(Dimensions::Two);
        view.interaction.pan_start = Some(IVec2::ZERO);
        view.interaction.pointer = IVec2::new(4, 4);
        assert_eq!(view.snapshot(), view.scene);
    }
}
