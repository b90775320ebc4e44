use thiserror::Error;

/// Failures a render generation can end with.
///
/// None of these are fatal: the worst outcome is a stale or partially
/// updated display. They reach the caller only through completion callbacks
/// and [`crate::RenderHandle::join`], never through the rerender trigger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The generation was superseded by a newer one.
    #[error("render cancelled")]
    Cancelled,
    /// A finished raster could not be converted into a displayable image.
    #[error("failed to upload {width}x{height} image for display")]
    PresentationUpload { width: u32, height: u32 },
    /// The scene contract returned an error of its own.
    #[error("scene render failed: {0}")]
    SceneRender(String),
    /// A rerender was requested before the presentation layer ever ticked.
    #[error("rerender requested before the first update")]
    BeforeFirstRender,
}

impl RenderError {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RenderError::Cancelled)
    }
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;
