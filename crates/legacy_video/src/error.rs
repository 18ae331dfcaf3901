//! Error taxonomy for the compatibility layer
//!
//! Failures are reported synchronously through `Result`; nothing is
//! retried. [`VideoError::SurfaceLost`] marks the one documented
//! unrecoverable state (the window surface vanishing mid fullscreen
//! toggle).

/// Errors surfaced by the video session and its backend.
#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    /// An operation that requires a video mode was called before one
    /// was set.
    #[error("no video mode has been set")]
    NoModeSet,

    /// Legacy API surface with no modern equivalent.
    #[error("{0} are not implemented in this compatibility layer")]
    Unsupported(&'static str),

    /// Palette operation on a surface whose format has no palette.
    #[error("surface format has no palette")]
    NoPalette,

    /// The windowing backend failed an operation.
    #[error("window system error: {0}")]
    Backend(String),

    /// The window surface could not be refetched after a mode switch;
    /// the session cannot be repaired by the caller.
    #[error("window surface lost after mode switch; display state is unrecoverable")]
    SurfaceLost,
}
