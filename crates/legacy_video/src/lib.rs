//! # Legacy Video
//!
//! A compatibility layer reconstructing the classic single-window
//! video surface model on top of a modern windowing backend.
//!
//! ## Features
//!
//! - **Video Modes**: One logical mode with fail-hard set/resize semantics
//! - **Shadow Surfaces**: Transparent depth conversion behind the screen
//! - **Viewport Centering**: Logical surfaces centered in larger windows
//! - **Event Translation**: Modern window/input events reshaped into classic ones
//! - **Palettes**: Indexed formats with generation-counted blit map caching
//! - **Headless Backend**: Deterministic in-process backend for tests
//!
//! ## Quick Start
//!
//! ```rust
//! use legacy_video::{HeadlessBackend, SurfaceFlags, VideoSession};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = HeadlessBackend::new(1920, 1080);
//!     let mut session = VideoSession::new(Box::new(backend));
//!     let screen = session.set_video_mode(640, 480, 32, SurfaceFlags::empty())?;
//!     let id = screen.id();
//!     session.flip(id)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod foundation;
pub mod pixels;
pub mod surface;
pub mod video;

pub use backend::{
    DisplayBackend, DisplayMode, HeadlessBackend, WindowFlags, WindowFramebuffer, WindowPos,
    WindowRequest,
};
pub use config::{PositionOverride, VideoConfig};
pub use error::VideoError;
pub use events::{
    AppState, CompatEvent, CompatEventKind, Event, KeyMods, WindowEvent, BUTTON_WHEEL_DOWN,
    BUTTON_WHEEL_UP,
};
pub use pixels::{Color, FormatId, Palette, PixelFormat};
pub use surface::{blit, Rect, Surface, SurfaceFlags, SurfaceId};
pub use video::{ModeList, Overlay, VideoInfo, VideoSession};
