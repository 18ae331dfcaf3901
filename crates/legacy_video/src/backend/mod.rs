//! Backend-agnostic display trait
//!
//! This is the seam between the compatibility layer and whatever
//! window system actually puts pixels on glass. The session only ever
//! holds a `Box<dyn DisplayBackend>`, so tests (and anything else
//! that wants deterministic behavior) can substitute the in-memory
//! [`headless::HeadlessBackend`].
//!
//! All operations happen on the calling thread; implementations are
//! not required to be `Send`.

use std::cell::RefCell;
use std::rc::Rc;

use bitflags::bitflags;

use crate::error::VideoError;
use crate::events::Event;
use crate::pixels::{FormatId, PixelFormat};
use crate::surface::{Rect, Surface};

pub mod headless;

pub use headless::HeadlessBackend;

bitflags! {
    /// Window state flags in the modern vocabulary.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WindowFlags: u32 {
        /// Window is visible.
        const SHOWN       = 1 << 0;
        /// Window covers its display.
        const FULLSCREEN  = 1 << 1;
        /// Window carries a GL-capable surface.
        const OPENGL      = 1 << 2;
        /// Window may be resized by the user.
        const RESIZABLE   = 1 << 3;
        /// Window has no decorations.
        const BORDERLESS  = 1 << 4;
        /// Window is minimized.
        const MINIMIZED   = 1 << 5;
        /// Window has keyboard focus.
        const INPUT_FOCUS = 1 << 6;
        /// Pointer is inside the window.
        const MOUSE_FOCUS = 1 << 7;
    }
}

/// Requested placement of one window axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowPos {
    /// Let the window system choose.
    #[default]
    Undefined,
    /// Center on the display.
    Centered,
    /// Exact coordinate.
    At(i32),
}

/// Everything needed to create the window.
#[derive(Debug, Clone)]
pub struct WindowRequest {
    /// Title bar text.
    pub title: String,
    /// Horizontal placement.
    pub x: WindowPos,
    /// Vertical placement.
    pub y: WindowPos,
    /// Client area width.
    pub w: u32,
    /// Client area height.
    pub h: u32,
    /// Requested window flags; the backend reports what it actually
    /// granted through [`DisplayBackend::window_flags`].
    pub flags: WindowFlags,
}

/// A display mode as reported by the window system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayMode {
    /// Width in pixels.
    pub w: u32,
    /// Height in pixels.
    pub h: u32,
    /// Native pixel format identity.
    pub format: FormatId,
}

/// The window's native pixel buffer, fetched (and refetched) from the
/// backend.
///
/// The buffer is a shared handle: the video surface aliases it at a
/// byte offset rather than copying it.
#[derive(Debug, Clone)]
pub struct WindowFramebuffer {
    /// Shared pixel storage, `h * pitch` bytes.
    pub buffer: Rc<RefCell<Vec<u8>>>,
    /// The window's native format, shared with aliasing surfaces.
    pub format: Rc<PixelFormat>,
    /// Width in pixels.
    pub w: u32,
    /// Height in pixels.
    pub h: u32,
    /// Row stride in bytes.
    pub pitch: usize,
}

/// Window-system primitives the compatibility layer consumes.
///
/// One logical window at a time; the session never asks for a second.
pub trait DisplayBackend {
    /// Bring the display subsystem up if it is not already. Called at
    /// the top of every mode set; failure is fatal to that call.
    fn ensure_initialized(&mut self) -> Result<(), VideoError>;

    /// Name of the underlying video driver.
    fn driver_name(&self) -> String;

    /// The desktop's current mode on `display`.
    fn desktop_mode(&self, display: usize) -> DisplayMode;

    /// All modes available on `display`, best first.
    fn display_modes(&self, display: usize) -> Vec<DisplayMode>;

    /// Create the window, destroying nothing (the caller tears down
    /// first).
    fn create_window(&mut self, request: &WindowRequest) -> Result<(), VideoError>;

    /// Destroy the window and everything hanging off it.
    fn destroy_window(&mut self);

    /// Whether a window currently exists.
    fn has_window(&self) -> bool;

    /// Flags the window system actually granted.
    fn window_flags(&self) -> WindowFlags;

    /// Current client area size.
    fn window_size(&self) -> (u32, u32);

    /// Resize the client area in place.
    fn set_window_size(&mut self, w: u32, h: u32);

    /// Current window position on screen.
    fn window_position(&self) -> (i32, i32);

    /// Update the title bar text.
    fn set_window_title(&mut self, title: &str);

    /// Set the window icon.
    fn set_window_icon(&mut self, icon: &Surface);

    /// Minimize the window.
    fn minimize_window(&mut self);

    /// Switch the window into or out of fullscreen at the OS level.
    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), VideoError>;

    /// Fetch the window's native surface. May reallocate after a size
    /// or mode change; callers must not cache the result across
    /// window mutations.
    fn window_surface(&mut self) -> Result<WindowFramebuffer, VideoError>;

    /// Push the given framebuffer rectangles to the screen.
    fn present_rects(&mut self, rects: &[Rect]) -> Result<(), VideoError>;

    /// Create a rendering context for the window.
    fn create_gl_context(&mut self) -> Result<(), VideoError>;

    /// Make the window's rendering context current.
    fn make_gl_current(&mut self) -> Result<(), VideoError>;

    /// Destroy the rendering context, if any.
    fn delete_gl_context(&mut self);

    /// Swap the GL back buffer to the window.
    fn swap_gl_window(&mut self);

    /// Allow or suppress the system screensaver.
    fn set_screensaver_enabled(&mut self, enabled: bool);

    /// Confine input to the window (or release it).
    fn set_grab(&mut self, grab: bool);

    /// Whether input is currently grabbed.
    fn grab(&self) -> bool;

    /// Move the pointer to window coordinates.
    fn warp_pointer(&mut self, x: i32, y: i32);

    /// Current pointer position in window coordinates.
    fn pointer_position(&self) -> (i32, i32);

    /// Install a gamma translation ramp per channel.
    fn set_gamma_ramp(
        &mut self,
        red: &[u16; 256],
        green: &[u16; 256],
        blue: &[u16; 256],
    ) -> Result<(), VideoError>;

    /// The currently installed gamma ramps.
    #[allow(clippy::type_complexity)]
    fn gamma_ramp(&self) -> Result<([u16; 256], [u16; 256], [u16; 256]), VideoError>;

    /// Drain pending input/window events.
    fn poll_events(&mut self) -> Vec<Event>;
}
