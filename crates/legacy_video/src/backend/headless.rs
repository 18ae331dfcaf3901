//! In-memory reference backend
//!
//! Implements the whole [`DisplayBackend`] contract over plain state:
//! a fake desktop, one fake window, and a heap framebuffer. Cloning a
//! `HeadlessBackend` clones a handle to the same state, so a test can
//! hand one clone to the session and keep the other to inspect
//! counters, inject events, or arm failure knobs.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use log::debug;

use super::{DisplayBackend, DisplayMode, WindowFlags, WindowFramebuffer, WindowPos, WindowRequest};
use crate::error::VideoError;
use crate::events::Event;
use crate::pixels::{calculate_gamma_ramp, calculate_pitch, PixelFormat};
use crate::surface::{Rect, Surface};

#[derive(Debug)]
struct Window {
    x: i32,
    y: i32,
    w: u32,
    h: u32,
    windowed_size: (u32, u32),
    flags: WindowFlags,
    title: String,
    framebuffer: Option<WindowFramebuffer>,
}

#[derive(Debug)]
struct Inner {
    desktop: (u32, u32),
    native_format: Rc<PixelFormat>,
    modes: Vec<(u32, u32)>,
    window: Option<Window>,
    windows_created: u32,
    deny_fullscreen: bool,
    fail_fullscreen_change: bool,
    fail_surface_fetch: bool,
    screensaver_enabled: bool,
    grab: bool,
    pointer: (i32, i32),
    gamma: ([u16; 256], [u16; 256], [u16; 256]),
    gl_context: bool,
    pending: VecDeque<Event>,
    last_presented: Vec<Rect>,
    present_count: u32,
}

/// Deterministic in-memory display backend.
#[derive(Debug, Clone)]
pub struct HeadlessBackend {
    inner: Rc<RefCell<Inner>>,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

impl HeadlessBackend {
    /// Backend with the given desktop size and a 32-bit native
    /// format.
    #[must_use]
    pub fn new(desktop_w: u32, desktop_h: u32) -> Self {
        let identity = calculate_gamma_ramp(1.0);
        Self {
            inner: Rc::new(RefCell::new(Inner {
                desktop: (desktop_w, desktop_h),
                native_format: PixelFormat::new(32),
                modes: vec![
                    (desktop_w, desktop_h),
                    (1280, 720),
                    (1024, 768),
                    (640, 480),
                ],
                window: None,
                windows_created: 0,
                deny_fullscreen: false,
                fail_fullscreen_change: false,
                fail_surface_fetch: false,
                screensaver_enabled: true,
                grab: false,
                pointer: (0, 0),
                gamma: (identity, identity, identity),
                gl_context: false,
                pending: VecDeque::new(),
                last_presented: Vec::new(),
                present_count: 0,
            })),
        }
    }

    /// Replace the native window pixel format.
    pub fn set_native_format(&self, format: Rc<PixelFormat>) {
        self.inner.borrow_mut().native_format = format;
    }

    /// Silently refuse fullscreen at window creation (granted flags
    /// will not include it).
    pub fn deny_fullscreen(&self, deny: bool) {
        self.inner.borrow_mut().deny_fullscreen = deny;
    }

    /// Make the next OS-level fullscreen change fail.
    pub fn fail_fullscreen_change(&self, fail: bool) {
        self.inner.borrow_mut().fail_fullscreen_change = fail;
    }

    /// Make window surface fetches fail.
    pub fn fail_surface_fetch(&self, fail: bool) {
        self.inner.borrow_mut().fail_surface_fetch = fail;
    }

    /// Queue an event for the next poll.
    pub fn push_event(&self, event: Event) {
        self.inner.borrow_mut().pending.push_back(event);
    }

    /// How many windows have been created over this backend's life.
    #[must_use]
    pub fn windows_created(&self) -> u32 {
        self.inner.borrow().windows_created
    }

    /// Rectangles handed to the most recent present call.
    #[must_use]
    pub fn last_presented(&self) -> Vec<Rect> {
        self.inner.borrow().last_presented.clone()
    }

    /// Total number of present calls.
    #[must_use]
    pub fn present_count(&self) -> u32 {
        self.inner.borrow().present_count
    }

    /// Whether the screensaver is currently allowed.
    #[must_use]
    pub fn screensaver_enabled(&self) -> bool {
        self.inner.borrow().screensaver_enabled
    }

    /// Current window title, if a window exists.
    #[must_use]
    pub fn window_title(&self) -> Option<String> {
        self.inner
            .borrow()
            .window
            .as_ref()
            .map(|w| w.title.clone())
    }

    /// Whether a GL context is live.
    #[must_use]
    pub fn gl_context_active(&self) -> bool {
        self.inner.borrow().gl_context
    }
}

impl Inner {
    fn resolve_pos(&self, pos: WindowPos, extent: u32, desktop_extent: u32) -> i32 {
        match pos {
            WindowPos::Undefined => 100,
            WindowPos::Centered => (desktop_extent.saturating_sub(extent) / 2) as i32,
            WindowPos::At(v) => v,
        }
    }
}

impl DisplayBackend for HeadlessBackend {
    fn ensure_initialized(&mut self) -> Result<(), VideoError> {
        Ok(())
    }

    fn driver_name(&self) -> String {
        "headless".to_string()
    }

    fn desktop_mode(&self, _display: usize) -> DisplayMode {
        let inner = self.inner.borrow();
        DisplayMode {
            w: inner.desktop.0,
            h: inner.desktop.1,
            format: inner.native_format.id(),
        }
    }

    fn display_modes(&self, _display: usize) -> Vec<DisplayMode> {
        let inner = self.inner.borrow();
        let format = inner.native_format.id();
        inner
            .modes
            .iter()
            .map(|&(w, h)| DisplayMode { w, h, format })
            .collect()
    }

    fn create_window(&mut self, request: &WindowRequest) -> Result<(), VideoError> {
        let mut inner = self.inner.borrow_mut();
        let mut flags = request.flags | WindowFlags::SHOWN | WindowFlags::INPUT_FOCUS;
        let (mut w, mut h) = (request.w, request.h);
        if flags.contains(WindowFlags::FULLSCREEN) {
            if inner.deny_fullscreen {
                debug!("fullscreen denied, creating windowed");
                flags.remove(WindowFlags::FULLSCREEN);
            } else {
                (w, h) = inner.desktop;
            }
        }
        let x = inner.resolve_pos(request.x, w, inner.desktop.0);
        let y = inner.resolve_pos(request.y, h, inner.desktop.1);
        inner.window = Some(Window {
            x,
            y,
            w,
            h,
            windowed_size: (request.w, request.h),
            flags,
            title: request.title.clone(),
            framebuffer: None,
        });
        inner.windows_created += 1;
        Ok(())
    }

    fn destroy_window(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.window = None;
        inner.gl_context = false;
    }

    fn has_window(&self) -> bool {
        self.inner.borrow().window.is_some()
    }

    fn window_flags(&self) -> WindowFlags {
        self.inner
            .borrow()
            .window
            .as_ref()
            .map_or(WindowFlags::empty(), |w| w.flags)
    }

    fn window_size(&self) -> (u32, u32) {
        self.inner
            .borrow()
            .window
            .as_ref()
            .map_or((0, 0), |w| (w.w, w.h))
    }

    fn set_window_size(&mut self, w: u32, h: u32) {
        let mut inner = self.inner.borrow_mut();
        if let Some(window) = inner.window.as_mut() {
            window.w = w;
            window.h = h;
            window.windowed_size = (w, h);
        }
    }

    fn window_position(&self) -> (i32, i32) {
        self.inner
            .borrow()
            .window
            .as_ref()
            .map_or((0, 0), |w| (w.x, w.y))
    }

    fn set_window_title(&mut self, title: &str) {
        let mut inner = self.inner.borrow_mut();
        if let Some(window) = inner.window.as_mut() {
            window.title = title.to_string();
        }
    }

    fn set_window_icon(&mut self, _icon: &Surface) {}

    fn minimize_window(&mut self) {
        let mut inner = self.inner.borrow_mut();
        if let Some(window) = inner.window.as_mut() {
            window.flags.insert(WindowFlags::MINIMIZED);
        }
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), VideoError> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_fullscreen_change {
            return Err(VideoError::Backend("fullscreen change refused".to_string()));
        }
        let desktop = inner.desktop;
        let Some(window) = inner.window.as_mut() else {
            return Err(VideoError::Backend("no window".to_string()));
        };
        if fullscreen {
            window.flags.insert(WindowFlags::FULLSCREEN);
            (window.w, window.h) = desktop;
        } else {
            window.flags.remove(WindowFlags::FULLSCREEN);
            (window.w, window.h) = window.windowed_size;
        }
        Ok(())
    }

    fn window_surface(&mut self) -> Result<WindowFramebuffer, VideoError> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_surface_fetch {
            return Err(VideoError::Backend("surface fetch failed".to_string()));
        }
        let format = Rc::clone(&inner.native_format);
        let Some(window) = inner.window.as_mut() else {
            return Err(VideoError::Backend("no window".to_string()));
        };
        let (w, h) = (window.w, window.h);
        let pitch = calculate_pitch(w, format.bits_per_pixel());
        let stale = window
            .framebuffer
            .as_ref()
            .map_or(true, |fb| fb.w != w || fb.h != h);
        if stale {
            window.framebuffer = Some(WindowFramebuffer {
                buffer: Rc::new(RefCell::new(vec![0; h as usize * pitch])),
                format: Rc::clone(&format),
                w,
                h,
                pitch,
            });
        }
        window
            .framebuffer
            .clone()
            .ok_or_else(|| VideoError::Backend("surface allocation failed".to_string()))
    }

    fn present_rects(&mut self, rects: &[Rect]) -> Result<(), VideoError> {
        let mut inner = self.inner.borrow_mut();
        if inner.window.is_none() {
            return Err(VideoError::Backend("no window".to_string()));
        }
        inner.last_presented = rects.to_vec();
        inner.present_count += 1;
        Ok(())
    }

    fn create_gl_context(&mut self) -> Result<(), VideoError> {
        let mut inner = self.inner.borrow_mut();
        if inner.window.is_none() {
            return Err(VideoError::Backend("no window".to_string()));
        }
        inner.gl_context = true;
        Ok(())
    }

    fn make_gl_current(&mut self) -> Result<(), VideoError> {
        let inner = self.inner.borrow();
        if inner.gl_context {
            Ok(())
        } else {
            Err(VideoError::Backend("no current context".to_string()))
        }
    }

    fn delete_gl_context(&mut self) {
        self.inner.borrow_mut().gl_context = false;
    }

    fn swap_gl_window(&mut self) {}

    fn set_screensaver_enabled(&mut self, enabled: bool) {
        self.inner.borrow_mut().screensaver_enabled = enabled;
    }

    fn set_grab(&mut self, grab: bool) {
        self.inner.borrow_mut().grab = grab;
    }

    fn grab(&self) -> bool {
        self.inner.borrow().grab
    }

    fn warp_pointer(&mut self, x: i32, y: i32) {
        self.inner.borrow_mut().pointer = (x, y);
    }

    fn pointer_position(&self) -> (i32, i32) {
        self.inner.borrow().pointer
    }

    fn set_gamma_ramp(
        &mut self,
        red: &[u16; 256],
        green: &[u16; 256],
        blue: &[u16; 256],
    ) -> Result<(), VideoError> {
        self.inner.borrow_mut().gamma = (*red, *green, *blue);
        Ok(())
    }

    fn gamma_ramp(&self) -> Result<([u16; 256], [u16; 256], [u16; 256]), VideoError> {
        Ok(self.inner.borrow().gamma)
    }

    fn poll_events(&mut self) -> Vec<Event> {
        self.inner.borrow_mut().pending.drain(..).collect()
    }
}
