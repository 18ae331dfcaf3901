//! The window/surface reconciliation session
//!
//! [`VideoSession`] owns the mapping between one process-wide logical
//! video mode and the backend's concrete window and framebuffer. It
//! maintains up to two surfaces: the video surface, a view aliasing
//! the window framebuffer at the centering viewport offset, and an
//! optional shadow surface in the application's requested depth that
//! is convert-blitted into the video surface on every present. The
//! public screen is the shadow surface when one exists, else the
//! video surface.
//!
//! Mode changes first try an in-place resize; only when that cannot
//! work is the window torn down and recreated (preserving its screen
//! position). Several failure paths intentionally keep the legacy
//! fail-hard contract; see [`VideoError::SurfaceLost`].

use std::rc::Rc;

use log::{debug, info, warn};

use crate::backend::{DisplayBackend, WindowFlags, WindowFramebuffer, WindowPos, WindowRequest};
use crate::config::{PositionOverride, VideoConfig};
use crate::error::VideoError;
use crate::events::{
    translate, AppState, CompatEvent, EventQueue, TranslateContext,
};
use crate::pixels::{calculate_gamma_ramp, dither_colors, Color, FormatId};
use crate::surface::{blit, Rect, Surface, SurfaceFlags, SurfaceId};

/// Desktop properties reported to legacy mode queries.
#[derive(Debug, Clone, Copy)]
pub struct VideoInfo {
    /// Desktop width in pixels.
    pub current_w: u32,
    /// Desktop height in pixels.
    pub current_h: u32,
    /// Desktop pixel format.
    pub format: FormatId,
}

/// Result of a fullscreen mode enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeList {
    /// Windowed modes are not restricted; any size works.
    Unrestricted,
    /// The sizes available at the queried depth, best first.
    Modes(Vec<(u32, u32)>),
}

/// Legacy video overlays cannot be constructed; the type exists so
/// the failing constructor has an honest return type.
#[derive(Debug)]
pub enum Overlay {}

/// The session object replacing the legacy layer's module-level
/// globals: one window, one logical mode, one event queue.
pub struct VideoSession {
    backend: Box<dyn DisplayBackend>,
    config: VideoConfig,
    window_fb: Option<WindowFramebuffer>,
    video: Option<Surface>,
    shadow: Option<Surface>,
    viewport: Rect,
    mode_flags: SurfaceFlags,
    gl_context: bool,
    caption: Option<String>,
    icon: Option<Surface>,
    queue: EventQueue,
    filter_installed: bool,
}

impl VideoSession {
    /// Session over a backend with default configuration.
    #[must_use]
    pub fn new(backend: Box<dyn DisplayBackend>) -> Self {
        Self::with_config(backend, VideoConfig::default())
    }

    /// Session over a backend with explicit configuration.
    #[must_use]
    pub fn with_config(backend: Box<dyn DisplayBackend>, config: VideoConfig) -> Self {
        Self {
            backend,
            config,
            window_fb: None,
            video: None,
            shadow: None,
            viewport: Rect::default(),
            mode_flags: SurfaceFlags::empty(),
            gl_context: false,
            caption: None,
            icon: None,
            queue: EventQueue::new(),
            filter_installed: false,
        }
    }

    /// The surface the application should draw to, if a mode is set.
    #[must_use]
    pub fn screen(&self) -> Option<&Surface> {
        self.shadow.as_ref().or(self.video.as_ref())
    }

    /// Mutable access to the public screen surface.
    pub fn screen_mut(&mut self) -> Option<&mut Surface> {
        self.shadow.as_mut().or(self.video.as_mut())
    }

    /// Identity of the public screen surface.
    #[must_use]
    pub fn screen_id(&self) -> Option<SurfaceId> {
        self.screen().map(Surface::id)
    }

    /// Active centering viewport.
    #[must_use]
    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    fn public_mut(&mut self) -> Result<&mut Surface, VideoError> {
        match self.shadow.as_mut() {
            Some(shadow) => Ok(shadow),
            None => self.video.as_mut().ok_or(VideoError::NoModeSet),
        }
    }

    /// Set the logical video mode, reusing the existing window when
    /// an in-place resize can satisfy the request.
    ///
    /// Zero width, height, or depth resolve to the desktop's current
    /// values. The returned surface's flags reflect what the window
    /// system actually granted, not what was requested.
    pub fn set_video_mode(
        &mut self,
        width: u32,
        height: u32,
        bpp: u8,
        flags: SurfaceFlags,
    ) -> Result<&mut Surface, VideoError> {
        self.backend.ensure_initialized()?;

        let display = self.config.display_index();
        let desktop = self.backend.desktop_mode(display);
        let width = if width == 0 { desktop.w } else { width };
        let height = if height == 0 { desktop.h } else { height };
        let bpp = if bpp == 0 {
            desktop.format.bits_per_pixel()
        } else {
            bpp
        };

        // See if we can simply resize the existing window and surface.
        if self.resize_in_place(width, height, bpp, flags) {
            info!("mode {width}x{height}x{bpp} satisfied by in-place resize");
            return self.public_mut();
        }

        // Tear down everything the session owns, keeping the window's
        // screen position for the replacement.
        self.shadow = None;
        self.video = None;
        self.window_fb = None;
        if self.gl_context {
            self.backend.delete_gl_context();
            self.gl_context = false;
        }
        let mut preserved = None;
        if self.backend.has_window() {
            preserved = Some(self.backend.window_position());
            self.backend.destroy_window();
        }

        self.install_filter();

        let mut window_flags = WindowFlags::SHOWN;
        if flags.contains(SurfaceFlags::FULLSCREEN) {
            window_flags |= WindowFlags::FULLSCREEN;
        }
        if flags.contains(SurfaceFlags::OPENGL) {
            window_flags |= WindowFlags::OPENGL;
        }
        if flags.contains(SurfaceFlags::RESIZABLE) {
            window_flags |= WindowFlags::RESIZABLE;
        }
        if flags.contains(SurfaceFlags::NOFRAME) {
            window_flags |= WindowFlags::BORDERLESS;
        }

        let (x, y) = match self.config.position_override() {
            Some(PositionOverride::Centered) => (WindowPos::Centered, WindowPos::Centered),
            Some(PositionOverride::At(x, y)) => (WindowPos::At(x), WindowPos::At(y)),
            None => preserved.map_or((WindowPos::Undefined, WindowPos::Undefined), |(px, py)| {
                (WindowPos::At(px), WindowPos::At(py))
            }),
        };

        self.backend.create_window(&WindowRequest {
            title: self.caption.clone().unwrap_or_default(),
            x,
            y,
            w: width,
            h: height,
            flags: window_flags,
        })?;
        if let Some(icon) = &self.icon {
            self.backend.set_window_icon(icon);
        }
        self.backend
            .set_screensaver_enabled(
                self.config
                    .allow_screensaver(flags.contains(SurfaceFlags::FULLSCREEN)),
            );

        let granted = self.backend.window_flags();
        let surface_flags = granted_surface_flags(granted, flags);
        self.mode_flags = flags;

        // GL modes get a stub surface carrying only the granted flags.
        if flags.contains(SurfaceFlags::OPENGL) {
            self.backend.create_gl_context()?;
            self.gl_context = true;
            self.backend.make_gl_current()?;
            self.video = Some(Surface::gl_stub(width, height, surface_flags));
            self.viewport = Rect::new(0, 0, width, height);
            return self.public_mut();
        }

        let fb = self.backend.window_surface()?;
        let (win_w, win_h) = self.backend.window_size();
        self.viewport = centered_viewport(win_w, win_h, width, height);
        let offset = alias_offset(&self.viewport, fb.pitch, fb.format.bytes_per_pixel());
        self.video = Some(Surface::aliased(
            width,
            height,
            Rc::clone(&fb.format),
            Rc::clone(&fb.buffer),
            offset,
            fb.pitch,
            surface_flags,
        ));

        if bpp != fb.format.bits_per_pixel() && !flags.contains(SurfaceFlags::ANYFORMAT) {
            let mut shadow = Surface::owned(width, height, bpp, surface_flags);
            // Indexed shadow surfaces report an exclusive palette and
            // start from the dithered ramp.
            if let Some(palette) = shadow.format().palette().cloned() {
                shadow.insert_flags(SurfaceFlags::HWPALETTE);
                palette.borrow_mut().update(|colors| dither_colors(colors, bpp));
            }
            shadow.fill_color(None, Color::rgb(0, 0, 0));
            self.shadow = Some(shadow);
        }
        self.window_fb = Some(fb);

        self.clear_and_present();
        info!(
            "mode {width}x{height}x{bpp} set, shadow={}, viewport=({}, {})",
            self.shadow.is_some(),
            self.viewport.x,
            self.viewport.y
        );
        self.public_mut()
    }

    /// Attempt to satisfy a mode request without recreating the
    /// window. Falls through (returns false) whenever anything but
    /// plain dimensions changed.
    fn resize_in_place(&mut self, width: u32, height: u32, bpp: u8, flags: SurfaceFlags) -> bool {
        // We can't resize something we don't have.
        if self.video.is_none() {
            return false;
        }
        // Fullscreen likely means a different display mode entirely.
        if flags.contains(SurfaceFlags::FULLSCREEN) {
            return false;
        }
        // No flag change can be made gracefully in place.
        if flags != self.mode_flags {
            return false;
        }
        let current_bpp = self
            .video
            .as_ref()
            .map(|v| v.format().bits_per_pixel());
        let shadow_bpp = self.shadow.as_ref().map(|s| s.format().bits_per_pixel());
        if shadow_bpp.or(current_bpp) != Some(bpp) {
            return false;
        }

        let (w, h) = self.backend.window_size();
        if (w, h) != (width, height) {
            self.backend.set_window_size(width, height);
        }

        // GL stubs track logical size only; there is no buffer.
        if flags.contains(SurfaceFlags::OPENGL) {
            if let Some(video) = self.video.as_mut() {
                video.set_logical_size(width, height);
            }
            self.viewport = Rect::new(0, 0, width, height);
            return true;
        }

        let fb = match self.backend.window_surface() {
            Ok(fb) => fb,
            Err(e) => {
                warn!("window surface refetch failed during resize: {e}");
                return false;
            }
        };
        if self.video.as_ref().map(|v| v.format().id()) != Some(fb.format.id()) {
            debug!("window format changed, falling back to recreation");
            return false;
        }

        let (win_w, win_h) = self.backend.window_size();
        self.viewport = centered_viewport(win_w, win_h, width, height);
        let offset = alias_offset(&self.viewport, fb.pitch, fb.format.bytes_per_pixel());
        if let Some(video) = self.video.as_mut() {
            video.set_logical_size(width, height);
            video.realias(Rc::clone(&fb.buffer), offset, fb.pitch);
            video.set_clip(None);
        }
        if let Some(shadow) = self.shadow.as_mut() {
            shadow.reallocate_owned(width, height);
            shadow.set_clip(None);
            shadow.invalidate_map();
        }
        self.window_fb = Some(fb);
        self.clear_and_present();
        true
    }

    fn clear_and_present(&mut self) {
        if let Some(shadow) = self.shadow.as_mut() {
            shadow.fill_color(None, Color::rgb(0, 0, 0));
        }
        if let Some(fb) = &self.window_fb {
            fb.buffer.borrow_mut().fill(0);
        }
        let (w, h) = self.backend.window_size();
        if let Err(e) = self.backend.present_rects(&[Rect::new(0, 0, w, h)]) {
            warn!("clearing present failed: {e}");
        }
    }

    /// Push changed regions of a screen surface to the window.
    ///
    /// Presenting the shadow surface first convert-blits each
    /// rectangle into the video surface; presenting the video surface
    /// translates rectangles by the viewport offset. Any other
    /// surface is a no-op because the window system does not track
    /// it.
    pub fn update_rects(&mut self, id: SurfaceId, rects: &[Rect]) -> Result<(), VideoError> {
        let shadow_id = self.shadow.as_ref().map(Surface::id);
        let video_id = self.video.as_ref().map(Surface::id);

        let mut id = id;
        if Some(id) == shadow_id {
            if let (Some(shadow), Some(video)) = (self.shadow.as_mut(), self.video.as_mut()) {
                for rect in rects {
                    blit(shadow, Some(*rect), video, rect.x, rect.y);
                }
            }
            // Fall through to the video surface update.
            if let Some(vid) = video_id {
                id = vid;
            }
        }
        if Some(id) == video_id {
            if self.viewport.x != 0 || self.viewport.y != 0 {
                let offset: Vec<Rect> = rects
                    .iter()
                    .map(|r| r.offset(self.viewport.x, self.viewport.y))
                    .collect();
                self.backend.present_rects(&offset)?;
            } else {
                self.backend.present_rects(rects)?;
            }
        }
        Ok(())
    }

    /// Present one rectangle; zero width or height mean the whole
    /// surface.
    pub fn update_rect(
        &mut self,
        id: SurfaceId,
        x: i32,
        y: i32,
        w: u32,
        h: u32,
    ) -> Result<(), VideoError> {
        let dims = [&self.shadow, &self.video]
            .into_iter()
            .flatten()
            .find(|s| s.id() == id)
            .map(|s| (s.width(), s.height()));
        let Some((sw, sh)) = dims else {
            return Ok(());
        };
        let rect = Rect::new(x, y, if w == 0 { sw } else { w }, if h == 0 { sh } else { h });
        self.update_rects(id, &[rect])
    }

    /// Present the entire surface.
    pub fn flip(&mut self, id: SurfaceId) -> Result<(), VideoError> {
        self.update_rect(id, 0, 0, 0, 0)
    }

    /// Toggle between fullscreen and windowed, preserving the screen
    /// contents best-effort and reconciling the shadow-surface
    /// arrangement against the window's (possibly changed) native
    /// format.
    pub fn toggle_fullscreen(&mut self) -> Result<(), VideoError> {
        if self.video.is_none() {
            return Err(VideoError::NoModeSet);
        }

        // Copy the old bits out. A failed snapshot skips restoration.
        let snapshot = self.screen().and_then(|s| {
            let row_len = s.width() as usize * s.format().bytes_per_pixel();
            s.snapshot().map(|bytes| (bytes, row_len))
        });

        // The physical mode switch; failure aborts with nothing
        // mutated.
        let was_fullscreen = self.backend.window_flags().contains(WindowFlags::FULLSCREEN);
        self.backend.set_fullscreen(!was_fullscreen)?;
        {
            let public = self.public_mut()?;
            if was_fullscreen {
                public.remove_flags(SurfaceFlags::FULLSCREEN);
            } else {
                public.insert_flags(SurfaceFlags::FULLSCREEN);
            }
        }

        // Recreate the screen surface. If this fails we're totally
        // hosed; the caller cannot repair the session.
        let fb = self
            .backend
            .window_surface()
            .map_err(|_| VideoError::SurfaceLost)?;

        let (win_w, win_h) = self.backend.window_size();
        let (logical_w, logical_h) = match self.video.as_ref() {
            Some(video) => (video.width(), video.height()),
            None => return Err(VideoError::NoModeSet),
        };
        self.viewport = centered_viewport(win_w, win_h, logical_w, logical_h);
        let offset = alias_offset(&self.viewport, fb.pitch, fb.format.bytes_per_pixel());

        // Some shuffling behind the application's back if the native
        // format changed.
        let video_format_differs = self
            .video
            .as_ref()
            .is_some_and(|v| v.format().id() != fb.format.id());
        if video_format_differs {
            match self.shadow.take() {
                None => {
                    // The video surface becomes the shadow surface,
                    // and a fresh alias over the window buffer takes
                    // its place.
                    if let Some(mut adopted) = self.video.take() {
                        adopted.adopt_owned_buffer();
                        let replacement = Surface::aliased(
                            adopted.width(),
                            adopted.height(),
                            Rc::clone(&fb.format),
                            Rc::clone(&fb.buffer),
                            offset,
                            fb.pitch,
                            adopted.flags(),
                        );
                        self.video = Some(replacement);
                        self.shadow = Some(adopted);
                    }
                }
                Some(shadow) if shadow.format().id() == fb.format.id() => {
                    // Whee! We don't need a shadow surface anymore.
                    let mut promoted = shadow;
                    promoted.realias(Rc::clone(&fb.buffer), offset, fb.pitch);
                    self.video = Some(promoted);
                }
                Some(mut shadow) => {
                    // Keep both; just track the new native format.
                    if let Some(video) = self.video.as_mut() {
                        video.set_format(Rc::clone(&fb.format));
                    }
                    shadow.invalidate_map();
                    self.shadow = Some(shadow);
                }
            }
        }

        if let Some(video) = self.video.as_mut() {
            video.realias(Rc::clone(&fb.buffer), offset, fb.pitch);
            video.set_clip(None);
        }
        self.window_fb = Some(fb);

        // Copy the old bits back, row by row across the pitch change.
        if let Some((bytes, row_len)) = snapshot {
            let id = {
                let public = self.public_mut()?;
                public.restore_packed(&bytes, row_len);
                public.id()
            };
            self.flip(id)?;
        }
        Ok(())
    }

    /// Install the event translator. Setting a mode does this
    /// automatically; installing twice has no further effect.
    pub fn install_filter(&mut self) {
        self.filter_installed = true;
    }

    /// Whether the event translator is active.
    #[must_use]
    pub fn filter_installed(&self) -> bool {
        self.filter_installed
    }

    /// Drain backend events through the translator into the legacy
    /// queue.
    pub fn pump_events(&mut self) {
        let raw = self.backend.poll_events();
        if raw.is_empty() {
            return;
        }
        let ctx = TranslateContext {
            viewport: (self.viewport.x, self.viewport.y),
            fullscreen: self
                .backend
                .window_flags()
                .contains(WindowFlags::FULLSCREEN),
            pointer: self.backend.pointer_position(),
        };
        for event in raw {
            if self.filter_installed {
                self.queue.apply(translate(&event, &ctx));
            } else {
                self.queue.push(CompatEvent::passthrough(&event));
            }
        }
    }

    /// Pump and pop the oldest pending legacy event.
    pub fn poll_event(&mut self) -> Option<CompatEvent> {
        self.pump_events();
        self.queue.poll()
    }

    /// Inject an application event directly into the legacy queue.
    pub fn push_event(&mut self, event: CompatEvent) {
        self.queue.push(event);
    }

    /// Number of pending legacy events.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Desktop properties for legacy capability queries.
    #[must_use]
    pub fn video_info(&self) -> VideoInfo {
        let mode = self.backend.desktop_mode(self.config.display_index());
        VideoInfo {
            current_w: mode.w,
            current_h: mode.h,
            format: mode.format,
        }
    }

    /// Best available depth for a fullscreen request, or the desktop
    /// depth for windowed requests. Zero means nothing fits.
    #[must_use]
    pub fn mode_ok(&self, width: u32, height: u32, bpp: u8, flags: SurfaceFlags) -> u8 {
        let display = self.config.display_index();
        if !flags.contains(SurfaceFlags::FULLSCREEN) {
            return self.backend.desktop_mode(display).format.bits_per_pixel();
        }
        let mut actual = 0;
        for mode in self.backend.display_modes(display) {
            let size_matches = mode.w == 0 || mode.h == 0 || (mode.w == width && mode.h == height);
            if size_matches && mode.format.bits_per_pixel() >= bpp {
                actual = mode.format.bits_per_pixel();
            }
        }
        actual
    }

    /// Sizes available at a depth for fullscreen modes; windowed
    /// requests are unrestricted.
    #[must_use]
    pub fn list_modes(&self, bpp: u8, flags: SurfaceFlags) -> ModeList {
        if !flags.contains(SurfaceFlags::FULLSCREEN) {
            return ModeList::Unrestricted;
        }
        let display = self.config.display_index();
        let bpp = if bpp == 0 {
            self.backend.desktop_mode(display).format.bits_per_pixel()
        } else {
            bpp
        };
        let mut out: Vec<(u32, u32)> = Vec::new();
        for mode in self.backend.display_modes(display) {
            if mode.format.bits_per_pixel() != bpp {
                continue;
            }
            if out.last() == Some(&(mode.w, mode.h)) {
                continue;
            }
            out.push((mode.w, mode.h));
        }
        ModeList::Modes(out)
    }

    /// Current window caption.
    #[must_use]
    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    /// Set the window caption, applying it immediately if a window
    /// exists.
    pub fn set_caption(&mut self, title: &str) {
        self.caption = Some(title.to_string());
        if self.backend.has_window() {
            self.backend.set_window_title(title);
        }
    }

    /// Store the window icon; it is applied when the window is next
    /// created.
    pub fn set_icon(&mut self, icon: Surface) {
        self.icon = Some(icon);
    }

    /// Minimize the window.
    pub fn iconify(&mut self) {
        self.backend.minimize_window();
    }

    /// Legacy activation bitmask derived from the window state.
    #[must_use]
    pub fn app_state(&self) -> AppState {
        let flags = self.backend.window_flags();
        let mut state = AppState::empty();
        if flags.contains(WindowFlags::SHOWN) && !flags.contains(WindowFlags::MINIMIZED) {
            state |= AppState::ACTIVE;
        }
        if flags.contains(WindowFlags::INPUT_FOCUS) {
            state |= AppState::INPUT_FOCUS;
        }
        if flags.contains(WindowFlags::MOUSE_FOCUS) {
            state |= AppState::MOUSE_FOCUS;
        }
        state
    }

    /// Confine input to the window or release it, returning the
    /// resulting grab state.
    pub fn set_grab(&mut self, grab: bool) -> bool {
        self.backend.set_grab(grab);
        self.backend.grab()
    }

    /// Current input grab state.
    #[must_use]
    pub fn grab(&self) -> bool {
        self.backend.grab()
    }

    /// Move the pointer to logical-surface coordinates.
    pub fn warp_mouse(&mut self, x: i32, y: i32) {
        self.backend.warp_pointer(x, y);
    }

    /// Install per-channel gamma from three scalar exponents.
    pub fn set_gamma(&mut self, red: f32, green: f32, blue: f32) -> Result<(), VideoError> {
        let red_ramp = calculate_gamma_ramp(red);
        let green_ramp = if (green - red).abs() < f32::EPSILON {
            red_ramp
        } else {
            calculate_gamma_ramp(green)
        };
        let blue_ramp = if (blue - red).abs() < f32::EPSILON {
            red_ramp
        } else {
            calculate_gamma_ramp(blue)
        };
        self.backend.set_gamma_ramp(&red_ramp, &green_ramp, &blue_ramp)
    }

    /// Install explicit gamma translation ramps.
    pub fn set_gamma_ramp(
        &mut self,
        red: &[u16; 256],
        green: &[u16; 256],
        blue: &[u16; 256],
    ) -> Result<(), VideoError> {
        self.backend.set_gamma_ramp(red, green, blue)
    }

    /// The currently installed gamma ramps.
    #[allow(clippy::type_complexity)]
    pub fn gamma_ramp(&self) -> Result<([u16; 256], [u16; 256], [u16; 256]), VideoError> {
        self.backend.gamma_ramp()
    }

    /// Update palette entries of a screen surface, bumping its
    /// palette generation (which invalidates dependent blit maps).
    ///
    /// Returns the number of entries written; an id the session does
    /// not track writes nothing.
    pub fn set_colors(
        &mut self,
        id: SurfaceId,
        first: usize,
        colors: &[Color],
    ) -> Result<usize, VideoError> {
        let surface = [&self.shadow, &self.video]
            .into_iter()
            .flatten()
            .find(|s| s.id() == id);
        let Some(surface) = surface else {
            return Ok(0);
        };
        let palette = surface.format().palette().ok_or(VideoError::NoPalette)?;
        Ok(palette.borrow_mut().set_colors(first, colors))
    }

    /// Legacy alias for [`VideoSession::set_colors`]; the historical
    /// flags argument carried no meaning here.
    pub fn set_palette(
        &mut self,
        id: SurfaceId,
        first: usize,
        colors: &[Color],
    ) -> Result<usize, VideoError> {
        self.set_colors(id, first, colors)
    }

    /// Name of the underlying video driver.
    #[must_use]
    pub fn video_driver_name(&self) -> String {
        self.backend.driver_name()
    }

    /// Swap the GL back buffer to the window.
    pub fn gl_swap_buffers(&mut self) {
        self.backend.swap_gl_window();
    }

    /// Video overlays have no modern equivalent; this always fails.
    pub fn create_yuv_overlay(&mut self, _w: u32, _h: u32) -> Result<Overlay, VideoError> {
        Err(VideoError::Unsupported("YUV overlays"))
    }
}

fn granted_surface_flags(granted: WindowFlags, requested: SurfaceFlags) -> SurfaceFlags {
    let mut flags = SurfaceFlags::empty();
    if granted.contains(WindowFlags::FULLSCREEN) {
        flags |= SurfaceFlags::FULLSCREEN;
    }
    if granted.contains(WindowFlags::OPENGL) && requested.contains(SurfaceFlags::OPENGL) {
        flags |= SurfaceFlags::OPENGL;
    }
    if granted.contains(WindowFlags::RESIZABLE) {
        flags |= SurfaceFlags::RESIZABLE;
    }
    if granted.contains(WindowFlags::BORDERLESS) {
        flags |= SurfaceFlags::NOFRAME;
    }
    flags
}

fn centered_viewport(window_w: u32, window_h: u32, logical_w: u32, logical_h: u32) -> Rect {
    Rect::new(
        (window_w as i32 - logical_w as i32) / 2,
        (window_h as i32 - logical_h as i32) / 2,
        logical_w,
        logical_h,
    )
}

fn alias_offset(viewport: &Rect, pitch: usize, bytes_per_pixel: usize) -> usize {
    let x = viewport.x.max(0) as usize;
    let y = viewport.y.max(0) as usize;
    y * pitch + x * bytes_per_pixel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_centers_with_truncation() {
        let v = centered_viewport(1920, 1080, 640, 480);
        assert_eq!((v.x, v.y), (640, 300));
        // Odd differences truncate toward zero.
        let v = centered_viewport(101, 51, 100, 50);
        assert_eq!((v.x, v.y), (0, 0));
        let v = centered_viewport(103, 53, 100, 50);
        assert_eq!((v.x, v.y), (1, 1));
    }

    #[test]
    fn granted_flags_require_both_sides_for_gl() {
        let granted = WindowFlags::SHOWN | WindowFlags::OPENGL;
        assert!(
            !granted_surface_flags(granted, SurfaceFlags::empty())
                .contains(SurfaceFlags::OPENGL)
        );
        assert!(
            granted_surface_flags(granted, SurfaceFlags::OPENGL)
                .contains(SurfaceFlags::OPENGL)
        );
    }

    #[test]
    fn denied_fullscreen_is_not_reflected() {
        let granted = WindowFlags::SHOWN;
        let flags = granted_surface_flags(granted, SurfaceFlags::FULLSCREEN);
        assert!(!flags.contains(SurfaceFlags::FULLSCREEN));
    }

    #[test]
    fn alias_offset_combines_row_and_column() {
        let viewport = Rect::new(3, 2, 10, 10);
        assert_eq!(alias_offset(&viewport, 100, 4), 212);
        let clamped = Rect::new(-5, -5, 10, 10);
        assert_eq!(alias_offset(&clamped, 100, 4), 0);
    }
}
