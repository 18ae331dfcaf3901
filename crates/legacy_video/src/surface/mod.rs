//! Surfaces and the blit machinery between them
//!
//! A [`Surface`] is a rectangular pixel view. The video surface
//! aliases the window's framebuffer through a shared handle plus a
//! byte offset; the shadow surface owns its buffer outright; the GL
//! stub carries no pixels at all. [`PixelStorage`] makes those three
//! ownership states explicit instead of encoding them in flags.
//!
//! Pixel addressing assumes whole-byte pixels. The 1- and 4-bit
//! depths participate in pitch math only; fills and blits on them are
//! not supported.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;

use crate::pixels::{calculate_pitch, Color, PixelFormat};

bitflags! {
    /// Logical mode / surface flags in the legacy vocabulary.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SurfaceFlags: u32 {
        /// Surface is presented fullscreen.
        const FULLSCREEN = 1 << 0;
        /// Surface is a GPU-context stub with no pixel buffer.
        const OPENGL     = 1 << 1;
        /// The window may be resized by the user.
        const RESIZABLE  = 1 << 2;
        /// The window has no decorations.
        const NOFRAME    = 1 << 3;
        /// Caller accepts whatever pixel format the window has; no
        /// shadow surface is created on a depth mismatch.
        const ANYFORMAT  = 1 << 4;
        /// Surface owns an exclusive hardware palette.
        const HWPALETTE  = 1 << 5;
    }
}

/// A rectangle in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width in pixels
    pub w: u32,
    /// Height in pixels
    pub h: u32,
}

impl Rect {
    /// Construct a rectangle.
    #[must_use]
    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// The rectangle translated by `(dx, dy)`.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }

    /// Overlap of two rectangles, if any.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = (self.x + self.w as i32).min(other.x + other.w as i32);
        let y1 = (self.y + self.h as i32).min(other.y + other.h as i32);
        if x0 < x1 && y0 < y1 {
            Some(Self::new(x0, y0, (x1 - x0) as u32, (y1 - y0) as u32))
        } else {
            None
        }
    }
}

/// Process-unique surface identity.
///
/// Presentation calls identify their target by id so that a foreign
/// surface (one the session does not track) degrades to a no-op
/// instead of touching the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(u64);

impl SurfaceId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Where a surface's pixels live.
#[derive(Debug)]
pub enum PixelStorage {
    /// The surface owns its buffer (shadow surfaces).
    Owned(Vec<u8>),
    /// The surface is a view over a shared framebuffer at a byte
    /// offset (the video surface over the window framebuffer).
    Aliased {
        /// Shared framebuffer, owned by the window.
        buffer: Rc<RefCell<Vec<u8>>>,
        /// Byte offset of this surface's top-left pixel.
        offset: usize,
    },
    /// No pixels (GL context stub).
    None,
}

/// Cached description of how to copy pixels into a destination
/// format, tagged with the palette generations it was built against.
///
/// The entry is valid only while its recorded generation numbers
/// equal the current generation numbers of both formats; any mismatch
/// forces a rebuild before the next blit.
#[derive(Debug, Default)]
pub struct BlitMap {
    dst_format: Option<Rc<PixelFormat>>,
    table: Option<Vec<u32>>,
    src_palette_version: u32,
    dst_palette_version: u32,
}

impl BlitMap {
    /// Drop the destination reference, zero both generation counters,
    /// and free the cached color-translation table.
    pub fn invalidate(&mut self) {
        self.dst_format = None;
        self.table = None;
        self.src_palette_version = 0;
        self.dst_palette_version = 0;
    }

    /// Whether a cached entry exists at all.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.dst_format.is_some()
    }

    fn is_valid_for(&self, src: &PixelFormat, dst: &PixelFormat) -> bool {
        match &self.dst_format {
            Some(cached) if cached.id() == dst.id() => {
                self.src_palette_version == src.palette_version()
                    && self.dst_palette_version == dst.palette_version()
            }
            _ => false,
        }
    }

    fn rebuild(&mut self, src: &PixelFormat, dst: &Rc<PixelFormat>) {
        self.table = src.palette().map(|palette| {
            palette
                .borrow()
                .colors()
                .iter()
                .map(|&c| dst.map_rgb(c))
                .collect()
        });
        self.src_palette_version = src.palette_version();
        self.dst_palette_version = dst.palette_version();
        self.dst_format = Some(Rc::clone(dst));
    }
}

/// A rectangular pixel view with format, clip rectangle, and a cached
/// blit mapping.
#[derive(Debug)]
pub struct Surface {
    id: SurfaceId,
    w: u32,
    h: u32,
    pitch: usize,
    flags: SurfaceFlags,
    format: Rc<PixelFormat>,
    storage: PixelStorage,
    clip: Rect,
    map: BlitMap,
}

impl Surface {
    /// Surface owning a zeroed buffer at the canonical format for
    /// `bits_per_pixel`.
    #[must_use]
    pub fn owned(w: u32, h: u32, bits_per_pixel: u8, flags: SurfaceFlags) -> Self {
        let format = PixelFormat::new(bits_per_pixel);
        let pitch = calculate_pitch(w, bits_per_pixel);
        Self {
            id: SurfaceId::next(),
            w,
            h,
            pitch,
            flags,
            format,
            storage: PixelStorage::Owned(vec![0; h as usize * pitch]),
            clip: Rect::new(0, 0, w, h),
            map: BlitMap::default(),
        }
    }

    /// Surface aliasing a shared framebuffer, inheriting the given
    /// (shared) format.
    #[must_use]
    pub fn aliased(
        w: u32,
        h: u32,
        format: Rc<PixelFormat>,
        buffer: Rc<RefCell<Vec<u8>>>,
        offset: usize,
        pitch: usize,
        flags: SurfaceFlags,
    ) -> Self {
        Self {
            id: SurfaceId::next(),
            w,
            h,
            pitch,
            flags,
            format,
            storage: PixelStorage::Aliased { buffer, offset },
            clip: Rect::new(0, 0, w, h),
            map: BlitMap::default(),
        }
    }

    /// Zero-size placeholder for GL modes: carries dimensions and
    /// flags but no pixel buffer.
    #[must_use]
    pub fn gl_stub(w: u32, h: u32, flags: SurfaceFlags) -> Self {
        Self {
            id: SurfaceId::next(),
            w,
            h,
            pitch: 0,
            flags,
            format: PixelFormat::new(32),
            storage: PixelStorage::None,
            clip: Rect::new(0, 0, w, h),
            map: BlitMap::default(),
        }
    }

    /// Unique identity of this surface.
    #[must_use]
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.w
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.h
    }

    /// Row stride in bytes.
    #[must_use]
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// Flags granted to this surface.
    #[must_use]
    pub fn flags(&self) -> SurfaceFlags {
        self.flags
    }

    /// Shared pixel format.
    #[must_use]
    pub fn format(&self) -> &Rc<PixelFormat> {
        &self.format
    }

    /// Current clip rectangle.
    #[must_use]
    pub fn clip(&self) -> Rect {
        self.clip
    }

    /// Whether this surface carries a pixel buffer at all.
    #[must_use]
    pub fn has_pixels(&self) -> bool {
        !matches!(self.storage, PixelStorage::None)
    }

    /// Set the clip rectangle; `None` resets it to the full surface.
    pub fn set_clip(&mut self, clip: Option<Rect>) {
        let full = Rect::new(0, 0, self.w, self.h);
        self.clip = match clip {
            Some(r) => r.intersection(&full).unwrap_or(Rect::new(0, 0, 0, 0)),
            None => full,
        };
    }

    pub(crate) fn insert_flags(&mut self, flags: SurfaceFlags) {
        self.flags |= flags;
    }

    pub(crate) fn remove_flags(&mut self, flags: SurfaceFlags) {
        self.flags &= !flags;
    }

    /// Invalidate the cached blit mapping.
    pub fn invalidate_map(&mut self) {
        self.map.invalidate();
    }

    /// Whether the blit mapping currently holds a cached entry.
    #[must_use]
    pub fn map_is_cached(&self) -> bool {
        self.map.is_cached()
    }

    /// Update logical dimensions without touching storage (GL stubs
    /// and the in-place resize path).
    pub(crate) fn set_logical_size(&mut self, w: u32, h: u32) {
        self.w = w;
        self.h = h;
    }

    /// Repoint this surface at a (new) shared framebuffer.
    pub(crate) fn realias(
        &mut self,
        buffer: Rc<RefCell<Vec<u8>>>,
        offset: usize,
        pitch: usize,
    ) {
        self.storage = PixelStorage::Aliased { buffer, offset };
        self.pitch = pitch;
    }

    /// Give this surface its own zeroed buffer at its format's pitch,
    /// releasing any alias it held (the "adopt shadow role" move in
    /// the fullscreen toggle).
    pub(crate) fn adopt_owned_buffer(&mut self) {
        self.pitch = calculate_pitch(self.w, self.format.bits_per_pixel());
        self.storage = PixelStorage::Owned(vec![0; self.h as usize * self.pitch]);
    }

    /// Resize an owned buffer to the current dimensions at a freshly
    /// computed pitch. No-op for aliased or absent storage.
    pub(crate) fn reallocate_owned(&mut self, w: u32, h: u32) {
        if let PixelStorage::Owned(buffer) = &mut self.storage {
            self.w = w;
            self.h = h;
            self.pitch = calculate_pitch(w, self.format.bits_per_pixel());
            buffer.clear();
            buffer.resize(h as usize * self.pitch, 0);
        }
    }

    /// Swap in a new shared format reference (window format changes
    /// behind the application's back during a fullscreen toggle).
    pub(crate) fn set_format(&mut self, format: Rc<PixelFormat>) {
        self.format = format;
    }

    fn with_pixels<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Option<R> {
        match &self.storage {
            PixelStorage::Owned(buffer) => Some(f(buffer)),
            PixelStorage::Aliased { buffer, offset } => {
                let buffer = buffer.borrow();
                buffer.get(*offset..).map(f)
            }
            PixelStorage::None => None,
        }
    }

    fn with_pixels_mut<R>(&mut self, f: impl FnOnce(&mut [u8]) -> R) -> Option<R> {
        match &mut self.storage {
            PixelStorage::Owned(buffer) => Some(f(buffer)),
            PixelStorage::Aliased { buffer, offset } => {
                let mut buffer = buffer.borrow_mut();
                let offset = *offset;
                buffer.get_mut(offset..).map(f)
            }
            PixelStorage::None => None,
        }
    }

    /// Raw pixel value at `(x, y)`, if in bounds and backed by pixels.
    #[must_use]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.w || y >= self.h {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let start = y as usize * self.pitch + x as usize * bpp;
        self.with_pixels(|pixels| pixels.get(start..start + bpp).map(read_raw))
            .flatten()
    }

    /// Write a raw pixel value at `(x, y)`; out-of-bounds writes are
    /// ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, raw: u32) {
        if x >= self.w || y >= self.h {
            return;
        }
        let bpp = self.format.bytes_per_pixel();
        let start = y as usize * self.pitch + x as usize * bpp;
        self.with_pixels_mut(|pixels| {
            if let Some(dst) = pixels.get_mut(start..start + bpp) {
                write_raw(dst, raw);
            }
        });
    }

    /// Fill a rectangle (or the whole surface) with a raw pixel
    /// value, clipped to the clip rectangle.
    pub fn fill(&mut self, rect: Option<Rect>, raw: u32) {
        let target = rect.unwrap_or(Rect::new(0, 0, self.w, self.h));
        let Some(rect) = target.intersection(&self.clip) else {
            return;
        };
        let bpp = self.format.bytes_per_pixel();
        let pitch = self.pitch;
        self.with_pixels_mut(|pixels| {
            for row in rect.y..rect.y + rect.h as i32 {
                let row_start = row as usize * pitch + rect.x as usize * bpp;
                let row_end = row_start + rect.w as usize * bpp;
                let Some(row_bytes) = pixels.get_mut(row_start..row_end) else {
                    continue;
                };
                for pixel in row_bytes.chunks_exact_mut(bpp) {
                    write_raw(pixel, raw);
                }
            }
        });
    }

    /// Fill with a color mapped through this surface's format.
    pub fn fill_color(&mut self, rect: Option<Rect>, color: Color) {
        let raw = self.format.map_rgb(color);
        self.fill(rect, raw);
    }

    /// Copy the pixel contents out row by row, packed at
    /// `width * bytes_per_pixel` with no pitch padding.
    ///
    /// Returns `None` for surfaces without pixels; callers treat that
    /// as "skip restoration", not as an error.
    #[must_use]
    pub fn snapshot(&self) -> Option<Vec<u8>> {
        let bpp = self.format.bytes_per_pixel();
        let row_len = self.w as usize * bpp;
        let pitch = self.pitch;
        let h = self.h as usize;
        self.with_pixels(|pixels| {
            let mut out = vec![0u8; h * row_len];
            for row in 0..h {
                let src_start = row * pitch;
                if let Some(src) = pixels.get(src_start..src_start + row_len) {
                    out[row * row_len..(row + 1) * row_len].copy_from_slice(src);
                }
            }
            out
        })
    }

    /// Write packed rows (as produced by [`Surface::snapshot`]) back
    /// into the surface, respecting the surface's current pitch. Rows
    /// are truncated or left partially untouched if the shapes
    /// disagree.
    pub fn restore_packed(&mut self, data: &[u8], row_len: usize) {
        if row_len == 0 {
            return;
        }
        let copy_len = row_len.min(self.w as usize * self.format.bytes_per_pixel());
        let pitch = self.pitch;
        let h = self.h as usize;
        self.with_pixels_mut(|pixels| {
            for (row, src) in data.chunks(row_len).take(h).enumerate() {
                let dst_start = row * pitch;
                let n = copy_len.min(src.len());
                if let Some(dst) = pixels.get_mut(dst_start..dst_start + n) {
                    dst.copy_from_slice(&src[..n]);
                }
            }
        });
    }
}

fn read_raw(bytes: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw[..bytes.len()].copy_from_slice(bytes);
    u32::from_le_bytes(raw)
}

fn write_raw(dst: &mut [u8], raw: u32) {
    let bytes = raw.to_le_bytes();
    let n = dst.len().min(4);
    dst[..n].copy_from_slice(&bytes[..n]);
}

/// Copy a rectangle from `src` into `dst` at `(dst_x, dst_y)`,
/// converting pixel formats as needed.
///
/// The conversion path is cached in the source surface's blit map and
/// rebuilt whenever the recorded palette generations no longer match
/// the live formats. Rectangles are clipped to both surfaces.
pub fn blit(src: &mut Surface, src_rect: Option<Rect>, dst: &mut Surface, dst_x: i32, dst_y: i32) {
    let src_bounds = Rect::new(0, 0, src.w, src.h);
    let Some(src_rect) = src_rect.unwrap_or(src_bounds).intersection(&src_bounds) else {
        return;
    };
    let dst_rect = Rect::new(dst_x, dst_y, src_rect.w, src_rect.h);
    let Some(dst_rect) = dst_rect.intersection(&dst.clip) else {
        return;
    };
    // Re-anchor the source to account for destination clipping.
    let src_rect = Rect::new(
        src_rect.x + (dst_rect.x - dst_x),
        src_rect.y + (dst_rect.y - dst_y),
        dst_rect.w,
        dst_rect.h,
    );

    let mut map = std::mem::take(&mut src.map);
    if !map.is_valid_for(&src.format, &dst.format) {
        map.rebuild(&src.format, &dst.format);
    }

    let same_format = src.format.id() == dst.format.id();
    let src_bpp = src.format.bytes_per_pixel();
    let dst_bpp = dst.format.bytes_per_pixel();
    let mut row_raw: Vec<u32> = Vec::with_capacity(dst_rect.w as usize);

    for row in 0..dst_rect.h as usize {
        row_raw.clear();
        let src_y = src_rect.y as usize + row;
        let src_row_start = src_y * src.pitch + src_rect.x as usize * src_bpp;
        src.with_pixels(|pixels| {
            for col in 0..src_rect.w as usize {
                let start = src_row_start + col * src_bpp;
                let raw = pixels.get(start..start + src_bpp).map_or(0, read_raw);
                row_raw.push(if same_format {
                    raw
                } else if let Some(table) = &map.table {
                    table.get(raw as usize).copied().unwrap_or(0)
                } else {
                    dst.format.map_rgb(src.format.unmap(raw))
                });
            }
        });

        let dst_y = dst_rect.y as usize + row;
        let dst_row_start = dst_y * dst.pitch + dst_rect.x as usize * dst_bpp;
        dst.with_pixels_mut(|pixels| {
            for (col, raw) in row_raw.iter().enumerate() {
                let start = dst_row_start + col * dst_bpp;
                if let Some(out) = pixels.get_mut(start..start + dst_bpp) {
                    write_raw(out, *raw);
                }
            }
        });
    }

    src.map = map;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixels::dither_colors;

    #[test]
    fn fill_respects_clip() {
        let mut s = Surface::owned(8, 8, 32, SurfaceFlags::empty());
        s.set_clip(Some(Rect::new(2, 2, 4, 4)));
        s.fill(None, 0x00FF_FFFF);
        assert_eq!(s.get_pixel(0, 0), Some(0));
        assert_eq!(s.get_pixel(3, 3), Some(0x00FF_FFFF));
        assert_eq!(s.get_pixel(6, 6), Some(0));
    }

    #[test]
    fn blit_converts_indexed_to_packed() {
        let mut shadow = Surface::owned(4, 4, 8, SurfaceFlags::empty());
        if let Some(palette) = shadow.format().palette() {
            palette.borrow_mut().update(|c| dither_colors(c, 8));
        }
        // Index 0xE0 is pure red in the 3-3-2 ramp.
        shadow.fill(None, 0xE0);

        let mut video = Surface::owned(4, 4, 32, SurfaceFlags::empty());
        blit(&mut shadow, None, &mut video, 0, 0);
        assert_eq!(video.get_pixel(1, 1), Some(0x00FF_0000));
        assert!(shadow.map_is_cached());
    }

    #[test]
    fn blit_map_rebuilds_after_palette_change() {
        let mut shadow = Surface::owned(2, 2, 8, SurfaceFlags::empty());
        if let Some(palette) = shadow.format().palette() {
            palette
                .borrow_mut()
                .set_colors(1, &[Color::rgb(0, 255, 0)]);
        }
        shadow.fill(None, 1);
        let mut video = Surface::owned(2, 2, 32, SurfaceFlags::empty());
        blit(&mut shadow, None, &mut video, 0, 0);
        assert_eq!(video.get_pixel(0, 0), Some(0x0000_FF00));

        // Remapping entry 1 bumps the palette generation; the cached
        // table must not be reused.
        if let Some(palette) = shadow.format().palette() {
            palette
                .borrow_mut()
                .set_colors(1, &[Color::rgb(0, 0, 255)]);
        }
        blit(&mut shadow, None, &mut video, 0, 0);
        assert_eq!(video.get_pixel(0, 0), Some(0x0000_00FF));
    }

    #[test]
    fn invalidate_clears_cache_and_counters() {
        let mut shadow = Surface::owned(2, 2, 8, SurfaceFlags::empty());
        let mut video = Surface::owned(2, 2, 32, SurfaceFlags::empty());
        blit(&mut shadow, None, &mut video, 0, 0);
        assert!(shadow.map_is_cached());
        shadow.invalidate_map();
        assert!(!shadow.map_is_cached());
    }

    #[test]
    fn aliased_surface_reads_through_shared_buffer() {
        let format = PixelFormat::new(32);
        let pitch = calculate_pitch(4, 32);
        let buffer = Rc::new(RefCell::new(vec![0u8; 4 * pitch]));
        let mut view = Surface::aliased(
            2,
            2,
            Rc::clone(&format),
            Rc::clone(&buffer),
            pitch + 4, // one row down, one pixel in
            pitch,
            SurfaceFlags::empty(),
        );
        view.put_pixel(0, 0, 0xAABB_CCDD);
        let raw = &buffer.borrow()[pitch + 4..pitch + 8];
        assert_eq!(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]), 0xAABB_CCDD);
    }

    #[test]
    fn snapshot_restore_round_trip_across_pitches() {
        let mut a = Surface::owned(3, 2, 24, SurfaceFlags::empty());
        a.put_pixel(0, 0, 0x11_22_33);
        a.put_pixel(2, 1, 0x44_55_66);
        let packed = a.snapshot().unwrap();
        assert_eq!(packed.len(), 3 * 3 * 2);

        let mut b = Surface::owned(3, 2, 24, SurfaceFlags::empty());
        b.restore_packed(&packed, 3 * 3);
        assert_eq!(b.get_pixel(0, 0), Some(0x11_22_33));
        assert_eq!(b.get_pixel(2, 1), Some(0x44_55_66));
    }

    #[test]
    fn gl_stub_has_no_pixels() {
        let stub = Surface::gl_stub(640, 480, SurfaceFlags::OPENGL);
        assert!(!stub.has_pixels());
        assert!(stub.snapshot().is_none());
        assert_eq!(stub.get_pixel(0, 0), None);
    }
}
