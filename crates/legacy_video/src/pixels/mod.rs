//! Pixel formats, palettes, and the stateless pixel math helpers
//!
//! Format objects are shared between surfaces through `Rc` so that a
//! surface aliasing the window framebuffer can inherit the window's
//! format without copying it. Palettes carry a generation counter;
//! every mutation bumps it, which is what drives blit-map invalidation
//! in the surface module.

use std::cell::RefCell;
use std::rc::Rc;

/// An RGBA color with 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    /// Red component
    pub r: u8,
    /// Green component
    pub g: u8,
    /// Blue component
    pub b: u8,
    /// Alpha component (255 = fully opaque)
    pub a: u8,
}

/// Fully opaque alpha value.
pub const ALPHA_OPAQUE: u8 = 255;

impl Color {
    /// Opaque color from RGB components.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: ALPHA_OPAQUE }
    }
}

/// An indexed-color palette with a generation counter.
///
/// The counter starts at 1 and never revisits 0, so a zeroed counter
/// in a cache entry can never compare equal to a live palette.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<Color>,
    version: u32,
}

impl Palette {
    /// Create a palette of `len` black, opaque entries.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            colors: vec![Color::rgb(0, 0, 0); len],
            version: 1,
        }
    }

    /// Current generation counter.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The palette entries.
    #[must_use]
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Whether the palette has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Overwrite entries starting at `first`, clamped to the palette
    /// length, and bump the generation counter.
    ///
    /// Returns the number of entries actually written.
    pub fn set_colors(&mut self, first: usize, colors: &[Color]) -> usize {
        let len = self.colors.len();
        if first >= len {
            return 0;
        }
        let n = colors.len().min(len - first);
        self.colors[first..first + n].copy_from_slice(&colors[..n]);
        self.bump();
        n
    }

    /// Mutate entries in place through a closure and bump the counter.
    pub fn update<F: FnOnce(&mut [Color])>(&mut self, f: F) {
        f(&mut self.colors);
        self.bump();
    }

    fn bump(&mut self) {
        self.version = self.version.wrapping_add(1);
        if self.version == 0 {
            self.version = 1;
        }
    }
}

/// Identity key for pixel-format equality tests.
///
/// Two formats are "the same format" when their depth and channel
/// masks agree; this is the comparison the resize path and the
/// fullscreen decision table run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatId {
    bits_per_pixel: u8,
    masks: [u32; 4],
}

impl FormatId {
    /// Depth in bits per pixel.
    #[must_use]
    pub fn bits_per_pixel(&self) -> u8 {
        self.bits_per_pixel
    }
}

/// Per-channel packing description derived from a mask.
#[derive(Debug, Clone, Copy, Default)]
struct Channel {
    mask: u32,
    shift: u32,
    loss: u32,
}

impl Channel {
    fn from_mask(mask: u32) -> Self {
        if mask == 0 {
            return Self::default();
        }
        let shift = mask.trailing_zeros();
        let loss = 8 - mask.count_ones().min(8);
        Self { mask, shift, loss }
    }

    fn pack(&self, value: u8) -> u32 {
        (u32::from(value) >> self.loss) << self.shift
    }

    fn unpack(&self, raw: u32) -> u8 {
        let v = ((raw & self.mask) >> self.shift) << self.loss;
        let mut c = v as u8;
        if self.loss > 0 {
            // Replicate the high bits downward so full-intensity
            // channels expand to 255, not 255 - (2^loss - 1).
            c |= c >> (8 - self.loss);
        }
        c
    }
}

/// A pixel format: depth, channel layout, and (for indexed depths) a
/// shared palette.
#[derive(Debug)]
pub struct PixelFormat {
    bits_per_pixel: u8,
    bytes_per_pixel: usize,
    red: Channel,
    green: Channel,
    blue: Channel,
    alpha: Channel,
    palette: Option<Rc<RefCell<Palette>>>,
}

impl PixelFormat {
    /// Canonical format for a depth: indexed at 8 bpp and below,
    /// RGB565 at 16, RGB888 at 24, XRGB8888 otherwise.
    #[must_use]
    pub fn new(bits_per_pixel: u8) -> Rc<Self> {
        match bits_per_pixel {
            1 | 4 | 8 => Rc::new(Self {
                bits_per_pixel,
                bytes_per_pixel: 1,
                red: Channel::default(),
                green: Channel::default(),
                blue: Channel::default(),
                alpha: Channel::default(),
                palette: Some(Rc::new(RefCell::new(Palette::new(
                    1 << bits_per_pixel,
                )))),
            }),
            16 => Self::with_masks(16, 0xF800, 0x07E0, 0x001F, 0),
            24 => Self::with_masks(24, 0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0),
            _ => Self::with_masks(32, 0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0),
        }
    }

    /// Packed format from explicit channel masks.
    #[must_use]
    pub fn with_masks(bits_per_pixel: u8, r: u32, g: u32, b: u32, a: u32) -> Rc<Self> {
        Rc::new(Self {
            bits_per_pixel,
            bytes_per_pixel: bytes_per_pixel(bits_per_pixel),
            red: Channel::from_mask(r),
            green: Channel::from_mask(g),
            blue: Channel::from_mask(b),
            alpha: Channel::from_mask(a),
            palette: None,
        })
    }

    /// Depth in bits per pixel.
    #[must_use]
    pub fn bits_per_pixel(&self) -> u8 {
        self.bits_per_pixel
    }

    /// Storage width of one pixel in bytes.
    #[must_use]
    pub fn bytes_per_pixel(&self) -> usize {
        self.bytes_per_pixel
    }

    /// The shared palette, if this is an indexed format.
    #[must_use]
    pub fn palette(&self) -> Option<&Rc<RefCell<Palette>>> {
        self.palette.as_ref()
    }

    /// Identity key for format-equality comparisons.
    #[must_use]
    pub fn id(&self) -> FormatId {
        FormatId {
            bits_per_pixel: self.bits_per_pixel,
            masks: [
                self.red.mask,
                self.green.mask,
                self.blue.mask,
                self.alpha.mask,
            ],
        }
    }

    /// Current palette generation, or 0 for packed formats.
    #[must_use]
    pub fn palette_version(&self) -> u32 {
        self.palette.as_ref().map_or(0, |p| p.borrow().version())
    }

    /// Pack a color into this format's raw pixel value.
    ///
    /// For indexed formats this is a nearest-color palette search.
    #[must_use]
    pub fn map_rgb(&self, color: Color) -> u32 {
        if let Some(palette) = &self.palette {
            return nearest_index(&palette.borrow(), color) as u32;
        }
        let mut raw = self.red.pack(color.r) | self.green.pack(color.g) | self.blue.pack(color.b);
        if self.alpha.mask != 0 {
            raw |= self.alpha.pack(color.a);
        }
        raw
    }

    /// Unpack a raw pixel value into a color.
    #[must_use]
    pub fn unmap(&self, raw: u32) -> Color {
        if let Some(palette) = &self.palette {
            let palette = palette.borrow();
            return palette
                .colors()
                .get(raw as usize)
                .copied()
                .unwrap_or_else(|| Color::rgb(0, 0, 0));
        }
        Color {
            r: self.red.unpack(raw),
            g: self.green.unpack(raw),
            b: self.blue.unpack(raw),
            a: if self.alpha.mask == 0 {
                ALPHA_OPAQUE
            } else {
                self.alpha.unpack(raw)
            },
        }
    }
}

fn nearest_index(palette: &Palette, color: Color) -> usize {
    let mut best = 0;
    let mut best_dist = u32::MAX;
    for (i, c) in palette.colors().iter().enumerate() {
        let dr = i32::from(c.r) - i32::from(color.r);
        let dg = i32::from(c.g) - i32::from(color.g);
        let db = i32::from(c.b) - i32::from(color.b);
        let dist = (dr * dr + dg * dg + db * db) as u32;
        if dist < best_dist {
            best_dist = dist;
            best = i;
            if dist == 0 {
                break;
            }
        }
    }
    best
}

/// Storage width in bytes for a depth. Sub-byte depths store one
/// packed byte run per pixel group, so they report 1 here; the pitch
/// calculation applies their packing.
#[must_use]
pub fn bytes_per_pixel(bits_per_pixel: u8) -> usize {
    match bits_per_pixel {
        1 | 4 | 8 => 1,
        16 => 2,
        24 => 3,
        _ => 4,
    }
}

/// Pad-aligned scanline width in bytes for a surface row.
///
/// Rows are kept 4-byte aligned; 1-bit and 4-bit depths pack multiple
/// pixels per byte before alignment.
#[must_use]
pub fn calculate_pitch(width: u32, bits_per_pixel: u8) -> usize {
    let mut pitch = width as usize * bytes_per_pixel(bits_per_pixel);
    match bits_per_pixel {
        1 => pitch = (pitch + 7) / 8,
        4 => pitch = (pitch + 1) / 2,
        _ => {}
    }
    (pitch + 3) & !3
}

/// Fill `colors` with the 3-3-2 dithered ramp used for exclusive
/// 8-bit palettes. Depths other than 8 are left untouched.
pub fn dither_colors(colors: &mut [Color], bits_per_pixel: u8) {
    if bits_per_pixel != 8 {
        return;
    }
    for (i, color) in colors.iter_mut().enumerate().take(256) {
        // Map each bit field onto the full [0, 255] interval so 0
        // lands on (0, 0, 0) and 255 on (255, 255, 255).
        let mut r = i & 0xe0;
        r |= r >> 3 | r >> 6;
        let mut g = (i << 3) & 0xe0;
        g |= g >> 3 | g >> 6;
        let mut b = i & 0x03;
        b |= b << 2;
        b |= b << 4;
        *color = Color {
            r: r as u8,
            g: g as u8,
            b: b as u8,
            a: ALPHA_OPAQUE,
        };
    }
}

/// Translation ramp for one gamma value, 256 16-bit entries.
///
/// A gamma of 1.0 produces the identity ramp; non-positive gamma
/// produces an all-black ramp.
#[must_use]
pub fn calculate_gamma_ramp(gamma: f32) -> [u16; 256] {
    let mut ramp = [0u16; 256];
    if gamma <= 0.0 {
        return ramp;
    }
    if (gamma - 1.0).abs() < f32::EPSILON {
        for (i, entry) in ramp.iter_mut().enumerate() {
            *entry = ((i << 8) | i) as u16;
        }
        return ramp;
    }
    let exponent = 1.0 / gamma;
    for (i, entry) in ramp.iter_mut().enumerate() {
        let value = ((i as f32) / 256.0).powf(exponent) * 65535.0 + 0.5;
        *entry = if value > 65535.0 { 65535 } else { value as u16 };
    }
    ramp
}
