//! 8-bit indexed glyph sheets.
//!
//! A sheet holds one block of 256 glyphs in a 32x8 grid, row-major in
//! codepoint-low-byte order: glyph `b` sits at cell `(b % 32, b / 32)`.
//! The palette carries RGB plus a transparency channel: `alpha` 0 is
//! fully opaque, 255 fully transparent. Values above 127 are treated
//! as transparent when copying, so greyscale alpha survives transforms
//! without per-pixel blending.

use image::DynamicImage;
use log::{debug, warn};
use rustc_hash::FxHashMap;

pub const SHEET_COLS: u32 = 32;
pub const SHEET_ROWS: u32 = 8;

/// A palette entry. `alpha` is transparency, not coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Colour {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Colour {
    #[inline(always)]
    pub fn rgb(red: u8, green: u8, blue: u8) -> Colour {
        Colour { red, green, blue, alpha: 0 }
    }

    #[inline(always)]
    pub fn is_transparent(self) -> bool {
        self.alpha > 0x7F
    }
}

/// An 8-bit indexed bitmap holding a 32x8 grid of glyph cells.
#[derive(Debug, Clone)]
pub struct GlyphSheet {
    pub width: u32,
    pub height: u32,
    pub palette: Vec<Colour>,
    data: Vec<u8>,
}

impl GlyphSheet {
    /// Build a sheet from raw indexed rows. Dimensions must divide
    /// into the 32x8 cell grid.
    pub fn from_indexed(width: u32, height: u32, palette: Vec<Colour>, data: Vec<u8>) -> Option<GlyphSheet> {
        if !grid_dimensions_ok(width, height) || data.len() != (width * height) as usize {
            return None;
        }
        Some(GlyphSheet { width, height, palette, data })
    }

    /// Index a decoded image into palette form. Sources are expected
    /// to already be small-palette bitmaps; anything else takes this
    /// conversion, which walks every pixel and is best avoided by
    /// shipping indexed sheets in the first place.
    pub fn from_decoded(img: &DynamicImage) -> Option<GlyphSheet> {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        if !grid_dimensions_ok(width, height) {
            warn!(
                "glyph sheet is {}x{}, not a multiple of the {}x{} cell grid",
                width, height, SHEET_COLS, SHEET_ROWS
            );
            return None;
        }

        let mut palette: Vec<Colour> = Vec::new();
        let mut lookup: FxHashMap<[u8; 4], u8> = FxHashMap::default();
        let mut data = Vec::with_capacity((width * height) as usize);
        for px in rgba.pixels() {
            let key = px.0;
            let index = match lookup.get(&key) {
                Some(&i) => i,
                None => {
                    if palette.len() == 256 {
                        warn!("glyph sheet has more than 256 colours; not an indexed bitmap");
                        return None;
                    }
                    let i = palette.len() as u8;
                    palette.push(Colour {
                        red: key[0],
                        green: key[1],
                        blue: key[2],
                        // Decoded alpha is coverage; ours is transparency.
                        alpha: 255 - key[3],
                    });
                    lookup.insert(key, i);
                    i
                }
            };
            data.push(index);
        }
        debug!(
            "indexed a {}x{} sheet into {} palette entries (slow path)",
            width,
            height,
            palette.len()
        );
        Some(GlyphSheet { width, height, palette, data })
    }

    /// A new sheet of the given size filled with the first fully
    /// transparent palette index, sharing `palette`.
    pub fn transparent_like(width: u32, height: u32, palette: &[Colour]) -> GlyphSheet {
        let fill = palette
            .iter()
            .position(|c| c.alpha == 255)
            .unwrap_or(0) as u8;
        GlyphSheet {
            width,
            height,
            palette: palette.to_vec(),
            data: vec![fill; (width * height) as usize],
        }
    }

    /// Normalize the palette for drawing. A sheet that already uses
    /// transparency (nonzero alpha under the top-left pixel) is left
    /// alone. Otherwise pure white becomes fully transparent, and a
    /// palette that is entirely greyscale is reinterpreted as an
    /// anti-aliased mask: alpha takes the grey level and the ink
    /// becomes black. Returns whether the grey reinterpretation fired.
    pub fn normalize_palette(&mut self) -> bool {
        let mut all_greyscale = true;
        let top_left = self.palette[self.data[0] as usize];
        if top_left.alpha > 0 {
            return false;
        }
        for c in self.palette.iter_mut() {
            if c.red == 255 && c.green == 255 && c.blue == 255 {
                c.alpha = 255;
            }
            if c.red != c.green || c.green != c.blue {
                all_greyscale = false;
            }
        }
        if all_greyscale {
            // Black stays opaque, white stays transparent, greys land
            // in between: greyscale sheets simulate anti-aliasing.
            for c in self.palette.iter_mut() {
                c.alpha = c.red;
                c.red = 0;
                c.green = 0;
                c.blue = 0;
            }
        }
        all_greyscale
    }

    #[inline(always)]
    pub fn cell_width(&self) -> u32 {
        self.width / SHEET_COLS
    }

    #[inline(always)]
    pub fn cell_height(&self) -> u32 {
        self.height / SHEET_ROWS
    }

    #[inline(always)]
    pub fn index_at(&self, x: u32, y: u32) -> u8 {
        self.data[(y * self.width + x) as usize]
    }

    #[inline(always)]
    pub fn colour_at(&self, x: u32, y: u32) -> Colour {
        self.palette[self.index_at(x, y) as usize]
    }

    /// Copy a rectangle from `src`, skipping transparent source pixels
    /// so repeated copies overstrike instead of erasing. Both sheets
    /// must share a palette; destination coordinates may be negative
    /// or overhang and are clipped.
    pub fn copy_rect(
        &mut self,
        dx: i32,
        dy: i32,
        src: &GlyphSheet,
        sx: u32,
        sy: u32,
        w: u32,
        h: u32,
    ) {
        debug_assert_eq!(self.palette.len(), src.palette.len());
        for row in 0..h {
            let ty = dy + row as i32;
            if ty < 0 || ty >= self.height as i32 {
                continue;
            }
            let from_y = sy + row;
            if from_y >= src.height {
                continue;
            }
            for col in 0..w {
                let tx = dx + col as i32;
                if tx < 0 || tx >= self.width as i32 {
                    continue;
                }
                let from_x = sx + col;
                if from_x >= src.width {
                    continue;
                }
                let index = src.index_at(from_x, from_y);
                if src.palette[index as usize].is_transparent() {
                    continue;
                }
                self.data[(ty as u32 * self.width + tx as u32) as usize] = index;
            }
        }
    }
}

#[inline(always)]
fn grid_dimensions_ok(width: u32, height: u32) -> bool {
    width > 0 && height > 0 && width % SHEET_COLS == 0 && height % SHEET_ROWS == 0
}
