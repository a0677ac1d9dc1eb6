//! One loaded 256-codepoint block of a font.

use std::any::Any;

use crate::sheet::GlyphSheet;
use crate::widths::SubfontWidths;

/// The glyph bitmaps and advance widths for one contiguous block of
/// 256 codepoints sharing a base. Created lazily on first query, owned
/// by exactly one font, and destroyed by eviction or with its owner.
pub struct Subfont {
    /// First codepoint of the block; always a multiple of 256.
    pub base: u32,
    pub sheet: GlyphSheet,
    /// Derived clip-mask, opaque to this subsystem.
    pub mask: Option<Box<dyn Any>>,
    pub anti_alias: bool,
    pub widths: SubfontWidths,
}

impl Subfont {
    /// Advance width in pixels for a codepoint in this block, or -1
    /// when the block has no glyph for it.
    #[inline(always)]
    pub fn char_width(&self, codepoint: u32) -> i32 {
        self.widths.lookup((codepoint & 0xFF) as u8)
    }
}
