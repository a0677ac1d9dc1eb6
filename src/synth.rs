//! Bold and italic glyph synthesis.
//!
//! When the resolver only finds a plainer variant than the caller
//! asked for, the missing attributes are synthesized from pixels:
//! bold by overstriking each glyph one pixel sideways, italic by
//! shearing each glyph in 6-pixel strips. Widths are carried forward
//! explicitly alongside the pixels, never recomputed from them.

use log::debug;

use crate::sheet::{GlyphSheet, SHEET_COLS, SHEET_ROWS};
use crate::widths::SubfontWidths;

/// Bold glyph cells grow by two pixels when the old width is even and
/// one when odd, so the overstrike changes parity predictably.
#[inline(always)]
pub fn bold_cell_width(old: u32) -> u32 {
    old + 2 - (old % 2)
}

/// Horizontal margin an italic shear adds to each glyph cell.
#[inline(always)]
pub fn italic_margin(font_height: i32) -> i32 {
    (font_height + 5) / 6 - 1
}

/// Draw every glyph twice, the second copy shifted one pixel, into a
/// widened sheet. The shift goes right by default; when glyphs sit
/// vertically centered in an oversized box, the copy is nudged right
/// by one and glyphs with known even widths overstrike leftward so the
/// thickened stroke stays centered.
pub fn synthesize_bold(font_height: i32, widths: &SubfontWidths, sheet: &GlyphSheet) -> GlyphSheet {
    let old_w = sheet.cell_width();
    let cell_h = sheet.cell_height();
    let new_w = bold_cell_width(old_w);
    let mut out = GlyphSheet::transparent_like(new_w * SHEET_COLS, sheet.height, &sheet.palette);

    let oversized = (font_height as u32) < cell_h;
    for row in 0..SHEET_ROWS {
        for col in 0..SHEET_COLS {
            let mut dx = 0i32;
            let mut shift = 1i32; // right
            if oversized {
                if let Some(dense) = &widths.dense {
                    let w = dense[(row * SHEET_COLS + col) as usize];
                    if w > 0 && w % 2 == 0 {
                        shift = -1; // left
                    }
                    dx = 1; // centered in box, move right
                }
            }

            let sx = col * old_w;
            let sy = row * cell_h;
            let tx = (col * new_w) as i32 + dx;
            let ty = sy as i32;
            out.copy_rect(tx, ty, sheet, sx, sy, old_w, cell_h);
            out.copy_rect(tx + shift, ty, sheet, sx, sy, old_w, cell_h);
        }
    }
    debug!(
        "bold synthesis widened cells {} -> {} px",
        old_w, new_w
    );
    out
}

/// Widen every recorded glyph width by the one-pixel overstrike and
/// raise the running maximum to match.
pub fn apply_bold_widths(widths: &mut SubfontWidths, maximum_width: &mut i32) {
    let extra = 1;
    for fw in widths.ranges.iter_mut() {
        if fw.width > 0 {
            fw.width += extra;
        }
        if fw.width > *maximum_width {
            *maximum_width = fw.width;
        }
    }
    if let Some(dense) = widths.dense.as_mut() {
        for w in dense.iter_mut() {
            if *w > 0 {
                *w += extra as i16;
            }
            if i32::from(*w) > *maximum_width {
                *maximum_width = i32::from(*w);
            }
        }
    }
}

/// Shear every glyph into an italic slant of roughly 10 degrees.
///
/// Glyphs are sliced into strips 6 pixels tall; the strip containing
/// source row `i` lands `ceil((cell_height - i) / 6) - 1` pixels to the
/// right, so the bottom strip stays put and the top strip reaches the
/// full margin. A cell taller than the font height signals vertically
/// centered glyphs, which take an additional fixed offset of one
/// eighth of the old cell height to keep the slant visually centered.
/// Advance widths are left untouched: the slant overhangs the
/// neighbouring cell instead of pushing it away.
pub fn synthesize_italic(font_height: i32, sheet: &GlyphSheet) -> GlyphSheet {
    let old_w = sheet.cell_width() as i32;
    let old_h = sheet.cell_height() as i32;
    let new_h = old_h.max(font_height + 2);
    let extra = italic_margin(font_height);
    let new_w = old_w + extra;
    let dy = (new_h - old_h) / 2;
    let dx = if dy != 0 { old_h / 8 } else { 0 };

    let mut out = GlyphSheet::transparent_like(
        (new_w as u32) * SHEET_COLS,
        (new_h as u32) * SHEET_ROWS,
        &sheet.palette,
    );

    for row in 0..SHEET_ROWS as i32 {
        for col in 0..SHEET_COLS as i32 {
            let mut i = 0;
            while i < old_h {
                let strip_h = 6.min(old_h - i);
                let off = (old_h - i + 5) / 6 - 1;
                out.copy_rect(
                    col * new_w + dx + off,
                    row * new_h + dy + i,
                    sheet,
                    (col * old_w) as u32,
                    (row * old_h + i) as u32,
                    old_w as u32,
                    strip_h as u32,
                );
                i += 6;
            }
        }
    }
    debug!(
        "italic synthesis: cells {}x{} -> {}x{} (margin {})",
        old_w, old_h, new_w, new_h, extra
    );
    out
}
