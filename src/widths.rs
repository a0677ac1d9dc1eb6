//! Width-table text parser.
//!
//! A font's info file lists, per 256-codepoint block, which byte values
//! exist and how wide their glyphs are:
//!
//! ```text
//! 00000100
//! \t10 20-7F
//! \t6 80,82-84
//! ```
//!
//! Lines without a leading tab are a hexadecimal block base, ascending
//! through the file. Tab-led descriptor lines carry a decimal width and
//! comma-separated hex byte ranges (`HH` or `HH-HH`). The parser scans
//! the whole file for one requested block; loading each block re-reads
//! the file, which trades a little parse time for keeping only a
//! bounded number of blocks in memory.
//!
//! Parsing is deliberately lenient: tokens are capped at 8 significant
//! characters and malformed numbers read as 0, so a damaged info file
//! degrades to wrong widths rather than a failed load.

use log::trace;
use smallvec::SmallVec;

/// Dense-array sentinel: the block has no glyph for this byte.
pub const WIDTH_ABSENT: i16 = -1;
/// Dense-array sentinel used only during parsing: no descriptor has
/// claimed this byte yet.
pub const WIDTH_UNRESOLVED: i16 = -2;

const MAX_TOKEN: usize = 8;

/// One descriptor line: a pixel width shared by a list of inclusive
/// byte sub-ranges within a single block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidthRange {
    pub width: i32,
    pub ranges: SmallVec<[(u8, u8); 4]>,
}

/// Per-block width data. The dense array is the fast lookup path and
/// is preferred when present; the range records are kept as parsed and
/// are authoritative if the dense array was never built.
#[derive(Debug, Clone, Default)]
pub struct SubfontWidths {
    pub dense: Option<Box<[i16; 256]>>,
    pub ranges: Vec<WidthRange>,
}

impl SubfontWidths {
    /// Width of the glyph for `byte`, or -1 if absent.
    pub fn lookup(&self, byte: u8) -> i32 {
        if let Some(dense) = &self.dense {
            return i32::from(dense[byte as usize]);
        }
        for fw in &self.ranges {
            for &(lo, hi) in &fw.ranges {
                if byte >= lo && byte <= hi {
                    return fw.width;
                }
            }
        }
        -1
    }
}

/// Leading hex digits of `tok` (at most 8), or 0 if there are none.
#[inline(always)]
fn lenient_hex(tok: &str) -> u32 {
    let t = tok.trim_start();
    let end = t
        .bytes()
        .take(MAX_TOKEN)
        .take_while(u8::is_ascii_hexdigit)
        .count();
    u32::from_str_radix(&t[..end], 16).unwrap_or(0)
}

/// Leading decimal digits of `tok` (at most 8), or 0 if there are none.
#[inline(always)]
fn lenient_dec(tok: &str) -> i32 {
    let t = tok.trim_start();
    let end = t
        .bytes()
        .take(MAX_TOKEN)
        .take_while(u8::is_ascii_digit)
        .count();
    t[..end].parse().unwrap_or(0)
}

/// Extract the width records for the block at `base` from an info
/// file's text, building both the sparse range list and the dense
/// 256-entry array. `maximum_width` is raised to cover every width
/// seen. Blocks the file does not mention yield an all-absent result.
pub fn parse_subfont_widths(text: &str, base: u32, maximum_width: &mut i32) -> SubfontWidths {
    let mut dense = Box::new([WIDTH_UNRESOLVED; 256]);
    let mut ranges: Vec<WidthRange> = Vec::new();
    let mut current_base = u32::MAX; // matches no block until a header is seen

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix('\t') {
            if current_base != base {
                continue; // some other block's descriptor
            }
            let (width_tok, range_toks) = rest.split_once(' ').unwrap_or((rest, ""));
            let width = lenient_dec(width_tok);
            if width > *maximum_width {
                *maximum_width = width;
            }

            let mut fw = WidthRange {
                width,
                ranges: SmallVec::new(),
            };
            for item in range_toks.split(',') {
                let item = item.trim();
                if item.is_empty() {
                    continue;
                }
                let (lo, hi) = match item.split_once('-') {
                    Some((a, b)) => (lenient_hex(a), lenient_hex(b)),
                    None => {
                        let v = lenient_hex(item);
                        (v, v)
                    }
                };
                fw.ranges.push((lo as u8, hi as u8));
            }

            // First writer wins for overlapping ranges within the block.
            for &(lo, hi) in &fw.ranges {
                for b in lo..=hi {
                    if dense[b as usize] == WIDTH_UNRESOLVED {
                        dense[b as usize] = width as i16;
                    }
                }
            }
            ranges.push(fw);
        } else {
            let header = line.trim();
            if header.is_empty() {
                continue;
            }
            current_base = lenient_hex(header);
            if current_base > base {
                break; // file is sorted; the block is not present
            }
        }
    }

    for entry in dense.iter_mut() {
        if *entry == WIDTH_UNRESOLVED {
            *entry = WIDTH_ABSENT;
        }
    }

    trace!(
        "parsed block {:08x}: {} width records, max width now {}",
        base,
        ranges.len(),
        maximum_width
    );
    SubfontWidths {
        dense: Some(dense),
        ranges,
    }
}
