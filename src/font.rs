//! Font objects, the bounded subfont cache, and the registry.
//!
//! The registry is the single owner of every font: callers hold copyable
//! `FontId` handles, equivalent requests share one refcounted font, and
//! all loading happens inline on the calling thread at cache-miss time.
//! Everything here takes `&mut self`; the subsystem assumes a single UI
//! thread and encodes that in ownership instead of locks.

use std::any::Any;

use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::locate::{FontEnv, load_sheet_image, open_font_info};
use crate::sheet::GlyphSheet;
use crate::style::Style;
use crate::subfont::Subfont;
use crate::synth::{apply_bold_widths, synthesize_bold, synthesize_italic};
use crate::widths::parse_subfont_widths;

/// Upper bound on blocks kept per font. A UI session touches tens of
/// distinct blocks at most, so a small bound with linear scan keeps
/// memory strictly predictable even for text spanning many scripts.
pub const MAX_SUBFONTS: usize = 15;

/// Pixels reserved when a glyph is absent everywhere and the caller
/// will draw a placeholder instead.
const MISSING_GLYPH_WIDTH: i32 = 6;

/// A font loaded by the native (platform) backend.
pub struct NativeFont {
    pub handle: Box<dyn Any>,
    pub maximum_width: i32,
}

/// External collaborator wrapping the platform font system.
pub trait NativeBackend {
    fn load(&mut self, name: &str, size: i32, height: i32, style: Style) -> Option<NativeFont>;
    fn string_width(&self, font: &NativeFont, text: &str) -> i32;
}

/// External collaborator that derives a drawing clip-mask from a
/// finished glyph sheet.
pub trait MaskBuilder {
    fn build(&mut self, sheet: &GlyphSheet) -> Option<Box<dyn Any>>;
}

/// One registered font: a face at a fixed pixel height and style, with
/// its most-recently-used-first block cache.
pub struct Font {
    pub name: String,
    pub height: i32,
    pub style: Style,
    pub maximum_width: i32,
    refcount: u32,
    subfonts: SmallVec<[Subfont; MAX_SUBFONTS]>,
    native: Option<NativeFont>,
}

impl Font {
    #[cfg(test)]
    fn cached_bases(&self) -> Vec<u32> {
        self.subfonts.iter().map(|s| s.base).collect()
    }
}

/// Handle to a font owned by a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontId(u32);

/// Owner of every font in an application instance. Replaces process
/// globals: create one per app/context, drop it on shutdown and every
/// font and subfont goes with it.
pub struct FontRegistry {
    env: FontEnv,
    fonts: FxHashMap<u32, Font>,
    next_id: u32,
    default_font: Option<FontId>,
    native: Option<Box<dyn NativeBackend>>,
    masks: Option<Box<dyn MaskBuilder>>,
}

impl FontRegistry {
    pub fn new(env: FontEnv) -> FontRegistry {
        FontRegistry {
            env,
            fonts: FxHashMap::default(),
            next_id: 1,
            default_font: None,
            native: None,
            masks: None,
        }
    }

    pub fn set_native_backend(&mut self, backend: Box<dyn NativeBackend>) {
        self.native = Some(backend);
    }

    pub fn set_mask_builder(&mut self, builder: Box<dyn MaskBuilder>) {
        self.masks = Some(builder);
    }

    pub fn env(&self) -> &FontEnv {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut FontEnv {
        &mut self.env
    }

    /// Find or create a font. Equivalent requests (same name, pixel
    /// height and bold/italic bits, compatible backend capability)
    /// share one font and bump its refcount. Returns `None` only when
    /// neither the portable nor the native backend can supply the font.
    pub fn new_font(&mut self, name: Option<&str>, mut style: Style, size: i32) -> Option<FontId> {
        let name = name.unwrap_or(&self.env.default_name).to_string();
        if !style.intersects(Style::NATIVE | Style::PORTABLE) {
            style |= Style::NATIVE | Style::PORTABLE;
        }

        // Negative sizes are point sizes; convert via the display's
        // geometry, or a flat 100 dpi / 72 points-per-inch ratio.
        let height = if size < 0 {
            match self.env.display {
                Some(d) if d.millimetres > 0 => {
                    (-size as i64 * 254 * d.pixels as i64 / d.millimetres as i64 / 720) as i32
                }
                _ => -size * 100 / 72,
            }
        } else {
            size
        };

        // Share the earliest-registered matching font; id order is
        // registration order, so the lowest matching id is stable even
        // when several fonts differ only in backend capability.
        let face = style & (Style::BOLD | Style::ITALIC);
        let shared = self
            .fonts
            .iter()
            .filter(|(_, font)| {
                font.name == name
                    && font.height == height
                    && (font.style & (Style::BOLD | Style::ITALIC)) == face
                    && (style & (Style::NATIVE | Style::PORTABLE)).intersects(font.style)
            })
            .map(|(&id, _)| id)
            .min();
        if let Some(id) = shared {
            if let Some(font) = self.fonts.get_mut(&id) {
                font.refcount += 1;
                debug!("sharing font {} {}px (refcount {})", name, height, font.refcount);
                return Some(FontId(id));
            }
        }

        // Prefer the portable backend when its info file exists.
        if style.contains(Style::PORTABLE) {
            if open_font_info(&self.env, &name, height, style).is_some() {
                style -= Style::NATIVE;
            } else {
                style -= Style::PORTABLE;
            }
        }

        let mut native = None;
        if style.contains(Style::NATIVE) {
            match self.native.as_mut().and_then(|b| b.load(&name, size, height, style)) {
                Some(nf) => {
                    style -= Style::PORTABLE;
                    native = Some(nf);
                }
                None => style -= Style::NATIVE,
            }
        }

        if !style.intersects(Style::NATIVE | Style::PORTABLE) {
            warn!("no backend can supply font {} {}px {:?}", name, height, face);
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;
        let maximum_width = native.as_ref().map_or(0, |n| n.maximum_width);
        info!("new font {} {}px {:?} -> id {}", name, height, style, id);
        self.fonts.insert(
            id,
            Font {
                name,
                height,
                style,
                maximum_width,
                refcount: 1,
                subfonts: SmallVec::new(),
                native,
            },
        );
        Some(FontId(id))
    }

    /// Drop one reference. The last reference releases the font and
    /// every subfont it owns.
    pub fn del_font(&mut self, id: FontId) {
        let Some(font) = self.fonts.get_mut(&id.0) else {
            return;
        };
        font.refcount = font.refcount.saturating_sub(1);
        if font.refcount > 0 {
            return;
        }
        debug!("releasing font {} {}px", font.name, font.height);
        self.fonts.remove(&id.0);
        if self.default_font == Some(id) {
            self.default_font = None;
        }
    }

    /// The advance width of `ch` in pixels, or -1 if neither this font
    /// nor the default font has a glyph for it.
    pub fn char_width(&mut self, id: FontId, ch: char) -> i32 {
        let codepoint = ch as u32;
        let base = codepoint & !0xFF;
        let mut width = self.subfont_char_width(id, base, codepoint);
        if width == -1 {
            if let Some(fallback) = self.find_default_font() {
                if fallback != id {
                    width = self.subfont_char_width(fallback, base, codepoint);
                }
            }
        }
        width
    }

    /// Width of a whole string. Native fonts are measured by the
    /// backend; portable fonts sum per-character advances, reserving a
    /// placeholder width for absent glyphs.
    pub fn string_width(&mut self, id: FontId, text: &str) -> i32 {
        if let Some(font) = self.fonts.get(&id.0) {
            if font.style.contains(Style::NATIVE) {
                if let (Some(backend), Some(native)) = (self.native.as_ref(), font.native.as_ref())
                {
                    return backend.string_width(native, text);
                }
            }
        }
        let mut total = 0;
        for ch in text.chars() {
            let w = self.char_width(id, ch);
            total += if w < 0 { MISSING_GLYPH_WIDTH } else { w };
        }
        total
    }

    pub fn font_height(&self, id: FontId) -> Option<i32> {
        self.fonts.get(&id.0).map(|f| f.height)
    }

    pub fn maximum_width(&self, id: FontId) -> Option<i32> {
        self.fonts.get(&id.0).map(|f| f.maximum_width)
    }

    pub fn refcount(&self, id: FontId) -> u32 {
        self.fonts.get(&id.0).map_or(0, |f| f.refcount)
    }

    /// The glyph sheet and widths for the block holding `codepoint`,
    /// loading and caching it if necessary.
    pub fn char_subfont(&mut self, id: FontId, codepoint: u32) -> Option<&Subfont> {
        let base = codepoint & !0xFF;
        let FontRegistry { env, fonts, masks, .. } = self;
        let font = fonts.get_mut(&id.0)?;
        load_subfont(env, masks, font, base)
    }

    /// The application default font, created on first use. If the
    /// configured portable default is unavailable, a native bold
    /// helvetica is tried before giving up.
    pub fn find_default_font(&mut self) -> Option<FontId> {
        if let Some(id) = self.default_font {
            if self.fonts.contains_key(&id.0) {
                return Some(id);
            }
            self.default_font = None;
        }
        let name = self.env.default_name.clone();
        let style = self.env.default_style;
        let size = self.env.default_size;
        let id = self
            .new_font(Some(&name), style, size)
            .or_else(|| self.new_font(Some("helvetica"), Style::NATIVE | Style::BOLD, size))?;
        self.default_font = Some(id);
        Some(id)
    }

    /// Point future default-font lookups at a different face. The
    /// previously cached default (if any) is released.
    pub fn change_default_font(&mut self, name: &str) {
        self.env.default_name = name.to_string();
        if let Some(id) = self.default_font.take() {
            self.del_font(id);
        }
    }

    fn subfont_char_width(&mut self, id: FontId, base: u32, codepoint: u32) -> i32 {
        let FontRegistry { env, fonts, masks, .. } = self;
        let Some(font) = fonts.get_mut(&id.0) else {
            return -1;
        };
        match load_subfont(env, masks, font, base) {
            Some(sub) => sub.char_width(codepoint),
            None => -1,
        }
    }
}

/// The subfont cache. A hit swaps the entry to the front of the MRU
/// list; a miss resolves, parses and (when the on-disk style is
/// plainer than requested) synthesizes a new subfont, evicting the
/// least-recently-used entry at capacity.
fn load_subfont<'a>(
    env: &FontEnv,
    masks: &mut Option<Box<dyn MaskBuilder>>,
    font: &'a mut Font,
    base: u32,
) -> Option<&'a Subfont> {
    if let Some(i) = font.subfonts.iter().position(|s| s.base == base) {
        if i > 0 {
            font.subfonts.swap(0, i);
        }
        return Some(&font.subfonts[0]);
    }

    let (img, style_found) = load_sheet_image(env, &font.name, font.height, base, font.style)?;
    let mut sheet = GlyphSheet::from_decoded(&img)?;
    let anti_alias = sheet.normalize_palette();

    let info = open_font_info(env, &font.name, font.height, style_found)?;
    let mut widths = parse_subfont_widths(&info, base, &mut font.maximum_width);

    if font.style.contains(Style::BOLD) && !style_found.contains(Style::BOLD) {
        sheet = synthesize_bold(font.height, &widths, &sheet);
        apply_bold_widths(&mut widths, &mut font.maximum_width);
    }
    if font.style.contains(Style::ITALIC) && !style_found.contains(Style::ITALIC) {
        sheet = synthesize_italic(font.height, &sheet);
    }

    let mask = masks.as_mut().and_then(|m| m.build(&sheet));
    let sub = Subfont {
        base,
        sheet,
        mask,
        anti_alias,
        widths,
    };

    if font.subfonts.len() >= MAX_SUBFONTS {
        // Reuse the least-recently-used slot.
        let evicted = font.subfonts.pop();
        if let Some(old) = evicted {
            debug!(
                "evicting block {:08x} from {} to admit {:08x}",
                old.base, font.name, base
            );
        }
    }
    font.subfonts.insert(0, sub);
    Some(&font.subfonts[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::DisplayMetrics;
    use crate::synth::{bold_cell_width, italic_margin};
    use crate::testutil::{TempDir, write_info_file, write_plain_sheet};

    const CELL_W: u32 = 8;
    const CELL_H: u32 = 16;

    fn registry_with_fixture(dir: &TempDir) -> FontRegistry {
        let mut env = FontEnv::from_env("pixfont-test");
        env.search_path = Some(dir.path().to_path_buf());
        env.home = None;
        FontRegistry::new(env)
    }

    /// Lay down a plain 16px font with the given blocks, each block
    /// carrying one descriptor `width 20-7F`.
    fn plain_font(dir: &TempDir, name: &str, blocks: &[(u32, i32)]) {
        let mut info = String::new();
        for &(base, width) in blocks {
            info.push_str(&format!("{:08x}\n\t{} 20-7F\n", base, width));
        }
        write_info_file(dir.path(), name, 16, "", &info);
        for &(base, _) in blocks {
            write_plain_sheet(dir.path(), name, 16, "", base, CELL_W, CELL_H);
        }
    }

    #[test]
    fn char_width_round_trip() {
        let dir = TempDir::new("font-roundtrip");
        write_info_file(dir.path(), "demo", 16, "", "00000100\n\t10 20-7F\n");
        write_plain_sheet(dir.path(), "demo", 16, "", 0x0100, CELL_W, CELL_H);

        let mut reg = registry_with_fixture(&dir);
        let id = reg.new_font(Some("demo"), Style::PORTABLE, 16).unwrap();
        assert_eq!(reg.char_width(id, '\u{0120}'), 10);
        assert_eq!(reg.char_width(id, '\u{017F}'), 10);
        assert_eq!(reg.char_width(id, '\u{0180}'), -1);
    }

    #[test]
    fn cache_evicts_the_oldest_block_at_capacity() {
        let dir = TempDir::new("font-evict");
        let blocks: Vec<(u32, i32)> = (0..16u32).map(|i| (i * 256, 8)).collect();
        plain_font(&dir, "demo", &blocks);

        let mut reg = registry_with_fixture(&dir);
        let id = reg.new_font(Some("demo"), Style::PORTABLE, 16).unwrap();
        for &(base, _) in &blocks {
            assert_eq!(reg.char_width(id, char::from_u32(base + 0x20).unwrap()), 8);
        }
        let cached = reg.fonts[&id.0].cached_bases();
        assert_eq!(cached.len(), MAX_SUBFONTS);
        assert!(!cached.contains(&0), "first-loaded block must be evicted");
        assert_eq!(cached[0], 15 * 256, "most recent load sits in front");

        // Querying the evicted block loads it afresh.
        assert_eq!(reg.char_width(id, '\u{20}'), 8);
        assert_eq!(reg.fonts[&id.0].cached_bases()[0], 0);
    }

    #[test]
    fn hits_promote_without_reloading() {
        let dir = TempDir::new("font-promote");
        let blocks: Vec<(u32, i32)> = (0..16u32).map(|i| (i * 256, 8)).collect();
        plain_font(&dir, "demo", &blocks);

        let mut reg = registry_with_fixture(&dir);
        let id = reg.new_font(Some("demo"), Style::PORTABLE, 16).unwrap();
        let a = '\u{0020}'; // block 0x0000
        let b = '\u{0120}'; // block 0x0100
        reg.char_width(id, a);
        reg.char_width(id, b);
        reg.char_width(id, a);
        assert_eq!(reg.fonts[&id.0].cached_bases(), [0x0000, 0x0100]);

        // Fill the cache; the next miss evicts B (the LRU), not A.
        for base in (2..16u32).map(|i| i * 256) {
            reg.char_width(id, char::from_u32(base + 0x20).unwrap());
        }
        assert_eq!(reg.fonts[&id.0].cached_bases().len(), MAX_SUBFONTS);
        let cached = reg.fonts[&id.0].cached_bases();
        assert!(cached.contains(&0x0000), "promoted block survives");
        assert!(!cached.contains(&0x0100), "unpromoted block is evicted first");
    }

    #[test]
    fn degraded_style_passes_through_synthesis() {
        let dir = TempDir::new("font-synth");
        plain_font(&dir, "demo", &[(0, 8)]);

        let mut reg = registry_with_fixture(&dir);
        let style = Style::BOLD | Style::ITALIC | Style::ANTI_ALIAS | Style::PORTABLE;
        let id = reg.new_font(Some("demo"), style, 16).unwrap();

        // Bold adds one pixel of advance; italic leaves advances alone.
        assert_eq!(reg.char_width(id, ' '), 9);

        let sub = reg.char_subfont(id, 0x20).unwrap();
        assert_eq!(sub.base, 0);
        // The sheet went through both transforms: bold widened the
        // cell, then the shear added the italic margin.
        assert_eq!(
            sub.sheet.cell_width(),
            bold_cell_width(CELL_W) + italic_margin(16) as u32
        );
        assert_eq!(sub.sheet.cell_height(), 18);
        assert!(sub.anti_alias, "black-on-white sheets read as greyscale");
    }

    #[test]
    fn equivalent_requests_share_one_font() {
        let dir = TempDir::new("font-refcount");
        plain_font(&dir, "demo", &[(0, 8)]);

        let mut reg = registry_with_fixture(&dir);
        let a = reg.new_font(Some("demo"), Style::PORTABLE, 16).unwrap();
        let b = reg.new_font(Some("demo"), Style::PORTABLE, 16).unwrap();
        assert_eq!(a, b);
        assert_eq!(reg.refcount(a), 2);

        reg.del_font(a);
        assert_eq!(reg.refcount(a), 1);
        assert_eq!(reg.char_width(a, ' '), 8, "still usable at refcount 1");

        reg.del_font(a);
        assert_eq!(reg.refcount(a), 0);
        assert_eq!(reg.char_width(a, ' '), -1);
    }

    #[test]
    fn different_heights_do_not_share() {
        let dir = TempDir::new("font-heights");
        plain_font(&dir, "demo", &[(0, 8)]);
        write_info_file(dir.path(), "demo", 20, "", "00000000\n\t9 20-7F\n");
        write_plain_sheet(dir.path(), "demo", 20, "", 0, CELL_W, 24);

        let mut reg = registry_with_fixture(&dir);
        let a = reg.new_font(Some("demo"), Style::PORTABLE, 16).unwrap();
        let b = reg.new_font(Some("demo"), Style::PORTABLE, 20).unwrap();
        assert_ne!(a, b);
        assert_eq!(reg.refcount(a), 1);
        assert_eq!(reg.refcount(b), 1);
    }

    #[test]
    fn missing_glyphs_fall_back_to_the_default_font() {
        let dir = TempDir::new("font-fallback");
        plain_font(&dir, "narrow", &[(0, 8)]);
        // The default font also covers block 0x0100.
        plain_font(&dir, "unifont", &[(0, 7), (0x0100, 7)]);

        let mut reg = registry_with_fixture(&dir);
        let id = reg.new_font(Some("narrow"), Style::PORTABLE, 16).unwrap();
        assert_eq!(reg.char_width(id, ' '), 8, "own glyph wins");
        assert_eq!(reg.char_width(id, '\u{0120}'), 7, "default font fills the gap");
        assert_eq!(reg.char_width(id, '\u{0820}'), -1, "absent everywhere");
    }

    #[test]
    fn string_width_reserves_space_for_missing_glyphs() {
        let dir = TempDir::new("font-strwidth");
        plain_font(&dir, "demo", &[(0, 8)]);

        let mut reg = registry_with_fixture(&dir);
        let id = reg.new_font(Some("demo"), Style::PORTABLE, 16).unwrap();
        // 'a' and 'b' at 8px each; U+0900 has no sheet anywhere.
        assert_eq!(reg.string_width(id, "ab"), 16);
        assert_eq!(reg.string_width(id, "a\u{0900}b"), 16 + MISSING_GLYPH_WIDTH);
    }

    #[test]
    fn total_backend_failure_fails_font_creation() {
        let dir = TempDir::new("font-nofont");
        let mut reg = registry_with_fixture(&dir);
        assert!(reg.new_font(Some("ghost"), Style::PORTABLE, 16).is_none());
        // No backend bits at all implies trying both; both fail.
        assert!(reg.new_font(Some("ghost"), Style::PLAIN, 16).is_none());
    }

    #[test]
    fn point_sizes_convert_via_display_metrics() {
        let dir = TempDir::new("font-points");
        plain_font(&dir, "demo", &[(0, 8)]);

        let mut reg = registry_with_fixture(&dir);
        // 1016 px over 254 mm: height = 12 * 254 * 1016 / 254 / 720 = 16
        reg.env_mut().display = Some(DisplayMetrics { pixels: 1016, millimetres: 254 });
        let id = reg.new_font(Some("demo"), Style::PORTABLE, -12).unwrap();
        assert_eq!(reg.font_height(id), Some(16));
    }

    #[test]
    fn point_sizes_without_a_display_use_the_fixed_ratio() {
        let dir = TempDir::new("font-points-flat");
        write_info_file(dir.path(), "demo", 25, "", "00000000\n\t9 20-7F\n");
        write_plain_sheet(dir.path(), "demo", 25, "", 0, CELL_W, 32);

        let mut reg = registry_with_fixture(&dir);
        let id = reg.new_font(Some("demo"), Style::PORTABLE, -18).unwrap();
        assert_eq!(reg.font_height(id), Some(18 * 100 / 72));
    }

    #[test]
    fn default_name_is_used_when_none_is_given() {
        let dir = TempDir::new("font-defaultname");
        plain_font(&dir, "unifont", &[(0, 7)]);

        let mut reg = registry_with_fixture(&dir);
        let id = reg.new_font(None, Style::PORTABLE, 16).unwrap();
        assert_eq!(reg.char_width(id, ' '), 7);
    }

    #[test]
    fn change_default_font_redirects_fallback() {
        let dir = TempDir::new("font-changedefault");
        plain_font(&dir, "narrow", &[(0, 8)]);
        plain_font(&dir, "unifont", &[(0x0100, 7)]);
        plain_font(&dir, "wide", &[(0x0100, 12)]);

        let mut reg = registry_with_fixture(&dir);
        let id = reg.new_font(Some("narrow"), Style::PORTABLE, 16).unwrap();
        assert_eq!(reg.char_width(id, '\u{0120}'), 7);
        reg.change_default_font("wide");
        assert_eq!(reg.char_width(id, '\u{0120}'), 12);
    }

    struct StubNative {
        loaded: std::cell::Cell<u32>,
    }

    impl NativeBackend for StubNative {
        fn load(&mut self, name: &str, _size: i32, _height: i32, _style: Style) -> Option<NativeFont> {
            if name != "platform-face" {
                return None;
            }
            self.loaded.set(self.loaded.get() + 1);
            Some(NativeFont { handle: Box::new(()), maximum_width: 11 })
        }

        fn string_width(&self, _font: &NativeFont, text: &str) -> i32 {
            text.chars().count() as i32 * 11
        }
    }

    #[test]
    fn native_backend_handles_fonts_the_portable_side_lacks() {
        let dir = TempDir::new("font-native");
        let mut reg = registry_with_fixture(&dir);
        reg.set_native_backend(Box::new(StubNative { loaded: std::cell::Cell::new(0) }));

        let id = reg.new_font(Some("platform-face"), Style::PLAIN, 16).unwrap();
        assert!(reg.fonts[&id.0].style.contains(Style::NATIVE));
        assert!(!reg.fonts[&id.0].style.contains(Style::PORTABLE));
        assert_eq!(reg.maximum_width(id), Some(11));
        assert_eq!(reg.string_width(id, "abc"), 33);
    }

    #[test]
    fn portable_files_win_over_the_native_backend() {
        let dir = TempDir::new("font-portable-wins");
        plain_font(&dir, "platform-face", &[(0, 8)]);
        let mut reg = registry_with_fixture(&dir);
        reg.set_native_backend(Box::new(StubNative { loaded: std::cell::Cell::new(0) }));

        let id = reg.new_font(Some("platform-face"), Style::PLAIN, 16).unwrap();
        assert!(reg.fonts[&id.0].style.contains(Style::PORTABLE));
        assert!(!reg.fonts[&id.0].style.contains(Style::NATIVE));
    }

    #[test]
    fn sharing_prefers_the_earliest_registered_font() {
        let dir = TempDir::new("font-share-order");
        plain_font(&dir, "platform-face", &[(0, 8)]);
        let mut reg = registry_with_fixture(&dir);
        reg.set_native_backend(Box::new(StubNative { loaded: std::cell::Cell::new(0) }));

        // Same face and height, disjoint backend capabilities.
        let portable = reg.new_font(Some("platform-face"), Style::PORTABLE, 16).unwrap();
        let native = reg.new_font(Some("platform-face"), Style::NATIVE, 16).unwrap();
        assert_ne!(portable, native);

        // A request that either backend could satisfy always shares
        // the one registered first.
        let shared = reg.new_font(Some("platform-face"), Style::PLAIN, 16).unwrap();
        assert_eq!(shared, portable);
        assert_eq!(reg.refcount(portable), 2);
        assert_eq!(reg.refcount(native), 1);
    }

    struct CountingMasks(u32);

    impl MaskBuilder for CountingMasks {
        fn build(&mut self, _sheet: &GlyphSheet) -> Option<Box<dyn Any>> {
            self.0 += 1;
            Some(Box::new(self.0))
        }
    }

    #[test]
    fn masks_are_built_once_per_loaded_block() {
        let dir = TempDir::new("font-masks");
        plain_font(&dir, "demo", &[(0, 8)]);
        let mut reg = registry_with_fixture(&dir);
        reg.set_mask_builder(Box::new(CountingMasks(0)));

        let id = reg.new_font(Some("demo"), Style::PORTABLE, 16).unwrap();
        reg.char_width(id, ' ');
        reg.char_width(id, '!');
        let sub = reg.char_subfont(id, 0x20).unwrap();
        let stamp = sub.mask.as_ref().unwrap().downcast_ref::<u32>().unwrap();
        assert_eq!(*stamp, 1, "cache hits must not rebuild the mask");
    }
}
