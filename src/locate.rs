//! Font file location.
//!
//! Fonts live on disk as a per-font directory holding one info file
//! per height/style (`{name}/{height}{infix}.txt`) and one glyph sheet
//! per block (`{name}/{height}{infix}/{base:08x}.png`, `.gif` as the
//! alternative). The resolver walks an ordered list of root locations
//! and, within each, the style-degradation table, stopping at the
//! first file that exists.

use std::env;
use std::fs;
use std::path::PathBuf;

use image::{DynamicImage, ImageReader};
use log::{debug, trace, warn};

use crate::style::{Style, applicable_choices};

/// Environment variable naming an explicit font search path.
pub const SEARCH_PATH_VAR: &str = "PIXFONT_PATH";
/// Environment variable naming the user's home directory.
pub const HOME_VAR: &str = "HOME";
/// Default install subdirectory under a search root.
pub const INSTALL_DIR: &str = "/pixfonts/";
/// Namespace prefix for fonts embedded in a program's resources.
pub const RESOURCE_PREFIX: &str = "*fonts/";

pub const INFO_SUFFIX: &str = ".txt";
pub const SHEET_SUFFIX: &str = ".png"; // tried first
pub const SHEET_SUFFIX_ALT: &str = ".gif"; // tried second

pub const DEFAULT_FONT_NAME: &str = "unifont";
pub const DEFAULT_FONT_SIZE: i32 = 16;

/// External resource-archive collaborator: resolves a path inside the
/// archive belonging to `program` to its raw bytes.
pub trait ResourceArchive {
    fn read(&self, program: &str, path: &str) -> Option<Vec<u8>>;
}

/// Reported screen geometry, used to convert point sizes to pixels.
#[derive(Debug, Clone, Copy)]
pub struct DisplayMetrics {
    pub pixels: i32,
    pub millimetres: i32,
}

/// Where and how to look for fonts. One of these is owned by the
/// registry; tests and embedders fill the fields directly.
pub struct FontEnv {
    pub search_path: Option<PathBuf>,
    pub home: Option<PathBuf>,
    pub install_dir: String,
    pub resource_prefix: String,
    pub program_name: String,
    pub resources: Option<Box<dyn ResourceArchive>>,
    pub display: Option<DisplayMetrics>,
    pub default_name: String,
    pub default_style: Style,
    pub default_size: i32,
}

impl FontEnv {
    /// Seed the search locations from the process environment.
    pub fn from_env(program_name: impl Into<String>) -> FontEnv {
        FontEnv {
            search_path: env::var_os(SEARCH_PATH_VAR).map(PathBuf::from),
            home: env::var_os(HOME_VAR).map(PathBuf::from),
            install_dir: INSTALL_DIR.to_string(),
            resource_prefix: RESOURCE_PREFIX.to_string(),
            program_name: program_name.into(),
            resources: None,
            display: None,
            default_name: DEFAULT_FONT_NAME.to_string(),
            default_style: Style::PLAIN,
            default_size: DEFAULT_FONT_SIZE,
        }
    }

    /// The on-disk roots to search, in priority order: the search path
    /// alone, home + install dir, search path + install dir, and the
    /// install dir relative to the working directory.
    fn roots(&self) -> [Option<String>; 4] {
        let search = self.search_path.as_ref().map(|p| p.to_string_lossy());
        let home = self.home.as_ref().map(|p| p.to_string_lossy());
        [
            search.as_deref().map(|s| format!("{}/", s)),
            home.as_deref().map(|h| format!("{}{}", h, self.install_dir)),
            search.as_deref().map(|s| format!("{}{}", s, self.install_dir)),
            Some(format!(".{}", self.install_dir)),
        ]
    }
}

/// Contents of the best-matching info file for `(name, height, style)`,
/// or `None` when no location has one (not an error: the registry then
/// falls back to the native backend).
pub fn open_font_info(env: &FontEnv, name: &str, height: i32, style: Style) -> Option<String> {
    for root in env.roots().into_iter().flatten() {
        for choice in applicable_choices(style) {
            let path = format!("{}{}/{}{}{}", root, name, height, choice.infix, INFO_SUFFIX);
            match fs::read_to_string(&path) {
                Ok(text) => {
                    debug!("font info: {}", path);
                    return Some(text);
                }
                Err(_) => trace!("no font info at {}", path),
            }
        }
    }
    if let Some(resources) = env.resources.as_deref() {
        for choice in applicable_choices(style) {
            let path = format!(
                "{}{}/{}{}{}",
                env.resource_prefix, name, height, choice.infix, INFO_SUFFIX
            );
            if let Some(bytes) = resources.read(&env.program_name, &path) {
                debug!("font info from resources: {}", path);
                return Some(String::from_utf8_lossy(&bytes).into_owned());
            }
        }
    }
    trace!("no info file for {} {}px {:?}", name, height, style);
    None
}

/// Decode the best-matching glyph sheet for one block, returning the
/// image and the style actually found (which may be plainer than the
/// request, signalling the caller to synthesize the difference).
pub fn load_sheet_image(
    env: &FontEnv,
    name: &str,
    height: i32,
    base: u32,
    style: Style,
) -> Option<(DynamicImage, Style)> {
    for root in env.roots().into_iter().flatten() {
        for choice in applicable_choices(style) {
            for suffix in [SHEET_SUFFIX, SHEET_SUFFIX_ALT] {
                let path = format!(
                    "{}{}/{}{}/{:08x}{}",
                    root, name, height, choice.infix, base, suffix
                );
                match decode_sheet_file(&path) {
                    Some(img) => {
                        debug!("glyph sheet: {} (style {:?})", path, choice.yields);
                        return Some((img, choice.yields));
                    }
                    None => trace!("no glyph sheet at {}", path),
                }
            }
        }
    }
    if let Some(resources) = env.resources.as_deref() {
        for choice in applicable_choices(style) {
            for suffix in [SHEET_SUFFIX, SHEET_SUFFIX_ALT] {
                let path = format!(
                    "{}{}/{}{}/{:08x}{}",
                    env.resource_prefix, name, height, choice.infix, base, suffix
                );
                let Some(bytes) = resources.read(&env.program_name, &path) else {
                    continue;
                };
                match image::load_from_memory(&bytes) {
                    Ok(img) => {
                        debug!("glyph sheet from resources: {}", path);
                        return Some((img, choice.yields));
                    }
                    Err(e) => warn!("undecodable glyph sheet resource {}: {}", path, e),
                }
            }
        }
    }
    trace!(
        "no glyph sheet for {} {}px block {:08x} {:?}",
        name, height, base, style
    );
    None
}

fn decode_sheet_file(path: &str) -> Option<DynamicImage> {
    let reader = ImageReader::open(path).ok()?;
    match reader.decode() {
        Ok(img) => Some(img),
        Err(e) => {
            // The file exists but will not decode; report it and keep
            // degrading through the search order.
            warn!("undecodable glyph sheet {}: {}", path, e);
            None
        }
    }
}
