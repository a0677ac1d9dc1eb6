//! Portable bitmap-font subsystem.
//!
//! Fonts are directories of plain-text width tables and indexed glyph
//! sheets, resolved through an ordered search path with graceful style
//! degradation. Missing bold and italic variants are synthesized from
//! pixels; loaded 256-codepoint blocks live in a small per-font MRU
//! cache owned by a [`font::FontRegistry`].
//!
//! The subsystem is single-threaded by construction: the registry owns
//! everything, callers hold copyable [`font::FontId`] handles, and all
//! mutation goes through `&mut self`.

pub mod font;
pub mod locate;
pub mod sheet;
pub mod style;
pub mod subfont;
pub mod synth;
pub mod widths;

#[cfg(test)]
pub(crate) mod testutil;

pub use font::{Font, FontId, FontRegistry, MAX_SUBFONTS, MaskBuilder, NativeBackend, NativeFont};
pub use locate::{DisplayMetrics, FontEnv, ResourceArchive};
pub use sheet::{Colour, GlyphSheet};
pub use style::Style;
pub use subfont::Subfont;
pub use widths::{SubfontWidths, WidthRange};
