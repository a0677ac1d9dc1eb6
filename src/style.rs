//! Font style bits and the style-degradation search table.
//!
//! A requested style may not exist on disk. The search table maps each
//! request to an ordered list of on-disk variants, most specific first,
//! so a plain file can stand in for a bold request (the caller then
//! synthesizes the missing attributes).

use bitflags::bitflags;

bitflags! {
    /// Style attributes of a font. `NATIVE` and `PORTABLE` select the
    /// backend; the rest describe the face itself.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Style: u32 {
        const BOLD       = 1 << 0;
        const ITALIC     = 1 << 1;
        const ANTI_ALIAS = 1 << 2;
        const NATIVE     = 1 << 3;
        const PORTABLE   = 1 << 4;
    }
}

impl Style {
    pub const PLAIN: Style = Style::empty();

    /// The face attributes, ignoring backend selection bits.
    #[inline(always)]
    pub fn face_bits(self) -> Style {
        self & (Style::BOLD | Style::ITALIC | Style::ANTI_ALIAS)
    }
}

/// One row of the degradation table: the filename infix to try, the
/// request bits this row applies to, and the style actually obtained
/// if the file exists.
#[derive(Debug, Clone, Copy)]
pub struct StyleChoice {
    pub infix: &'static str,
    pub requires: Style,
    pub yields: Style,
}

const B: Style = Style::BOLD;
const I: Style = Style::ITALIC;
const A: Style = Style::ANTI_ALIAS;

/// Priority-ordered decision table for locating style variants.
///
/// A row is tried only when the request contains all of `requires`;
/// the first row whose file exists wins. There is deliberately no
/// anti-aliased fallback for bold requests: overstriking anti-aliased
/// glyphs produces muddy double-blended strokes, whereas the italic
/// shear only moves pixels and degrades cleanly.
pub static STYLE_SEARCH: &[StyleChoice] = &[
    StyleChoice { infix: "bia", requires: B.union(I).union(A), yields: B.union(I).union(A) },
    StyleChoice { infix: "ba",  requires: B.union(I).union(A), yields: B.union(A) },
    StyleChoice { infix: "bi",  requires: B.union(I).union(A), yields: B.union(I) },
    StyleChoice { infix: "i",   requires: B.union(I).union(A), yields: I },
    StyleChoice { infix: "b",   requires: B.union(I).union(A), yields: B },
    StyleChoice { infix: "",    requires: B.union(I).union(A), yields: Style::PLAIN },
    StyleChoice { infix: "bi",  requires: B.union(I),          yields: B.union(I) },
    StyleChoice { infix: "i",   requires: B.union(I),          yields: I },
    StyleChoice { infix: "b",   requires: B.union(I),          yields: B },
    StyleChoice { infix: "",    requires: B.union(I),          yields: Style::PLAIN },
    StyleChoice { infix: "ba",  requires: B.union(A),          yields: B.union(A) },
    StyleChoice { infix: "b",   requires: B.union(A),          yields: B },
    StyleChoice { infix: "",    requires: B.union(A),          yields: Style::PLAIN },
    StyleChoice { infix: "ia",  requires: I.union(A),          yields: I.union(A) },
    StyleChoice { infix: "i",   requires: I.union(A),          yields: I },
    StyleChoice { infix: "a",   requires: I.union(A),          yields: A },
    StyleChoice { infix: "",    requires: I.union(A),          yields: Style::PLAIN },
    StyleChoice { infix: "b",   requires: B,                   yields: B },
    StyleChoice { infix: "",    requires: B,                   yields: Style::PLAIN },
    StyleChoice { infix: "i",   requires: I,                   yields: I },
    StyleChoice { infix: "",    requires: I,                   yields: Style::PLAIN },
    StyleChoice { infix: "a",   requires: A,                   yields: A },
    StyleChoice { infix: "",    requires: A,                   yields: Style::PLAIN },
    StyleChoice { infix: "",    requires: Style::PLAIN,        yields: Style::PLAIN },
];

/// Rows of the table applicable to `style`, in priority order.
#[inline(always)]
pub fn applicable_choices(style: Style) -> impl Iterator<Item = &'static StyleChoice> {
    let face = style.face_bits();
    STYLE_SEARCH.iter().filter(move |c| face.contains(c.requires))
}
