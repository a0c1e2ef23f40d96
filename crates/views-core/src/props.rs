//! Character formatting properties.
//!
//! Formatting comes in two shapes:
//!
//! - [`TextProps`]: a sparse set of overrides. Rich-text strings, overlay categories and
//!   override layers all carry `TextProps`, and only the fields they set take effect.
//! - [`CharProps`]: a fully resolved set of values, which is what a rendering engine sees
//!   when it asks a text source for the properties at a rendered offset.
//!
//! A run's style is a `CharProps`; the string's internal runs are applied on top of it.

/// Writing-system identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct WsId(pub u32);

/// Overlay category identifier (a tag attached to a stretch of text).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CategoryId(pub u32);

/// Font family name that is resolved through the writing system's default font.
pub const DEFAULT_FONT: &str = "<default font>";

/// A packed `0x00RRGGBB` color, or [`Color::TRANSPARENT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

impl Color {
    /// No color.
    pub const TRANSPARENT: Self = Self(0xC000_0000);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(0xFF, 0xFF, 0xFF);
    /// Opaque red.
    pub const RED: Self = Self::rgb(0xFF, 0, 0);
    /// Opaque blue.
    pub const BLUE: Self = Self::rgb(0, 0, 0xFF);

    /// Build a color from its components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Returns `true` for [`Color::TRANSPARENT`].
    pub fn is_transparent(self) -> bool {
        self == Self::TRANSPARENT
    }
}

/// Underline (and strike) decoration kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnderlineKind {
    /// No decoration.
    #[default]
    None,
    /// Single solid line.
    Single,
    /// Double solid line.
    Double,
    /// Dotted line.
    Dotted,
    /// Dashed line.
    Dashed,
    /// Wavy line (spelling errors).
    Squiggle,
    /// Line through the middle of the text.
    Strikethrough,
}

/// Underline query result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Underline {
    /// Decoration kind.
    pub kind: UnderlineKind,
    /// Decoration color ([`Color::TRANSPARENT`] means "use the foreground color").
    pub color: Color,
}

/// Sparse formatting overrides.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextProps {
    /// Writing system.
    pub ws: Option<WsId>,
    /// Font family name (may be [`DEFAULT_FONT`]).
    pub font_family: Option<String>,
    /// Font size in millipoints.
    pub font_size: Option<u32>,
    /// Bold weight.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,
    /// Foreground color.
    pub fore_color: Option<Color>,
    /// Background color.
    pub back_color: Option<Color>,
    /// Underline kind.
    pub underline: Option<UnderlineKind>,
    /// Underline color.
    pub underline_color: Option<Color>,
    /// Overlay category tags. Replaces (does not extend) the tags underneath.
    pub tags: Option<Vec<CategoryId>>,
}

impl TextProps {
    /// An empty override set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the writing system.
    pub fn with_ws(mut self, ws: WsId) -> Self {
        self.ws = Some(ws);
        self
    }

    /// Set bold on or off.
    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = Some(bold);
        self
    }

    /// Set italic on or off.
    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = Some(italic);
        self
    }

    /// Set the foreground color.
    pub fn with_fore_color(mut self, color: Color) -> Self {
        self.fore_color = Some(color);
        self
    }

    /// Set the background color.
    pub fn with_back_color(mut self, color: Color) -> Self {
        self.back_color = Some(color);
        self
    }

    /// Set the underline kind and color.
    pub fn with_underline(mut self, kind: UnderlineKind, color: Color) -> Self {
        self.underline = Some(kind);
        self.underline_color = Some(color);
        self
    }

    /// Set the overlay category tags.
    pub fn with_tags(mut self, tags: Vec<CategoryId>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Fully resolved character formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharProps {
    /// Writing system.
    pub ws: WsId,
    /// Font family name.
    pub font_family: String,
    /// Font size in millipoints.
    pub font_size: u32,
    /// Bold weight.
    pub bold: bool,
    /// Italic style.
    pub italic: bool,
    /// Foreground color.
    pub fore_color: Color,
    /// Background color.
    pub back_color: Color,
    /// Underline kind.
    pub underline: UnderlineKind,
    /// Underline color.
    pub underline_color: Color,
    /// Right-to-left writing system (filled in from the writing-system factory).
    pub right_to_left: bool,
    /// Overlay category tags.
    pub tags: Vec<CategoryId>,
}

impl Default for CharProps {
    fn default() -> Self {
        Self {
            ws: WsId::default(),
            font_family: DEFAULT_FONT.to_string(),
            font_size: 10_000,
            bold: false,
            italic: false,
            fore_color: Color::BLACK,
            back_color: Color::TRANSPARENT,
            underline: UnderlineKind::None,
            underline_color: Color::TRANSPARENT,
            right_to_left: false,
            tags: Vec::new(),
        }
    }
}

impl CharProps {
    /// Default properties in the given writing system.
    pub fn for_ws(ws: WsId) -> Self {
        Self {
            ws,
            ..Self::default()
        }
    }

    /// Apply every field set in `props`.
    pub fn apply(&mut self, props: &TextProps) {
        if let Some(ws) = props.ws {
            self.ws = ws;
        }
        if let Some(family) = &props.font_family {
            self.font_family.clone_from(family);
        }
        if let Some(size) = props.font_size {
            self.font_size = size;
        }
        if let Some(bold) = props.bold {
            self.bold = bold;
        }
        if let Some(italic) = props.italic {
            self.italic = italic;
        }
        if let Some(color) = props.fore_color {
            self.fore_color = color;
        }
        if let Some(color) = props.back_color {
            self.back_color = color;
        }
        if let Some(kind) = props.underline {
            self.underline = kind;
        }
        if let Some(color) = props.underline_color {
            self.underline_color = color;
        }
        if let Some(tags) = &props.tags {
            self.tags.clone_from(tags);
        }
    }

    /// Copy with `props` applied.
    pub fn applied(&self, props: &TextProps) -> Self {
        let mut out = self.clone();
        out.apply(props);
        out
    }

    /// The underline decoration.
    pub fn underline(&self) -> Underline {
        Underline {
            kind: self.underline,
            color: self.underline_color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_only_touches_set_fields() {
        let mut props = CharProps::for_ws(WsId(7));
        props.italic = true;
        props.apply(&TextProps::new().with_bold(true).with_fore_color(Color::RED));

        assert!(props.bold);
        assert!(props.italic);
        assert_eq!(props.fore_color, Color::RED);
        assert_eq!(props.ws, WsId(7));
    }

    #[test]
    fn test_tags_replace() {
        let mut props = CharProps::default();
        props.apply(&TextProps::new().with_tags(vec![CategoryId(1), CategoryId(2)]));
        props.apply(&TextProps::new().with_tags(vec![CategoryId(3)]));
        assert_eq!(props.tags, vec![CategoryId(3)]);
    }

    #[test]
    fn test_color_rgb_packing() {
        assert_eq!(Color::rgb(0x12, 0x34, 0x56), Color(0x0012_3456));
        assert!(Color::TRANSPARENT.is_transparent());
        assert!(!Color::BLACK.is_transparent());
    }
}
