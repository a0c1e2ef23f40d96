//! Category overlays.
//!
//! Text can be tagged with [`CategoryId`]s (through [`TextProps::tags`](crate::TextProps)).
//! An overlay maps categories to display styles; a paragraph source bound to an overlay
//! colors tagged text accordingly. The owning root keeps the overlay alive and the source
//! holds only a [`Weak`] reference, so dropping the overlay silently turns coloring off.

use crate::props::{CategoryId, CharProps, Color, UnderlineKind};
use std::collections::HashMap;
use std::sync::Weak;

/// Display style attached to one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CategoryStyle {
    /// Foreground color.
    pub fore_color: Option<Color>,
    /// Background color.
    pub back_color: Option<Color>,
    /// Underline kind.
    pub underline: Option<UnderlineKind>,
    /// Underline color.
    pub underline_color: Option<Color>,
}

/// Lookup of category display styles.
pub trait CategoryTable {
    /// Style for `category`, or `None` if the category is not displayed.
    fn style_for(&self, category: CategoryId) -> Option<CategoryStyle>;
}

/// Non-owning link from a text source to a category table.
pub type OverlayLink = Weak<dyn CategoryTable>;

/// A named, in-memory [`CategoryTable`].
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    name: String,
    styles: HashMap<CategoryId, CategoryStyle>,
}

impl Overlay {
    /// An empty overlay.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            styles: HashMap::new(),
        }
    }

    /// Overlay name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set (or replace) the style of a category.
    pub fn set_style(&mut self, category: CategoryId, style: CategoryStyle) {
        self.styles.insert(category, style);
    }

    /// Builder-style [`Overlay::set_style`].
    pub fn with_style(mut self, category: CategoryId, style: CategoryStyle) -> Self {
        self.set_style(category, style);
        self
    }

    /// Stop displaying a category.
    pub fn remove_style(&mut self, category: CategoryId) -> Option<CategoryStyle> {
        self.styles.remove(&category)
    }
}

impl CategoryTable for Overlay {
    fn style_for(&self, category: CategoryId) -> Option<CategoryStyle> {
        self.styles.get(&category).copied()
    }
}

/// Merge the style of the first displayed tag in `props.tags` into `props`.
///
/// Returns `true` if a tag matched.
pub fn apply_overlay(props: &mut CharProps, table: &dyn CategoryTable) -> bool {
    let Some(style) = props.tags.iter().find_map(|&tag| table.style_for(tag)) else {
        return false;
    };
    if let Some(color) = style.fore_color {
        props.fore_color = color;
    }
    if let Some(color) = style.back_color {
        props.back_color = color;
    }
    if let Some(kind) = style.underline {
        props.underline = kind;
    }
    if let Some(color) = style.underline_color {
        props.underline_color = color;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_displayed_tag_wins() {
        let overlay = Overlay::new("notes")
            .with_style(
                CategoryId(2),
                CategoryStyle {
                    fore_color: Some(Color::RED),
                    ..CategoryStyle::default()
                },
            )
            .with_style(
                CategoryId(3),
                CategoryStyle {
                    fore_color: Some(Color::BLUE),
                    underline: Some(UnderlineKind::Dotted),
                    ..CategoryStyle::default()
                },
            );

        let mut props = CharProps {
            tags: vec![CategoryId(1), CategoryId(3), CategoryId(2)],
            ..CharProps::default()
        };
        assert!(apply_overlay(&mut props, &overlay));
        assert_eq!(props.fore_color, Color::BLUE);
        assert_eq!(props.underline, UnderlineKind::Dotted);
    }

    #[test]
    fn test_untagged_text_unchanged() {
        let overlay = Overlay::new("empty");
        let mut props = CharProps::default();
        let before = props.clone();
        assert!(!apply_overlay(&mut props, &overlay));
        assert_eq!(props, before);
    }
}
