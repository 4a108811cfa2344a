use std::borrow::Cow;

use ratatui::style::Color;

/// Font used for item labels.
#[derive(Clone, Debug, PartialEq)]
pub struct Font {
    pub family: Cow<'static, str>,
    /// Size in points.
    pub size: f64,
}

impl Font {
    pub fn new(family: impl Into<Cow<'static, str>>, size: f64) -> Self {
        Self {
            family: family.into(),
            size,
        }
    }

    /// CSS-like shorthand, e.g. `9pt Segoe UI`. Used as a cache key.
    pub fn shorthand(&self) -> String {
        format!("{}pt {}", self.size, self.family)
    }
}

/// Colors, font and dash pattern used when painting the tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Theme {
    pub background: Color,
    pub font_family: Cow<'static, str>,
    pub dnd_source_background: Color,
    pub dnd_target_allowed: Color,
    pub dnd_target_disallowed: Color,
    pub item_line: Color,
    pub item_line_dash: Cow<'static, [f64]>,
    pub item_box_stroke: Color,
    pub item_box_gradient_top: Color,
    pub item_box_gradient_bottom: Color,
    pub plus_stroke: Color,
    pub minus_stroke: Color,
    pub focus_stroke: Color,
    pub focus_fill: Color,
    pub dnd_selected_disallowed_fill: Color,
    pub text: Color,
    pub text_selected: Color,
    pub scrollbar_fill: Color,
    pub scrollbar_stroke: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::Rgb(255, 255, 255),
            font_family: Cow::Borrowed("Segoe UI"),
            dnd_source_background: Color::Rgb(220, 220, 255),
            dnd_target_allowed: Color::Rgb(100, 100, 255),
            dnd_target_disallowed: Color::Rgb(255, 100, 100),
            item_line: Color::Rgb(100, 100, 100),
            item_line_dash: Cow::Borrowed(&[1.0, 2.0]),
            item_box_stroke: Color::Rgb(145, 145, 145),
            item_box_gradient_top: Color::Rgb(252, 252, 252),
            item_box_gradient_bottom: Color::Rgb(227, 227, 227),
            plus_stroke: Color::Rgb(41, 66, 114),
            minus_stroke: Color::Rgb(75, 99, 167),
            focus_stroke: Color::Rgb(0, 0, 0),
            focus_fill: Color::Rgb(51, 153, 255),
            dnd_selected_disallowed_fill: Color::Rgb(255, 100, 100),
            text: Color::Rgb(0, 0, 0),
            text_selected: Color::Rgb(255, 255, 255),
            scrollbar_fill: Color::Rgb(51, 153, 255),
            scrollbar_stroke: Color::Rgb(0, 0, 0),
        }
    }
}

impl Theme {
    /// Label font at the given point size.
    pub fn font(&self, size: f64) -> Font {
        Font::new(self.font_family.clone(), size)
    }
}
