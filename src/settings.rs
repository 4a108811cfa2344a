#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Layout constants, in pixels (font height in points).
///
/// Rows have a fixed height and every depth level is indented by
/// `depth_margin_left`; all item geometry is derived from these values.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderSettings {
    pub canvas_padding_top: f64,
    pub canvas_padding_left: f64,
    pub box_width: f64,
    pub box_height: f64,
    pub icon_width: f64,
    pub icon_height: f64,
    pub icon_padding_right: f64,
    pub item_height: f64,
    pub item_margin_bottom: f64,
    pub item_padding_left: f64,
    pub item_padding_top: f64,
    pub depth_margin_left: f64,
    pub font_height: f64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            canvas_padding_top: 8.0,
            canvas_padding_left: 8.0,
            box_width: 8.0,
            box_height: 8.0,
            icon_width: 16.0,
            icon_height: 16.0,
            icon_padding_right: 3.0,
            item_height: 18.0,
            item_margin_bottom: 0.0,
            item_padding_left: 3.0,
            item_padding_top: 1.0,
            depth_margin_left: 20.0,
            font_height: 9.0,
        }
    }
}

impl RenderSettings {
    /// Returns a copy with every size multiplied by `factor`.
    ///
    /// Always derive from the unscaled settings; applying this to an already
    /// zoomed value compounds the factors.
    #[must_use]
    pub fn zoomed(&self, factor: f64) -> Self {
        Self {
            canvas_padding_top: self.canvas_padding_top * factor,
            canvas_padding_left: self.canvas_padding_left * factor,
            box_width: self.box_width * factor,
            box_height: self.box_height * factor,
            icon_width: self.icon_width * factor,
            icon_height: self.icon_height * factor,
            icon_padding_right: self.icon_padding_right * factor,
            item_height: self.item_height * factor,
            item_margin_bottom: self.item_margin_bottom * factor,
            item_padding_left: self.item_padding_left * factor,
            item_padding_top: self.item_padding_top * factor,
            depth_margin_left: self.depth_margin_left * factor,
            font_height: self.font_height * factor,
        }
    }

    /// Vertical distance between the tops of two consecutive rows.
    #[inline]
    pub fn line_pitch(&self) -> f64 {
        self.item_height + self.item_margin_bottom
    }
}

/// Behavioural switches of the tree view.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeOptions {
    /// Enables drag-and-drop reparenting.
    pub dnd_enabled: bool,
    /// Pointer travel in pixels before a press turns into a drag.
    pub drag_threshold: f64,
    /// Rows scrolled per wheel notch.
    pub wheel_lines: f64,
    /// Upper bound for cached text measurements (`None` keeps everything).
    pub text_cache_limit: Option<usize>,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            dnd_enabled: true,
            drag_threshold: 5.0,
            wheel_lines: 3.0,
            text_cache_limit: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_scales_every_size() {
        let base = RenderSettings::default();
        let zoomed = base.zoomed(2.0);
        assert_eq!(zoomed.item_height, 36.0);
        assert_eq!(zoomed.depth_margin_left, 40.0);
        assert_eq!(zoomed.canvas_padding_top, 16.0);
        assert_eq!(zoomed.font_height, 18.0);
    }

    #[test]
    fn zoom_from_base_is_not_cumulative() {
        let base = RenderSettings::default();
        let twice = base.zoomed(2.0);
        let back = base.zoomed(1.0);
        assert_ne!(twice, base);
        assert_eq!(back, base);
    }
}
