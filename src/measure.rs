//! Row geometry.
//!
//! [`ItemMeasurements`] lays out one row (expand box, icon, label, focus
//! rectangle) in virtual space from its line and depth. Painting, hit
//! testing and drop classification all read the same rectangles.

use rustc_hash::FxHashMap;

use crate::geometry::{VirtualLine, VirtualPoint, VirtualRect};
use crate::settings::RenderSettings;
use crate::theme::Font;

/// Sub-area of a row reported by hit tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HitArea {
    /// The expand/collapse glyph.
    Box,
    /// The indentation strip left of the icon.
    Expand,
    Text,
    Icon,
    Focus,
    /// Anywhere else on the row.
    Item,
}

impl HitArea {
    /// Lower-case name, as used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Box => "box",
            Self::Expand => "expand",
            Self::Text => "text",
            Self::Icon => "icon",
            Self::Focus => "focus",
            Self::Item => "item",
        }
    }

    /// Returns `true` for the areas that toggle expansion on press.
    pub const fn is_toggle(self) -> bool {
        matches!(self, Self::Box | Self::Expand)
    }
}

/// Geometry of one rendered row, in virtual space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ItemMeasurements {
    /// The whole row, full width regardless of depth.
    pub item: VirtualRect,
    pub icon: VirtualRect,
    /// Indentation strip that toggles expansion when pressed.
    pub expand: VirtualRect,
    /// The plus/minus box inside `expand`.
    pub expand_box: VirtualRect,
    /// Label bounds; `text.left()` is where the label is drawn.
    pub text: VirtualRect,
    /// Selection highlight around the label.
    pub focus: VirtualRect,
    /// Connector from the parent's vertical line to the icon.
    pub horizontal_line: VirtualLine,
    /// The parent's vertical line across this row.
    pub vertical_line: VirtualLine,
}

impl Default for ItemMeasurements {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl ItemMeasurements {
    /// Zero-sized measurements, returned for nodes that are not visible.
    pub const EMPTY: Self = Self {
        item: VirtualRect::ZERO,
        icon: VirtualRect::ZERO,
        expand: VirtualRect::ZERO,
        expand_box: VirtualRect::ZERO,
        text: VirtualRect::ZERO,
        focus: VirtualRect::ZERO,
        horizontal_line: VirtualLine::ZERO,
        vertical_line: VirtualLine::ZERO,
    };

    /// Computes the geometry of the row at `line`, for a node at `depth`
    /// (the root has depth 1).
    ///
    /// Only the row position, the depth and the label width matter; sibling
    /// rows never influence each other.
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(
        settings: &RenderSettings,
        line: usize,
        depth: usize,
        row_width: f64,
        text_width: f64,
    ) -> Self {
        let s = settings;
        let item = VirtualRect::new(
            s.item_padding_left,
            s.canvas_padding_top + s.item_padding_top + line as f64 * s.line_pitch(),
            row_width,
            s.item_height,
        );

        let indent = depth.saturating_sub(1) as f64 * s.depth_margin_left;
        let icon = VirtualRect::new(
            s.canvas_padding_left + item.left() + indent,
            item.center_y() - s.icon_height / 2.0,
            s.icon_width,
            s.icon_height,
        );

        let line_y = item.top() + s.item_height / 2.0;
        let line_x = icon.left() - s.depth_margin_left + s.icon_width / 2.0;
        let horizontal_line = VirtualLine::new((line_x, line_y), (icon.left(), line_y));
        let vertical_line = VirtualLine::new(
            (line_x, item.top() - s.item_margin_bottom),
            (line_x, item.bottom()),
        );

        let expand = VirtualRect::new(
            icon.left() - s.depth_margin_left,
            icon.top(),
            s.depth_margin_left,
            s.item_height,
        );
        let expand_box = VirtualRect::new(
            icon.center_x() - s.depth_margin_left - s.box_width / 2.0,
            icon.center_y() - s.box_height / 2.0,
            s.box_width,
            s.box_height,
        );

        let text = VirtualRect::new(
            icon.right() + s.icon_padding_right + 2.0,
            item.top() + 2.0,
            text_width,
            s.item_height - 3.0,
        );
        let focus = VirtualRect::new(
            icon.right() + s.icon_padding_right,
            text.top(),
            text_width + 6.0,
            text.height(),
        );

        Self {
            item,
            icon,
            expand,
            expand_box,
            text,
            focus,
            horizontal_line,
            vertical_line,
        }
    }

    /// Returns `true` if these are the zero measurements of a hidden node.
    pub fn is_empty(&self) -> bool {
        self.item.width() == 0.0 && self.item.height() == 0.0
    }

    /// Tests `point` against the row and its sub-areas.
    ///
    /// Sub-areas are checked in a fixed order so overlapping areas resolve
    /// to the first one listed.
    pub fn hit(&self, point: VirtualPoint) -> Option<HitArea> {
        if !self.item.contains(point) {
            return None;
        }
        let area = [
            (self.expand_box, HitArea::Box),
            (self.expand, HitArea::Expand),
            (self.text, HitArea::Text),
            (self.icon, HitArea::Icon),
            (self.focus, HitArea::Focus),
        ]
        .into_iter()
        .find_map(|(rect, area)| rect.contains(point).then_some(area));
        Some(area.unwrap_or(HitArea::Item))
    }
}

const TEXT_BASELINE: &str = "middle";

/// Text width cache keyed by font, baseline and text.
#[derive(Clone, Debug, Default)]
pub struct TextMetricsCache {
    widths: FxHashMap<String, FxHashMap<String, f64>>,
    len: usize,
    limit: Option<usize>,
}

impl TextMetricsCache {
    /// Creates an empty cache; `limit` caps the number of stored widths.
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Returns the cached width of `text`, computing it with `measure` on a miss.
    pub fn width(&mut self, text: &str, font: &Font, measure: impl FnOnce() -> f64) -> f64 {
        let font_key = format!("{} {TEXT_BASELINE}", font.shorthand());
        if let Some(width) = self.widths.get(&font_key).and_then(|texts| texts.get(text)) {
            return *width;
        }
        if self.limit.is_some_and(|limit| self.len >= limit) {
            tracing::trace!(entries = self.len, "text metrics cache full, clearing");
            self.clear();
        }
        let width = measure();
        self.widths
            .entry(font_key)
            .or_default()
            .insert(text.to_owned(), width);
        self.len += 1;
        width
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.widths.clear();
        self.len = 0;
    }
}
