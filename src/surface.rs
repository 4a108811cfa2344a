use kurbo::{Point, Rect, Size};
use ratatui::style::Color;

use crate::icons::IconImage;
use crate::theme::Font;

/// Fill style for rectangles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Paint {
    Solid(Color),
    /// Two-stop linear gradient from `start` (color `from`) to `end` (color `to`).
    LinearGradient {
        start: Point,
        end: Point,
        from: Color,
        to: Color,
    },
}

/// Stroke style for paths.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke<'a> {
    pub color: Color,
    /// Alternating dash and gap lengths; empty for a solid line.
    pub dash: &'a [f64],
}

impl Stroke<'_> {
    pub const fn solid(color: Color) -> Self {
        Self { color, dash: &[] }
    }
}

/// Pixel drawing backend.
///
/// Coordinates are physical surface pixels. Text is drawn left aligned with
/// `origin.y` on the vertical middle of the glyphs.
pub trait Surface {
    /// Size of the drawable area in pixels.
    fn size(&self) -> Size;
    fn fill_rect(&mut self, rect: Rect, paint: &Paint);
    fn stroke_rect(&mut self, rect: Rect, color: Color);
    /// Strokes an open polyline through `points`.
    fn stroke_path(&mut self, points: &[Point], stroke: &Stroke<'_>);
    /// Width in pixels of `text` rendered with `font`.
    fn measure_text(&mut self, text: &str, font: &Font) -> f64;
    fn fill_text(&mut self, text: &str, origin: Point, font: &Font, color: Color);
    fn draw_image(&mut self, image: &IconImage, rect: Rect);
}

/// A recorded drawing call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    FillRect {
        rect: Rect,
        paint: Paint,
    },
    StrokeRect {
        rect: Rect,
        color: Color,
    },
    StrokePath {
        points: Vec<Point>,
        color: Color,
        dashed: bool,
    },
    Text {
        text: String,
        origin: Point,
        color: Color,
    },
    Image {
        key: String,
        rect: Rect,
    },
}

/// Headless [`Surface`] that records every call.
///
/// Text is measured at a fixed advance per character, which makes layouts
/// reproducible without a font rasterizer.
#[derive(Clone, Debug)]
pub struct RecordingSurface {
    size: Size,
    char_width: f64,
    commands: Vec<DrawCommand>,
    measured: usize,
}

impl RecordingSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            size: Size::new(width, height),
            char_width: 6.0,
            commands: Vec::new(),
            measured: 0,
        }
    }

    #[must_use]
    pub const fn with_char_width(mut self, char_width: f64) -> Self {
        self.char_width = char_width;
        self
    }

    pub const fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Number of `measure_text` calls so far.
    pub const fn measure_calls(&self) -> usize {
        self.measured
    }

    /// Texts drawn so far, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> Size {
        self.size
    }

    fn fill_rect(&mut self, rect: Rect, paint: &Paint) {
        self.commands.push(DrawCommand::FillRect {
            rect,
            paint: *paint,
        });
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::StrokeRect { rect, color });
    }

    fn stroke_path(&mut self, points: &[Point], stroke: &Stroke<'_>) {
        self.commands.push(DrawCommand::StrokePath {
            points: points.to_vec(),
            color: stroke.color,
            dashed: !stroke.dash.is_empty(),
        });
    }

    #[allow(clippy::cast_precision_loss)]
    fn measure_text(&mut self, text: &str, _font: &Font) -> f64 {
        self.measured += 1;
        text.chars().count() as f64 * self.char_width
    }

    fn fill_text(&mut self, text: &str, origin: Point, _font: &Font, color: Color) {
        self.commands.push(DrawCommand::Text {
            text: text.to_owned(),
            origin,
            color,
        });
    }

    fn draw_image(&mut self, image: &IconImage, rect: Rect) {
        self.commands.push(DrawCommand::Image {
            key: image.key.clone(),
            rect,
        });
    }
}
