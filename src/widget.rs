use std::marker::PhantomData;

use kurbo::{Point, Size};
use ratatui::layout::{Position, Rect};
use ratatui::prelude::Buffer;
use ratatui::style::{Color, Style};
use ratatui::text::Span;
use ratatui::widgets::{Block, StatefulWidget, Widget};

use crate::icons::IconImage;
use crate::label::TreeLabelProvider;
use crate::model::TreeModel;
use crate::surface::{Paint, Stroke, Surface};
use crate::theme::Font;
use crate::view::TreeView;

/// Pixel size of one terminal cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellSize {
    pub width: f64,
    pub height: f64,
}

impl Default for CellSize {
    /// One row per default item height.
    fn default() -> Self {
        Self {
            width: 8.0,
            height: 18.0,
        }
    }
}

/// [`Surface`] that rasterises onto a grid of terminal cells.
///
/// A pixel maps onto the cell that contains it. Fills set cell backgrounds,
/// horizontal and vertical strokes become box-drawing glyphs, text is written
/// from the cell under its origin.
#[derive(Clone, Debug)]
pub struct BufferSurface {
    buffer: Buffer,
    cell: CellSize,
}

impl BufferSurface {
    pub fn new(columns: u16, rows: u16, cell: CellSize) -> Self {
        Self {
            buffer: Buffer::empty(Rect::new(0, 0, columns, rows)),
            cell,
        }
    }

    pub const fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub const fn cell_size(&self) -> CellSize {
        self.cell
    }

    /// Size of the grid in cells.
    pub const fn grid(&self) -> (u16, u16) {
        (self.buffer.area.width, self.buffer.area.height)
    }

    /// Resizes the grid. Returns `true` if the size changed.
    pub fn resize(&mut self, columns: u16, rows: u16) -> bool {
        if self.grid() == (columns, rows) {
            return false;
        }
        self.buffer.resize(Rect::new(0, 0, columns, rows));
        true
    }

    /// Pixel at the centre of a cell, for mapping terminal mouse events.
    pub fn cell_center(&self, column: u16, row: u16) -> Point {
        Point::new(
            (f64::from(column) + 0.5) * self.cell.width,
            (f64::from(row) + 0.5) * self.cell.height,
        )
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn cell_of(&self, point: Point) -> Option<(u16, u16)> {
        let column = (point.x / self.cell.width).floor();
        let row = (point.y / self.cell.height).floor();
        let (columns, rows) = self.grid();
        if column < 0.0 || row < 0.0 || column >= f64::from(columns) || row >= f64::from(rows) {
            return None;
        }
        Some((column as u16, row as u16))
    }

    /// Cells whose centres lie inside `rect`.
    fn cells_in(&self, rect: kurbo::Rect) -> impl Iterator<Item = (u16, u16)> + use<> {
        let (columns, rows) = self.grid();
        let cell = self.cell;
        (0..rows).flat_map(move |row| {
            (0..columns).filter_map(move |column| {
                let center = Point::new(
                    (f64::from(column) + 0.5) * cell.width,
                    (f64::from(row) + 0.5) * cell.height,
                );
                rect.contains(center).then_some((column, row))
            })
        })
    }

    fn put_glyph(&mut self, position: (u16, u16), symbol: &str, color: Color) {
        if let Some(cell) = self.buffer.cell_mut(Position::from(position))
            && cell.symbol() == " "
        {
            cell.set_symbol(symbol);
            cell.set_fg(color);
        }
    }
}

impl Surface for BufferSurface {
    fn size(&self) -> Size {
        let (columns, rows) = self.grid();
        Size::new(
            f64::from(columns) * self.cell.width,
            f64::from(rows) * self.cell.height,
        )
    }

    fn fill_rect(&mut self, rect: kurbo::Rect, paint: &Paint) {
        let color = match *paint {
            Paint::Solid(color) => color,
            Paint::LinearGradient { from, .. } => from,
        };
        let full = rect.contains(Point::ZERO) && rect.contains(self.size().to_rect().center());
        for position in self.cells_in(rect).collect::<Vec<_>>() {
            if let Some(cell) = self.buffer.cell_mut(Position::from(position)) {
                if full {
                    cell.reset();
                }
                cell.set_bg(color);
            }
        }
    }

    fn stroke_rect(&mut self, rect: kurbo::Rect, color: Color) {
        // Cells are too coarse for outlines; thin rects get their text recoloured.
        if rect.height() > self.cell.height {
            return;
        }
        for position in self.cells_in(rect).collect::<Vec<_>>() {
            if let Some(cell) = self.buffer.cell_mut(Position::from(position))
                && cell.symbol() != " "
            {
                cell.set_fg(color);
            }
        }
    }

    fn stroke_path(&mut self, points: &[Point], stroke: &Stroke<'_>) {
        let dashed = !stroke.dash.is_empty();
        for segment in points.windows(2) {
            let (a, b) = (segment[0], segment[1]);
            let (Some(start), Some(end)) = (self.cell_of(a), self.cell_of(b)) else {
                continue;
            };
            if start.1 == end.1 {
                let symbol = if dashed { "╌" } else { "─" };
                for column in start.0.min(end.0)..=start.0.max(end.0) {
                    self.put_glyph((column, start.1), symbol, stroke.color);
                }
            } else if start.0 == end.0 {
                let symbol = if dashed { "┆" } else { "│" };
                for row in start.1.min(end.1)..=start.1.max(end.1) {
                    self.put_glyph((start.0, row), symbol, stroke.color);
                }
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn measure_text(&mut self, text: &str, _font: &Font) -> f64 {
        Span::raw(text).width() as f64 * self.cell.width
    }

    fn fill_text(&mut self, text: &str, origin: Point, _font: &Font, color: Color) {
        let Some((column, row)) = self.cell_of(origin) else {
            return;
        };
        self.buffer
            .set_string(column, row, text, Style::default().fg(color));
    }

    fn draw_image(&mut self, _image: &IconImage, rect: kurbo::Rect) {
        if let Some(position) = self.cell_of(rect.center())
            && let Some(cell) = self.buffer.cell_mut(Position::from(position))
        {
            cell.set_symbol("▪");
        }
    }
}

/// Stateful widget showing a [`TreeView`] painted on a [`BufferSurface`].
///
/// The view keeps its own buffer; rendering resizes it to the area (which
/// repaints) and copies the cells over.
pub struct TreeCanvas<'a, M, L> {
    block: Option<Block<'a>>,
    _marker: PhantomData<fn() -> (M, L)>,
}

impl<M, L> Default for TreeCanvas<'_, M, L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, M, L> TreeCanvas<'a, M, L> {
    pub const fn new() -> Self {
        Self {
            block: None,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl<M, L> StatefulWidget for TreeCanvas<'_, M, L>
where
    M: TreeModel,
    L: TreeLabelProvider<M>,
{
    type State = TreeView<M, L, BufferSurface>;

    fn render(self, area: Rect, buf: &mut Buffer, view: &mut Self::State) {
        let inner = match self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.render(area, buf);
                inner
            }
            None => area,
        };
        if view.surface_mut().resize(inner.width, inner.height) {
            view.handle_resize();
        } else if view.renderer().render_count() == 0 {
            view.invalidate();
        }

        let source = view.surface().buffer();
        for row in 0..inner.height {
            for column in 0..inner.width {
                if let Some(cell) = source.cell((column, row))
                    && let Some(target) = buf.cell_mut((inner.x + column, inner.y + row))
                {
                    *target = cell.clone();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::DebugLabels;
    use crate::model::MutableTreeModel;

    fn row_text(buf: &Buffer, y: u16) -> String {
        (buf.area.x..buf.area.right())
            .map(|x| buf[(x, y)].symbol().to_owned())
            .collect()
    }

    #[test]
    fn cell_mapping_and_size() {
        let surface = BufferSurface::new(10, 4, CellSize::default());
        assert_eq!(surface.size(), Size::new(80.0, 72.0));
        assert_eq!(surface.cell_of(Point::new(8.5, 18.0)), Some((1, 1)));
        assert_eq!(surface.cell_of(Point::new(-1.0, 0.0)), None);
        assert_eq!(surface.cell_of(Point::new(80.0, 0.0)), None);
        assert_eq!(surface.cell_center(1, 1), Point::new(12.0, 27.0));
    }

    #[test]
    fn text_and_lines_land_in_cells() {
        let mut surface = BufferSurface::new(10, 2, CellSize::default());
        let font = Font::new("mono", 9.0);
        surface.fill_text("ab", Point::new(16.0, 27.0), &font, Color::Red);
        surface.stroke_path(
            &[Point::new(0.0, 9.0), Point::new(30.0, 9.0)],
            &Stroke::solid(Color::Gray),
        );
        assert_eq!(row_text(surface.buffer(), 0), "────      ");
        assert_eq!(row_text(surface.buffer(), 1), "  ab      ");
        assert_eq!(surface.measure_text("ab", &font), 16.0);
    }

    #[test]
    fn canvas_renders_tree_into_area() {
        let mut model = MutableTreeModel::new(0_u32);
        model.add(0, 1, None);
        model.add(0, 2, None);
        let mut view = TreeView::builder()
            .model(model)
            .labels(DebugLabels)
            .surface(BufferSurface::new(1, 1, CellSize::default()))
            .build()
            .unwrap();
        view.state_mut().set_expanded(0, true);

        let area = Rect::new(0, 0, 20, 5);
        let mut buf = Buffer::empty(area);
        TreeCanvas::new().render(area, &mut buf, &mut view);

        assert_eq!(view.surface().grid(), (20, 5));
        let text: Vec<String> = (0..5).map(|y| row_text(&buf, y)).collect();
        assert!(text[1].contains('0'), "{text:?}");
        assert!(text[2].contains('1'), "{text:?}");
        assert!(text[3].contains('2'), "{text:?}");
    }
}
