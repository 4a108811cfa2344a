use std::cell::RefCell;
use std::rc::Rc;

use kurbo::{Point, Rect};
use smallvec::{SmallVec, smallvec};

use crate::dnd::{AllowanceReply, AllowanceTally, DndPolicy, DragSession, DropTarget, Placement, classify};
use crate::geometry::{VirtualPoint, Viewport, snap};
use crate::icons::IconCache;
use crate::label::TreeLabelProvider;
use crate::measure::{ItemMeasurements, TextMetricsCache};
use crate::model::TreeModel;
use crate::pass::{PassMode, RenderEntry, RenderPass, TreeHit};
use crate::settings::{RenderSettings, TreeOptions};
use crate::state::TreeState;
use crate::surface::{Paint, Stroke, Surface};
use crate::theme::{Font, Theme};

/// Width of the vertical scrollbar, in pixels.
pub const SCROLLBAR_WIDTH: f64 = 10.0;

/// Everything a pass reads besides the renderer's own caches.
pub(crate) struct RenderContext<'a, M: TreeModel, L> {
    pub model: &'a M,
    pub labels: &'a L,
    pub state: &'a TreeState<M::Id>,
    pub settings: &'a RenderSettings,
    pub theme: &'a Theme,
    pub options: &'a TreeOptions,
    pub session: &'a mut DragSession<M::Id>,
    pub policy: &'a mut dyn DndPolicy<M::Id>,
}

/// Paints, hit-tests and measures rows.
///
/// Owns the caches that outlive a single pass: text widths, icons, the
/// render count used as generation for async answers, and the content height
/// of the last paint.
#[derive(Default)]
pub struct TreeRenderer {
    text_metrics: TextMetricsCache,
    icons: IconCache,
    render_count: u64,
    previous_total_height: f64,
}

impl TreeRenderer {
    pub fn new(text_cache_limit: Option<usize>) -> Self {
        Self {
            text_metrics: TextMetricsCache::new(text_cache_limit),
            ..Self::default()
        }
    }

    /// Number of paint passes so far.
    pub const fn render_count(&self) -> u64 {
        self.render_count
    }

    /// Content height computed by the last paint pass.
    pub const fn previous_total_height(&self) -> f64 {
        self.previous_total_height
    }

    pub const fn icons(&self) -> &IconCache {
        &self.icons
    }

    pub const fn icons_mut(&mut self) -> &mut IconCache {
        &mut self.icons
    }

    pub const fn text_metrics(&self) -> &TextMetricsCache {
        &self.text_metrics
    }

    pub fn clear_text_metrics(&mut self) {
        self.text_metrics.clear();
    }

    pub(crate) fn run<M, L>(&mut self, pass: &mut RenderPass<'_, M::Id>, ctx: &mut RenderContext<'_, M, L>)
    where
        M: TreeModel,
        L: TreeLabelProvider<M>,
    {
        if pass.is_paint() {
            self.render_background(pass, ctx.theme);
            ctx.session.clear_target();
        }
        let state = ctx.state;
        let model = ctx.model;
        pass.traverse(
            model,
            |id| state.is_expanded(id),
            |pass, entry| self.render_item(pass, entry, ctx),
        );
        if pass.is_paint() {
            self.render_scrollbar(pass, ctx.settings, ctx.theme);
        }
    }

    fn render_background<Id: Copy + PartialEq>(&mut self, pass: &mut RenderPass<'_, Id>, theme: &Theme) {
        self.render_count += 1;
        pass.set_generation(self.render_count);
        let surface = pass.surface();
        let size = surface.size();
        surface.fill_rect(size.to_rect(), &Paint::Solid(theme.background));
    }

    fn render_item<M, L>(
        &mut self,
        pass: &mut RenderPass<'_, M::Id>,
        entry: &RenderEntry<'_, M::Id>,
        ctx: &mut RenderContext<'_, M, L>,
    ) where
        M: TreeModel,
        L: TreeLabelProvider<M>,
    {
        if let PassMode::Measure(target) = pass.mode()
            && target != entry.node
        {
            return;
        }

        let text = ctx.labels.text(ctx.model, entry.node);
        let font = ctx.theme.font(ctx.settings.font_height);
        let measurements = {
            let surface = pass.surface();
            let text_width = self
                .text_metrics
                .width(&text, &font, || surface.measure_text(&text, &font));
            ItemMeasurements::compute(
                ctx.settings,
                entry.line,
                entry.depth(),
                surface.size().width,
                text_width,
            )
        };

        match pass.mode() {
            PassMode::HitTest(point) => {
                if let Some(area) = measurements.hit(point) {
                    pass.set_hit(TreeHit {
                        node: entry.node,
                        area,
                        measurements,
                    });
                    pass.abort();
                }
            }
            PassMode::Measure(_) => {
                pass.set_measured(measurements);
                pass.abort();
            }
            PassMode::Paint => {
                self.paint_item(pass, entry, &measurements, &text, &font, ctx);
            }
        }
    }

    fn paint_item<M, L>(
        &mut self,
        pass: &mut RenderPass<'_, M::Id>,
        entry: &RenderEntry<'_, M::Id>,
        m: &ItemMeasurements,
        text: &str,
        font: &Font,
        ctx: &mut RenderContext<'_, M, L>,
    ) where
        M: TreeModel,
        L: TreeLabelProvider<M>,
    {
        let node = entry.node;
        let viewport = *pass.viewport();
        let expanded = ctx.state.is_expanded(node);
        let dnd_active = ctx.options.dnd_enabled && ctx.session.is_active(ctx.options.drag_threshold);

        if dnd_active && ctx.session.target().is_none() {
            Self::resolve_drop_target(pass.generation(), entry, m, expanded, ctx);
        }
        let target = ctx
            .session
            .target()
            .filter(|target| target.node == node)
            .map(|target| (target.placement, target.verdict()));
        let inside_target = matches!(target, Some((Placement::Inside, _)));
        let selected = ctx.state.is_selected(node);
        let theme = ctx.theme;

        let surface = pass.surface();
        let row = m.item.to_physical(&viewport);
        if row.y1 < 0.0 || row.y0 > surface.size().height {
            return;
        }

        if dnd_active && ctx.session.is_source(node) {
            surface.fill_rect(row, &Paint::Solid(theme.dnd_source_background));
        }

        paint_lines(surface, &viewport, entry, m, ctx.settings, theme);

        if let Some(key) = ctx.labels.icon_key(ctx.model, node)
            && let Some(icon) = self.icons.get_or_request(&key)
        {
            surface.draw_image(&icon, m.icon.to_physical(&viewport));
        }

        if entry.parent.is_some() && ctx.model.child_count(node) > 0 {
            paint_expand_box(surface, &viewport, m, expanded, theme);
        }

        if selected || inside_target {
            let fill = match target {
                Some((Placement::Inside, Some(false))) => theme.dnd_selected_disallowed_fill,
                _ => theme.focus_fill,
            };
            let focus = snap_rect(m.focus.to_physical(&viewport));
            surface.fill_rect(focus, &Paint::Solid(fill));
            if selected {
                surface.stroke_rect(focus, theme.focus_stroke);
            }
        }

        let color = if selected || inside_target {
            theme.text_selected
        } else {
            theme.text
        };
        let origin = viewport.virtual_to_physical(VirtualPoint::new(m.text.left(), m.text.center_y()));
        surface.fill_text(text, origin, font, color);

        if let Some((placement, verdict)) = target {
            paint_drop_marker(surface, &viewport, placement, m, verdict, theme);
        }
    }

    /// Makes `entry` the frame's drop target if the pointer classifies
    /// against its row, and asks the policy about every source.
    ///
    /// Drops that no model could carry out resolve no target: beside the
    /// root, or into a source's own subtree.
    fn resolve_drop_target<M, L>(
        generation: u64,
        entry: &RenderEntry<'_, M::Id>,
        m: &ItemMeasurements,
        expanded: bool,
        ctx: &mut RenderContext<'_, M, L>,
    ) where
        M: TreeModel,
    {
        let Some(point) = ctx.session.current_point() else {
            return;
        };
        let Some(placement) = classify(point.y(), &m.item, ctx.settings, expanded) else {
            return;
        };

        // The entry whose node becomes the new parent.
        let parent_entry = match placement {
            Placement::Inside => entry,
            Placement::Above | Placement::Below => match entry.parent {
                Some(parent) => parent,
                None => {
                    tracing::trace!(?placement, "no drop beside the root");
                    return;
                }
            },
        };
        let sources: SmallVec<[M::Id; 4]> = ctx.session.sources().iter().copied().collect();
        let into_own_subtree = std::iter::once(parent_entry)
            .chain(parent_entry.ancestors())
            .any(|ancestor| sources.contains(&ancestor.node));
        if into_own_subtree {
            tracing::trace!(target_node = ?entry.node, "no drop into a dragged subtree");
            return;
        }
        let mut path: SmallVec<[M::Id; 8]> = smallvec![entry.node];
        if parent_entry.node != entry.node {
            path.push(parent_entry.node);
        }

        let tally = Rc::new(RefCell::new(AllowanceTally::new(generation)));
        for source in &sources {
            ctx.policy
                .is_target_allowed(*source, &path, AllowanceReply::new(&tally));
        }
        // Answers given inside the call are painted by this pass.
        tally.borrow_mut().take_changed();

        tracing::debug!(
            target_node = ?entry.node,
            ?placement,
            generation,
            verdict = ?tally.borrow().verdict(),
            "drop target resolved"
        );
        ctx.session.set_target(DropTarget {
            node: entry.node,
            placement,
            path,
            measurements: *m,
            tally,
        });
    }

    #[allow(clippy::cast_precision_loss)]
    fn render_scrollbar<Id: Copy + PartialEq>(
        &mut self,
        pass: &mut RenderPass<'_, Id>,
        settings: &RenderSettings,
        theme: &Theme,
    ) {
        let total = pass.last_line() as f64 * settings.item_height;
        self.previous_total_height = total;
        let y_offset = pass.viewport().y_offset;
        let surface = pass.surface();
        let size = surface.size();
        if total <= 0.0 {
            return;
        }
        let visible = size.height / total;
        if visible >= 1.0 {
            return;
        }
        let bar = Rect::from_origin_size(
            (size.width - SCROLLBAR_WIDTH, size.height * (y_offset / total)),
            (SCROLLBAR_WIDTH, size.height * visible),
        );
        surface.fill_rect(bar, &Paint::Solid(theme.scrollbar_fill));
        surface.stroke_rect(bar, theme.scrollbar_stroke);
    }

    /// Redraws the marker of a drop target whose answers arrived after the
    /// paint pass. Returns `false` if the target belongs to an older frame.
    pub(crate) fn repaint_drop_marker<Id>(
        &self,
        surface: &mut dyn Surface,
        viewport: &Viewport,
        target: &DropTarget<Id>,
        theme: &Theme,
    ) -> bool {
        if target.generation() != self.render_count {
            tracing::debug!(
                stale = target.generation(),
                current = self.render_count,
                "discarding stale drop allowance"
            );
            return false;
        }
        paint_drop_marker(
            surface,
            viewport,
            target.placement,
            &target.measurements,
            target.verdict(),
            theme,
        );
        true
    }
}

fn snapped(viewport: &Viewport, x: f64, y: f64) -> Point {
    let p = viewport.virtual_to_physical(VirtualPoint::new(x, y));
    Point::new(snap(p.x), snap(p.y))
}

fn snap_rect(rect: Rect) -> Rect {
    let x0 = snap(rect.x0);
    let y0 = snap(rect.y0);
    Rect::new(x0, y0, x0 + rect.width(), y0 + rect.height())
}

/// Dashed connectors: the row's own tick and vertical line, plus one
/// vertical line per ancestor that still has siblings below it.
fn paint_lines<Id: Copy>(
    surface: &mut dyn Surface,
    viewport: &Viewport,
    entry: &RenderEntry<'_, Id>,
    m: &ItemMeasurements,
    settings: &RenderSettings,
    theme: &Theme,
) {
    if entry.parent.is_none() {
        return;
    }
    let stroke = Stroke {
        color: theme.item_line,
        dash: &theme.item_line_dash,
    };
    let h = &m.horizontal_line;
    surface.stroke_path(
        &[
            snapped(viewport, h.left(), h.top()),
            snapped(viewport, h.right(), h.top()),
        ],
        &stroke,
    );

    let v = &m.vertical_line;
    let bottom = if entry.is_last {
        m.item.center_y()
    } else {
        v.bottom()
    };
    surface.stroke_path(
        &[
            snapped(viewport, v.left(), v.top()),
            snapped(viewport, v.left(), bottom),
        ],
        &stroke,
    );

    let mut x = v.left();
    for ancestor in entry.ancestors() {
        if ancestor.parent.is_none() {
            break;
        }
        x -= settings.depth_margin_left;
        if !ancestor.is_last {
            surface.stroke_path(
                &[
                    snapped(viewport, x, v.top()),
                    snapped(viewport, x, v.bottom()),
                ],
                &stroke,
            );
        }
    }
}

fn paint_expand_box(
    surface: &mut dyn Surface,
    viewport: &Viewport,
    m: &ItemMeasurements,
    expanded: bool,
    theme: &Theme,
) {
    let r = snap_rect(m.expand_box.to_physical(viewport));
    surface.fill_rect(
        r,
        &Paint::LinearGradient {
            start: Point::new(r.x0, r.y0),
            end: Point::new(r.x0, r.y1),
            from: theme.item_box_gradient_top,
            to: theme.item_box_gradient_bottom,
        },
    );
    surface.stroke_rect(r, theme.item_box_stroke);

    let center = r.center();
    let color = if expanded {
        theme.minus_stroke
    } else {
        theme.plus_stroke
    };
    let stroke = Stroke::solid(color);
    surface.stroke_path(
        &[
            Point::new(r.x0 + 2.0, center.y),
            Point::new(r.x1 - 2.0, center.y),
        ],
        &stroke,
    );
    if !expanded {
        surface.stroke_path(
            &[
                Point::new(center.x, r.y0 + 2.0),
                Point::new(center.x, r.y1 - 2.0),
            ],
            &stroke,
        );
    }
}

/// Outline of the focus area for INSIDE, a bracket along the row edge for
/// ABOVE and BELOW.
fn paint_drop_marker(
    surface: &mut dyn Surface,
    viewport: &Viewport,
    placement: Placement,
    m: &ItemMeasurements,
    verdict: Option<bool>,
    theme: &Theme,
) {
    let color = if verdict == Some(true) {
        theme.dnd_target_allowed
    } else {
        theme.dnd_target_disallowed
    };
    let (y, tick) = match placement {
        Placement::Inside => {
            surface.stroke_rect(snap_rect(m.focus.to_physical(viewport)), color);
            return;
        }
        Placement::Above => (m.item.top(), m.item.height() / 4.0),
        Placement::Below => (m.item.bottom(), -m.item.height() / 4.0),
    };
    let x0 = m.expand_box.left() - 4.0;
    let x1 = m.focus.right() + 2.0;
    surface.stroke_path(
        &[
            snapped(viewport, x0, y + tick),
            snapped(viewport, x0, y),
            snapped(viewport, x1, y),
            snapped(viewport, x1, y + tick),
        ],
        &Stroke::solid(color),
    );
}
