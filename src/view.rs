//! The tree controller: owns the viewport, turns input into state changes
//! and drives render passes.

use std::cell::Cell;
use std::rc::Rc;

#[cfg(feature = "keymap")]
use crossterm::event::KeyEvent;
use kurbo::Point;
use smallvec::SmallVec;

use crate::action::{TreeAction, TreeEvent};
use crate::dnd::{
    DefaultDndPolicy, DndPolicy, DragSession, DropTarget, MovedNode, NodeMovedArgs,
    NodeMovedListener, NodeMovedResult, Placement,
};
use crate::error::{Result, TreeError};
use crate::geometry::{VirtualPoint, Viewport};
use crate::icons::ImageProvider;
#[cfg(feature = "keymap")]
use crate::keymap::TreeKeyBindings;
use crate::label::TreeLabelProvider;
use crate::listeners::{ListenerId, Listeners};
use crate::measure::ItemMeasurements;
use crate::model::{TreeModel, locate};
use crate::pass::{PassMode, RenderPass, TreeHit};
use crate::renderer::{RenderContext, TreeRenderer};
use crate::settings::{RenderSettings, TreeOptions};
use crate::state::TreeState;
use crate::surface::Surface;
use crate::theme::Theme;

/// Summary of a finished paint pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaintReport {
    /// Render count of the pass.
    pub generation: u64,
    /// Number of rows painted.
    pub lines: usize,
}

/// A completed drop: what moved where, and what the listeners said.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DropOutcome<Id> {
    pub args: NodeMovedArgs<Id>,
    pub result: NodeMovedResult,
}

struct PassOutput<Id> {
    generation: u64,
    lines: usize,
    hit: Option<TreeHit<Id>>,
    measured: Option<ItemMeasurements>,
}

/// Interactive tree view painted onto a [`Surface`].
pub struct TreeView<M: TreeModel, L, S> {
    model: M,
    labels: L,
    surface: S,
    state: TreeState<M::Id>,
    renderer: TreeRenderer,
    viewport: Viewport,
    default_settings: RenderSettings,
    settings: RenderSettings,
    zoom: f64,
    theme: Theme,
    options: TreeOptions,
    session: DragSession<M::Id>,
    policy: Box<dyn DndPolicy<M::Id>>,
    moved_listeners: Listeners<NodeMovedListener<M::Id>>,
    model_changed: Rc<Cell<bool>>,
    model_subscription: Option<ListenerId>,
    #[cfg(feature = "keymap")]
    keymap: TreeKeyBindings,
}

impl<M, L, S> TreeView<M, L, S>
where
    M: TreeModel,
    L: TreeLabelProvider<M>,
    S: Surface,
{
    pub fn builder() -> TreeViewBuilder<M, L, S> {
        TreeViewBuilder::new()
    }

    pub const fn model(&self) -> &M {
        &self.model
    }

    /// Mutable access to the model. Changes reported through the model's
    /// listeners are repainted by [`TreeView::dispatch_pending`].
    pub const fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub const fn labels(&self) -> &L {
        &self.labels
    }

    pub const fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable access to the surface; call [`TreeView::handle_resize`] after
    /// changing its size.
    pub const fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub const fn state(&self) -> &TreeState<M::Id> {
        &self.state
    }

    pub const fn state_mut(&mut self) -> &mut TreeState<M::Id> {
        &mut self.state
    }

    pub const fn renderer(&self) -> &TreeRenderer {
        &self.renderer
    }

    pub const fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Active (zoomed) render settings.
    pub const fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Replaces the unzoomed settings; the current zoom is re-applied.
    pub fn set_settings(&mut self, settings: RenderSettings) {
        self.default_settings = settings;
        self.settings = settings.zoomed(self.zoom);
        self.repaint_clamped();
    }

    pub const fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.invalidate();
    }

    pub const fn options(&self) -> &TreeOptions {
        &self.options
    }

    pub const fn options_mut(&mut self) -> &mut TreeOptions {
        &mut self.options
    }

    pub const fn drag_session(&self) -> &DragSession<M::Id> {
        &self.session
    }

    pub fn set_dnd_policy(&mut self, policy: Box<dyn DndPolicy<M::Id>>) {
        self.policy = policy;
    }

    pub fn add_image_provider(&mut self, provider: Box<dyn ImageProvider>) {
        self.renderer.icons_mut().add_provider(provider);
    }

    #[cfg(feature = "keymap")]
    pub const fn keymap_mut(&mut self) -> &mut TreeKeyBindings {
        &mut self.keymap
    }

    /// Runs a paint pass.
    pub fn invalidate(&mut self) -> PaintReport {
        let output = self.run_pass(PassMode::Paint);
        PaintReport {
            generation: output.generation,
            lines: output.lines,
        }
    }

    /// Hit-tests a point in surface coordinates.
    pub fn hit_test_physical(&mut self, point: Point) -> Option<TreeHit<M::Id>> {
        let point = self.viewport.physical_to_virtual(point);
        self.hit_test_virtual(point)
    }

    /// Hit-tests a point in content coordinates.
    pub fn hit_test_virtual(&mut self, point: VirtualPoint) -> Option<TreeHit<M::Id>> {
        self.run_pass(PassMode::HitTest(point)).hit
    }

    /// Geometry of `node`'s row, or [`ItemMeasurements::EMPTY`] when the node
    /// is not visible.
    pub fn measure(&mut self, node: M::Id) -> ItemMeasurements {
        self.run_pass(PassMode::Measure(node))
            .measured
            .unwrap_or(ItemMeasurements::EMPTY)
    }

    pub const fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Scales the unzoomed settings by `factor`. Zooming is not cumulative.
    pub fn set_zoom(&mut self, factor: f64) {
        tracing::debug!(factor, "zoom changed");
        self.zoom = factor;
        self.settings = self.default_settings.zoomed(factor);
        self.repaint_clamped();
    }

    /// Scrolls as little as possible to bring `node`'s row into view.
    ///
    /// Returns `false` if the node is not visible or already fully shown.
    pub fn scroll_to(&mut self, node: M::Id) -> bool {
        let m = self.measure(node);
        if m.is_empty() {
            return false;
        }
        let height = self.surface.size().height;
        let top = self.viewport.y_offset;
        let y = if m.item.top() < top {
            m.item.top()
        } else if m.item.bottom() > top + height {
            // Whole rows, so snapping the offset keeps the row bottom in view.
            let row = self.settings.item_height;
            ((m.item.bottom() - height) / row).ceil() * row
        } else {
            return false;
        };
        tracing::debug!(node = ?node, from = top, to = y, "scroll to node");
        self.set_scroll_offset(y);
        true
    }

    /// Sets the vertical scroll offset, clamped to the content.
    pub fn set_scroll_offset(&mut self, y: f64) {
        self.viewport.y_offset = y;
        self.clamp_scroll();
        self.invalidate();
    }

    pub fn scroll_by(&mut self, dy: f64) {
        self.set_scroll_offset(self.viewport.y_offset + dy);
    }

    /// Re-clamps the viewport and repaints after the surface changed size.
    pub fn handle_resize(&mut self) {
        self.clamp_scroll();
        self.invalidate();
    }

    /// Primary button press at a surface point.
    ///
    /// Pressing the expand box toggles the node. Elsewhere the press selects
    /// (or with `ctrl` toggles) the node and arms a drag of the selection.
    pub fn pointer_down(&mut self, point: Point, ctrl: bool) -> bool {
        let Some(hit) = self.hit_test_physical(point) else {
            return false;
        };
        let node = hit.node;
        if hit.area.is_toggle() {
            if self.model.child_count(node) > 0 {
                self.state.toggle_expanded(node);
                self.repaint_clamped();
            }
            return true;
        }

        if ctrl {
            let select = !self.state.is_selected(node);
            self.state.set_selected(node, select);
        } else {
            self.select_only(node);
        }
        let press = self.viewport.physical_to_virtual(point);
        self.session.press(press, self.state.selected().iter().copied());
        self.after_selection_change();
        true
    }

    /// Pointer movement. Repaints while a drag is armed.
    pub fn pointer_move(&mut self, point: Point) -> bool {
        let point = self.viewport.physical_to_virtual(point);
        if !self.session.drag_to(point) {
            return false;
        }
        if self.session.is_active(self.options.drag_threshold) {
            self.invalidate();
        }
        true
    }

    /// Primary button release. Completes an allowed drop and reports it.
    ///
    /// The drop uses the verdict of the current target, including answers
    /// delivered through [`TreeView::dispatch_pending`].
    pub fn pointer_up(&mut self, point: Point) -> Option<DropOutcome<M::Id>> {
        if !self.session.is_pressed() {
            return None;
        }
        let point = self.viewport.physical_to_virtual(point);
        let moved = self.session.drag_to(point);
        let dragging = self.options.dnd_enabled && self.session.is_active(self.options.drag_threshold);
        // A target resolved at this point keeps the answers that arrived for it.
        if dragging && (moved || self.session.target().is_none()) {
            self.invalidate();
        }
        let sources: SmallVec<[M::Id; 4]> = self.session.sources().iter().copied().collect();
        let target = self.session.release();
        self.invalidate();

        let target = target.filter(|_| dragging)?;
        if !target.is_allowed() {
            tracing::debug!(target_node = ?target.node, "drop refused");
            return None;
        }
        let args = self.moved_args(&target, &sources)?;
        let result = self.fire_node_moved(&args);
        tracing::debug!(
            new_parent = ?args.new_parent,
            new_index = args.new_index,
            accepted = result.accepted,
            "drop completed"
        );
        Some(DropOutcome { args, result })
    }

    /// Double click toggles the node unless it hit the expand box, which the
    /// preceding press already toggled.
    pub fn double_click(&mut self, point: Point) -> bool {
        let Some(hit) = self.hit_test_physical(point) else {
            return false;
        };
        if hit.area.is_toggle() || self.model.child_count(hit.node) == 0 {
            return false;
        }
        self.state.toggle_expanded(hit.node);
        self.repaint_clamped();
        true
    }

    /// Wheel scroll; positive `delta_y` scrolls down.
    pub fn wheel(&mut self, delta_y: f64) {
        let mut delta = -delta_y;
        if delta.abs() > 100.0 {
            delta /= 100.0;
        } else {
            delta = delta.clamp(-1.0, 1.0);
        }
        let y = self.viewport.y_offset - delta * self.settings.item_height * self.options.wheel_lines;
        self.set_scroll_offset(y);
    }

    /// Applies a navigation action.
    pub fn handle_action<C>(&mut self, action: TreeAction<C>) -> TreeEvent<C> {
        if matches!(&action, TreeAction::Custom(_)) {
            return TreeEvent::Action(action);
        }
        let handled = match action {
            TreeAction::SelectPrev => self.select_adjacent(false),
            TreeAction::SelectNext => self.select_adjacent(true),
            TreeAction::SelectParent => self.select_parent(),
            TreeAction::SelectChild => self.select_child(),
            TreeAction::ToggleNode => self.toggle_selected(),
            TreeAction::CollapseAll => {
                self.state.clear_expansion();
                self.repaint_clamped();
                true
            }
            TreeAction::ClearSelection => {
                if self.state.selected().is_empty() {
                    false
                } else {
                    self.state.clear_selection();
                    self.invalidate();
                    true
                }
            }
            TreeAction::ScrollHome => {
                self.set_scroll_offset(0.0);
                true
            }
            TreeAction::ScrollEnd => {
                self.set_scroll_offset(self.renderer.previous_total_height());
                true
            }
            TreeAction::PageUp => {
                self.scroll_by(-self.surface.size().height);
                true
            }
            TreeAction::PageDown => {
                self.scroll_by(self.surface.size().height);
                true
            }
            TreeAction::Custom(_) => false,
        };
        if handled {
            TreeEvent::Handled
        } else {
            TreeEvent::Unhandled
        }
    }

    #[cfg(feature = "keymap")]
    /// Resolves a key event into an action and handles it.
    pub fn handle_key(&mut self, key: KeyEvent) -> TreeEvent<()> {
        let Some(action) = self.keymap.resolve(key) else {
            return TreeEvent::Unhandled;
        };
        self.handle_action(action)
    }

    #[cfg(feature = "keymap")]
    /// Resolves a key event with a custom mapping and handles it.
    pub fn handle_key_with<C, F>(&mut self, key: KeyEvent, custom: F) -> TreeEvent<C>
    where
        F: Fn(KeyEvent) -> Option<C>,
    {
        let Some(action) = self.keymap.resolve_with(key, custom) else {
            return TreeEvent::Unhandled;
        };
        self.handle_action(action)
    }

    /// Processes everything that arrived since the last event: model change
    /// notifications, icons, and late drop allowance answers.
    ///
    /// Returns `true` if anything was repainted.
    pub fn dispatch_pending(&mut self) -> bool {
        let mut repainted = false;
        if self.model_changed.replace(false) {
            self.repaint_clamped();
            repainted = true;
        }
        if self.renderer.icons_mut().drain() > 0 {
            self.invalidate();
            repainted = true;
        }
        let answered = self
            .session
            .target()
            .is_some_and(|target| target.tally.borrow_mut().take_changed());
        if answered && let Some(target) = self.session.target() {
            repainted |= self.renderer.repaint_drop_marker(
                &mut self.surface,
                &self.viewport,
                target,
                &self.theme,
            );
        }
        repainted
    }

    pub fn add_node_moved_listener(&mut self, listener: Box<NodeMovedListener<M::Id>>) -> ListenerId {
        self.moved_listeners.add(listener)
    }

    pub fn remove_node_moved_listener(&mut self, id: ListenerId) -> bool {
        self.moved_listeners.remove(id)
    }

    /// Notifies listeners in registration order; the first rejection wins.
    fn fire_node_moved(&mut self, args: &NodeMovedArgs<M::Id>) -> NodeMovedResult {
        for listener in self.moved_listeners.iter_mut() {
            let result = listener(args);
            if !result.accepted {
                return result;
            }
        }
        NodeMovedResult::accept()
    }

    fn moved_args(&self, target: &DropTarget<M::Id>, sources: &[M::Id]) -> Option<NodeMovedArgs<M::Id>> {
        let (new_parent, new_index) = match target.placement {
            Placement::Inside => (target.node, self.model.child_count(target.node)),
            Placement::Above | Placement::Below => {
                let location = locate(&self.model, target.node)?;
                let Some(parent) = location.parent else {
                    tracing::debug!("cannot drop beside the root");
                    return None;
                };
                let offset = usize::from(target.placement == Placement::Below);
                (parent, location.index + offset)
            }
        };
        let nodes = sources
            .iter()
            .filter_map(|node| {
                let location = locate(&self.model, *node)?;
                Some(MovedNode {
                    node: *node,
                    previous_parent: location.parent,
                    previous_index: location.index,
                })
            })
            .collect::<SmallVec<_>>();
        if nodes.is_empty() {
            return None;
        }
        Some(NodeMovedArgs {
            nodes,
            new_parent,
            new_index,
            placement: target.placement,
        })
    }

    fn run_pass(&mut self, mode: PassMode<M::Id>) -> PassOutput<M::Id> {
        let mut pass = RenderPass::new(mode, self.viewport);
        pass.bind_surface(&mut self.surface);
        let mut ctx = RenderContext {
            model: &self.model,
            labels: &self.labels,
            state: &self.state,
            settings: &self.settings,
            theme: &self.theme,
            options: &self.options,
            session: &mut self.session,
            policy: self.policy.as_mut(),
        };
        self.renderer.run(&mut pass, &mut ctx);
        PassOutput {
            generation: pass.generation(),
            lines: pass.last_line(),
            hit: pass.take_hit(),
            measured: pass.measured().copied(),
        }
    }

    /// Clamps the viewport against the content height of the last paint.
    /// Returns `true` if the offset changed.
    fn clamp_scroll(&mut self) -> bool {
        if self.renderer.render_count() == 0 {
            self.invalidate();
        }
        let before = self.viewport.y_offset;
        self.viewport.clamp_vertical(
            self.renderer.previous_total_height(),
            self.surface.size().height,
            self.settings.item_height,
        );
        let changed = before != self.viewport.y_offset;
        if changed {
            tracing::trace!(from = before, to = self.viewport.y_offset, "viewport clamped");
        }
        changed
    }

    /// Repaints after the content height changed, re-clamping the viewport
    /// against the new height.
    fn repaint_clamped(&mut self) {
        self.invalidate();
        if self.clamp_scroll() {
            self.invalidate();
        }
    }

    fn select_only(&mut self, node: M::Id) {
        if self.state.selected() == [node] {
            return;
        }
        self.state.clear_selection();
        self.state.set_selected(node, true);
    }

    /// Scrolls a single selected node into view, then repaints.
    fn after_selection_change(&mut self) {
        if let [node] = *self.state.selected()
            && self.scroll_to(node)
        {
            return;
        }
        self.invalidate();
    }

    fn selected_node(&self) -> Option<M::Id> {
        self.state.selected().first().copied()
    }

    fn select_adjacent(&mut self, down: bool) -> bool {
        let Some(node) = self.selected_node() else {
            let Some(root) = self.model.root() else {
                return false;
            };
            self.select_only(root);
            self.after_selection_change();
            return true;
        };
        let m = self.measure(node);
        if m.is_empty() {
            return false;
        }
        let step = self.settings.item_height / 2.0 + self.settings.item_margin_bottom;
        let y = if down {
            m.item.bottom() + step
        } else {
            m.item.top() - step
        };
        let Some(hit) = self.hit_test_virtual(VirtualPoint::new(m.item.center_x(), y)) else {
            return false;
        };
        self.select_only(hit.node);
        self.after_selection_change();
        true
    }

    fn select_parent(&mut self) -> bool {
        let Some(node) = self.selected_node() else {
            return false;
        };
        if self.state.is_expanded(node) && self.model.child_count(node) > 0 {
            self.state.set_expanded(node, false);
            self.repaint_clamped();
            return true;
        }
        let Some(parent) = locate(&self.model, node).and_then(|location| location.parent) else {
            return false;
        };
        self.select_only(parent);
        self.after_selection_change();
        true
    }

    fn select_child(&mut self) -> bool {
        let Some(node) = self.selected_node() else {
            return false;
        };
        if self.model.child_count(node) == 0 {
            return false;
        }
        if !self.state.is_expanded(node) {
            self.state.set_expanded(node, true);
            self.invalidate();
            return true;
        }
        let Some(child) = self.model.child(node, 0) else {
            return false;
        };
        self.select_only(child);
        self.after_selection_change();
        true
    }

    fn toggle_selected(&mut self) -> bool {
        let Some(node) = self.selected_node() else {
            return false;
        };
        if self.model.child_count(node) == 0 {
            return false;
        }
        self.state.toggle_expanded(node);
        self.repaint_clamped();
        true
    }
}

impl<M: TreeModel, L, S> Drop for TreeView<M, L, S> {
    fn drop(&mut self) {
        if let Some(id) = self.model_subscription.take() {
            self.model.unsubscribe(id);
        }
    }
}

/// Assembles a [`TreeView`]. Model, label provider and surface are required.
pub struct TreeViewBuilder<M: TreeModel, L, S> {
    model: Option<M>,
    labels: Option<L>,
    surface: Option<S>,
    state: Option<TreeState<M::Id>>,
    settings: RenderSettings,
    theme: Theme,
    options: TreeOptions,
    policy: Option<Box<dyn DndPolicy<M::Id>>>,
    providers: Vec<Box<dyn ImageProvider>>,
}

impl<M: TreeModel, L, S> Default for TreeViewBuilder<M, L, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: TreeModel, L, S> TreeViewBuilder<M, L, S> {
    pub fn new() -> Self {
        Self {
            model: None,
            labels: None,
            surface: None,
            state: None,
            settings: RenderSettings::default(),
            theme: Theme::default(),
            options: TreeOptions::default(),
            policy: None,
            providers: Vec::new(),
        }
    }

    #[must_use]
    pub fn model(mut self, model: M) -> Self {
        self.model = Some(model);
        self
    }

    #[must_use]
    pub fn labels(mut self, labels: L) -> Self {
        self.labels = Some(labels);
        self
    }

    #[must_use]
    pub fn surface(mut self, surface: S) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Uses `state` instead of an empty one; a store attached to it is
    /// loaded on build.
    #[must_use]
    pub fn state(mut self, state: TreeState<M::Id>) -> Self {
        self.state = Some(state);
        self
    }

    #[must_use]
    pub const fn settings(mut self, settings: RenderSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    #[must_use]
    pub const fn options(mut self, options: TreeOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn dnd_policy(mut self, policy: Box<dyn DndPolicy<M::Id>>) -> Self {
        self.policy = Some(policy);
        self
    }

    #[must_use]
    pub fn image_provider(mut self, provider: Box<dyn ImageProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn build(self) -> Result<TreeView<M, L, S>> {
        let mut model = self.model.ok_or(TreeError::MissingModel)?;
        let labels = self.labels.ok_or(TreeError::MissingLabels)?;
        let surface = self.surface.ok_or(TreeError::MissingSurface)?;

        let mut state = self.state.unwrap_or_default();
        state.load()?;

        let model_changed = Rc::new(Cell::new(false));
        let model_subscription = {
            let flag = Rc::clone(&model_changed);
            model.subscribe(Box::new(move || flag.set(true)))
        };

        let mut renderer = TreeRenderer::new(self.options.text_cache_limit);
        for provider in self.providers {
            renderer.icons_mut().add_provider(provider);
        }

        Ok(TreeView {
            model,
            labels,
            surface,
            state,
            renderer,
            viewport: Viewport::default(),
            default_settings: self.settings,
            settings: self.settings,
            zoom: 1.0,
            theme: self.theme,
            options: self.options,
            session: DragSession::default(),
            policy: self.policy.unwrap_or_else(|| Box::new(DefaultDndPolicy)),
            moved_listeners: Listeners::new(),
            model_changed,
            model_subscription,
            #[cfg(feature = "keymap")]
            keymap: TreeKeyBindings::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::dnd::AllowanceReply;
    use crate::label::DebugLabels;
    use crate::model::MutableTreeModel;
    use crate::surface::RecordingSurface;

    type TestView = TreeView<MutableTreeModel<u32>, DebugLabels, RecordingSurface>;

    /// 0 -> [1, 2], 1 -> [3]; rows 0, 1, 3, 2 with row `n` centred at
    /// `y = 18 + 18n`.
    fn view() -> TestView {
        let mut model = MutableTreeModel::new(0);
        model.add(0, 1, None);
        model.add(0, 2, None);
        model.add(1, 3, None);
        let mut view = TreeView::builder()
            .model(model)
            .labels(DebugLabels)
            .surface(RecordingSurface::new(200.0, 100.0))
            .build()
            .unwrap();
        view.state_mut().set_expanded(0, true);
        view.state_mut().set_expanded(1, true);
        view
    }

    fn long_view() -> TestView {
        long_view_with_height(100.0)
    }

    /// Root with children 1..=20, expanded.
    fn long_view_with_height(height: f64) -> TestView {
        let mut model = MutableTreeModel::new(0);
        for child in 1..=20 {
            model.add(0, child, None);
        }
        let mut view = TreeView::builder()
            .model(model)
            .labels(DebugLabels)
            .surface(RecordingSurface::new(200.0, height))
            .build()
            .unwrap();
        view.state_mut().set_expanded(0, true);
        view
    }

    fn row(line: u32) -> Point {
        Point::new(150.0, 18.0 + 18.0 * f64::from(line))
    }

    #[derive(Clone, Default)]
    struct Deferred(Rc<RefCell<Vec<AllowanceReply>>>);

    impl DndPolicy<u32> for Deferred {
        fn is_target_allowed(&mut self, _source: u32, _targets: &[u32], reply: AllowanceReply) {
            self.0.borrow_mut().push(reply);
        }
    }

    #[test]
    fn builder_reports_missing_parts() {
        let built = TreeViewBuilder::<MutableTreeModel<u32>, DebugLabels, RecordingSurface>::new()
            .labels(DebugLabels)
            .surface(RecordingSurface::new(10.0, 10.0))
            .build();
        assert!(matches!(built, Err(TreeError::MissingModel)));

        let built = TreeViewBuilder::<MutableTreeModel<u32>, DebugLabels, RecordingSurface>::new()
            .model(MutableTreeModel::new(0))
            .labels(DebugLabels)
            .build();
        assert!(matches!(built, Err(TreeError::MissingSurface)));
    }

    #[test]
    fn paint_reports_visible_lines() {
        let mut view = view();
        let report = view.invalidate();
        assert_eq!(report.lines, 4);
        assert_eq!(report.generation, view.renderer().render_count());
        let texts: Vec<&str> = view.surface().texts().collect();
        assert_eq!(texts, ["0", "1", "3", "2"]);
    }

    #[test]
    fn hit_and_measure_agree() {
        let mut view = view();
        let hit = view.hit_test_physical(row(2)).unwrap();
        assert_eq!(hit.node, 3);
        assert_eq!(view.measure(3), hit.measurements);
        assert!(view.hit_test_physical(Point::new(150.0, 95.0)).is_none());
        assert!(view.measure(42).is_empty());
    }

    #[test]
    fn press_selects_and_expand_box_toggles() {
        let mut view = view();
        assert!(view.pointer_down(row(1), false));
        assert_eq!(view.state().selected(), [1]);

        assert!(view.pointer_down(Point::new(20.0, 36.0), false));
        assert!(!view.state().is_expanded(1));
        assert_eq!(view.state().selected(), [1]);
        assert_eq!(view.invalidate().lines, 3);
    }

    #[test]
    fn ctrl_press_extends_selection() {
        let mut view = view();
        view.pointer_down(row(0), true);
        view.pointer_down(row(3), true);
        assert_eq!(view.state().selected(), [0, 2]);
        view.pointer_down(row(0), true);
        assert_eq!(view.state().selected(), [2]);
    }

    #[test]
    fn scroll_offset_is_clamped_and_snapped() {
        let mut view = long_view();
        view.set_scroll_offset(1000.0);
        assert_eq!(view.viewport().y_offset, 288.0);
        view.set_scroll_offset(-5.0);
        assert_eq!(view.viewport().y_offset, 0.0);

        view.wheel(1.0);
        assert_eq!(view.viewport().y_offset, 54.0);
        assert_eq!(view.handle_action::<()>(TreeAction::PageDown), TreeEvent::Handled);
        assert_eq!(view.viewport().y_offset, 144.0);
        view.handle_action::<()>(TreeAction::ScrollHome);
        assert_eq!(view.viewport().y_offset, 0.0);
    }

    #[test]
    fn scroll_to_reveals_node() {
        let mut view = long_view();
        assert!(!view.scroll_to(1));
        assert!(view.scroll_to(20));
        assert_eq!(view.viewport().y_offset, 288.0);
        assert!(view.scroll_to(0));
        assert_eq!(view.viewport().y_offset, 0.0);
    }

    #[test]
    fn scroll_to_shows_whole_row_on_uneven_surface() {
        let mut view = long_view_with_height(95.0);
        assert!(view.scroll_to(10));
        assert_eq!(view.viewport().y_offset, 126.0);
        let row = view.measure(10).item.to_physical(view.viewport());
        assert!(row.y0 >= 0.0 && row.y1 <= 95.0, "{row:?}");
        assert!(!view.scroll_to(10));
    }

    #[test]
    fn collapsing_pulls_offset_back() {
        let mut view = long_view();
        view.set_scroll_offset(1000.0);
        view.state_mut().set_selected(0, true);
        assert_eq!(view.handle_action::<()>(TreeAction::ToggleNode), TreeEvent::Handled);
        assert_eq!(view.viewport().y_offset, 0.0);
    }

    #[test]
    fn zoom_is_not_cumulative() {
        let mut view = view();
        view.set_zoom(2.0);
        assert_eq!(view.settings().item_height, 36.0);
        view.set_zoom(2.0);
        assert_eq!(view.settings().item_height, 36.0);
        view.set_zoom(1.0);
        assert_eq!(*view.settings(), RenderSettings::default());
    }

    #[test]
    fn keyboard_navigation_walks_visible_rows() {
        let mut view = view();
        assert_eq!(view.handle_action::<()>(TreeAction::SelectNext), TreeEvent::Handled);
        assert_eq!(view.state().selected(), [0]);
        view.handle_action::<()>(TreeAction::SelectNext);
        assert_eq!(view.state().selected(), [1]);
        view.handle_action::<()>(TreeAction::SelectChild);
        assert_eq!(view.state().selected(), [3]);
        view.handle_action::<()>(TreeAction::SelectNext);
        assert_eq!(view.state().selected(), [2]);
        assert_eq!(view.handle_action::<()>(TreeAction::SelectNext), TreeEvent::Unhandled);
        view.handle_action::<()>(TreeAction::SelectPrev);
        assert_eq!(view.state().selected(), [3]);

        view.handle_action::<()>(TreeAction::SelectParent);
        assert_eq!(view.state().selected(), [1]);
        view.handle_action::<()>(TreeAction::SelectParent);
        assert!(!view.state().is_expanded(1));
        view.handle_action::<()>(TreeAction::ToggleNode);
        assert!(view.state().is_expanded(1));

        view.handle_action::<()>(TreeAction::CollapseAll);
        assert!(!view.state().is_expanded(0));
        assert_eq!(view.handle_action::<()>(TreeAction::ClearSelection), TreeEvent::Handled);
        assert!(view.state().selected().is_empty());
        assert_eq!(view.handle_action::<()>(TreeAction::ClearSelection), TreeEvent::Unhandled);
        assert_eq!(
            view.handle_action(TreeAction::Custom(5_u8)),
            TreeEvent::Action(TreeAction::Custom(5))
        );
    }

    #[test]
    fn drop_inside_reports_move_to_listeners() {
        let mut view = view();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        view.add_node_moved_listener(Box::new(move |args: &NodeMovedArgs<u32>| {
            sink.borrow_mut().push(args.clone());
            NodeMovedResult::accept()
        }));

        view.pointer_down(row(3), false);
        assert!(view.pointer_move(row(1)));
        let target = view.drag_session().target().unwrap();
        assert_eq!((target.node, target.placement), (1, Placement::Inside));
        assert_eq!(target.verdict(), Some(true));

        let outcome = view.pointer_up(row(1)).unwrap();
        assert!(outcome.result.accepted);
        assert_eq!(outcome.args.new_parent, 1);
        assert_eq!(outcome.args.new_index, 1);
        assert_eq!(
            outcome.args.nodes.as_slice(),
            [MovedNode {
                node: 2,
                previous_parent: Some(0),
                previous_index: 1,
            }]
        );
        assert_eq!(seen.borrow().as_slice(), [outcome.args.clone()]);
        assert!(!view.drag_session().is_pressed());

        assert!(view.model_mut().apply_moved(&outcome.args));
        assert_eq!(view.model().children(1), [3, 2]);
        assert!(view.dispatch_pending());
        assert!(!view.dispatch_pending());
    }

    #[test]
    fn first_rejecting_listener_wins() {
        let mut view = view();
        let later_calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&later_calls);
        view.add_node_moved_listener(Box::new(|_: &NodeMovedArgs<u32>| {
            NodeMovedResult::reject("locked")
        }));
        view.add_node_moved_listener(Box::new(move |_: &NodeMovedArgs<u32>| {
            counter.set(counter.get() + 1);
            NodeMovedResult::accept()
        }));

        view.pointer_down(row(3), false);
        view.pointer_move(row(1));
        let outcome = view.pointer_up(row(1)).unwrap();
        assert!(!outcome.result.accepted);
        assert_eq!(outcome.result.reason.as_deref(), Some("locked"));
        assert_eq!(later_calls.get(), 0);
    }

    #[test]
    fn drop_into_own_subtree_is_refused() {
        let mut view = view();
        view.pointer_down(row(1), false);
        view.pointer_move(row(2));
        assert!(view.drag_session().target().is_none());
        assert!(view.pointer_up(row(2)).is_none());
    }

    #[test]
    fn permissive_policy_answers_stand_alone() {
        let mut view = view();
        view.set_dnd_policy(Box::new(|_: u32, _: &[u32]| Some(true)));

        view.pointer_down(row(3), false);
        view.pointer_move(row(2));
        let target = view.drag_session().target().unwrap();
        assert_eq!((target.node, target.placement), (3, Placement::Inside));
        assert_eq!(target.verdict(), Some(true));
        assert_eq!(target.tally.borrow().pending(), 0);
        let outcome = view.pointer_up(row(2)).unwrap();
        assert_eq!(outcome.args.new_parent, 3);

        view.pointer_down(row(1), false);
        view.pointer_move(row(2));
        assert!(view.drag_session().target().is_none());
        assert!(view.pointer_up(row(2)).is_none());
    }

    #[test]
    fn root_cannot_get_siblings() {
        let mut view = view();
        view.pointer_down(row(3), false);
        view.pointer_move(Point::new(150.0, 11.0));
        assert!(view.drag_session().target().is_none());
        assert!(view.pointer_up(Point::new(150.0, 11.0)).is_none());
    }

    #[test]
    fn short_press_does_not_drop() {
        let mut view = view();
        view.pointer_down(row(3), false);
        assert!(view.pointer_up(Point::new(152.0, 72.0)).is_none());
        assert_eq!(view.state().selected(), [2]);
    }

    #[test]
    fn late_answers_update_current_target_only() {
        let mut view = view();
        let policy = Deferred::default();
        view.set_dnd_policy(Box::new(policy.clone()));

        view.pointer_down(row(3), false);
        view.pointer_move(row(1));
        assert_eq!(view.drag_session().target().unwrap().verdict(), None);
        let stale = policy.0.borrow_mut().pop().unwrap();

        view.pointer_move(Point::new(150.0, 37.0));
        stale.resolve(Some(false));
        assert!(!view.dispatch_pending());
        assert_eq!(view.drag_session().target().unwrap().verdict(), None);

        let fresh = policy.0.borrow_mut().pop().unwrap();
        assert_eq!(fresh.generation(), view.renderer().render_count());
        fresh.resolve(Some(true));
        assert!(view.dispatch_pending());
        assert_eq!(view.drag_session().target().unwrap().verdict(), Some(true));

        let outcome = view.pointer_up(Point::new(150.0, 37.0)).unwrap();
        assert_eq!(outcome.args.new_parent, 1);
        assert!(outcome.result.accepted);
    }

    #[test]
    fn dnd_can_be_disabled() {
        let mut view = view();
        view.options_mut().dnd_enabled = false;
        view.pointer_down(row(3), false);
        view.pointer_move(row(1));
        assert!(view.pointer_up(row(1)).is_none());
    }

    #[cfg(feature = "keymap")]
    #[test]
    fn keys_drive_actions() {
        use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

        let mut view = view();
        let down = KeyEvent::new(KeyCode::Down, KeyModifiers::NONE);
        assert_eq!(view.handle_key(down), TreeEvent::Handled);
        assert_eq!(view.state().selected(), [0]);
        let unknown = KeyEvent::new(KeyCode::F(5), KeyModifiers::NONE);
        assert_eq!(view.handle_key(unknown), TreeEvent::Unhandled);
    }
}
