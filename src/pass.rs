//! One traversal of the visible tree.
//!
//! The same depth-first walk paints, hit-tests or measures; the
//! [`PassMode`] decides which, and a single-purpose pass stops as soon as it
//! has its answer.

use crate::geometry::{VirtualPoint, Viewport};
use crate::measure::{HitArea, ItemMeasurements};
use crate::model::TreeModel;
use crate::surface::Surface;

/// What a pass is for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PassMode<Id> {
    /// Draws every visible row and resolves the drop target.
    Paint,
    /// Finds the row under a point; stops at the first hit.
    HitTest(VirtualPoint),
    /// Computes one node's row geometry; stops once the node is reached.
    Measure(Id),
}

/// Result of a hit test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeHit<Id> {
    /// Node whose row contains the point.
    pub node: Id,
    /// Part of the row that was hit.
    pub area: HitArea,
    /// Geometry of that row, in virtual space.
    pub measurements: ItemMeasurements,
}

/// Per-node traversal record, living on the stack for the duration of the
/// visit.
#[derive(Clone, Copy, Debug)]
pub struct RenderEntry<'a, Id> {
    pub node: Id,
    /// Last child of its parent; decides where the connector line stops.
    pub is_last: bool,
    /// Zero-based visible row.
    pub line: usize,
    /// The caller's entry, `None` for the root.
    pub parent: Option<&'a RenderEntry<'a, Id>>,
}

impl<'a, Id: Copy> RenderEntry<'a, Id> {
    /// Entry for the root node on line 0.
    pub const fn root(node: Id) -> Self {
        Self {
            node,
            is_last: true,
            line: 0,
            parent: None,
        }
    }

    /// 1 for the root, plus one per ancestor.
    pub fn depth(&self) -> usize {
        1 + self.ancestors().count()
    }

    /// Ancestors from the direct parent up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = &'a RenderEntry<'a, Id>> + use<'a, Id> {
        std::iter::successors(self.parent, |entry| entry.parent)
    }
}

/// State of a single traversal.
pub struct RenderPass<'s, Id> {
    mode: PassMode<Id>,
    viewport: Viewport,
    generation: u64,
    aborted: bool,
    last_line: usize,
    hit: Option<TreeHit<Id>>,
    measured: Option<ItemMeasurements>,
    surface: Option<&'s mut dyn Surface>,
}

impl<'s, Id: Copy + PartialEq> RenderPass<'s, Id> {
    pub const fn new(mode: PassMode<Id>, viewport: Viewport) -> Self {
        Self {
            mode,
            viewport,
            generation: 0,
            aborted: false,
            last_line: 0,
            hit: None,
            measured: None,
            surface: None,
        }
    }

    pub const fn mode(&self) -> PassMode<Id> {
        self.mode
    }

    pub const fn is_paint(&self) -> bool {
        matches!(self.mode, PassMode::Paint)
    }

    pub const fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Render count this pass painted under (0 for non-paint passes).
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) const fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }

    /// Stops the traversal after the current node.
    pub const fn abort(&mut self) {
        self.aborted = true;
    }

    pub const fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Number of lines rendered so far.
    pub const fn last_line(&self) -> usize {
        self.last_line
    }

    const fn set_last_line(&mut self, line: usize) {
        if line > self.last_line {
            self.last_line = line;
        }
    }

    pub const fn hit(&self) -> Option<&TreeHit<Id>> {
        self.hit.as_ref()
    }

    pub fn take_hit(&mut self) -> Option<TreeHit<Id>> {
        self.hit.take()
    }

    pub(crate) const fn set_hit(&mut self, hit: TreeHit<Id>) {
        self.hit = Some(hit);
    }

    pub const fn measured(&self) -> Option<&ItemMeasurements> {
        self.measured.as_ref()
    }

    pub(crate) const fn set_measured(&mut self, measurements: ItemMeasurements) {
        self.measured = Some(measurements);
    }

    /// Binds the drawing surface for this pass.
    ///
    /// # Panics
    ///
    /// Panics if a surface is already bound.
    pub fn bind_surface(&mut self, surface: &'s mut dyn Surface) {
        assert!(
            self.surface.is_none(),
            "render pass surface is bound twice"
        );
        self.surface = Some(surface);
    }

    /// The bound drawing surface.
    ///
    /// # Panics
    ///
    /// Panics if no surface has been bound.
    pub fn surface(&mut self) -> &mut dyn Surface {
        match self.surface.as_deref_mut() {
            Some(surface) => surface,
            None => panic!("render pass used before a surface was bound"),
        }
    }

    /// Walks the visible tree from the model root.
    ///
    /// `render` is called once per visited node. Children are visited only
    /// when their parent has children and `is_expanded` says so.
    pub fn traverse<M, E, R>(&mut self, model: &M, is_expanded: E, mut render: R)
    where
        M: TreeModel<Id = Id>,
        E: Fn(Id) -> bool,
        R: FnMut(&mut Self, &RenderEntry<'_, Id>),
    {
        let Some(root) = model.root() else {
            return;
        };
        let entry = RenderEntry::root(root);
        self.start_item(model, &is_expanded, &mut render, &entry);
        tracing::trace!(mode = self.mode_name(), lines = self.last_line, "pass finished");
    }

    /// Visits `entry` and its visible subtree; returns the number of lines used.
    fn start_item<M, E, R>(
        &mut self,
        model: &M,
        is_expanded: &E,
        render: &mut R,
        entry: &RenderEntry<'_, Id>,
    ) -> usize
    where
        M: TreeModel<Id = Id>,
        E: Fn(Id) -> bool,
        R: FnMut(&mut Self, &RenderEntry<'_, Id>),
    {
        render(self, entry);
        self.set_last_line(entry.line + 1);
        if self.aborted {
            return 1;
        }

        let mut rendered = 1;
        let child_count = model.child_count(entry.node);
        if child_count == 0 || !is_expanded(entry.node) {
            return rendered;
        }
        for index in 0..child_count {
            let Some(child) = model.child(entry.node, index) else {
                continue;
            };
            let child_entry = RenderEntry {
                node: child,
                is_last: index + 1 == child_count,
                line: entry.line + rendered,
                parent: Some(entry),
            };
            rendered += self.start_item(model, is_expanded, render, &child_entry);
            if self.aborted {
                break;
            }
        }
        rendered
    }

    const fn mode_name(&self) -> &'static str {
        match self.mode {
            PassMode::Paint => "paint",
            PassMode::HitTest(_) => "hit-test",
            PassMode::Measure(_) => "measure",
        }
    }
}
