//! Drag-and-drop placement and drop allowance.

use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::geometry::{VirtualPoint, VirtualRect};
use crate::measure::ItemMeasurements;
use crate::settings::RenderSettings;

/// Where a drop lands relative to the target row.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Placement {
    /// Before the target, as its sibling.
    Above,
    /// After the target, as its sibling.
    Below,
    /// As the last child of the target.
    Inside,
}

/// Classifies pointer height `y` against a row.
///
/// The top and bottom `item_height / 3.5` of the row are sibling drop zones,
/// the middle is a child drop zone. Rows of expanded nodes never accept
/// [`Placement::Below`] because that band visually belongs to their first
/// child.
pub fn classify(
    y: f64,
    row: &VirtualRect,
    settings: &RenderSettings,
    expanded: bool,
) -> Option<Placement> {
    let gutter = settings.item_height / 3.5;
    let margin_half = settings.item_margin_bottom / 2.0;
    let (top, bottom) = (row.top(), row.bottom());

    let mut placement = None;
    if y <= bottom + margin_half {
        if y >= bottom - gutter {
            placement = Some(Placement::Below);
        } else if y >= top + gutter {
            placement = Some(Placement::Inside);
        }
    }
    if placement.is_none() && y > top - margin_half {
        if y < top + gutter {
            placement = Some(Placement::Above);
        } else if y <= bottom - gutter {
            placement = Some(Placement::Inside);
        }
    }

    match placement {
        Some(Placement::Below) if expanded => Some(Placement::Inside),
        other => other,
    }
}

/// Running count of allow/deny answers for one frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllowanceTally {
    generation: u64,
    requested: usize,
    answered: usize,
    allow: usize,
    deny: usize,
    changed: bool,
}

impl AllowanceTally {
    pub const fn new(generation: u64) -> Self {
        Self {
            generation,
            requested: 0,
            answered: 0,
            allow: 0,
            deny: 0,
            changed: false,
        }
    }

    /// Render count the tally was opened for.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Records one answer. `None` counts as answered but neither allows nor denies.
    pub const fn record(&mut self, answer: Option<bool>) {
        self.answered += 1;
        match answer {
            Some(true) => self.allow += 1,
            Some(false) => self.deny += 1,
            None => {}
        }
        self.changed = true;
    }

    /// `true` iff at least one source allowed and none denied.
    pub const fn is_allowed(&self) -> bool {
        self.allow > 0 && self.deny == 0
    }

    /// Current verdict, or `None` while nothing has been answered.
    pub const fn verdict(&self) -> Option<bool> {
        if self.answered == 0 {
            None
        } else {
            Some(self.is_allowed())
        }
    }

    /// Number of sources that have not answered yet.
    pub const fn pending(&self) -> usize {
        self.requested.saturating_sub(self.answered)
    }

    /// Returns and clears the "answers arrived" flag.
    pub const fn take_changed(&mut self) -> bool {
        let changed = self.changed;
        self.changed = false;
        changed
    }
}

pub(crate) type SharedTally = Rc<RefCell<AllowanceTally>>;

/// One-shot handle through which a [`DndPolicy`] answers for one source.
///
/// Answers given after the frame that asked are ignored.
pub struct AllowanceReply {
    tally: SharedTally,
    generation: u64,
}

impl AllowanceReply {
    pub(crate) fn new(tally: &SharedTally) -> Self {
        let generation = {
            let mut tally = tally.borrow_mut();
            tally.requested += 1;
            tally.generation
        };
        Self {
            tally: Rc::clone(tally),
            generation,
        }
    }

    /// Render count of the frame that asked.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Delivers the answer: `Some(true)` allow, `Some(false)` deny, `None`
    /// no opinion.
    pub fn resolve(self, answer: Option<bool>) {
        self.tally.borrow_mut().record(answer);
    }
}

/// Decides whether dragged nodes may be dropped onto a target path.
pub trait DndPolicy<Id> {
    /// Asks whether `source` may be dropped on `targets`, the nodes from the
    /// hovered row up to the node that would become the new parent.
    fn is_target_allowed(&mut self, source: Id, targets: &[Id], reply: AllowanceReply);
}

impl<Id, F> DndPolicy<Id> for F
where
    F: FnMut(Id, &[Id]) -> Option<bool>,
{
    fn is_target_allowed(&mut self, source: Id, targets: &[Id], reply: AllowanceReply) {
        reply.resolve(self(source, targets));
    }
}

/// Refuses drops into the dragged node's own subtree, allows everything else.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultDndPolicy;

impl<Id: PartialEq> DndPolicy<Id> for DefaultDndPolicy {
    fn is_target_allowed(&mut self, source: Id, targets: &[Id], reply: AllowanceReply) {
        reply.resolve(Some(!targets.contains(&source)));
    }
}

/// A node taking part in a move, with where it came from.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MovedNode<Id> {
    pub node: Id,
    pub previous_parent: Option<Id>,
    pub previous_index: usize,
}

/// Payload of a node-moved notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeMovedArgs<Id> {
    pub nodes: SmallVec<[MovedNode<Id>; 4]>,
    pub new_parent: Id,
    /// Index among the new parent's children, before the moved nodes are
    /// detached.
    pub new_index: usize,
    pub placement: Placement,
}

/// Answer of a node-moved listener.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeMovedResult {
    pub accepted: bool,
    pub reason: Option<String>,
}

impl NodeMovedResult {
    pub const fn accept() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
        }
    }
}

pub type NodeMovedListener<Id> = dyn FnMut(&NodeMovedArgs<Id>) -> NodeMovedResult;

/// Drop target resolved during one paint pass.
#[derive(Debug)]
pub struct DropTarget<Id> {
    pub node: Id,
    pub placement: Placement,
    /// Nodes from the hovered row up to the new parent.
    pub path: SmallVec<[Id; 8]>,
    pub measurements: ItemMeasurements,
    pub(crate) tally: SharedTally,
}

impl<Id> DropTarget<Id> {
    pub fn is_allowed(&self) -> bool {
        self.tally.borrow().is_allowed()
    }

    pub fn verdict(&self) -> Option<bool> {
        self.tally.borrow().verdict()
    }

    pub fn generation(&self) -> u64 {
        self.tally.borrow().generation()
    }
}

/// Pointer-driven drag state.
///
/// A session starts on press and becomes an active drag once the pointer has
/// travelled past the drag threshold with at least one source node.
#[derive(Debug)]
pub struct DragSession<Id> {
    start: Option<VirtualPoint>,
    current: Option<VirtualPoint>,
    sources: SmallVec<[Id; 4]>,
    target: Option<DropTarget<Id>>,
}

impl<Id> Default for DragSession<Id> {
    fn default() -> Self {
        Self {
            start: None,
            current: None,
            sources: SmallVec::new(),
            target: None,
        }
    }
}

impl<Id: Copy + PartialEq> DragSession<Id> {
    /// Records the press point and the nodes that would be dragged.
    pub fn press(&mut self, point: VirtualPoint, sources: impl IntoIterator<Item = Id>) {
        self.start = Some(point);
        self.current = Some(point);
        self.sources = sources.into_iter().collect();
        self.target = None;
    }

    /// Moves the pointer. Returns `true` if the point changed.
    pub fn drag_to(&mut self, point: VirtualPoint) -> bool {
        if self.start.is_none() {
            return false;
        }
        let moved = self.current.is_none_or(|current| current.distance(point) > 0.0);
        if moved {
            self.current = Some(point);
        }
        moved
    }

    pub const fn is_pressed(&self) -> bool {
        self.start.is_some()
    }

    /// `true` once the pointer left the threshold radius around the press point.
    pub fn is_active(&self, threshold: f64) -> bool {
        match (self.start, self.current) {
            (Some(start), Some(current)) => {
                !self.sources.is_empty() && start.distance(current) > threshold
            }
            _ => false,
        }
    }

    pub const fn current_point(&self) -> Option<VirtualPoint> {
        self.current
    }

    pub fn sources(&self) -> &[Id] {
        &self.sources
    }

    pub fn is_source(&self, node: Id) -> bool {
        self.sources.contains(&node)
    }

    pub const fn target(&self) -> Option<&DropTarget<Id>> {
        self.target.as_ref()
    }

    pub(crate) fn set_target(&mut self, target: DropTarget<Id>) {
        self.target = Some(target);
    }

    pub(crate) fn clear_target(&mut self) {
        self.target = None;
    }

    /// Ends the session, returning its last target.
    pub fn release(&mut self) -> Option<DropTarget<Id>> {
        self.start = None;
        self.current = None;
        self.sources.clear();
        self.target.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> VirtualRect {
        VirtualRect::new(0.0, 100.0, 200.0, 18.0)
    }

    #[test]
    fn classify_bands() {
        let s = RenderSettings::default();
        let r = row();
        assert_eq!(classify(101.0, &r, &s, false), Some(Placement::Above));
        assert_eq!(classify(109.0, &r, &s, false), Some(Placement::Inside));
        assert_eq!(classify(117.0, &r, &s, false), Some(Placement::Below));
        assert_eq!(classify(90.0, &r, &s, false), None);
        assert_eq!(classify(130.0, &r, &s, false), None);
    }

    #[test]
    fn expanded_rows_remap_below_to_inside() {
        let s = RenderSettings::default();
        let r = row();
        for y in [114.0, 116.0, 118.0] {
            assert_eq!(classify(y, &r, &s, false), Some(Placement::Below));
            assert_eq!(classify(y, &r, &s, true), Some(Placement::Inside));
        }
        assert_eq!(classify(101.0, &r, &s, true), Some(Placement::Above));
    }

    fn tally_of(answers: &[Option<bool>]) -> AllowanceTally {
        let shared: SharedTally = Rc::new(RefCell::new(AllowanceTally::new(1)));
        for answer in answers {
            AllowanceReply::new(&shared).resolve(*answer);
        }
        let tally = shared.borrow().clone();
        tally
    }

    #[test]
    fn allowance_needs_an_allow_and_no_deny() {
        assert!(!tally_of(&[Some(true), Some(false), None]).is_allowed());
        assert!(tally_of(&[Some(true), Some(true), None]).is_allowed());
        assert!(!tally_of(&[None, None]).is_allowed());
        assert_eq!(tally_of(&[None, None]).verdict(), Some(false));
    }

    #[test]
    fn unanswered_sources_are_not_counted() {
        let shared: SharedTally = Rc::new(RefCell::new(AllowanceTally::new(3)));
        let first = AllowanceReply::new(&shared);
        let _second = AllowanceReply::new(&shared);
        assert_eq!(shared.borrow().pending(), 2);
        assert_eq!(shared.borrow().verdict(), None);
        assert_eq!(first.generation(), 3);
        first.resolve(Some(true));
        assert!(shared.borrow().is_allowed());
        assert_eq!(shared.borrow().pending(), 1);
        assert!(shared.borrow_mut().take_changed());
        assert!(!shared.borrow_mut().take_changed());
    }

    #[test]
    fn default_policy_refuses_own_subtree() {
        let shared: SharedTally = Rc::new(RefCell::new(AllowanceTally::new(0)));
        let mut policy = DefaultDndPolicy;
        policy.is_target_allowed(2_u32, &[5, 2, 0], AllowanceReply::new(&shared));
        assert_eq!(shared.borrow().verdict(), Some(false));

        let shared: SharedTally = Rc::new(RefCell::new(AllowanceTally::new(0)));
        policy.is_target_allowed(2_u32, &[5, 1, 0], AllowanceReply::new(&shared));
        assert_eq!(shared.borrow().verdict(), Some(true));
    }

    #[test]
    fn session_activates_past_threshold() {
        let mut session = DragSession::default();
        session.press(VirtualPoint::new(10.0, 10.0), [1_u32]);
        assert!(!session.is_active(5.0));
        assert!(session.drag_to(VirtualPoint::new(13.0, 13.0)));
        assert!(!session.is_active(5.0));
        assert!(session.drag_to(VirtualPoint::new(10.0, 30.0)));
        assert!(session.is_active(5.0));
        assert!(!session.drag_to(VirtualPoint::new(10.0, 30.0)));
        session.release();
        assert!(!session.is_pressed());
        assert!(!session.is_active(5.0));
    }

    #[test]
    fn session_without_sources_never_activates() {
        let mut session = DragSession::<u32>::default();
        session.press(VirtualPoint::new(0.0, 0.0), []);
        session.drag_to(VirtualPoint::new(0.0, 50.0));
        assert!(!session.is_active(5.0));
    }
}
