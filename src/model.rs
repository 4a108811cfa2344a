use std::fmt::Debug;
use std::hash::Hash;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::dnd::NodeMovedArgs;
use crate::listeners::{ListenerId, Listeners};

/// Minimal tree contract required by the widget.
///
/// A proper tree is expected (not a DAG):
/// - no cycles (DFS traversal is used directly);
/// - each node has exactly one parent;
/// - identifiers are stable between frames (for selection/expansion).
pub trait TreeModel {
    /// Node identifier type.
    type Id: Copy + Eq + Hash + Debug;

    /// Returns the root node (or `None` if the tree is empty).
    fn root(&self) -> Option<Self::Id>;
    /// Returns the number of children of `id`.
    fn child_count(&self, id: Self::Id) -> usize;
    /// Returns the child of `id` at `index`, in a deterministic order.
    fn child(&self, id: Self::Id, index: usize) -> Option<Self::Id>;

    /// Registers a listener fired whenever the structure changes.
    ///
    /// Models that never change may keep the default, which drops the
    /// listener and returns `None`.
    fn subscribe(&mut self, listener: Box<dyn FnMut()>) -> Option<ListenerId> {
        let _ = listener;
        None
    }

    /// Removes a listener registered with [`TreeModel::subscribe`].
    fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let _ = id;
        false
    }
}

/// Where a node sits in the tree: its parent and index among the siblings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeLocation<Id> {
    pub parent: Option<Id>,
    pub index: usize,
}

/// Finds `target` by walking the model from its root.
pub fn locate<M: TreeModel>(model: &M, target: M::Id) -> Option<NodeLocation<M::Id>> {
    let root = model.root()?;
    if root == target {
        return Some(NodeLocation {
            parent: None,
            index: 0,
        });
    }
    let mut stack: SmallVec<[M::Id; 16]> = SmallVec::new();
    stack.push(root);
    while let Some(node) = stack.pop() {
        for index in 0..model.child_count(node) {
            let Some(child) = model.child(node, index) else {
                continue;
            };
            if child == target {
                return Some(NodeLocation {
                    parent: Some(node),
                    index,
                });
            }
            stack.push(child);
        }
    }
    None
}

/// Default editable model backed by a parent → children map.
pub struct MutableTreeModel<Id> {
    root: Id,
    children: FxHashMap<Id, Vec<Id>>,
    listeners: Listeners<dyn FnMut()>,
}

impl<Id: Copy + Eq + Hash + Debug> MutableTreeModel<Id> {
    pub fn new(root: Id) -> Self {
        Self {
            root,
            children: FxHashMap::default(),
            listeners: Listeners::new(),
        }
    }

    /// Returns the children of `parent` (empty if it has none).
    pub fn children(&self, parent: Id) -> &[Id] {
        self.children.get(&parent).map_or(&[][..], Vec::as_slice)
    }

    /// Inserts `child` under `parent` at `index` (appends when `None`).
    ///
    /// Returns `false` if `child` is already a child of `parent`.
    pub fn add(&mut self, parent: Id, child: Id, index: Option<usize>) -> bool {
        if !self.insert_child(parent, child, index) {
            return false;
        }
        self.fire_changed();
        true
    }

    /// Removes `child` from `parent` together with its whole subtree.
    pub fn remove(&mut self, parent: Id, child: Id) -> bool {
        if !self.detach(parent, child) {
            return false;
        }
        self.remove_subtree(child);
        self.fire_changed();
        true
    }

    /// Removes every child of `parent`, keeping their subtrees addressable.
    pub fn clear_children(&mut self, parent: Id) {
        self.children.insert(parent, Vec::new());
        self.fire_changed();
    }

    /// Moves `node` with its subtree under `new_parent` at `index`.
    ///
    /// `index` refers to the sibling list after `node` has been detached.
    pub fn move_node(&mut self, node: Id, new_parent: Id, index: Option<usize>) -> bool {
        if node == self.root || self.is_ancestor_or_self(node, new_parent) {
            return false;
        }
        let Some(parent) = self.parent_of(node) else {
            return false;
        };
        self.detach(parent, node);
        self.insert_child(new_parent, node, index);
        self.fire_changed();
        true
    }

    /// Applies an accepted drag-and-drop move.
    ///
    /// The moved nodes keep their relative order and land where
    /// `args.new_index` pointed before they were detached. Refuses moves that
    /// would put a node inside its own subtree.
    pub fn apply_moved(&mut self, args: &NodeMovedArgs<Id>) -> bool {
        let moving: SmallVec<[Id; 4]> = args.nodes.iter().map(|moved| moved.node).collect();
        if moving
            .iter()
            .any(|node| *node == self.root || self.is_ancestor_or_self(*node, args.new_parent))
        {
            return false;
        }
        let siblings = self.children(args.new_parent);
        let end = args.new_index.min(siblings.len());
        let mut index = siblings[..end]
            .iter()
            .filter(|child| !moving.contains(*child))
            .count();
        for node in &moving {
            if let Some(parent) = self.parent_of(*node) {
                self.detach(parent, *node);
            }
        }
        for node in moving {
            if self.insert_child(args.new_parent, node, Some(index)) {
                index += 1;
            }
        }
        self.fire_changed();
        true
    }

    /// Returns the parent of `node`, if it is attached.
    pub fn parent_of(&self, node: Id) -> Option<Id> {
        self.children
            .iter()
            .find_map(|(parent, children)| children.contains(&node).then_some(*parent))
    }

    /// Returns the index of `node` among its siblings.
    pub fn index_of(&self, node: Id) -> Option<usize> {
        let parent = self.parent_of(node)?;
        self.children(parent).iter().position(|child| *child == node)
    }

    fn is_ancestor_or_self(&self, ancestor: Id, node: Id) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent_of(id);
        }
        false
    }

    fn insert_child(&mut self, parent: Id, child: Id, index: Option<usize>) -> bool {
        let siblings = self.children.entry(parent).or_default();
        if siblings.contains(&child) {
            return false;
        }
        let index = index.unwrap_or(siblings.len()).min(siblings.len());
        siblings.insert(index, child);
        true
    }

    fn detach(&mut self, parent: Id, child: Id) -> bool {
        let Some(siblings) = self.children.get_mut(&parent) else {
            return false;
        };
        let Some(idx) = siblings.iter().position(|id| *id == child) else {
            return false;
        };
        siblings.remove(idx);
        true
    }

    fn remove_subtree(&mut self, node: Id) {
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(children) = self.children.remove(&id) {
                stack.extend(children);
            }
        }
    }

    fn fire_changed(&mut self) {
        for listener in self.listeners.iter_mut() {
            listener();
        }
    }
}

impl<Id: Copy + Eq + Hash + Debug> TreeModel for MutableTreeModel<Id> {
    type Id = Id;

    fn root(&self) -> Option<Id> {
        Some(self.root)
    }

    fn child_count(&self, id: Id) -> usize {
        self.children(id).len()
    }

    fn child(&self, id: Id, index: usize) -> Option<Id> {
        self.children(id).get(index).copied()
    }

    fn subscribe(&mut self, listener: Box<dyn FnMut()>) -> Option<ListenerId> {
        Some(self.listeners.add(listener))
    }

    fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn sample() -> MutableTreeModel<u32> {
        let mut model = MutableTreeModel::new(0);
        model.add(0, 1, None);
        model.add(0, 2, None);
        model.add(1, 3, None);
        model.add(3, 4, None);
        model
    }

    #[test]
    fn add_respects_index_and_rejects_duplicates() {
        let mut model = sample();
        assert!(model.add(0, 5, Some(0)));
        assert!(!model.add(0, 5, None));
        assert_eq!(model.children(0), &[5, 1, 2]);
    }

    #[test]
    fn remove_drops_subtree() {
        let mut model = sample();
        assert!(model.remove(0, 1));
        assert_eq!(model.children(0), &[2]);
        assert!(model.children(3).is_empty());
        assert_eq!(model.parent_of(4), None);
    }

    #[test]
    fn move_keeps_subtree_and_refuses_cycles() {
        let mut model = sample();
        assert!(!model.move_node(1, 4, None));
        assert!(model.move_node(3, 2, Some(0)));
        assert_eq!(model.children(2), &[3]);
        assert_eq!(model.children(3), &[4]);
        assert_eq!(model.index_of(3), Some(0));
    }

    #[test]
    fn apply_moved_places_nodes_at_drop_index() {
        use crate::dnd::{MovedNode, Placement};
        use smallvec::smallvec;

        // 0: [1, 2, 5]; move 1 below 2.
        let mut model = sample();
        model.add(0, 5, None);
        let args = NodeMovedArgs {
            nodes: smallvec![MovedNode {
                node: 1,
                previous_parent: Some(0),
                previous_index: 0,
            }],
            new_parent: 0,
            new_index: 2,
            placement: Placement::Below,
        };
        assert!(model.apply_moved(&args));
        assert_eq!(model.children(0), &[2, 1, 5]);
        assert_eq!(model.children(1), &[3]);

        let into_own_subtree = NodeMovedArgs {
            new_parent: 4,
            new_index: 0,
            placement: Placement::Inside,
            ..args
        };
        assert!(!model.apply_moved(&into_own_subtree));
    }

    /// Root 0 with leaves 1 and 2, built from the required methods only.
    struct Fixed;

    impl TreeModel for Fixed {
        type Id = u8;

        fn root(&self) -> Option<u8> {
            Some(0)
        }

        fn child_count(&self, id: u8) -> usize {
            if id == 0 { 2 } else { 0 }
        }

        fn child(&self, id: u8, index: usize) -> Option<u8> {
            (id == 0).then(|| [1, 2].get(index).copied()).flatten()
        }
    }

    #[test]
    fn required_methods_are_enough() {
        let mut model = Fixed;
        assert_eq!(locate(&model, 2), Some(NodeLocation { parent: Some(0), index: 1 }));
        assert_eq!(model.subscribe(Box::new(|| {})), None);
    }

    #[test]
    fn locate_finds_parent_and_index() {
        let model = sample();
        assert_eq!(
            locate(&model, 2),
            Some(NodeLocation {
                parent: Some(0),
                index: 1
            })
        );
        assert_eq!(
            locate(&model, 0),
            Some(NodeLocation {
                parent: None,
                index: 0
            })
        );
        assert_eq!(locate(&model, 42), None);
    }

    #[test]
    fn listeners_fire_on_mutation() {
        let mut model = sample();
        let count = Rc::new(Cell::new(0));
        let id = {
            let count = Rc::clone(&count);
            model.subscribe(Box::new(move || count.set(count.get() + 1)))
        };
        model.add(2, 9, None);
        model.remove(2, 9);
        assert_eq!(count.get(), 2);
        assert!(model.unsubscribe(id.unwrap()));
        model.add(2, 9, None);
        assert_eq!(count.get(), 2);
    }
}
