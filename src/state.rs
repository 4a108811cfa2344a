use std::hash::Hash;

use rustc_hash::{FxHashMap, FxHashSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::listeners::{ListenerId, Listeners};

/// A single membership change of a selection or expansion set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateChange<Id> {
    pub node: Id,
    pub previous: bool,
    pub current: bool,
}

/// Listener signature for selection and expansion changes.
pub type StateListener<Id> = dyn FnMut(&StateChange<Id>);

/// Persisted part of the state (selection and expansion).
///
/// With the `serde` feature enabled, this type derives `Serialize`/`Deserialize`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeStateSnapshot<Id> {
    /// Selected nodes in selection order.
    pub selected: Vec<Id>,
    /// Expanded nodes.
    pub expanded: Vec<Id>,
}

impl<Id> Default for TreeStateSnapshot<Id> {
    fn default() -> Self {
        Self {
            selected: Vec::new(),
            expanded: Vec::new(),
        }
    }
}

/// Key-value persistence for tree state, keyed by widget identity.
pub trait StateStore<Id> {
    /// Loads the snapshot stored for `widget_id`, if any.
    fn load(&mut self, widget_id: &str) -> Result<Option<TreeStateSnapshot<Id>>>;
    /// Replaces the snapshot stored for `widget_id`.
    fn save(&mut self, widget_id: &str, snapshot: &TreeStateSnapshot<Id>) -> Result<()>;
}

/// In-memory [`StateStore`].
#[derive(Clone, Debug)]
pub struct MemoryStore<Id> {
    entries: FxHashMap<String, TreeStateSnapshot<Id>>,
}

impl<Id> Default for MemoryStore<Id> {
    fn default() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }
}

impl<Id: Clone> MemoryStore<Id> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the snapshot stored for `widget_id`.
    pub fn get(&self, widget_id: &str) -> Option<&TreeStateSnapshot<Id>> {
        self.entries.get(widget_id)
    }

    /// Seeds the store, e.g. with a snapshot from a previous session.
    pub fn insert(&mut self, widget_id: impl Into<String>, snapshot: TreeStateSnapshot<Id>) {
        self.entries.insert(widget_id.into(), snapshot);
    }
}

impl<Id: Clone> StateStore<Id> for MemoryStore<Id> {
    fn load(&mut self, widget_id: &str) -> Result<Option<TreeStateSnapshot<Id>>> {
        Ok(self.entries.get(widget_id).cloned())
    }

    fn save(&mut self, widget_id: &str, snapshot: &TreeStateSnapshot<Id>) -> Result<()> {
        self.entries.insert(widget_id.to_owned(), snapshot.clone());
        Ok(())
    }
}

/// Selection, expansion and lock sets of a tree view.
///
/// Every membership change of the selection or expansion set is reported to
/// the registered listeners as `(node, previous, current)` and, when a store
/// is attached, persisted under the widget id.
pub struct TreeState<Id> {
    // Selection order matters: keyboard navigation starts from the first entry.
    selected: Vec<Id>,
    selected_set: FxHashSet<Id>,
    expanded: FxHashSet<Id>,
    locked: FxHashSet<Id>,
    selection_listeners: Listeners<StateListener<Id>>,
    expansion_listeners: Listeners<StateListener<Id>>,
    store: Option<(String, Box<dyn StateStore<Id>>)>,
}

impl<Id: Copy + Eq + Hash + std::fmt::Debug> Default for TreeState<Id> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: Copy + Eq + Hash + std::fmt::Debug> TreeState<Id> {
    /// Creates an empty state without persistence.
    pub fn new() -> Self {
        Self {
            selected: Vec::new(),
            selected_set: FxHashSet::default(),
            expanded: FxHashSet::default(),
            locked: FxHashSet::default(),
            selection_listeners: Listeners::new(),
            expansion_listeners: Listeners::new(),
            store: None,
        }
    }

    /// Creates an empty state persisted to `store` under `widget_id`.
    ///
    /// Nothing is read until [`TreeState::load`] is called.
    pub fn with_store(widget_id: impl Into<String>, store: Box<dyn StateStore<Id>>) -> Self {
        Self {
            store: Some((widget_id.into(), store)),
            ..Self::new()
        }
    }

    /// Applies the persisted snapshot, firing listeners for every change.
    pub fn load(&mut self) -> Result<()> {
        let Some((widget_id, store)) = self.store.as_mut() else {
            return Ok(());
        };
        let Some(snapshot) = store.load(widget_id)? else {
            return Ok(());
        };
        tracing::debug!(
            widget_id = %widget_id,
            selected = snapshot.selected.len(),
            expanded = snapshot.expanded.len(),
            "restoring tree state"
        );
        for node in snapshot.expanded {
            self.set_expanded(node, true);
        }
        for node in snapshot.selected {
            self.set_selected(node, true);
        }
        Ok(())
    }

    #[inline]
    pub fn is_selected(&self, node: Id) -> bool {
        self.selected_set.contains(&node)
    }

    #[inline]
    pub fn is_expanded(&self, node: Id) -> bool {
        self.expanded.contains(&node)
    }

    #[inline]
    pub fn is_locked(&self, node: Id) -> bool {
        self.locked.contains(&node)
    }

    /// Selected nodes in the order they were selected.
    pub fn selected(&self) -> &[Id] {
        &self.selected
    }

    /// Expanded nodes, in no particular order.
    pub fn expanded(&self) -> impl Iterator<Item = Id> + '_ {
        self.expanded.iter().copied()
    }

    /// Adds or removes `node` from the selection. Returns `true` on change.
    pub fn set_selected(&mut self, node: Id, selected: bool) -> bool {
        if !self.apply_selected(node, selected) {
            return false;
        }
        Self::fire(&mut self.selection_listeners, node, !selected, selected);
        self.persist();
        true
    }

    /// Expands or collapses `node`. Locked nodes are left untouched.
    ///
    /// Returns `true` if the expansion set changed.
    pub fn set_expanded(&mut self, node: Id, expanded: bool) -> bool {
        if self.is_locked(node) {
            return false;
        }
        let changed = if expanded {
            self.expanded.insert(node)
        } else {
            self.expanded.remove(&node)
        };
        if !changed {
            return false;
        }
        Self::fire(&mut self.expansion_listeners, node, !expanded, expanded);
        self.persist();
        true
    }

    /// Flips the expansion of `node`.
    pub fn toggle_expanded(&mut self, node: Id) -> bool {
        let expand = !self.is_expanded(node);
        self.set_expanded(node, expand)
    }

    /// Locks or unlocks the expansion state of `node`.
    pub fn set_locked(&mut self, node: Id, locked: bool) {
        if locked {
            self.locked.insert(node);
        } else {
            self.locked.remove(&node);
        }
    }

    /// Deselects everything, notifying once per removed node.
    pub fn clear_selection(&mut self) {
        if self.selected.is_empty() {
            return;
        }
        let removed = std::mem::take(&mut self.selected);
        self.selected_set.clear();
        for node in removed {
            Self::fire(&mut self.selection_listeners, node, true, false);
        }
        self.persist();
    }

    /// Collapses every unlocked node, notifying once per collapsed node.
    pub fn clear_expansion(&mut self) {
        let collapsible: Vec<Id> = self
            .expanded
            .iter()
            .copied()
            .filter(|node| !self.locked.contains(node))
            .collect();
        if collapsible.is_empty() {
            return;
        }
        for node in collapsible {
            self.expanded.remove(&node);
            Self::fire(&mut self.expansion_listeners, node, true, false);
        }
        self.persist();
    }

    pub fn add_selection_listener(&mut self, listener: Box<StateListener<Id>>) -> ListenerId {
        self.selection_listeners.add(listener)
    }

    pub fn add_expansion_listener(&mut self, listener: Box<StateListener<Id>>) -> ListenerId {
        self.expansion_listeners.add(listener)
    }

    pub fn remove_selection_listener(&mut self, id: ListenerId) -> bool {
        self.selection_listeners.remove(id)
    }

    pub fn remove_expansion_listener(&mut self, id: ListenerId) -> bool {
        self.expansion_listeners.remove(id)
    }

    /// Captures selection and expansion for persistence or restore.
    pub fn snapshot(&self) -> TreeStateSnapshot<Id> {
        TreeStateSnapshot {
            selected: self.selected.clone(),
            expanded: self.expanded.iter().copied().collect(),
        }
    }

    /// Replaces selection and expansion without notifying listeners.
    pub fn restore(&mut self, snapshot: TreeStateSnapshot<Id>) {
        self.selected.clear();
        self.selected_set.clear();
        for node in snapshot.selected {
            self.apply_selected(node, true);
        }
        self.expanded = snapshot.expanded.into_iter().collect();
    }

    fn apply_selected(&mut self, node: Id, selected: bool) -> bool {
        if selected {
            if !self.selected_set.insert(node) {
                return false;
            }
            self.selected.push(node);
        } else {
            if !self.selected_set.remove(&node) {
                return false;
            }
            self.selected.retain(|id| *id != node);
        }
        true
    }

    fn fire(listeners: &mut Listeners<StateListener<Id>>, node: Id, previous: bool, current: bool) {
        let change = StateChange {
            node,
            previous,
            current,
        };
        for listener in listeners.iter_mut() {
            listener(&change);
        }
    }

    fn persist(&mut self) {
        if self.store.is_none() {
            return;
        }
        let snapshot = self.snapshot();
        if let Some((widget_id, store)) = self.store.as_mut()
            && let Err(err) = store.save(widget_id, &snapshot)
        {
            tracing::warn!(widget_id = %widget_id, error = %err, "failed to persist tree state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TreeError;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(state: &mut TreeState<u32>) -> Rc<RefCell<Vec<StateChange<u32>>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        state.add_expansion_listener(Box::new(move |change| sink.borrow_mut().push(*change)));
        log
    }

    #[test]
    fn expansion_changes_notify_with_previous_and_current() {
        let mut state = TreeState::new();
        let log = recorder(&mut state);

        assert!(state.set_expanded(1, true));
        assert!(!state.set_expanded(1, true));
        assert!(state.toggle_expanded(1));

        assert_eq!(
            *log.borrow(),
            vec![
                StateChange {
                    node: 1,
                    previous: false,
                    current: true
                },
                StateChange {
                    node: 1,
                    previous: true,
                    current: false
                },
            ]
        );
    }

    #[test]
    fn locked_node_cannot_change_expansion() {
        let mut state = TreeState::new();
        state.set_locked(4, true);
        assert!(!state.set_expanded(4, true));
        assert!(!state.is_expanded(4));

        state.set_locked(4, false);
        assert!(state.set_expanded(4, true));
        state.set_locked(4, true);
        state.clear_expansion();
        assert!(state.is_expanded(4));
    }

    #[test]
    fn selection_keeps_order_and_clears_with_notifications() {
        let mut state = TreeState::new();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        state.add_selection_listener(Box::new(move |_| *sink.borrow_mut() += 1));

        state.set_selected(3, true);
        state.set_selected(1, true);
        state.set_selected(3, true);
        assert_eq!(state.selected(), &[3, 1]);

        state.clear_selection();
        assert!(state.selected().is_empty());
        assert!(!state.is_selected(3));
        assert_eq!(*count.borrow(), 4);
    }

    #[test]
    fn persists_and_loads_through_store() {
        let shared = Rc::new(RefCell::new(MemoryStore::new()));

        struct Shared(Rc<RefCell<MemoryStore<u32>>>);
        impl StateStore<u32> for Shared {
            fn load(&mut self, widget_id: &str) -> Result<Option<TreeStateSnapshot<u32>>> {
                self.0.borrow_mut().load(widget_id)
            }
            fn save(&mut self, widget_id: &str, snapshot: &TreeStateSnapshot<u32>) -> Result<()> {
                self.0.borrow_mut().save(widget_id, snapshot)
            }
        }

        let mut first = TreeState::with_store("tree", Box::new(Shared(Rc::clone(&shared))));
        first.set_expanded(2, true);
        first.set_selected(5, true);
        assert_eq!(
            shared.borrow().get("tree").map(|s| s.selected.clone()),
            Some(vec![5])
        );

        let mut second = TreeState::with_store("tree", Box::new(Shared(shared)));
        let log = recorder(&mut second);
        second.load().unwrap();
        assert!(second.is_expanded(2));
        assert!(second.is_selected(5));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn failing_store_does_not_block_changes() {
        struct Broken;
        impl StateStore<u32> for Broken {
            fn load(&mut self, widget_id: &str) -> Result<Option<TreeStateSnapshot<u32>>> {
                Err(TreeError::Store {
                    widget_id: widget_id.to_owned(),
                    message: "offline".into(),
                })
            }
            fn save(&mut self, widget_id: &str, _: &TreeStateSnapshot<u32>) -> Result<()> {
                Err(TreeError::Store {
                    widget_id: widget_id.to_owned(),
                    message: "offline".into(),
                })
            }
        }

        let mut state = TreeState::with_store("tree", Box::new(Broken));
        assert!(state.load().is_err());
        assert!(state.set_selected(1, true));
        assert!(state.is_selected(1));
    }

    #[test]
    fn restore_is_silent() {
        let mut state = TreeState::new();
        let log = recorder(&mut state);
        state.restore(TreeStateSnapshot {
            selected: vec![1, 2],
            expanded: vec![7],
        });
        assert!(state.is_expanded(7));
        assert_eq!(state.selected(), &[1, 2]);
        assert!(log.borrow().is_empty());
    }
}
