/// Navigation and scrolling commands understood by [`crate::TreeView`].
///
/// `Custom` carries application commands through the same dispatch path;
/// the view hands them back untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeAction<Custom = ()> {
    /// Row above the selection (the root when nothing is selected).
    SelectPrev,
    /// Row below the selection (the root when nothing is selected).
    SelectNext,
    /// Collapses the selected node; a collapsed or leaf node hands the
    /// selection to its parent.
    SelectParent,
    /// Expands the selected node; an expanded node hands the selection to
    /// its first child.
    SelectChild,
    ToggleNode,
    /// Collapses everything except locked nodes.
    CollapseAll,
    ClearSelection,
    ScrollHome,
    ScrollEnd,
    /// One surface height up.
    PageUp,
    /// One surface height down.
    PageDown,
    Custom(Custom),
}

impl<C> TreeAction<C> {
    /// Re-types a built-in action; `None` for [`TreeAction::Custom`].
    pub fn builtin<D>(self) -> Option<TreeAction<D>> {
        Some(match self {
            Self::SelectPrev => TreeAction::SelectPrev,
            Self::SelectNext => TreeAction::SelectNext,
            Self::SelectParent => TreeAction::SelectParent,
            Self::SelectChild => TreeAction::SelectChild,
            Self::ToggleNode => TreeAction::ToggleNode,
            Self::CollapseAll => TreeAction::CollapseAll,
            Self::ClearSelection => TreeAction::ClearSelection,
            Self::ScrollHome => TreeAction::ScrollHome,
            Self::ScrollEnd => TreeAction::ScrollEnd,
            Self::PageUp => TreeAction::PageUp,
            Self::PageDown => TreeAction::PageDown,
            Self::Custom(_) => return None,
        })
    }
}

/// What became of an action or key event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeEvent<Custom = ()> {
    /// The view changed state and repainted.
    Handled,
    /// Nothing to do, e.g. no selection or already at the last row.
    Unhandled,
    /// A custom action for the caller.
    Action(TreeAction<Custom>),
}
