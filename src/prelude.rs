pub use crate::{
    BufferSurface, CellSize, DebugLabels, DefaultDndPolicy, DndPolicy, DropOutcome, HitArea,
    MutableTreeModel, NodeMovedArgs, NodeMovedResult, Placement, RenderSettings, Surface,
    Theme, TreeAction, TreeCanvas, TreeError, TreeEvent, TreeLabelProvider, TreeModel,
    TreeOptions, TreeState, TreeView, TreeViewBuilder,
};

#[cfg(feature = "keymap")]
pub use crate::{KeyBinding, KeymapProfile, TreeKeyBindings};
