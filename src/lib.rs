//! Painted tree view with hit-testing, scrolling and drag-and-drop.
//!
//! One traversal engine drives every pass: painting, hit-testing a point and
//! measuring a node walk the visible rows the same way, so what is drawn is
//! exactly what can be clicked. Rows are laid out in virtual space and shown
//! through a scrollable [`Viewport`]. Drag-and-drop classifies the pointer
//! into above/inside/below bands and collects allow/deny answers from a
//! [`DndPolicy`], which may answer after the frame was painted.
//!
//! [`TreeCanvas`] shows a [`TreeView`] inside a ratatui layout; any other
//! backend implements [`Surface`].
//!
//! Feature flags:
//! - `keymap`: crossterm-based key bindings and `TreeView::handle_key*` helpers.
//! - `serde`: serde support for settings, options and state snapshots.

mod action;
mod dnd;
mod error;
mod geometry;
mod icons;
#[cfg(feature = "keymap")]
mod keymap;
mod label;
mod listeners;
mod measure;
mod model;
mod pass;
pub mod prelude;
mod renderer;
mod settings;
mod state;
mod surface;
mod theme;
mod view;
mod widget;

pub use action::{TreeAction, TreeEvent};
pub use dnd::{
    AllowanceReply, AllowanceTally, DefaultDndPolicy, DndPolicy, DragSession, DropTarget,
    MovedNode, NodeMovedArgs, NodeMovedListener, NodeMovedResult, Placement, classify,
};
pub use error::{Result, TreeError};
pub use geometry::{Viewport, VirtualLine, VirtualPoint, VirtualRect, snap};
pub use icons::{IconCache, IconImage, IconPayload, ImageProvider, ImageReply};
#[cfg(feature = "keymap")]
pub use keymap::{KeyBinding, KeymapProfile, TreeKeyBindings};
pub use label::{DebugLabels, TreeLabelProvider};
pub use listeners::{ListenerId, Listeners};
pub use measure::{HitArea, ItemMeasurements, TextMetricsCache};
pub use model::{MutableTreeModel, NodeLocation, TreeModel, locate};
pub use pass::{PassMode, RenderEntry, RenderPass, TreeHit};
pub use renderer::{SCROLLBAR_WIDTH, TreeRenderer};
pub use settings::{RenderSettings, TreeOptions};
pub use state::{
    MemoryStore, StateChange, StateListener, StateStore, TreeState, TreeStateSnapshot,
};
pub use surface::{DrawCommand, Paint, RecordingSurface, Stroke, Surface};
pub use theme::{Font, Theme};
pub use view::{DropOutcome, PaintReport, TreeView, TreeViewBuilder};
pub use widget::{BufferSurface, CellSize, TreeCanvas};
