#![forbid(unsafe_code)]

//! Dockable tab layout: a tree of splits and tab groups rearranged by dragging tabs.

pub mod directory;
pub mod drag;
pub mod model;
pub mod render;
#[cfg(feature = "serde")]
pub mod snapshot;
pub mod tree;
pub mod zone;

pub use directory::{DirectoryError, RoomDirectory, StaticRoomDirectory, infer_kind, resolve_or_fallback};
pub use drag::{DEFAULT_HOVER_DEBOUNCE, DragError, DragSession, DragState, DropOutcome, LeafSurface};
pub use model::{DockModel, MoveError, MoveOutcome};
pub use render::{
	EMPTY_GROUP_PLACEHOLDER, FlexChild, FlexDirection, GroupBody, GroupView, RenderNode, TabContentRenderer, TabHeader,
	kind_glyph, layout_surfaces, outline, render,
};
#[cfg(feature = "serde")]
pub use snapshot::{LayoutSnapshot, SNAPSHOT_VERSION, SnapshotError, SnapshotNode};
pub use tree::{InvariantViolation, LeafNode, Orientation, PanelId, PanelNode, PanelTree, SplitNode, TabInfo};
pub use zone::{
	DEFAULT_EDGE_FRACTION, DropZone, Placement, Point, Rect, resolve_drop_zone, resolve_drop_zone_with_edge,
};
