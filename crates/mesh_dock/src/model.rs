#![forbid(unsafe_code)]

use std::sync::Arc;

use mesh_domain::{RoomId, RoomInfo, TabId};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::directory::{RoomDirectory, resolve_or_fallback};
use crate::tree::{PanelId, PanelTree, TabInfo};
use crate::zone::DropZone;

/// Why a `move_tab` request was dropped. Callers log these; they are never fatal
/// since a drag can race with a concurrent close.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoveError {
	#[error("tab {0} is not in the layout")]
	UnknownTab(TabId),
	#[error("leaf {0} is not in the layout")]
	UnknownLeaf(PanelId),
}

/// What a successful `move_tab` did to the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
	/// Nothing to do (center drop on the tab's own leaf, or splitting a leaf's only tab against itself).
	Unchanged,
	/// Tab appended to an existing group.
	Merged { from: PanelId, into: PanelId },
	/// Tab placed in a new leaf next to the target.
	Split { target: PanelId, leaf: PanelId },
}

/// Owner of the panel tree and every operation allowed to change it.
///
/// The tree is held behind an `Arc` and updated copy-on-write, so snapshots
/// handed to a renderer never observe a half-applied mutation.
#[derive(Debug, Clone, Default)]
pub struct DockModel {
	tree: Arc<PanelTree>,
}

impl DockModel {
	pub fn new() -> Self {
		Self::default()
	}

	pub(crate) fn from_tree(tree: PanelTree) -> Self {
		Self { tree: Arc::new(tree) }
	}

	pub fn tree(&self) -> &PanelTree {
		&self.tree
	}

	/// Cheap shared handle to the current tree.
	pub fn snapshot(&self) -> Arc<PanelTree> {
		Arc::clone(&self.tree)
	}

	pub fn default_leaf(&self) -> PanelId {
		self.tree.default_leaf()
	}

	pub fn last_active_leaf(&self) -> PanelId {
		self.tree.last_active_leaf()
	}

	pub fn active_tab(&self, leaf: PanelId) -> Option<TabId> {
		self.tree.active_tab(leaf)
	}

	pub fn leaves(&self) -> Vec<PanelId> {
		self.tree.leaves()
	}

	pub fn tab_count(&self) -> usize {
		self.tree.tab_count()
	}

	pub fn find_tab(&self, tab: TabId) -> Option<(PanelId, &TabInfo)> {
		let leaf = self.tree.leaf_of_tab(tab)?;
		Some((leaf, self.tree.tab(tab)?))
	}

	pub fn find_room(&self, room: &RoomId) -> Option<TabId> {
		self.tree.tab_for_room(room)
	}

	/// Room of the active tab in the most recently active leaf, or of the
	/// first leaf with an active tab once that leaf is gone or empty.
	pub fn active_room_id(&self) -> Option<RoomId> {
		let tab = self
			.tree
			.active_tab(self.tree.last_active_leaf())
			.or_else(|| self.tree.leaves().into_iter().find_map(|leaf| self.tree.active_tab(leaf)))?;
		self.tree.tab(tab).map(|t| t.room_id.clone())
	}

	/// Open `room`, or focus the tab already showing it.
	pub fn open_room(&mut self, room: RoomId, directory: &(impl RoomDirectory + ?Sized)) -> TabId {
		if let Some(tab) = self.focus_room(&room) {
			return tab;
		}
		let info = resolve_or_fallback(directory, &room);
		self.open_resolved(room, info)
	}

	/// Like [`Self::open_room`] with metadata resolved up front.
	pub fn open_resolved(&mut self, room: RoomId, info: RoomInfo) -> TabId {
		if let Some(tab) = self.focus_room(&room) {
			return tab;
		}

		let tree = Arc::make_mut(&mut self.tree);
		let last = tree.last_active_leaf();
		let target = if tree.leaf(last).is_some() { last } else { tree.default_leaf() };

		let tab = TabInfo::new(room, info);
		let id = tab.id;
		info!(tab = %id, room = %tab.room_id, name = %tab.room_name, leaf = %target, "opening room tab");
		tree.push_tab(target, tab);
		tree.set_active(target, id);
		tree.set_last_active(target);

		self.settle("open_room");
		id
	}

	/// Remove `tab` from `leaf`, then clean the leaf up.
	pub fn close_tab(&mut self, leaf: PanelId, tab: TabId) -> bool {
		if self.tree.leaf_of_tab(tab) != Some(leaf) {
			debug!(%leaf, %tab, "close_tab ignored: tab not in leaf");
			return false;
		}

		let tree = Arc::make_mut(&mut self.tree);
		let removed = tree.remove_tab(leaf, tab);
		tree.cleanup(leaf);
		if let Some(removed) = removed {
			info!(%leaf, tab = %removed.id, room = %removed.room_id, "closed tab");
		}

		self.settle("close_tab");
		true
	}

	/// Select `tab` in `leaf` and make the leaf the most recently active one.
	pub fn activate_tab(&mut self, leaf: PanelId, tab: TabId) -> bool {
		if self.tree.leaf_of_tab(tab) != Some(leaf) {
			return false;
		}
		let tree = Arc::make_mut(&mut self.tree);
		tree.set_active(leaf, tab);
		tree.set_last_active(leaf);
		debug!(%leaf, %tab, "activated tab");
		true
	}

	/// Move `source` relative to `target` according to the drop zone.
	pub fn move_tab(&mut self, source: TabId, target: PanelId, zone: DropZone) -> Result<MoveOutcome, MoveError> {
		let Some(from) = self.tree.leaf_of_tab(source) else {
			warn!(tab = %source, %target, %zone, "move_tab ignored: unknown tab");
			return Err(MoveError::UnknownTab(source));
		};
		let Some(target_leaf) = self.tree.leaf(target) else {
			warn!(tab = %source, %target, %zone, "move_tab ignored: unknown target leaf");
			return Err(MoveError::UnknownLeaf(target));
		};

		let outcome = match zone.split_placement() {
			None => {
				if from == target {
					return Ok(MoveOutcome::Unchanged);
				}
				let tree = Arc::make_mut(&mut self.tree);
				let Some(tab) = tree.remove_tab(from, source) else {
					return Err(MoveError::UnknownTab(source));
				};
				tree.push_tab(target, tab);
				tree.set_active(target, source);
				tree.set_last_active(target);
				tree.cleanup(from);
				MoveOutcome::Merged { from, into: target }
			}
			Some((orientation, placement)) => {
				if from == target && target_leaf.tabs.len() == 1 {
					return Ok(MoveOutcome::Unchanged);
				}
				let tree = Arc::make_mut(&mut self.tree);
				let Some(tab) = tree.remove_tab(from, source) else {
					return Err(MoveError::UnknownTab(source));
				};
				let leaf = tree.new_leaf(vec![tab]);
				if !tree.split_beside(target, leaf, orientation, placement) {
					error!(%target, %leaf, "split_beside rejected a validated target");
				}
				tree.set_last_active(leaf);
				tree.cleanup(from);
				MoveOutcome::Split { target, leaf }
			}
		};

		info!(tab = %source, %from, %target, %zone, ?outcome, "moved tab");
		self.settle("move_tab");
		Ok(outcome)
	}

	/// Strip `node` if it is invalid and collapse the splits above it.
	pub fn cleanup(&mut self, node: PanelId) {
		if !self.tree.contains(node) {
			return;
		}
		Arc::make_mut(&mut self.tree).cleanup(node);
		self.settle("cleanup");
	}

	/// Activate the tab already showing `room`, if there is one.
	pub fn focus_room(&mut self, room: &RoomId) -> Option<TabId> {
		let tab = self.tree.tab_for_room(room)?;
		let leaf = self.tree.leaf_of_tab(tab)?;
		let tree = Arc::make_mut(&mut self.tree);
		tree.set_active(leaf, tab);
		tree.set_last_active(leaf);
		debug!(%room, %tab, %leaf, "room already open; focusing existing tab");
		Some(tab)
	}

	/// Verify the tree after a mutation. Debug builds treat a violation as a bug;
	/// release builds repair and carry on.
	fn settle(&mut self, op: &'static str) {
		if let Err(violation) = self.tree.check_invariants() {
			debug_assert!(false, "panel tree invariant violated after {op}: {violation}");
			error!(op, %violation, "panel tree invariant violated; repairing");
			Arc::make_mut(&mut self.tree).repair();
		}
	}
}
