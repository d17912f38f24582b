#![forbid(unsafe_code)]

use std::collections::HashMap;

use mesh_domain::TabId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::model::DockModel;
use crate::tree::{InvariantViolation, LeafNode, Orientation, PanelId, PanelNode, PanelTree, SplitNode, TabInfo};

pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable arrangement of a dock, nested the same way as the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
	pub version: u32,
	pub root: SnapshotNode,
	pub default_leaf: PanelId,
	pub focused_leaf: PanelId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SnapshotNode {
	Split {
		id: PanelId,
		orientation: Orientation,
		size_percent: f32,
		children: Vec<SnapshotNode>,
	},
	Leaf {
		id: PanelId,
		size_percent: f32,
		tabs: Vec<TabInfo>,
		#[serde(default)]
		active: Option<TabId>,
	},
}

#[derive(Debug, Error)]
pub enum SnapshotError {
	#[error("unsupported layout snapshot version {0}")]
	UnsupportedVersion(u32),
	#[error("panel {0} appears more than once")]
	DuplicatePanel(PanelId),
	#[error("active tab of leaf {0} is not one of its tabs")]
	BadActiveTab(PanelId),
	#[error("snapshot violates a layout rule: {0}")]
	Invalid(#[from] InvariantViolation),
}

impl DockModel {
	pub fn to_snapshot(&self) -> LayoutSnapshot {
		let tree = self.tree();
		LayoutSnapshot {
			version: SNAPSHOT_VERSION,
			root: snapshot_node(tree, tree.root()),
			default_leaf: tree.default_leaf(),
			focused_leaf: tree.last_active_leaf(),
		}
	}

	/// Rebuild a model from `snapshot`, rejecting anything that breaks a layout rule.
	pub fn from_snapshot(snapshot: &LayoutSnapshot) -> Result<Self, SnapshotError> {
		if snapshot.version != SNAPSHOT_VERSION {
			return Err(SnapshotError::UnsupportedVersion(snapshot.version));
		}

		let mut nodes = HashMap::new();
		let mut active = HashMap::new();
		let root = collect(&snapshot.root, &mut nodes, &mut active)?;

		let tree = PanelTree::from_parts(nodes, active, root, snapshot.default_leaf, snapshot.focused_leaf);
		tree.check_invariants()?;
		debug!(nodes = tree.node_count(), tabs = tree.tab_count(), "restored layout snapshot");
		Ok(DockModel::from_tree(tree))
	}
}

fn snapshot_node(tree: &PanelTree, id: PanelId) -> SnapshotNode {
	match tree.node(id) {
		Some(PanelNode::Split(split)) => SnapshotNode::Split {
			id,
			orientation: split.orientation,
			size_percent: split.size_percent,
			children: split.children.iter().map(|c| snapshot_node(tree, *c)).collect(),
		},
		Some(PanelNode::Leaf(leaf)) => SnapshotNode::Leaf {
			id,
			size_percent: leaf.size_percent,
			tabs: leaf.tabs.clone(),
			active: tree.active_tab(id),
		},
		// Unreachable for a settled tree; restore rejects it as an empty leaf.
		None => SnapshotNode::Leaf {
			id,
			size_percent: 0.0,
			tabs: Vec::new(),
			active: None,
		},
	}
}

fn collect(
	node: &SnapshotNode,
	nodes: &mut HashMap<PanelId, PanelNode>,
	active: &mut HashMap<PanelId, TabId>,
) -> Result<PanelId, SnapshotError> {
	match node {
		SnapshotNode::Split {
			id,
			orientation,
			size_percent,
			children,
		} => {
			let mut ids = Vec::with_capacity(children.len());
			for child in children {
				ids.push(collect(child, nodes, active)?);
			}
			let split = PanelNode::Split(SplitNode {
				id: *id,
				orientation: *orientation,
				children: ids,
				size_percent: *size_percent,
			});
			if nodes.insert(*id, split).is_some() {
				return Err(SnapshotError::DuplicatePanel(*id));
			}
			Ok(*id)
		}
		SnapshotNode::Leaf {
			id,
			size_percent,
			tabs,
			active: active_tab,
		} => {
			let selected = match active_tab {
				Some(tab) if tabs.iter().any(|t| t.id == *tab) => Some(*tab),
				Some(_) => return Err(SnapshotError::BadActiveTab(*id)),
				None => tabs.first().map(|t| t.id),
			};
			let leaf = PanelNode::Leaf(LeafNode {
				id: *id,
				tabs: tabs.clone(),
				size_percent: *size_percent,
			});
			if nodes.insert(*id, leaf).is_some() {
				return Err(SnapshotError::DuplicatePanel(*id));
			}
			if let Some(tab) = selected {
				active.insert(*id, tab);
			}
			Ok(*id)
		}
	}
}

#[cfg(test)]
mod tests {
	use mesh_domain::{RoomId, RoomInfo, RoomKind};

	use super::*;
	use crate::model::MoveOutcome;
	use crate::render::outline;
	use crate::zone::DropZone;

	fn arranged() -> DockModel {
		let mut model = DockModel::new();
		model.open_resolved(RoomId::new("room1").unwrap(), RoomInfo::new("matrix-dev", RoomKind::Group));
		let b = model.open_resolved(RoomId::new("room2").unwrap(), RoomInfo::new("design-team", RoomKind::Group));
		let c = model.open_resolved(RoomId::new("dm1").unwrap(), RoomInfo::new("jane", RoomKind::Direct));
		let home = model.default_leaf();
		let MoveOutcome::Split { leaf, .. } = model.move_tab(c, home, DropZone::Right).unwrap() else {
			panic!("expected split");
		};
		model.move_tab(b, leaf, DropZone::Bottom).unwrap();
		model
	}

	fn empty_leaf(id: u64) -> SnapshotNode {
		SnapshotNode::Leaf {
			id: PanelId(id),
			size_percent: 50.0,
			tabs: Vec::new(),
			active: None,
		}
	}

	#[test]
	fn snapshot_round_trip_preserves_arrangement() {
		let model = arranged();
		let json = serde_json::to_string(&model.to_snapshot()).unwrap();
		let restored = DockModel::from_snapshot(&serde_json::from_str(&json).unwrap()).unwrap();

		assert_eq!(outline(restored.tree()), outline(model.tree()));
		assert_eq!(restored.tab_count(), 3);
		assert_eq!(restored.active_room_id(), model.active_room_id());
		restored.tree().check_invariants().unwrap();
	}

	#[test]
	fn restored_model_keeps_allocating_fresh_ids() {
		let model = arranged();
		let mut restored = DockModel::from_snapshot(&model.to_snapshot()).unwrap();
		let tab = restored.open_resolved(RoomId::new("space1").unwrap(), RoomInfo::new("Community", RoomKind::Space));
		let leaf = restored.find_tab(tab).unwrap().0;
		let MoveOutcome::Split { leaf: fresh, .. } = restored.move_tab(tab, leaf, DropZone::Left).unwrap() else {
			panic!("expected split");
		};
		assert!(model.tree().node(fresh).is_none());
		restored.tree().check_invariants().unwrap();
	}

	#[test]
	fn rejects_unknown_version() {
		let mut snapshot = arranged().to_snapshot();
		snapshot.version = 99;
		assert!(matches!(
			DockModel::from_snapshot(&snapshot),
			Err(SnapshotError::UnsupportedVersion(99))
		));
	}

	#[test]
	fn rejects_empty_non_default_leaf() {
		let snapshot = LayoutSnapshot {
			version: SNAPSHOT_VERSION,
			root: SnapshotNode::Split {
				id: PanelId(3),
				orientation: Orientation::Horizontal,
				size_percent: 100.0,
				children: vec![empty_leaf(1), empty_leaf(2)],
			},
			default_leaf: PanelId(1),
			focused_leaf: PanelId(1),
		};
		assert!(matches!(
			DockModel::from_snapshot(&snapshot),
			Err(SnapshotError::Invalid(InvariantViolation::EmptyLeaf(PanelId(2))))
		));
	}

	#[test]
	fn rejects_duplicate_panel_ids() {
		let snapshot = LayoutSnapshot {
			version: SNAPSHOT_VERSION,
			root: SnapshotNode::Split {
				id: PanelId(3),
				orientation: Orientation::Vertical,
				size_percent: 100.0,
				children: vec![empty_leaf(1), empty_leaf(1)],
			},
			default_leaf: PanelId(1),
			focused_leaf: PanelId(1),
		};
		assert!(matches!(
			DockModel::from_snapshot(&snapshot),
			Err(SnapshotError::DuplicatePanel(PanelId(1)))
		));
	}

	#[test]
	fn rejects_missing_default_leaf() {
		let mut snapshot = arranged().to_snapshot();
		snapshot.default_leaf = PanelId(77);
		assert!(matches!(
			DockModel::from_snapshot(&snapshot),
			Err(SnapshotError::Invalid(InvariantViolation::BadDefaultLeaf(PanelId(77))))
		));
	}
}
