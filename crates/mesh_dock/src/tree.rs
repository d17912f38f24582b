#![forbid(unsafe_code)]

use std::collections::{HashMap, HashSet};

use core::fmt;
use core::str::FromStr;

use mesh_domain::{ParseIdError, RoomId, RoomInfo, RoomKind, TabId};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::zone::Placement;

/// Share of the parent's space given to a freshly created root.
pub const FULL_SIZE_PERCENT: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct PanelId(pub u64);

impl fmt::Display for PanelId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "p{}", self.0)
	}
}

impl FromStr for PanelId {
	type Err = ParseIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		if s.is_empty() {
			return Err(ParseIdError::Empty);
		}
		let digits = s.strip_prefix('p').unwrap_or(s);
		digits
			.parse::<u64>()
			.map(PanelId)
			.map_err(|_| ParseIdError::InvalidFormat(format!("expected p<number>: {s}")))
	}
}

/// Axis along which a split lays out its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Orientation {
	/// Children side by side, left to right.
	Horizontal,
	/// Children stacked, top to bottom.
	Vertical,
}

impl Orientation {
	pub const fn as_str(self) -> &'static str {
		match self {
			Orientation::Horizontal => "horizontal",
			Orientation::Vertical => "vertical",
		}
	}
}

/// A tab bound to one room. Metadata is cached when the tab is created.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TabInfo {
	pub id: TabId,
	pub room_id: RoomId,
	pub room_name: String,
	pub room_kind: RoomKind,
}

impl TabInfo {
	pub fn new(room_id: RoomId, info: RoomInfo) -> Self {
		Self {
			id: TabId::new_v4(),
			room_id,
			room_name: info.name,
			room_kind: info.kind,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitNode {
	pub id: PanelId,
	pub orientation: Orientation,
	pub children: Vec<PanelId>,
	pub size_percent: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeafNode {
	pub id: PanelId,
	pub tabs: Vec<TabInfo>,
	pub size_percent: f32,
}

impl LeafNode {
	pub fn contains(&self, tab: TabId) -> bool {
		self.tabs.iter().any(|t| t.id == tab)
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelNode {
	Split(SplitNode),
	Leaf(LeafNode),
}

impl PanelNode {
	pub fn id(&self) -> PanelId {
		match self {
			PanelNode::Split(s) => s.id,
			PanelNode::Leaf(l) => l.id,
		}
	}

	pub fn size_percent(&self) -> f32 {
		match self {
			PanelNode::Split(s) => s.size_percent,
			PanelNode::Leaf(l) => l.size_percent,
		}
	}

	fn set_size_percent(&mut self, size: f32) {
		match self {
			PanelNode::Split(s) => s.size_percent = size,
			PanelNode::Leaf(l) => l.size_percent = size,
		}
	}

	pub fn as_leaf(&self) -> Option<&LeafNode> {
		match self {
			PanelNode::Leaf(l) => Some(l),
			PanelNode::Split(_) => None,
		}
	}

	pub fn as_split(&self) -> Option<&SplitNode> {
		match self {
			PanelNode::Split(s) => Some(s),
			PanelNode::Leaf(_) => None,
		}
	}
}

/// A broken structural rule, reported by [`PanelTree::check_invariants`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvariantViolation {
	#[error("root {0} is missing or has a parent")]
	BadRoot(PanelId),
	#[error("default leaf {0} is missing or not a leaf")]
	BadDefaultLeaf(PanelId),
	#[error("node {0} is reachable more than once")]
	SharedNode(PanelId),
	#[error("child {child} of split {split} does not exist")]
	DanglingChild { split: PanelId, child: PanelId },
	#[error("parent index for {node} is {indexed:?}, tree says {actual:?}")]
	ParentIndex {
		node: PanelId,
		indexed: Option<PanelId>,
		actual: Option<PanelId>,
	},
	#[error("{0} nodes are not reachable from the root")]
	Unreachable(usize),
	#[error("split {0} has {1} children")]
	UnderfilledSplit(PanelId, usize),
	#[error("leaf {0} is empty and is not the default leaf")]
	EmptyLeaf(PanelId),
	#[error("tab {0} appears more than once")]
	DuplicateTab(TabId),
	#[error("room {0} is open in more than one tab")]
	DuplicateRoom(RoomId),
	#[error("tab index disagrees with the tree for tab {0}")]
	TabIndex(TabId),
	#[error("room index disagrees with the tree for room {0}")]
	RoomIndex(RoomId),
	#[error("active tab for leaf {0} is not in that leaf")]
	ActiveTabMissing(PanelId),
	#[error("leaf {0} has tabs but no active tab")]
	ActiveTabUnset(PanelId),
}

/// The layout tree plus its indices and the per-leaf active tab table.
///
/// Only the crate mutates it; callers go through [`crate::DockModel`].
#[derive(Debug, Clone)]
pub struct PanelTree {
	nodes: HashMap<PanelId, PanelNode>,
	parents: HashMap<PanelId, PanelId>,
	tab_leaves: HashMap<TabId, PanelId>,
	rooms: HashMap<RoomId, TabId>,
	active: HashMap<PanelId, TabId>,
	root: PanelId,
	default_leaf: PanelId,
	last_active: PanelId,
	next_id: u64,
}

impl Default for PanelTree {
	fn default() -> Self {
		Self::new()
	}
}

impl PanelTree {
	/// A tree holding only the empty default leaf.
	pub fn new() -> Self {
		let id = PanelId(1);
		let mut nodes = HashMap::new();
		nodes.insert(
			id,
			PanelNode::Leaf(LeafNode {
				id,
				tabs: Vec::new(),
				size_percent: FULL_SIZE_PERCENT,
			}),
		);
		Self {
			nodes,
			parents: HashMap::new(),
			tab_leaves: HashMap::new(),
			rooms: HashMap::new(),
			active: HashMap::new(),
			root: id,
			default_leaf: id,
			last_active: id,
			next_id: 2,
		}
	}

	/// Rebuild a tree from its nodes, deriving every index. The result is not
	/// validated; run [`Self::check_invariants`] before handing it out.
	pub(crate) fn from_parts(
		nodes: HashMap<PanelId, PanelNode>,
		active: HashMap<PanelId, TabId>,
		root: PanelId,
		default_leaf: PanelId,
		last_active: PanelId,
	) -> Self {
		let next_id = nodes.keys().map(|id| id.0).max().unwrap_or(0) + 1;
		let mut parents = HashMap::new();
		let mut tab_leaves = HashMap::new();
		let mut rooms = HashMap::new();
		for node in nodes.values() {
			match node {
				PanelNode::Split(split) => {
					for child in &split.children {
						parents.insert(*child, split.id);
					}
				}
				PanelNode::Leaf(leaf) => {
					for tab in &leaf.tabs {
						tab_leaves.insert(tab.id, leaf.id);
						rooms.insert(tab.room_id.clone(), tab.id);
					}
				}
			}
		}
		Self {
			nodes,
			parents,
			tab_leaves,
			rooms,
			active,
			root,
			default_leaf,
			last_active,
			next_id,
		}
	}

	pub fn root(&self) -> PanelId {
		self.root
	}

	pub fn default_leaf(&self) -> PanelId {
		self.default_leaf
	}

	/// Most recently active leaf. May name a leaf that has since been removed.
	pub fn last_active_leaf(&self) -> PanelId {
		self.last_active
	}

	pub fn node(&self, id: PanelId) -> Option<&PanelNode> {
		self.nodes.get(&id)
	}

	pub fn leaf(&self, id: PanelId) -> Option<&LeafNode> {
		self.nodes.get(&id).and_then(PanelNode::as_leaf)
	}

	pub fn split(&self, id: PanelId) -> Option<&SplitNode> {
		self.nodes.get(&id).and_then(PanelNode::as_split)
	}

	pub fn parent(&self, id: PanelId) -> Option<PanelId> {
		self.parents.get(&id).copied()
	}

	pub fn contains(&self, id: PanelId) -> bool {
		self.nodes.contains_key(&id)
	}

	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	pub fn tab_count(&self) -> usize {
		self.tab_leaves.len()
	}

	/// Leaf currently holding `tab`.
	pub fn leaf_of_tab(&self, tab: TabId) -> Option<PanelId> {
		self.tab_leaves.get(&tab).copied()
	}

	pub fn tab(&self, tab: TabId) -> Option<&TabInfo> {
		let leaf = self.leaf(self.leaf_of_tab(tab)?)?;
		leaf.tabs.iter().find(|t| t.id == tab)
	}

	/// Tab bound to `room`, if one is open.
	pub fn tab_for_room(&self, room: &RoomId) -> Option<TabId> {
		self.rooms.get(room).copied()
	}

	pub fn active_tab(&self, leaf: PanelId) -> Option<TabId> {
		self.active.get(&leaf).copied()
	}

	/// Leaf ids in depth-first, left-to-right order.
	pub fn leaves(&self) -> Vec<PanelId> {
		self.walk().filter(|(_, n)| n.as_leaf().is_some()).map(|(_, n)| n.id()).collect()
	}

	/// Pre-order walk yielding `(depth, node)`.
	pub fn walk(&self) -> impl Iterator<Item = (usize, &PanelNode)> + '_ {
		let mut stack = vec![(0usize, self.root)];
		let mut seen = HashSet::new();
		std::iter::from_fn(move || {
			while let Some((depth, id)) = stack.pop() {
				if !seen.insert(id) {
					continue;
				}
				let Some(node) = self.nodes.get(&id) else {
					continue;
				};
				if let PanelNode::Split(s) = node {
					for child in s.children.iter().rev() {
						stack.push((depth + 1, *child));
					}
				}
				return Some((depth, node));
			}
			None
		})
	}

	pub(crate) fn alloc_id(&mut self) -> PanelId {
		let id = PanelId(self.next_id);
		self.next_id += 1;
		id
	}

	pub(crate) fn set_last_active(&mut self, leaf: PanelId) {
		self.last_active = leaf;
	}

	/// Set the active tab of `leaf`. Returns false when the tab is not in the leaf.
	pub(crate) fn set_active(&mut self, leaf: PanelId, tab: TabId) -> bool {
		if self.leaf_of_tab(tab) != Some(leaf) {
			return false;
		}
		self.active.insert(leaf, tab);
		true
	}

	/// Append `tab` to `leaf`, updating indices. The caller guarantees the tab id
	/// and room are not already present.
	pub(crate) fn push_tab(&mut self, leaf: PanelId, tab: TabInfo) -> bool {
		let Some(PanelNode::Leaf(node)) = self.nodes.get_mut(&leaf) else {
			return false;
		};
		self.tab_leaves.insert(tab.id, leaf);
		self.rooms.insert(tab.room_id.clone(), tab.id);
		node.tabs.push(tab);
		true
	}

	/// Remove `tab` from `leaf`. If it was active, the first remaining tab
	/// becomes active (or the entry is dropped when the leaf is now empty).
	pub(crate) fn remove_tab(&mut self, leaf: PanelId, tab: TabId) -> Option<TabInfo> {
		let Some(PanelNode::Leaf(node)) = self.nodes.get_mut(&leaf) else {
			return None;
		};
		let pos = node.tabs.iter().position(|t| t.id == tab)?;
		let removed = node.tabs.remove(pos);
		let first_remaining = node.tabs.first().map(|t| t.id);

		self.tab_leaves.remove(&tab);
		if self.rooms.get(&removed.room_id) == Some(&tab) {
			self.rooms.remove(&removed.room_id);
		}

		if self.active.get(&leaf) == Some(&tab) {
			match first_remaining {
				Some(next) => {
					self.active.insert(leaf, next);
				}
				None => {
					self.active.remove(&leaf);
				}
			}
		}
		Some(removed)
	}

	/// Create a detached leaf holding `tabs`. It must be attached with
	/// [`Self::split_beside`] before the tree is considered settled.
	pub(crate) fn new_leaf(&mut self, tabs: Vec<TabInfo>) -> PanelId {
		let id = self.alloc_id();
		for tab in &tabs {
			self.tab_leaves.insert(tab.id, id);
			self.rooms.insert(tab.room_id.clone(), tab.id);
		}
		if let Some(first) = tabs.first() {
			self.active.insert(id, first.id);
		}
		self.nodes.insert(
			id,
			PanelNode::Leaf(LeafNode {
				id,
				tabs,
				size_percent: FULL_SIZE_PERCENT,
			}),
		);
		id
	}

	/// Attach the detached node `new` next to `target` along `orientation`.
	///
	/// Reuses the target's parent when it already runs along `orientation`,
	/// otherwise wraps the target in a new split that takes over its size.
	pub(crate) fn split_beside(
		&mut self,
		target: PanelId,
		new: PanelId,
		orientation: Orientation,
		placement: Placement,
	) -> bool {
		let Some(prior) = self.nodes.get(&target).map(PanelNode::size_percent) else {
			return false;
		};
		if !self.nodes.contains_key(&new) || self.parents.contains_key(&new) {
			return false;
		}

		let parent = self.parent(target);
		let same_axis = parent
			.and_then(|p| self.split(p))
			.is_some_and(|s| s.orientation == orientation);

		if let (Some(parent), true) = (parent, same_axis) {
			let Some(PanelNode::Split(split)) = self.nodes.get_mut(&parent) else {
				return false;
			};
			let Some(idx) = split.children.iter().position(|c| *c == target) else {
				return false;
			};
			let at = match placement {
				Placement::Before => idx,
				Placement::After => idx + 1,
			};
			split.children.insert(at, new);
			self.parents.insert(new, parent);
			self.resize(target, prior / 2.0);
			self.resize(new, prior / 2.0);
			debug!(%target, %new, %parent, "inserted leaf into existing split");
			return true;
		}

		let split_id = self.alloc_id();
		let children = match placement {
			Placement::Before => vec![new, target],
			Placement::After => vec![target, new],
		};
		self.nodes.insert(
			split_id,
			PanelNode::Split(SplitNode {
				id: split_id,
				orientation,
				children,
				size_percent: prior,
			}),
		);

		match parent {
			Some(parent) => {
				self.replace_child(parent, target, split_id);
				self.parents.insert(split_id, parent);
			}
			None => {
				self.root = split_id;
			}
		}
		self.parents.insert(target, split_id);
		self.parents.insert(new, split_id);
		self.resize(target, FULL_SIZE_PERCENT / 2.0);
		self.resize(new, FULL_SIZE_PERCENT / 2.0);
		debug!(%target, %new, split = %split_id, orientation = orientation.as_str(), "wrapped target in new split");
		true
	}

	/// Strip invalid nodes at and below `id`, then collapse single-child splits
	/// upward from the node's position. The default leaf is never removed.
	pub(crate) fn cleanup(&mut self, id: PanelId) {
		if !self.nodes.contains_key(&id) {
			return;
		}
		self.normalize_below(id);

		let mut current = id;
		loop {
			if self.is_prunable(current) {
				let Some(parent) = self.parent(current) else {
					break;
				};
				self.detach(current);
				self.remove_node(current);
				debug!(node = %current, %parent, "removed empty node");
				current = parent;
				continue;
			}
			if self.is_single_child_split(current) {
				let parent = self.parent(current);
				self.collapse(current);
				match parent {
					Some(p) => {
						current = p;
						continue;
					}
					None => break,
				}
			}
			break;
		}
	}

	/// Check every structural rule. Stale `last_active` ids are allowed.
	pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
		if !self.nodes.contains_key(&self.root) || self.parents.contains_key(&self.root) {
			return Err(InvariantViolation::BadRoot(self.root));
		}
		if self.leaf(self.default_leaf).is_none() {
			return Err(InvariantViolation::BadDefaultLeaf(self.default_leaf));
		}

		let mut seen: HashSet<PanelId> = HashSet::new();
		let mut tabs: HashSet<TabId> = HashSet::new();
		let mut rooms: HashSet<&RoomId> = HashSet::new();
		let mut stack = vec![(self.root, None::<PanelId>)];

		while let Some((id, actual_parent)) = stack.pop() {
			if !seen.insert(id) {
				return Err(InvariantViolation::SharedNode(id));
			}
			let indexed = self.parent(id);
			if indexed != actual_parent {
				return Err(InvariantViolation::ParentIndex {
					node: id,
					indexed,
					actual: actual_parent,
				});
			}

			match self.nodes.get(&id) {
				Some(PanelNode::Split(s)) => {
					if s.children.len() < 2 {
						return Err(InvariantViolation::UnderfilledSplit(id, s.children.len()));
					}
					for child in &s.children {
						if !self.nodes.contains_key(child) {
							return Err(InvariantViolation::DanglingChild { split: id, child: *child });
						}
						stack.push((*child, Some(id)));
					}
				}
				Some(PanelNode::Leaf(l)) => {
					if l.tabs.is_empty() && id != self.default_leaf {
						return Err(InvariantViolation::EmptyLeaf(id));
					}
					for tab in &l.tabs {
						if !tabs.insert(tab.id) {
							return Err(InvariantViolation::DuplicateTab(tab.id));
						}
						if !rooms.insert(&tab.room_id) {
							return Err(InvariantViolation::DuplicateRoom(tab.room_id.clone()));
						}
						if self.tab_leaves.get(&tab.id) != Some(&id) {
							return Err(InvariantViolation::TabIndex(tab.id));
						}
						if self.rooms.get(&tab.room_id) != Some(&tab.id) {
							return Err(InvariantViolation::RoomIndex(tab.room_id.clone()));
						}
					}
					match self.active.get(&id) {
						Some(active) if !l.contains(*active) => {
							return Err(InvariantViolation::ActiveTabMissing(id));
						}
						None if !l.tabs.is_empty() => return Err(InvariantViolation::ActiveTabUnset(id)),
						_ => {}
					}
				}
				None => return Err(InvariantViolation::BadRoot(id)),
			}
		}

		if seen.len() != self.nodes.len() {
			return Err(InvariantViolation::Unreachable(self.nodes.len() - seen.len()));
		}
		if self.parents.len() + 1 != self.nodes.len() {
			let stray = self
				.parents
				.keys()
				.find(|id| !self.nodes.contains_key(id))
				.copied()
				.unwrap_or(self.root);
			return Err(InvariantViolation::ParentIndex {
				node: stray,
				indexed: self.parent(stray),
				actual: None,
			});
		}
		if self.tab_leaves.len() != tabs.len() {
			let stray = self.tab_leaves.keys().find(|t| !tabs.contains(*t)).copied();
			if let Some(tab) = stray {
				return Err(InvariantViolation::TabIndex(tab));
			}
		}
		if self.rooms.len() != rooms.len() {
			let stray = self.rooms.keys().find(|r| !rooms.contains(*r)).cloned();
			if let Some(room) = stray {
				return Err(InvariantViolation::RoomIndex(room));
			}
		}
		if let Some(stale) = self.active.keys().find(|leaf| self.leaf(**leaf).is_none()) {
			return Err(InvariantViolation::ActiveTabMissing(*stale));
		}
		Ok(())
	}

	/// Best-effort repair after an invariant violation: rebuild every index from
	/// the nodes reachable from the root, drop duplicates and unreachable nodes,
	/// then run a full cleanup.
	pub(crate) fn repair(&mut self) {
		if !self.nodes.contains_key(&self.root) {
			self.root = if self.leaf(self.default_leaf).is_some() {
				self.default_leaf
			} else {
				self.new_leaf(Vec::new())
			};
		}

		self.parents.clear();
		self.tab_leaves.clear();
		self.rooms.clear();

		let mut seen: HashSet<PanelId> = HashSet::from([self.root]);
		let mut stack = vec![self.root];
		while let Some(id) = stack.pop() {
			let Some(node) = self.nodes.get_mut(&id) else {
				continue;
			};
			match node {
				PanelNode::Split(s) => {
					let mut kept = Vec::with_capacity(s.children.len());
					for child in s.children.drain(..) {
						if seen.insert(child) {
							kept.push(child);
						}
					}
					s.children = kept;
					for child in &s.children {
						self.parents.insert(*child, id);
						stack.push(*child);
					}
				}
				PanelNode::Leaf(l) => {
					l.tabs.retain(|t| {
						if self.tab_leaves.contains_key(&t.id) || self.rooms.contains_key(&t.room_id) {
							return false;
						}
						self.tab_leaves.insert(t.id, id);
						self.rooms.insert(t.room_id.clone(), t.id);
						true
					});
				}
			}
		}

		self.nodes.retain(|id, _| seen.contains(id));
		let existing: HashSet<PanelId> = self.nodes.keys().copied().collect();
		self.parents.retain(|child, _| existing.contains(child));
		for node in self.nodes.values_mut() {
			if let PanelNode::Split(s) = node {
				s.children.retain(|c| existing.contains(c));
			}
		}

		if self.leaf(self.default_leaf).is_none() {
			self.default_leaf = self.leaves().first().copied().unwrap_or(self.root);
			if self.leaf(self.default_leaf).is_none() {
				self.nodes.clear();
				self.parents.clear();
				self.tab_leaves.clear();
				self.rooms.clear();
				let fresh = self.new_leaf(Vec::new());
				self.root = fresh;
				self.default_leaf = fresh;
			}
		}

		self.cleanup(self.root);

		let nodes = &self.nodes;
		self.active
			.retain(|leaf, tab| nodes.get(leaf).and_then(PanelNode::as_leaf).is_some_and(|l| l.contains(*tab)));
		for node in self.nodes.values() {
			if let PanelNode::Leaf(l) = node
				&& !self.active.contains_key(&l.id)
				&& let Some(first) = l.tabs.first()
			{
				self.active.insert(l.id, first.id);
			}
		}
		debug!(nodes = self.nodes.len(), tabs = self.tab_leaves.len(), "repaired panel tree");
	}

	fn resize(&mut self, id: PanelId, size: f32) {
		if let Some(node) = self.nodes.get_mut(&id) {
			node.set_size_percent(size);
		}
	}

	fn replace_child(&mut self, parent: PanelId, old: PanelId, new: PanelId) {
		if let Some(PanelNode::Split(s)) = self.nodes.get_mut(&parent) {
			for child in s.children.iter_mut() {
				if *child == old {
					*child = new;
				}
			}
		}
	}

	fn detach(&mut self, id: PanelId) {
		if let Some(parent) = self.parents.remove(&id)
			&& let Some(PanelNode::Split(s)) = self.nodes.get_mut(&parent)
		{
			s.children.retain(|c| *c != id);
		}
	}

	fn remove_node(&mut self, id: PanelId) {
		if let Some(PanelNode::Leaf(l)) = self.nodes.remove(&id) {
			for tab in l.tabs {
				self.tab_leaves.remove(&tab.id);
				self.rooms.remove(&tab.room_id);
			}
		}
		self.active.remove(&id);
		self.parents.remove(&id);
	}

	fn is_prunable(&self, id: PanelId) -> bool {
		match self.nodes.get(&id) {
			Some(PanelNode::Leaf(l)) => l.tabs.is_empty() && id != self.default_leaf,
			Some(PanelNode::Split(s)) => s.children.is_empty(),
			None => false,
		}
	}

	fn is_single_child_split(&self, id: PanelId) -> bool {
		self.split(id).is_some_and(|s| s.children.len() == 1)
	}

	/// Replace a single-child split by its child, which inherits the split's size.
	fn collapse(&mut self, split_id: PanelId) {
		let Some(PanelNode::Split(split)) = self.nodes.get(&split_id) else {
			return;
		};
		let [child] = split.children[..] else {
			return;
		};
		let size = split.size_percent;
		let parent = self.parent(split_id);

		self.resize(child, size);
		match parent {
			Some(parent) => {
				self.replace_child(parent, split_id, child);
				self.parents.insert(child, parent);
			}
			None => {
				self.parents.remove(&child);
				self.root = child;
			}
		}
		self.nodes.remove(&split_id);
		self.parents.remove(&split_id);
		debug!(split = %split_id, %child, "collapsed single-child split");
	}

	/// Clean every descendant of `id` bottom-up, leaving `id` itself alone.
	fn normalize_below(&mut self, id: PanelId) {
		let children = match self.nodes.get(&id) {
			Some(PanelNode::Split(s)) => s.children.clone(),
			_ => return,
		};
		for child in children {
			self.normalize_below(child);
			if self.is_prunable(child) {
				self.detach(child);
				self.remove_node(child);
			} else if self.is_single_child_split(child) {
				self.collapse(child);
			}
		}
	}

	#[cfg(test)]
	pub(crate) fn nodes_mut(&mut self) -> &mut HashMap<PanelId, PanelNode> {
		&mut self.nodes
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn tab(room: &str) -> TabInfo {
		TabInfo::new(RoomId::new(room).unwrap(), RoomInfo::new(room, RoomKind::Group))
	}

	fn tree_with_default_tab(room: &str) -> (PanelTree, TabId) {
		let mut tree = PanelTree::new();
		let t = tab(room);
		let id = t.id;
		tree.push_tab(tree.default_leaf(), t);
		tree.set_active(tree.default_leaf(), id);
		(tree, id)
	}

	#[test]
	fn new_tree_is_a_single_empty_default_leaf() {
		let tree = PanelTree::new();
		assert_eq!(tree.root(), tree.default_leaf());
		assert_eq!(tree.leaves(), vec![tree.default_leaf()]);
		assert!(tree.check_invariants().is_ok());
	}

	#[test]
	fn split_beside_root_creates_root_split() {
		let (mut tree, _) = tree_with_default_tab("a");
		let target = tree.default_leaf();
		let new = tree.new_leaf(vec![tab("b")]);
		assert!(tree.split_beside(target, new, Orientation::Horizontal, Placement::Before));

		let root = tree.split(tree.root()).expect("root split");
		assert_eq!(root.children, vec![new, target]);
		assert_eq!(root.orientation, Orientation::Horizontal);
		assert_eq!(root.size_percent, 100.0);
		assert_eq!(tree.node(new).unwrap().size_percent(), 50.0);
		assert_eq!(tree.node(target).unwrap().size_percent(), 50.0);
		assert!(tree.check_invariants().is_ok());
	}

	#[test]
	fn split_beside_same_axis_inserts_sibling() {
		let (mut tree, _) = tree_with_default_tab("a");
		let target = tree.default_leaf();
		let b = tree.new_leaf(vec![tab("b")]);
		tree.split_beside(target, b, Orientation::Horizontal, Placement::After);
		let c = tree.new_leaf(vec![tab("c")]);
		assert!(tree.split_beside(b, c, Orientation::Horizontal, Placement::Before));

		let root = tree.split(tree.root()).unwrap();
		assert_eq!(root.children, vec![target, c, b]);
		assert_eq!(tree.node(b).unwrap().size_percent(), 25.0);
		assert_eq!(tree.node(c).unwrap().size_percent(), 25.0);
		assert!(tree.check_invariants().is_ok());
	}

	#[test]
	fn split_beside_cross_axis_wraps_target() {
		let (mut tree, _) = tree_with_default_tab("a");
		let target = tree.default_leaf();
		let b = tree.new_leaf(vec![tab("b")]);
		tree.split_beside(target, b, Orientation::Horizontal, Placement::After);
		let c = tree.new_leaf(vec![tab("c")]);
		assert!(tree.split_beside(b, c, Orientation::Vertical, Placement::After));

		let root = tree.split(tree.root()).unwrap();
		assert_eq!(root.children.len(), 2);
		let inner_id = root.children[1];
		let inner = tree.split(inner_id).expect("intermediate split");
		assert_eq!(inner.orientation, Orientation::Vertical);
		assert_eq!(inner.children, vec![b, c]);
		assert_eq!(inner.size_percent, 50.0);
		assert_eq!(tree.parent(b), Some(inner_id));
		assert_eq!(tree.parent(inner_id), Some(tree.root()));
		assert!(tree.check_invariants().is_ok());
	}

	#[test]
	fn cleanup_removes_empty_leaf_and_collapses_parent() {
		let (mut tree, _) = tree_with_default_tab("a");
		let target = tree.default_leaf();
		let b_tab = tab("b");
		let b_id = b_tab.id;
		let b = tree.new_leaf(vec![b_tab]);
		tree.split_beside(target, b, Orientation::Horizontal, Placement::After);

		tree.remove_tab(b, b_id);
		tree.cleanup(b);

		assert!(!tree.contains(b));
		assert_eq!(tree.root(), target);
		assert_eq!(tree.parent(target), None);
		assert_eq!(tree.node(target).unwrap().size_percent(), 100.0);
		assert!(tree.check_invariants().is_ok());
	}

	#[test]
	fn cleanup_keeps_empty_default_leaf() {
		let (mut tree, a) = tree_with_default_tab("a");
		let leaf = tree.default_leaf();
		tree.remove_tab(leaf, a);
		tree.cleanup(leaf);
		assert!(tree.contains(leaf));
		assert_eq!(tree.root(), leaf);
		assert_eq!(tree.active_tab(leaf), None);
		assert!(tree.check_invariants().is_ok());
	}

	#[test]
	fn remove_active_tab_promotes_first_remaining() {
		let (mut tree, a) = tree_with_default_tab("a");
		let leaf = tree.default_leaf();
		let b = tab("b");
		let c = tab("c");
		let (b_id, c_id) = (b.id, c.id);
		tree.push_tab(leaf, b);
		tree.push_tab(leaf, c);
		tree.set_active(leaf, c_id);

		tree.remove_tab(leaf, c_id);
		assert_eq!(tree.active_tab(leaf), Some(a));
		tree.remove_tab(leaf, b_id);
		assert_eq!(tree.active_tab(leaf), Some(a));
		assert!(tree.tab_for_room(&RoomId::new("b").unwrap()).is_none());
	}

	#[test]
	fn check_reports_empty_non_default_leaf() {
		let (mut tree, _) = tree_with_default_tab("a");
		let target = tree.default_leaf();
		let b_tab = tab("b");
		let b_id = b_tab.id;
		let b = tree.new_leaf(vec![b_tab]);
		tree.split_beside(target, b, Orientation::Horizontal, Placement::After);
		tree.remove_tab(b, b_id);
		assert_eq!(tree.check_invariants(), Err(InvariantViolation::EmptyLeaf(b)));
	}

	#[test]
	fn repair_restores_a_valid_tree() {
		let (mut tree, _) = tree_with_default_tab("a");
		let target = tree.default_leaf();
		let b = tree.new_leaf(vec![tab("b")]);
		tree.split_beside(target, b, Orientation::Horizontal, Placement::After);

		// Corrupt: duplicate a child entry and empty the non-default leaf behind the index's back.
		let root = tree.root();
		if let Some(PanelNode::Split(s)) = tree.nodes_mut().get_mut(&root) {
			s.children.push(b);
		}
		if let Some(PanelNode::Leaf(l)) = tree.nodes_mut().get_mut(&b) {
			l.tabs.clear();
		}
		assert!(tree.check_invariants().is_err());

		tree.repair();
		assert!(tree.check_invariants().is_ok());
		assert_eq!(tree.root(), target);
	}

	#[test]
	fn walk_is_preorder() {
		let (mut tree, _) = tree_with_default_tab("a");
		let a = tree.default_leaf();
		let b = tree.new_leaf(vec![tab("b")]);
		tree.split_beside(a, b, Orientation::Vertical, Placement::After);
		let order: Vec<(usize, PanelId)> = tree.walk().map(|(d, n)| (d, n.id())).collect();
		assert_eq!(order, vec![(0, tree.root()), (1, a), (1, b)]);
	}

	#[test]
	fn panel_id_parse() {
		assert_eq!("p12".parse::<PanelId>().unwrap(), PanelId(12));
		assert_eq!("7".parse::<PanelId>().unwrap(), PanelId(7));
		assert_eq!(PanelId(3).to_string(), "p3");
		assert!("px".parse::<PanelId>().is_err());
	}
}
