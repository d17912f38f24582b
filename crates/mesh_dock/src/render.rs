#![forbid(unsafe_code)]

use core::fmt::Write as _;

use mesh_domain::{RoomId, RoomKind, TabId};

use crate::drag::{DragSession, LeafSurface};
use crate::tree::{Orientation, PanelId, PanelNode, PanelTree};
use crate::zone::{DropZone, Rect};

/// Shown in a leaf with no tabs.
pub const EMPTY_GROUP_PLACEHOLDER: &str = "No chat tabs open";

/// Produces the body of the active tab. The layout never inspects the output.
pub trait TabContentRenderer {
	type Output;

	fn render_content(&mut self, room: &RoomId, kind: RoomKind) -> Self::Output;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexDirection {
	Row,
	Column,
}

impl From<Orientation> for FlexDirection {
	fn from(o: Orientation) -> Self {
		match o {
			Orientation::Horizontal => FlexDirection::Row,
			Orientation::Vertical => FlexDirection::Column,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct TabHeader {
	pub tab: TabId,
	pub label: String,
	pub glyph: char,
	pub active: bool,
	/// Active tab of the most recently active leaf.
	pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GroupBody<C> {
	Content { tab: TabId, content: C },
	Placeholder(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupView<C> {
	pub leaf: PanelId,
	pub headers: Vec<TabHeader>,
	pub body: GroupBody<C>,
	pub drop_indicator: Option<DropZone>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlexChild<C> {
	/// Share of the container, normalized so siblings sum to 100.
	pub basis_percent: f32,
	pub node: RenderNode<C>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderNode<C> {
	Container {
		split: PanelId,
		direction: FlexDirection,
		children: Vec<FlexChild<C>>,
	},
	Group(GroupView<C>),
}

pub fn kind_glyph(kind: RoomKind) -> char {
	match kind {
		RoomKind::Direct => '@',
		RoomKind::Group | RoomKind::Space => '#',
	}
}

/// Project `tree` into nested view nodes. Only active tabs get content.
pub fn render<R: TabContentRenderer>(tree: &PanelTree, drag: &DragSession, content: &mut R) -> RenderNode<R::Output> {
	render_node(tree, tree.root(), drag.hover(), content).unwrap_or_else(|| empty_group(tree.default_leaf()))
}

fn render_node<R: TabContentRenderer>(
	tree: &PanelTree,
	id: PanelId,
	hover: Option<(PanelId, DropZone)>,
	content: &mut R,
) -> Option<RenderNode<R::Output>> {
	match tree.node(id)? {
		PanelNode::Split(split) => {
			let bases = normalized_bases(tree, &split.children);
			let children = split
				.children
				.iter()
				.zip(bases)
				.filter_map(|(child, basis_percent)| {
					render_node(tree, *child, hover, content).map(|node| FlexChild { basis_percent, node })
				})
				.collect();
			Some(RenderNode::Container {
				split: split.id,
				direction: split.orientation.into(),
				children,
			})
		}
		PanelNode::Leaf(leaf) => {
			let active = tree.active_tab(leaf.id);
			let focused = tree.last_active_leaf() == leaf.id;
			let headers = leaf
				.tabs
				.iter()
				.map(|t| {
					let is_active = active == Some(t.id);
					TabHeader {
						tab: t.id,
						label: t.room_name.clone(),
						glyph: kind_glyph(t.room_kind),
						active: is_active,
						highlighted: is_active && focused,
					}
				})
				.collect();
			let body = match active.and_then(|tab| tree.tab(tab)) {
				Some(t) => GroupBody::Content {
					tab: t.id,
					content: content.render_content(&t.room_id, t.room_kind),
				},
				None => GroupBody::Placeholder(EMPTY_GROUP_PLACEHOLDER),
			};
			Some(RenderNode::Group(GroupView {
				leaf: leaf.id,
				headers,
				body,
				drop_indicator: hover.filter(|(target, _)| *target == leaf.id).map(|(_, zone)| zone),
			}))
		}
	}
}

fn empty_group<C>(leaf: PanelId) -> RenderNode<C> {
	RenderNode::Group(GroupView {
		leaf,
		headers: Vec::new(),
		body: GroupBody::Placeholder(EMPTY_GROUP_PLACEHOLDER),
		drop_indicator: None,
	})
}

fn normalized_bases(tree: &PanelTree, children: &[PanelId]) -> Vec<f32> {
	let sizes: Vec<f32> = children
		.iter()
		.map(|c| tree.node(*c).map(PanelNode::size_percent).unwrap_or(0.0).max(0.0))
		.collect();
	let total: f32 = sizes.iter().sum();
	if total <= f32::EPSILON {
		let share = 100.0 / children.len().max(1) as f32;
		return vec![share; children.len()];
	}
	sizes.iter().map(|s| s / total * 100.0).collect()
}

/// Screen rectangle of every leaf within `bounds`, in depth-first order.
pub fn layout_surfaces(tree: &PanelTree, bounds: Rect) -> Vec<LeafSurface> {
	let mut out = Vec::new();
	layout_into(tree, tree.root(), bounds, &mut out);
	out
}

fn layout_into(tree: &PanelTree, id: PanelId, rect: Rect, out: &mut Vec<LeafSurface>) {
	match tree.node(id) {
		Some(PanelNode::Leaf(leaf)) => out.push(LeafSurface { leaf: leaf.id, rect }),
		Some(PanelNode::Split(split)) => {
			let bases = normalized_bases(tree, &split.children);
			let mut offset = 0.0;
			for (child, basis) in split.children.iter().zip(bases) {
				let child_rect = match split.orientation {
					Orientation::Horizontal => {
						let width = rect.width * basis / 100.0;
						Rect::new(rect.x + offset, rect.y, width, rect.height)
					}
					Orientation::Vertical => {
						let height = rect.height * basis / 100.0;
						Rect::new(rect.x, rect.y + offset, rect.width, height)
					}
				};
				offset += match split.orientation {
					Orientation::Horizontal => child_rect.width,
					Orientation::Vertical => child_rect.height,
				};
				layout_into(tree, *child, child_rect, out);
			}
		}
		None => {}
	}
}

/// Indented text view of the tree: one line per node, tabs beneath their leaf.
///
/// ```text
/// split p3 horizontal 100%
///   leaf p1 50% [default]
///     > #matrix-dev
///   leaf p2 50% [focused]
///     > @jane
/// ```
pub fn outline(tree: &PanelTree) -> String {
	let mut out = String::new();
	for (depth, node) in tree.walk() {
		let indent = "  ".repeat(depth);
		match node {
			PanelNode::Split(s) => {
				let _ = writeln!(
					out,
					"{indent}split {} {} {}%",
					s.id,
					s.orientation.as_str(),
					s.size_percent
				);
			}
			PanelNode::Leaf(l) => {
				let _ = write!(out, "{indent}leaf {} {}%", l.id, l.size_percent);
				if l.id == tree.default_leaf() {
					out.push_str(" [default]");
				}
				if l.id == tree.last_active_leaf() {
					out.push_str(" [focused]");
				}
				out.push('\n');
				if l.tabs.is_empty() {
					let _ = writeln!(out, "{indent}    ({EMPTY_GROUP_PLACEHOLDER})");
				}
				let active = tree.active_tab(l.id);
				for t in &l.tabs {
					let marker = if active == Some(t.id) { '>' } else { ' ' };
					let _ = writeln!(out, "{indent}  {marker} {}{}", kind_glyph(t.room_kind), t.room_name);
				}
			}
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use std::time::Instant;

	use mesh_domain::RoomInfo;

	use super::*;
	use crate::model::{DockModel, MoveOutcome};
	use crate::zone::Point;

	/// Records which rooms had content rendered.
	#[derive(Default)]
	struct Recorder {
		rendered: Vec<RoomId>,
	}

	impl TabContentRenderer for Recorder {
		type Output = String;

		fn render_content(&mut self, room: &RoomId, kind: RoomKind) -> String {
			self.rendered.push(room.clone());
			format!("{kind}:{room}")
		}
	}

	fn room(id: &str) -> RoomId {
		RoomId::new(id).unwrap()
	}

	fn split_model() -> (DockModel, PanelId, PanelId) {
		let mut model = DockModel::new();
		model.open_resolved(room("room1"), RoomInfo::new("matrix-dev", RoomKind::Group));
		model.open_resolved(room("room2"), RoomInfo::new("design-team", RoomKind::Group));
		let dm = model.open_resolved(room("dm1"), RoomInfo::new("jane", RoomKind::Direct));
		let home = model.default_leaf();
		let MoveOutcome::Split { leaf, .. } = model.move_tab(dm, home, DropZone::Right).unwrap() else {
			panic!("expected split");
		};
		(model, home, leaf)
	}

	#[test]
	fn empty_tree_renders_placeholder() {
		let model = DockModel::new();
		let mut recorder = Recorder::default();
		let node = render(model.tree(), &DragSession::new(), &mut recorder);
		let RenderNode::Group(group) = node else {
			panic!("expected a group");
		};
		assert!(group.headers.is_empty());
		assert_eq!(group.body, GroupBody::Placeholder(EMPTY_GROUP_PLACEHOLDER));
		assert!(recorder.rendered.is_empty());
	}

	#[test]
	fn split_renders_row_with_active_content_only() {
		let (model, home, right) = split_model();
		let mut recorder = Recorder::default();
		let node = render(model.tree(), &DragSession::new(), &mut recorder);

		let RenderNode::Container { direction, children, .. } = node else {
			panic!("expected a container");
		};
		assert_eq!(direction, FlexDirection::Row);
		assert_eq!(children.len(), 2);
		assert_eq!(children[0].basis_percent, 50.0);
		assert_eq!(children[1].basis_percent, 50.0);

		let RenderNode::Group(left) = &children[0].node else {
			panic!("expected a group");
		};
		assert_eq!(left.leaf, home);
		assert_eq!(left.headers.len(), 2);
		assert!(left.headers[0].active);
		assert!(!left.headers[0].highlighted);
		assert!(!left.headers[1].active);

		let RenderNode::Group(right_group) = &children[1].node else {
			panic!("expected a group");
		};
		assert_eq!(right_group.leaf, right);
		assert_eq!(right_group.headers[0].glyph, '@');
		assert!(right_group.headers[0].highlighted);

		assert_eq!(recorder.rendered, vec![room("room1"), room("dm1")]);
	}

	#[test]
	fn sibling_bases_are_normalized() {
		let (mut model, _, right) = split_model();
		let dm = model.active_tab(right).unwrap();
		model.open_resolved(room("space1"), RoomInfo::new("Community", RoomKind::Space));
		model.move_tab(dm, right, DropZone::Right).unwrap();

		let node = render(model.tree(), &DragSession::new(), &mut Recorder::default());
		let RenderNode::Container { children, .. } = node else {
			panic!("expected a container");
		};
		let total: f32 = children.iter().map(|c| c.basis_percent).sum();
		assert!((total - 100.0).abs() < 1e-3);
		assert_eq!(children.len(), 3);
	}

	#[test]
	fn hovered_leaf_carries_drop_indicator() {
		let (model, home, right) = split_model();
		let surfaces = layout_surfaces(model.tree(), Rect::new(0.0, 0.0, 200.0, 100.0));
		let mut drag = DragSession::new();
		drag.begin(model.active_tab(home).unwrap()).unwrap();
		drag.pointer_moved(Point::new(150.0, 95.0), &surfaces, Instant::now());

		let RenderNode::Container { children, .. } = render(model.tree(), &drag, &mut Recorder::default()) else {
			panic!("expected a container");
		};
		let indicators: Vec<_> = children
			.iter()
			.map(|c| match &c.node {
				RenderNode::Group(g) => (g.leaf, g.drop_indicator),
				RenderNode::Container { split, .. } => (*split, None),
			})
			.collect();
		assert_eq!(indicators, vec![(home, None), (right, Some(DropZone::Bottom))]);
	}

	#[test]
	fn surfaces_tile_the_bounds() {
		let (model, home, right) = split_model();
		let surfaces = layout_surfaces(model.tree(), Rect::new(10.0, 20.0, 200.0, 100.0));
		assert_eq!(
			surfaces,
			vec![
				LeafSurface {
					leaf: home,
					rect: Rect::new(10.0, 20.0, 100.0, 100.0),
				},
				LeafSurface {
					leaf: right,
					rect: Rect::new(110.0, 20.0, 100.0, 100.0),
				},
			]
		);
	}

	#[test]
	fn outline_marks_focus_and_active_tabs() {
		let (model, _, _) = split_model();
		let text = outline(model.tree());
		let lines: Vec<&str> = text.lines().collect();
		assert!(lines[0].starts_with("split p"));
		assert!(lines[0].contains("horizontal"));
		assert!(lines[1].trim_start().starts_with("leaf p1 50%"));
		assert!(lines[1].ends_with("[default]"));
		assert_eq!(lines[2].trim(), "> #matrix-dev");
		assert_eq!(lines[3].trim(), "#design-team");
		assert!(lines[4].ends_with("[focused]"));
		assert_eq!(lines[5].trim(), "> @jane");
	}

	#[test]
	fn outline_of_empty_tree_shows_placeholder() {
		let text = outline(DockModel::new().tree());
		assert!(text.contains(EMPTY_GROUP_PLACEHOLDER));
		assert!(text.starts_with("leaf p1 100% [default] [focused]"));
	}
}
