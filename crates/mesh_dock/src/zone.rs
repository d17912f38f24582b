#![forbid(unsafe_code)]

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use mesh_domain::ParseIdError;

use crate::tree::Orientation;

/// Fraction of a surface's width/height treated as an edge drop zone.
pub const DEFAULT_EDGE_FRACTION: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
	pub x: f32,
	pub y: f32,
}

impl Point {
	pub const fn new(x: f32, y: f32) -> Self {
		Self { x, y }
	}
}

/// Axis-aligned rectangle in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
	pub x: f32,
	pub y: f32,
	pub width: f32,
	pub height: f32,
}

impl Rect {
	pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
		Self { x, y, width, height }
	}

	/// Half-open containment: the right and bottom edges belong to the neighbour.
	pub fn contains(&self, p: Point) -> bool {
		p.x >= self.x && p.x < self.x + self.width && p.y >= self.y && p.y < self.y + self.height
	}
}

/// Region of a leaf's drop surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DropZone {
	Left,
	Right,
	Top,
	Bottom,
	#[default]
	Center,
}

/// Where a new leaf goes relative to the drop target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
	Before,
	After,
}

impl DropZone {
	pub const ALL: [DropZone; 5] = [
		DropZone::Left,
		DropZone::Right,
		DropZone::Top,
		DropZone::Bottom,
		DropZone::Center,
	];

	pub const fn as_str(self) -> &'static str {
		match self {
			DropZone::Left => "left",
			DropZone::Right => "right",
			DropZone::Top => "top",
			DropZone::Bottom => "bottom",
			DropZone::Center => "center",
		}
	}

	/// Orientation and placement of the split a drop in this zone creates.
	/// `None` for the center zone, which merges instead of splitting.
	pub const fn split_placement(self) -> Option<(Orientation, Placement)> {
		match self {
			DropZone::Left => Some((Orientation::Horizontal, Placement::Before)),
			DropZone::Right => Some((Orientation::Horizontal, Placement::After)),
			DropZone::Top => Some((Orientation::Vertical, Placement::Before)),
			DropZone::Bottom => Some((Orientation::Vertical, Placement::After)),
			DropZone::Center => None,
		}
	}
}

impl fmt::Display for DropZone {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for DropZone {
	type Err = ParseIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		if s.is_empty() {
			return Err(ParseIdError::Empty);
		}
		match s.to_ascii_lowercase().as_str() {
			"left" => Ok(DropZone::Left),
			"right" => Ok(DropZone::Right),
			"top" => Ok(DropZone::Top),
			"bottom" => Ok(DropZone::Bottom),
			"center" | "centre" => Ok(DropZone::Center),
			other => Err(ParseIdError::InvalidFormat(format!("unknown drop zone: {other}"))),
		}
	}
}

/// Resolve the drop zone for a pointer over `rect` using the default 20% edge.
pub fn resolve_drop_zone(rect: Rect, pointer_x: f32, pointer_y: f32) -> DropZone {
	resolve_drop_zone_with_edge(rect, pointer_x, pointer_y, DEFAULT_EDGE_FRACTION)
}

/// Resolve the drop zone with an explicit edge fraction.
///
/// Horizontal edges are checked before vertical ones, so a pointer in a corner
/// resolves to `Left` or `Right`.
pub fn resolve_drop_zone_with_edge(rect: Rect, pointer_x: f32, pointer_y: f32, edge: f32) -> DropZone {
	let x = pointer_x - rect.x;
	let y = pointer_y - rect.y;
	let w = rect.width;
	let h = rect.height;

	if x < w * edge {
		DropZone::Left
	} else if x > w * (1.0 - edge) {
		DropZone::Right
	} else if y < h * edge {
		DropZone::Top
	} else if y > h * (1.0 - edge) {
		DropZone::Bottom
	} else {
		DropZone::Center
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const SQUARE: Rect = Rect::new(0.0, 0.0, 100.0, 100.0);

	#[test]
	fn resolves_each_zone_on_a_square() {
		assert_eq!(resolve_drop_zone(SQUARE, 5.0, 50.0), DropZone::Left);
		assert_eq!(resolve_drop_zone(SQUARE, 95.0, 50.0), DropZone::Right);
		assert_eq!(resolve_drop_zone(SQUARE, 50.0, 5.0), DropZone::Top);
		assert_eq!(resolve_drop_zone(SQUARE, 50.0, 95.0), DropZone::Bottom);
		assert_eq!(resolve_drop_zone(SQUARE, 50.0, 50.0), DropZone::Center);
	}

	#[test]
	fn corners_prefer_horizontal_edges() {
		assert_eq!(resolve_drop_zone(SQUARE, 19.0, 19.0), DropZone::Left);
		assert_eq!(resolve_drop_zone(SQUARE, 81.0, 90.0), DropZone::Right);
	}

	#[test]
	fn pointer_is_made_rect_local() {
		let rect = Rect::new(200.0, 100.0, 400.0, 200.0);
		assert_eq!(resolve_drop_zone(rect, 210.0, 200.0), DropZone::Left);
		assert_eq!(resolve_drop_zone(rect, 400.0, 110.0), DropZone::Top);
		assert_eq!(resolve_drop_zone(rect, 400.0, 200.0), DropZone::Center);
	}

	#[test]
	fn exact_edge_boundary_is_not_an_edge() {
		assert_eq!(resolve_drop_zone(SQUARE, 20.0, 50.0), DropZone::Center);
		assert_eq!(resolve_drop_zone(SQUARE, 80.0, 50.0), DropZone::Center);
	}

	#[test]
	fn custom_edge_fraction() {
		assert_eq!(resolve_drop_zone_with_edge(SQUARE, 30.0, 50.0, 0.35), DropZone::Left);
		assert_eq!(resolve_drop_zone_with_edge(SQUARE, 30.0, 50.0, 0.1), DropZone::Center);
	}

	#[test]
	fn split_placement_matches_zone() {
		assert_eq!(
			DropZone::Left.split_placement(),
			Some((Orientation::Horizontal, Placement::Before))
		);
		assert_eq!(
			DropZone::Bottom.split_placement(),
			Some((Orientation::Vertical, Placement::After))
		);
		assert_eq!(DropZone::Center.split_placement(), None);
	}

	#[test]
	fn zone_parse_and_display() {
		for zone in DropZone::ALL {
			assert_eq!(zone.to_string().parse::<DropZone>().unwrap(), zone);
		}
		assert!("middle".parse::<DropZone>().is_err());
	}

	#[test]
	fn rect_contains_is_half_open() {
		assert!(SQUARE.contains(Point::new(0.0, 0.0)));
		assert!(SQUARE.contains(Point::new(99.9, 99.9)));
		assert!(!SQUARE.contains(Point::new(100.0, 50.0)));
		assert!(!SQUARE.contains(Point::new(-1.0, 50.0)));
	}
}
