#![forbid(unsafe_code)]

use std::time::{Duration, Instant};

use mesh_domain::TabId;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::{DockModel, MoveError, MoveOutcome};
use crate::tree::PanelId;
use crate::zone::{DEFAULT_EDGE_FRACTION, DropZone, Point, Rect, resolve_drop_zone_with_edge};

/// How long the pointer may stray off every leaf before the hover target is dropped.
pub const DEFAULT_HOVER_DEBOUNCE: Duration = Duration::from_millis(100);

/// On-screen drop surface of one leaf, as laid out by the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeafSurface {
	pub leaf: PanelId,
	pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragState {
	Idle,
	Dragging {
		source: TabId,
	},
	Hovering {
		source: TabId,
		target: PanelId,
		zone: DropZone,
		/// Set while the pointer is off every surface.
		clear_deadline: Option<Instant>,
	},
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DragError {
	#[error("a drag of tab {0} is already in progress")]
	AlreadyActive(TabId),
}

/// Result of releasing the pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
	/// No drag was running.
	Idle,
	/// Released without a hover target; the tree is untouched.
	NoTarget,
	Moved(MoveOutcome),
	Rejected(MoveError),
}

/// Tracks the single in-flight tab drag.
#[derive(Debug, Clone)]
pub struct DragSession {
	state: DragState,
	debounce: Duration,
	edge_fraction: f32,
}

impl Default for DragSession {
	fn default() -> Self {
		Self::new()
	}
}

impl DragSession {
	pub fn new() -> Self {
		Self::with_settings(DEFAULT_HOVER_DEBOUNCE, DEFAULT_EDGE_FRACTION)
	}

	pub fn with_settings(debounce: Duration, edge_fraction: f32) -> Self {
		Self {
			state: DragState::Idle,
			debounce,
			edge_fraction,
		}
	}

	pub fn state(&self) -> &DragState {
		&self.state
	}

	pub fn is_active(&self) -> bool {
		!matches!(self.state, DragState::Idle)
	}

	pub fn source(&self) -> Option<TabId> {
		match self.state {
			DragState::Idle => None,
			DragState::Dragging { source } | DragState::Hovering { source, .. } => Some(source),
		}
	}

	/// Current hover target and zone, if any.
	pub fn hover(&self) -> Option<(PanelId, DropZone)> {
		match self.state {
			DragState::Hovering { target, zone, .. } => Some((target, zone)),
			_ => None,
		}
	}

	pub fn hover_target(&self) -> Option<PanelId> {
		self.hover().map(|(target, _)| target)
	}

	pub fn zone(&self) -> Option<DropZone> {
		self.hover().map(|(_, zone)| zone)
	}

	/// When the pending hover-clear fires, if one is armed.
	pub fn next_deadline(&self) -> Option<Instant> {
		match self.state {
			DragState::Hovering { clear_deadline, .. } => clear_deadline,
			_ => None,
		}
	}

	pub fn begin(&mut self, tab: TabId) -> Result<(), DragError> {
		if let Some(active) = self.source() {
			warn!(%tab, %active, "drag start rejected: another drag is active");
			return Err(DragError::AlreadyActive(active));
		}
		debug!(%tab, "drag started");
		self.state = DragState::Dragging { source: tab };
		Ok(())
	}

	/// Feed a pointer position. `surfaces` are the leaf drop surfaces currently on screen.
	pub fn pointer_moved(&mut self, pointer: Point, surfaces: &[LeafSurface], now: Instant) {
		let Some(source) = self.source() else {
			return;
		};

		if let Some(surface) = surfaces.iter().find(|s| s.rect.contains(pointer)) {
			let zone = resolve_drop_zone_with_edge(surface.rect, pointer.x, pointer.y, self.edge_fraction);
			self.state = DragState::Hovering {
				source,
				target: surface.leaf,
				zone,
				clear_deadline: None,
			};
			return;
		}

		let DragState::Hovering {
			target,
			zone,
			clear_deadline,
			..
		} = self.state
		else {
			return;
		};
		match clear_deadline {
			None => {
				self.state = DragState::Hovering {
					source,
					target,
					zone,
					clear_deadline: Some(now + self.debounce),
				};
			}
			Some(deadline) if now >= deadline => {
				debug!(tab = %source, "hover target cleared");
				self.state = DragState::Dragging { source };
			}
			Some(_) => {}
		}
	}

	/// Fire the hover-clear timer if it is due. Returns true when the target was cleared.
	pub fn poll_timer(&mut self, now: Instant) -> bool {
		match self.state {
			DragState::Hovering {
				source,
				clear_deadline: Some(deadline),
				..
			} if now >= deadline => {
				debug!(tab = %source, "hover target cleared");
				self.state = DragState::Dragging { source };
				true
			}
			_ => false,
		}
	}

	/// Release the pointer. The session ends whatever the outcome.
	pub fn drop_on(&mut self, model: &mut DockModel) -> DropOutcome {
		match std::mem::replace(&mut self.state, DragState::Idle) {
			DragState::Idle => DropOutcome::Idle,
			DragState::Dragging { source } => {
				debug!(tab = %source, "drop without target");
				DropOutcome::NoTarget
			}
			DragState::Hovering { source, target, zone, .. } => match model.move_tab(source, target, zone) {
				Ok(outcome) => DropOutcome::Moved(outcome),
				Err(e) => {
					info!(tab = %source, %target, %zone, error = %e, "drop discarded");
					DropOutcome::Rejected(e)
				}
			},
		}
	}

	pub fn cancel(&mut self) {
		if let Some(source) = self.source() {
			debug!(tab = %source, "drag cancelled");
		}
		self.state = DragState::Idle;
	}
}
