#![forbid(unsafe_code)]

use std::collections::HashMap;

use mesh_domain::{RoomId, RoomInfo, RoomKind};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
	#[error("room {0} is not known to the directory")]
	NotFound(RoomId),
	#[error("room directory unavailable: {0}")]
	Unavailable(String),
}

/// Read-only lookup of room display metadata.
pub trait RoomDirectory {
	fn resolve(&self, room: &RoomId) -> Result<RoomInfo, DirectoryError>;
}

impl<T: RoomDirectory + ?Sized> RoomDirectory for &T {
	fn resolve(&self, room: &RoomId) -> Result<RoomInfo, DirectoryError> {
		(**self).resolve(room)
	}
}

/// Resolve `room`, substituting [`RoomInfo::fallback`] on any failure.
pub fn resolve_or_fallback(directory: &(impl RoomDirectory + ?Sized), room: &RoomId) -> RoomInfo {
	match directory.resolve(room) {
		Ok(info) => info,
		Err(e) => {
			warn!(%room, error = %e, "room metadata unavailable; using fallback");
			RoomInfo::fallback()
		}
	}
}

/// Guess a room's kind from its id prefix (`dm…` direct, `space…` space).
pub fn infer_kind(room: &RoomId) -> RoomKind {
	let id = room.as_str();
	if id.starts_with("dm") {
		RoomKind::Direct
	} else if id.starts_with("space") {
		RoomKind::Space
	} else {
		RoomKind::Group
	}
}

/// In-memory directory, used by the shell and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticRoomDirectory {
	rooms: HashMap<RoomId, RoomInfo>,
}

impl StaticRoomDirectory {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register `room` with its kind inferred from the id.
	pub fn insert(&mut self, room: RoomId, name: impl Into<String>) {
		let kind = infer_kind(&room);
		self.rooms.insert(room, RoomInfo::new(name, kind));
	}

	pub fn insert_info(&mut self, room: RoomId, info: RoomInfo) {
		self.rooms.insert(room, info);
	}

	pub fn len(&self) -> usize {
		self.rooms.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rooms.is_empty()
	}

	/// Known rooms sorted by id.
	pub fn rooms(&self) -> Vec<(&RoomId, &RoomInfo)> {
		let mut rooms: Vec<_> = self.rooms.iter().collect();
		rooms.sort_by(|a, b| a.0.cmp(b.0));
		rooms
	}
}

impl FromIterator<(RoomId, String)> for StaticRoomDirectory {
	fn from_iter<I: IntoIterator<Item = (RoomId, String)>>(iter: I) -> Self {
		let mut dir = Self::new();
		for (room, name) in iter {
			dir.insert(room, name);
		}
		dir
	}
}

impl RoomDirectory for StaticRoomDirectory {
	fn resolve(&self, room: &RoomId) -> Result<RoomInfo, DirectoryError> {
		self.rooms.get(room).cloned().ok_or_else(|| DirectoryError::NotFound(room.clone()))
	}
}
