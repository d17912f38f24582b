#![forbid(unsafe_code)]

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Display name used when a room cannot be resolved.
pub const UNKNOWN_ROOM_NAME: &str = "Unknown Room";

/// Errors for parsing identifiers from strings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseIdError {
	#[error("empty value")]
	Empty,
	#[error("unknown room kind: {0}")]
	UnknownRoomKind(String),
	#[error("invalid format: {0}")]
	InvalidFormat(String),
}

/// Kind of conversation a room represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RoomKind {
	Direct,
	#[default]
	Group,
	Space,
}

impl RoomKind {
	/// Stable string identifier.
	pub const fn as_str(self) -> &'static str {
		match self {
			RoomKind::Direct => "direct",
			RoomKind::Group => "group",
			RoomKind::Space => "space",
		}
	}
}

impl fmt::Display for RoomKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for RoomKind {
	type Err = ParseIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		if s.is_empty() {
			return Err(ParseIdError::Empty);
		}

		match s.to_ascii_lowercase().as_str() {
			"direct" | "dm" => Ok(RoomKind::Direct),
			"group" => Ok(RoomKind::Group),
			"space" => Ok(RoomKind::Space),
			other => Err(ParseIdError::UnknownRoomKind(other.to_string())),
		}
	}
}

/// Opaque room identifier handed out by the room directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RoomId(String);

impl RoomId {
	/// Create a non-empty `RoomId`.
	pub fn new(id: impl Into<String>) -> Result<Self, ParseIdError> {
		let id = id.into();
		if id.trim().is_empty() {
			return Err(ParseIdError::Empty);
		}
		Ok(Self(id))
	}
	pub fn as_str(&self) -> &str {
		&self.0
	}
	pub fn into_string(self) -> String {
		self.0
	}
}

impl fmt::Display for RoomId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl FromStr for RoomId {
	type Err = ParseIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		RoomId::new(s.trim().to_string())
	}
}

/// Display metadata for a room, cached on a tab when it is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoomInfo {
	pub name: String,
	pub kind: RoomKind,
}

impl RoomInfo {
	pub fn new(name: impl Into<String>, kind: RoomKind) -> Self {
		Self {
			name: name.into(),
			kind,
		}
	}

	/// Metadata substituted for rooms the directory cannot resolve.
	pub fn fallback() -> Self {
		Self::new(UNKNOWN_ROOM_NAME, RoomKind::Group)
	}
}

/// Identifier of an open tab. Generated once and kept for the tab's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TabId(pub uuid::Uuid);

impl TabId {
	/// Create a new random tab id.
	pub fn new_v4() -> Self {
		Self(uuid::Uuid::new_v4())
	}
}

impl fmt::Display for TabId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for TabId {
	type Err = ParseIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		if s.is_empty() {
			return Err(ParseIdError::Empty);
		}
		uuid::Uuid::parse_str(s)
			.map(Self)
			.map_err(|e| ParseIdError::InvalidFormat(e.to_string()))
	}
}
