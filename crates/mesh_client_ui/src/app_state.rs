#![forbid(unsafe_code)]

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use mesh_dock::{
	DockModel, DragError, DragSession, DropOutcome, LayoutSnapshot, LeafSurface, MoveOutcome, Rect, SnapshotError,
	StaticRoomDirectory, layout_surfaces, outline,
};
use mesh_domain::{RoomId, TabId};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::command::{Command, HELP};
use crate::directory::{AsyncRoomDirectory, resolve_with_timeout};
use crate::settings::ClientSettings;

/// Window size used for hit testing when no real window exists.
pub const DEFAULT_VIEWPORT: Rect = Rect::new(0.0, 0.0, 1200.0, 800.0);

#[derive(Debug, Error)]
pub enum LayoutStoreError {
	#[error("layout file {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("layout file is not valid JSON: {0}")]
	Json(#[from] serde_json::Error),
	#[error(transparent)]
	Snapshot(#[from] SnapshotError),
}

/// Read a saved layout. `Ok(None)` when nothing has been saved yet.
pub fn load_layout(path: &Path) -> Result<Option<DockModel>, LayoutStoreError> {
	let data = match fs::read_to_string(path) {
		Ok(data) => data,
		Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
		Err(source) => {
			return Err(LayoutStoreError::Io {
				path: path.to_path_buf(),
				source,
			});
		}
	};
	let snapshot: LayoutSnapshot = serde_json::from_str(&data)?;
	Ok(Some(DockModel::from_snapshot(&snapshot)?))
}

pub fn save_layout(model: &DockModel, path: &Path) -> Result<(), LayoutStoreError> {
	let data = serde_json::to_string_pretty(&model.to_snapshot())?;
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent).map_err(|source| LayoutStoreError::Io {
			path: parent.to_path_buf(),
			source,
		})?;
	}
	fs::write(path, data).map_err(|source| LayoutStoreError::Io {
		path: path.to_path_buf(),
		source,
	})
}

/// What the shell should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
	Text(String),
	Quit,
}

/// Everything the interactive shell owns: the dock, the drag session and the
/// room directory it resolves metadata from.
pub struct ShellState {
	pub dock: DockModel,
	pub drag: DragSession,
	pub settings: ClientSettings,
	pub viewport: Rect,
	directory: Arc<dyn AsyncRoomDirectory>,
	known_rooms: StaticRoomDirectory,
	layout_path: Option<PathBuf>,
}

impl ShellState {
	pub fn new(settings: ClientSettings, directory: Arc<dyn AsyncRoomDirectory>) -> Self {
		let drag = DragSession::with_settings(settings.hover_debounce(), settings.drop_edge_fraction);
		Self {
			dock: DockModel::new(),
			drag,
			settings,
			viewport: DEFAULT_VIEWPORT,
			directory,
			known_rooms: StaticRoomDirectory::new(),
			layout_path: None,
		}
	}

	/// Rooms listed by the `rooms` command.
	pub fn with_known_rooms(mut self, rooms: StaticRoomDirectory) -> Self {
		self.known_rooms = rooms;
		self
	}

	/// Enable layout persistence at `path`, restoring whatever is saved there.
	pub fn with_layout_file(mut self, path: PathBuf) -> Self {
		match load_layout(&path) {
			Ok(Some(dock)) => {
				info!(path = %path.display(), tabs = dock.tab_count(), "restored saved layout");
				self.dock = dock;
			}
			Ok(None) => debug!(path = %path.display(), "no saved layout"),
			Err(e) => warn!(path = %path.display(), error = %e, "ignoring unreadable saved layout"),
		}
		self.layout_path = Some(path);
		self
	}

	pub fn layout_path(&self) -> Option<&Path> {
		self.layout_path.as_deref()
	}

	/// Open `room`, resolving metadata before the tree is touched.
	pub async fn open_room(&mut self, room: RoomId) -> TabId {
		if let Some(tab) = self.dock.focus_room(&room) {
			return tab;
		}
		let info = resolve_with_timeout(
			self.directory.as_ref(),
			&room,
			self.settings.directory_timeout(),
			&self.settings.unknown_room_name,
		)
		.await;
		self.dock.open_resolved(room, info)
	}

	pub fn surfaces(&self) -> Vec<LeafSurface> {
		layout_surfaces(self.dock.tree(), self.viewport)
	}

	/// Save the layout if persistence is on.
	pub fn save(&self) -> Result<bool, LayoutStoreError> {
		let Some(path) = &self.layout_path else {
			return Ok(false);
		};
		save_layout(&self.dock, path)?;
		info!(path = %path.display(), "saved layout");
		Ok(true)
	}

	fn tab_for(&self, room: &RoomId) -> Option<(mesh_dock::PanelId, TabId)> {
		let tab = self.dock.find_room(room)?;
		let (leaf, _) = self.dock.find_tab(tab)?;
		Some((leaf, tab))
	}

	pub async fn execute(&mut self, cmd: Command, now: Instant) -> Reply {
		self.drag.poll_timer(now);

		let text = match cmd {
			Command::Open(room) => {
				let tab = self.open_room(room.clone()).await;
				format!("opened {room} as {tab}\n{}", outline(self.dock.tree()))
			}
			Command::Close(room) => match self.tab_for(&room) {
				Some((leaf, tab)) => {
					self.dock.close_tab(leaf, tab);
					outline(self.dock.tree())
				}
				None => format!("{room} is not open"),
			},
			Command::Activate(room) => match self.tab_for(&room) {
				Some((leaf, tab)) => {
					self.dock.activate_tab(leaf, tab);
					outline(self.dock.tree())
				}
				None => format!("{room} is not open"),
			},
			Command::Move { room, leaf, zone } => match self.dock.find_room(&room) {
				Some(tab) => match self.dock.move_tab(tab, leaf, zone) {
					Ok(outcome) => format!("{}\n{}", describe(outcome), outline(self.dock.tree())),
					Err(e) => format!("move ignored: {e}"),
				},
				None => format!("{room} is not open"),
			},
			Command::Drag(room) => match self.dock.find_room(&room) {
				Some(tab) => match self.drag.begin(tab) {
					Ok(()) => format!("dragging {room}"),
					Err(DragError::AlreadyActive(_)) => "a drag is already in progress".to_string(),
				},
				None => format!("{room} is not open"),
			},
			Command::Hover(point) => {
				let surfaces = self.surfaces();
				self.drag.pointer_moved(point, &surfaces, now);
				match self.drag.hover() {
					Some((leaf, zone)) => format!("over {leaf} ({zone})"),
					None if self.drag.is_active() => "not over any panel".to_string(),
					None => "no drag in progress".to_string(),
				}
			}
			Command::Drop => match self.drag.drop_on(&mut self.dock) {
				DropOutcome::Idle => "no drag in progress".to_string(),
				DropOutcome::NoTarget => "dropped outside every panel".to_string(),
				DropOutcome::Moved(outcome) => format!("{}\n{}", describe(outcome), outline(self.dock.tree())),
				DropOutcome::Rejected(e) => format!("drop ignored: {e}"),
			},
			Command::Cancel => {
				self.drag.cancel();
				"drag cancelled".to_string()
			}
			Command::Show => {
				let mut text = outline(self.dock.tree());
				if let Some(room) = self.dock.active_room_id() {
					text.push_str(&format!("active room: {room}\n"));
				}
				text
			}
			Command::Rooms => self
				.known_rooms
				.rooms()
				.into_iter()
				.map(|(id, info)| format!("{id}\t{}\t{}", info.kind, info.name))
				.collect::<Vec<_>>()
				.join("\n"),
			Command::Save => match self.save() {
				Ok(true) => "layout saved".to_string(),
				Ok(false) => "layout persistence is off (set persist_layout = true)".to_string(),
				Err(e) => format!("save failed: {e}"),
			},
			Command::Help => HELP.to_string(),
			Command::Quit => return Reply::Quit,
		};
		Reply::Text(text)
	}
}

fn describe(outcome: MoveOutcome) -> String {
	match outcome {
		MoveOutcome::Unchanged => "nothing to move".to_string(),
		MoveOutcome::Merged { from, into } => format!("merged from {from} into {into}"),
		MoveOutcome::Split { target, leaf } => format!("split {target}; new leaf {leaf}"),
	}
}
