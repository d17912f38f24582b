#![forbid(unsafe_code)]

use std::str::FromStr;

use mesh_dock::{DropZone, PanelId, Point};
use mesh_domain::{ParseIdError, RoomId};
use thiserror::Error;

pub const HELP: &str = "\
commands:
  open <room>                  open a room, or focus its tab
  close <room>                 close the room's tab
  activate <room>              make the room's tab active
  move <room> <leaf> <zone>    move a tab; zone is left|right|top|bottom|center
  drag <room>                  start dragging the room's tab
  hover <x> <y>                move the pointer during a drag
  drop                         release the pointer
  cancel                       abandon the drag
  show                         print the layout
  rooms                        list known rooms
  save                         write the layout snapshot
  help                         this text
  quit                         exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
	Open(RoomId),
	Close(RoomId),
	Activate(RoomId),
	Move { room: RoomId, leaf: PanelId, zone: DropZone },
	Drag(RoomId),
	Hover(Point),
	Drop,
	Cancel,
	Show,
	Rooms,
	Save,
	Help,
	Quit,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
	#[error("unknown command: {0} (try `help`)")]
	Unknown(String),
	#[error("usage: {0}")]
	Usage(&'static str),
	#[error(transparent)]
	BadId(#[from] ParseIdError),
	#[error("not a coordinate: {0}")]
	BadCoordinate(String),
}

impl FromStr for Command {
	type Err = CommandError;

	fn from_str(line: &str) -> Result<Self, Self::Err> {
		let mut parts = line.split_whitespace();
		let Some(verb) = parts.next() else {
			return Err(CommandError::Usage("help"));
		};
		let args: Vec<&str> = parts.collect();

		let cmd = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
			("open", [room]) => Command::Open(room.parse()?),
			("open", _) => return Err(CommandError::Usage("open <room>")),
			("close", [room]) => Command::Close(room.parse()?),
			("close", _) => return Err(CommandError::Usage("close <room>")),
			("activate", [room]) => Command::Activate(room.parse()?),
			("activate", _) => return Err(CommandError::Usage("activate <room>")),
			("move", [room, leaf, zone]) => Command::Move {
				room: room.parse()?,
				leaf: leaf.parse()?,
				zone: zone.parse()?,
			},
			("move", _) => return Err(CommandError::Usage("move <room> <leaf> <zone>")),
			("drag", [room]) => Command::Drag(room.parse()?),
			("drag", _) => return Err(CommandError::Usage("drag <room>")),
			("hover", [x, y]) => Command::Hover(Point::new(coordinate(x)?, coordinate(y)?)),
			("hover", _) => return Err(CommandError::Usage("hover <x> <y>")),
			("drop", []) => Command::Drop,
			("cancel", []) => Command::Cancel,
			("show", []) => Command::Show,
			("rooms", []) => Command::Rooms,
			("save", []) => Command::Save,
			("help" | "?", _) => Command::Help,
			("quit" | "exit", _) => Command::Quit,
			(other, _) => return Err(CommandError::Unknown(other.to_string())),
		};
		Ok(cmd)
	}
}

fn coordinate(raw: &str) -> Result<f32, CommandError> {
	raw.parse::<f32>()
		.ok()
		.filter(|v| v.is_finite())
		.ok_or_else(|| CommandError::BadCoordinate(raw.to_string()))
}
