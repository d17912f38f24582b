use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Duration;

use mesh_dock::{DEFAULT_EDGE_FRACTION, DEFAULT_HOVER_DEBOUNCE};
use mesh_domain::UNKNOWN_ROOM_NAME;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const CURRENT_SETTINGS_VERSION: u32 = 1;

const SETTINGS_FILE: &str = "client-settings.toml";
const LAYOUT_FILE: &str = "layout.json";

#[derive(Debug, Error)]
pub enum SettingsError {
	#[error("failed to read {path}: {source}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("failed to write {path}: {source}")]
	Write {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("invalid settings file: {0}")]
	Parse(#[from] toml::de::Error),
	#[error("failed to encode settings: {0}")]
	Encode(#[from] toml::ser::Error),
	#[error("{field} out of range: {value}")]
	OutOfRange { field: &'static str, value: String },
}

fn default_settings_version() -> u32 {
	CURRENT_SETTINGS_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
	pub settings_version: u32,

	/// Fraction of a leaf treated as an edge drop zone.
	pub drop_edge_fraction: f32,
	pub hover_debounce_ms: u64,
	pub directory_timeout_ms: u64,
	/// Save the panel arrangement on exit and restore it at start-up.
	pub persist_layout: bool,
	pub unknown_room_name: String,
}

impl Default for ClientSettings {
	fn default() -> Self {
		Self {
			settings_version: default_settings_version(),
			drop_edge_fraction: DEFAULT_EDGE_FRACTION,
			hover_debounce_ms: DEFAULT_HOVER_DEBOUNCE.as_millis() as u64,
			directory_timeout_ms: 1500,
			persist_layout: false,
			unknown_room_name: UNKNOWN_ROOM_NAME.to_string(),
		}
	}
}

impl ClientSettings {
	pub fn hover_debounce(&self) -> Duration {
		Duration::from_millis(self.hover_debounce_ms)
	}

	pub fn directory_timeout(&self) -> Duration {
		Duration::from_millis(self.directory_timeout_ms)
	}

	pub fn validate(&self) -> Result<(), SettingsError> {
		if !(0.0..0.5).contains(&self.drop_edge_fraction) {
			return Err(SettingsError::OutOfRange {
				field: "drop_edge_fraction",
				value: self.drop_edge_fraction.to_string(),
			});
		}
		if self.directory_timeout_ms == 0 {
			return Err(SettingsError::OutOfRange {
				field: "directory_timeout_ms",
				value: "0".to_string(),
			});
		}
		Ok(())
	}
}

pub fn settings_dir() -> PathBuf {
	let mut dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
	dir.push("mesh");
	dir
}

pub fn settings_path() -> PathBuf {
	settings_dir().join(SETTINGS_FILE)
}

/// Where the layout snapshot lives when `persist_layout` is on.
pub fn layout_path() -> PathBuf {
	settings_dir().join(LAYOUT_FILE)
}

fn migrate_settings_toml(mut v: toml::Value) -> toml::Value {
	let version = v.get("settings_version").and_then(|x| x.as_integer()).unwrap_or(0) as u32;
	if version < CURRENT_SETTINGS_VERSION {
		if let Some(table) = v.as_table_mut() {
			table.insert(
				"settings_version".to_string(),
				toml::Value::Integer(CURRENT_SETTINGS_VERSION as i64),
			);
		} else {
			let mut tbl = toml::map::Map::new();
			tbl.insert(
				"settings_version".to_string(),
				toml::Value::Integer(CURRENT_SETTINGS_VERSION as i64),
			);
			return toml::Value::Table(tbl);
		}
	}
	v
}

/// Load settings from `path`. A missing file yields the defaults.
pub fn load_from(path: &Path) -> Result<ClientSettings, SettingsError> {
	let data = match fs::read_to_string(path) {
		Ok(data) => data,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ClientSettings::default()),
		Err(source) => {
			return Err(SettingsError::Read {
				path: path.to_path_buf(),
				source,
			});
		}
	};

	let v = migrate_settings_toml(toml::from_str::<toml::Value>(&data)?);
	let settings = v.try_into::<ClientSettings>()?;
	settings.validate()?;
	Ok(settings)
}

pub fn save_to(cfg: &ClientSettings, path: &Path) -> Result<(), SettingsError> {
	let data = toml::to_string_pretty(cfg)?;
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
			path: parent.to_path_buf(),
			source,
		})?;
	}
	fs::write(path, data).map_err(|source| SettingsError::Write {
		path: path.to_path_buf(),
		source,
	})
}

fn load_from_disk() -> ClientSettings {
	let path = settings_path();
	match load_from(&path) {
		Ok(settings) => {
			debug!(path = %path.display(), "loaded client settings");
			settings
		}
		Err(e) => {
			warn!(path = %path.display(), error = %e, "ignoring unreadable client settings");
			ClientSettings::default()
		}
	}
}

static SETTINGS: OnceLock<Mutex<ClientSettings>> = OnceLock::new();

fn store() -> &'static Mutex<ClientSettings> {
	SETTINGS.get_or_init(|| Mutex::new(load_from_disk()))
}

pub fn get_cloned() -> ClientSettings {
	store().lock().unwrap_or_else(PoisonError::into_inner).clone()
}

pub fn set_and_persist(cfg: ClientSettings) -> Result<(), SettingsError> {
	set_and_persist_to(cfg, &settings_path())
}

/// Validate `cfg`, make it the process-wide settings and write it to `path`.
pub fn set_and_persist_to(cfg: ClientSettings, path: &Path) -> Result<(), SettingsError> {
	cfg.validate()?;
	*store().lock().unwrap_or_else(PoisonError::into_inner) = cfg.clone();
	save_to(&cfg, path)
}
