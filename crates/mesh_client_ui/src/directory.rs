#![forbid(unsafe_code)]

use std::time::Duration;

use mesh_dock::{DirectoryError, RoomDirectory, StaticRoomDirectory};
use mesh_domain::{RoomId, RoomInfo, RoomKind};
use tracing::warn;

/// Room metadata source that may need a round trip to answer.
#[async_trait::async_trait]
pub trait AsyncRoomDirectory: Send + Sync + 'static {
	async fn resolve(&self, room: &RoomId) -> Result<RoomInfo, DirectoryError>;
}

#[async_trait::async_trait]
impl AsyncRoomDirectory for StaticRoomDirectory {
	async fn resolve(&self, room: &RoomId) -> Result<RoomInfo, DirectoryError> {
		RoomDirectory::resolve(self, room)
	}
}

/// Wraps a directory with an artificial response delay.
#[derive(Debug, Clone)]
pub struct DelayedDirectory<D> {
	inner: D,
	delay: Duration,
}

impl<D> DelayedDirectory<D> {
	pub fn new(inner: D, delay: Duration) -> Self {
		Self { inner, delay }
	}
}

#[async_trait::async_trait]
impl<D: AsyncRoomDirectory> AsyncRoomDirectory for DelayedDirectory<D> {
	async fn resolve(&self, room: &RoomId) -> Result<RoomInfo, DirectoryError> {
		tokio::time::sleep(self.delay).await;
		self.inner.resolve(room).await
	}
}

/// Resolve within `timeout`; any failure or timeout yields a fallback named `fallback_name`.
pub async fn resolve_with_timeout(
	directory: &dyn AsyncRoomDirectory,
	room: &RoomId,
	timeout: Duration,
	fallback_name: &str,
) -> RoomInfo {
	match tokio::time::timeout(timeout, directory.resolve(room)).await {
		Ok(Ok(info)) => info,
		Ok(Err(e)) => {
			warn!(%room, error = %e, "room metadata unavailable; using fallback");
			RoomInfo::new(fallback_name, RoomKind::Group)
		}
		Err(_) => {
			warn!(%room, ?timeout, "room metadata lookup timed out; using fallback");
			RoomInfo::new(fallback_name, RoomKind::Group)
		}
	}
}

/// Rooms the shell knows about out of the box.
pub fn demo_directory() -> StaticRoomDirectory {
	[
		("room1", "matrix-dev"),
		("room2", "design-team"),
		("room3", "release-planning"),
		("dm1", "jane"),
		("dm2", "bob"),
		("space1", "Matrix Community"),
	]
	.into_iter()
	.filter_map(|(id, name)| RoomId::new(id).ok().map(|room| (room, name.to_string())))
	.collect()
}
