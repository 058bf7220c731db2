//! On-disk persistence of the host cache, per spec §6: `hostcache.json` is
//! an array of `{host, family, endpoints, expiresAt, pinnedNetworkId}`,
//! written no more often than `persistDelay`.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use crate::binding::Binding;
use crate::entry::{AddressFamily, HostCacheEntry};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PersistedEntry {
	pub host: String,
	pub family: PersistedFamily,
	pub endpoints: Vec<IpAddr>,
	pub expires_at_unix_millis: u64,
	pub pinned_network_id: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PersistedFamily {
	Unspecified,
	V4Only,
	V6Only,
}

impl From<AddressFamily> for PersistedFamily {
	fn from(f: AddressFamily) -> Self {
		match f {
			AddressFamily::Unspecified => PersistedFamily::Unspecified,
			AddressFamily::V4Only => PersistedFamily::V4Only,
			AddressFamily::V6Only => PersistedFamily::V6Only,
		}
	}
}

impl PersistedEntry {
	/// Converts a live [`HostCacheEntry`] into its on-disk shape, turning the
	/// monotonic `fetched_at`/`ttl` pair into a wall-clock expiry.
	pub fn from_entry(entry: &HostCacheEntry) -> Self {
		let elapsed = Instant::now().saturating_duration_since(entry.fetched_at);
		let remaining = entry.ttl.saturating_sub(elapsed);
		Self {
			host: entry.key.host.clone(),
			family: entry.key.family.into(),
			endpoints: entry.resolved.clone(),
			expires_at_unix_millis: unix_millis_from_now(remaining),
			pinned_network_id: match &entry.pinned_to_network {
				Binding::Unbound => None,
				Binding::Bound(b) => Some(b.label().to_string()),
			},
		}
	}
}

pub fn unix_millis_from_now(ttl_remaining: Duration) -> u64 {
	let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
	(now + ttl_remaining).as_millis() as u64
}

pub async fn write_snapshot(path: &Path, entries: &[PersistedEntry]) -> std::io::Result<()> {
	let body = serde_json::to_vec_pretty(entries).map_err(std::io::Error::other)?;
	if let Some(parent) = path.parent() {
		fs_err::tokio::create_dir_all(parent).await?;
	}
	let tmp = path.with_extension("json.tmp");
	fs_err::tokio::write(&tmp, body).await?;
	fs_err::tokio::rename(&tmp, path).await?;
	Ok(())
}

pub async fn read_snapshot(path: &Path) -> std::io::Result<Vec<PersistedEntry>> {
	let body = fs_err::tokio::read(path).await?;
	serde_json::from_slice(&body).map_err(std::io::Error::other)
}

/// Debounces writes so the cache is flushed to disk at most once per
/// `persist_delay`, regardless of how many inserts happen in between.
pub struct PersistDebouncer {
	path: PathBuf,
	delay: Duration,
	dirty: Mutex<bool>,
	notify: Notify,
}

impl PersistDebouncer {
	pub fn new(path: PathBuf, delay: Duration) -> Self {
		Self {
			path,
			delay,
			dirty: Mutex::new(false),
			notify: Notify::new(),
		}
	}

	/// Marks the cache dirty; the background task wakes at most once every
	/// `delay` to flush.
	pub fn mark_dirty(&self) {
		*self.dirty.lock() = true;
		self.notify.notify_one();
	}

	/// Whether a write is still pending. Used by tests to observe that an
	/// insert reached the debouncer without waiting out a real `run()` loop.
	pub fn is_dirty(&self) -> bool {
		*self.dirty.lock()
	}

	pub async fn run(&self, snapshot: impl Fn() -> Vec<PersistedEntry>) {
		loop {
			self.notify.notified().await;
			tokio::time::sleep(self.delay).await;
			let should_write = {
				let mut dirty = self.dirty.lock();
				std::mem::replace(&mut *dirty, false)
			};
			if should_write {
				let entries = snapshot();
				if let Err(err) = write_snapshot(&self.path, &entries).await {
					tracing::warn!(target: "netengine::dns", error = %err, "failed to persist host cache");
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn writes_and_reads_back() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("hostcache.json");
		let entries = vec![PersistedEntry {
			host: "example.com".into(),
			family: PersistedFamily::Unspecified,
			endpoints: vec!["127.0.0.1".parse().unwrap()],
			expires_at_unix_millis: unix_millis_from_now(Duration::from_secs(60)),
			pinned_network_id: None,
		}];
		write_snapshot(&path, &entries).await.unwrap();
		let read_back = read_snapshot(&path).await.unwrap();
		assert_eq!(read_back.len(), 1);
		assert_eq!(read_back[0].host, "example.com");
	}

	#[test]
	fn from_entry_carries_the_pinned_network_label() {
		use crate::entry::{CacheKey, Source};

		let mut entry = HostCacheEntry {
			key: CacheKey {
				host: "example.com".into(),
				family: AddressFamily::Unspecified,
				binding: Binding::Unbound,
			},
			resolved: vec!["127.0.0.1".parse().unwrap()],
			fetched_at: Instant::now(),
			ttl: Duration::from_secs(60),
			source: Source::Builtin,
			pinned_to_network: Binding::Unbound,
		};
		let unpinned = PersistedEntry::from_entry(&entry);
		assert_eq!(unpinned.pinned_network_id, None);

		entry.pinned_to_network = Binding::Bound(crate::binding::NetworkBinding::new("wifi"));
		let pinned = PersistedEntry::from_entry(&entry);
		assert_eq!(pinned.pinned_network_id, Some("wifi".to_string()));
	}
}
