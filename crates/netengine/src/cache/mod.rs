//! HTTP cache, spec §4.H: validator-driven conditional GETs over an
//! LRU-bounded store, single-writer-per-key, disk mode refusing a second
//! concurrent open of the same directory.

mod disk;

pub use disk::DiskGuard;

use std::num::NonZeroUsize;
use std::sync::Arc;

use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;

use crate::request::Fingerprint;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheMode {
	Disabled,
	InMemory,
	Disk,
	DiskNoHttp,
}

#[derive(Clone, Debug, Default)]
pub struct Validators {
	pub etag: Option<String>,
	pub last_modified: Option<String>,
}

impl Validators {
	pub fn is_empty(&self) -> bool {
		self.etag.is_none() && self.last_modified.is_none()
	}
}

#[derive(Clone, Debug)]
pub struct CacheEntry {
	pub status: u16,
	pub headers: Vec<(String, String)>,
	pub body: Option<Bytes>,
	pub validators: Validators,
	pub freshness_lifetime_secs: u64,
	pub stored_at_unix_secs: u64,
}

impl CacheEntry {
	pub fn is_fresh(&self, now_unix_secs: u64) -> bool {
		now_unix_secs.saturating_sub(self.stored_at_unix_secs) < self.freshness_lifetime_secs
	}

	fn approx_size(&self) -> usize {
		self.body.as_ref().map(|b| b.len()).unwrap_or(0) + 256
	}
}

/// What to do before sending a request, from the cache's point of view.
#[derive(Debug, PartialEq, Eq)]
pub enum Disposition {
	/// No usable entry; send the request as-is.
	Miss,
	/// An entry is fresh enough to serve without going to the network.
	Fresh(CacheEntry),
	/// An entry exists but is stale; send a conditional GET carrying these
	/// validators, and replace the entry with whatever comes back (200 or
	/// 304, in which case the stored entry's body is reused).
	Revalidate(Validators),
}

struct Store {
	entries: LruCache<Fingerprint, CacheEntry>,
	byte_budget: usize,
	bytes_used: usize,
	in_flight_writes: hashbrown::HashSet<Fingerprint>,
}

/// In-memory HTTP cache. DISK and DISK_NO_HTTP wrap this with a
/// [`DiskGuard`] controlling directory ownership; the in-memory structure
/// underneath is unchanged (DISK_NO_HTTP simply never populates `body`).
pub struct HttpCache {
	mode: CacheMode,
	store: Mutex<Store>,
	disk: Option<Arc<DiskGuard>>,
}

impl HttpCache {
	pub fn new(mode: CacheMode, max_size_bytes: usize, disk: Option<Arc<DiskGuard>>) -> Self {
		Self {
			mode,
			store: Mutex::new(Store {
				entries: LruCache::new(NonZeroUsize::new(8192).unwrap()),
				byte_budget: max_size_bytes,
				bytes_used: 0,
				in_flight_writes: hashbrown::HashSet::new(),
			}),
			disk,
		}
	}

	pub fn mode(&self) -> CacheMode {
		self.mode
	}

	pub fn lookup(&self, key: &Fingerprint, now_unix_secs: u64) -> Disposition {
		if self.mode == CacheMode::Disabled {
			return Disposition::Miss;
		}
		let mut store = self.store.lock();
		match store.entries.get(key) {
			Some(entry) if entry.is_fresh(now_unix_secs) => Disposition::Fresh(entry.clone()),
			Some(entry) if !entry.validators.is_empty() => Disposition::Revalidate(entry.validators.clone()),
			_ => Disposition::Miss,
		}
	}

	/// Claims the single-writer slot for `key`. Returns `false` if another
	/// write for the same key is already in flight; the caller should then
	/// treat the response as non-cacheable rather than racing a second
	/// writer, since readers must see an atomic entry swap.
	pub fn begin_write(&self, key: &Fingerprint) -> bool {
		self.store.lock().in_flight_writes.insert(key.clone())
	}

	pub fn insert(&self, key: Fingerprint, mut entry: CacheEntry) {
		if self.mode == CacheMode::Disabled {
			return;
		}
		if self.mode == CacheMode::DiskNoHttp {
			entry.body = None;
		}
		let mut store = self.store.lock();
		store.in_flight_writes.remove(&key);
		let size = entry.approx_size();
		if let Some((_, evicted)) = store.entries.push(key, entry) {
			store.bytes_used = store.bytes_used.saturating_sub(evicted.approx_size());
		}
		store.bytes_used += size;
		while store.bytes_used > store.byte_budget {
			match store.entries.pop_lru() {
				Some((_, evicted)) => store.bytes_used = store.bytes_used.saturating_sub(evicted.approx_size()),
				None => break,
			}
		}
	}

	pub fn abandon_write(&self, key: &Fingerprint) {
		self.store.lock().in_flight_writes.remove(key);
	}

	pub fn len(&self) -> usize {
		self.store.lock().entries.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use http::Method;

	fn key(path: &str) -> Fingerprint {
		let url = url::Url::parse(&format!("https://example.com{path}")).unwrap();
		Fingerprint::new(&Method::GET, &url, &http::HeaderMap::new())
	}

	fn entry(fresh_secs: u64, stored_at: u64) -> CacheEntry {
		CacheEntry {
			status: 200,
			headers: Vec::new(),
			body: Some(Bytes::from_static(b"hello")),
			validators: Validators::default(),
			freshness_lifetime_secs: fresh_secs,
			stored_at_unix_secs: stored_at,
		}
	}

	#[test]
	fn disabled_mode_never_caches() {
		let cache = HttpCache::new(CacheMode::Disabled, 1 << 20, None);
		cache.insert(key("/a"), entry(60, 0));
		assert_eq!(cache.lookup(&key("/a"), 0), Disposition::Miss);
	}

	#[test]
	fn fresh_entry_is_served_without_revalidation() {
		let cache = HttpCache::new(CacheMode::InMemory, 1 << 20, None);
		cache.insert(key("/a"), entry(60, 100));
		match cache.lookup(&key("/a"), 110) {
			Disposition::Fresh(e) => assert_eq!(e.status, 200),
			other => panic!("expected Fresh, got {other:?}"),
		}
	}

	#[test]
	fn stale_entry_with_validators_requests_revalidation() {
		let cache = HttpCache::new(CacheMode::InMemory, 1 << 20, None);
		let mut e = entry(60, 0);
		e.validators.etag = Some("\"v1\"".into());
		cache.insert(key("/a"), e);
		match cache.lookup(&key("/a"), 1000) {
			Disposition::Revalidate(v) => assert_eq!(v.etag.as_deref(), Some("\"v1\"")),
			other => panic!("expected Revalidate, got {other:?}"),
		}
	}

	#[test]
	fn stale_entry_without_validators_is_a_miss() {
		let cache = HttpCache::new(CacheMode::InMemory, 1 << 20, None);
		cache.insert(key("/a"), entry(60, 0));
		assert_eq!(cache.lookup(&key("/a"), 1000), Disposition::Miss);
	}

	#[test]
	fn disk_no_http_mode_drops_body() {
		let cache = HttpCache::new(CacheMode::DiskNoHttp, 1 << 20, None);
		cache.insert(key("/a"), entry(60, 0));
		match cache.lookup(&key("/a"), 0) {
			Disposition::Fresh(e) => assert!(e.body.is_none()),
			other => panic!("expected Fresh, got {other:?}"),
		}
	}

	#[test]
	fn single_writer_per_key_is_enforced() {
		let cache = HttpCache::new(CacheMode::InMemory, 1 << 20, None);
		let k = key("/a");
		assert!(cache.begin_write(&k));
		assert!(!cache.begin_write(&k));
		cache.insert(k.clone(), entry(60, 0));
		assert!(cache.begin_write(&k));
	}

	#[test]
	fn byte_budget_evicts_lru_entries() {
		let cache = HttpCache::new(CacheMode::InMemory, 300, None);
		cache.insert(key("/a"), entry(60, 0));
		cache.insert(key("/b"), entry(60, 0));
		cache.insert(key("/c"), entry(60, 0));
		assert!(cache.len() < 3);
	}
}
