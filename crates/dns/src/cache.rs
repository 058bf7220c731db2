use std::time::Instant;

use lru::LruCache;
use parking_lot::Mutex;

use crate::binding::Binding;
use crate::entry::{CacheKey, Freshness, HostCacheEntry};

/// The host cache proper: insert on resolution, re-validate on stale lookup,
/// evict on OOM pressure (LRU) or explicit flush on network change, per
/// spec §3 lifecycle notes.
pub struct HostCache {
	entries: Mutex<LruCache<CacheKey, HostCacheEntry>>,
}

impl HostCache {
	pub fn new(capacity: usize) -> Self {
		let cap = std::num::NonZeroUsize::new(capacity.max(1)).unwrap();
		Self {
			entries: Mutex::new(LruCache::new(cap)),
		}
	}

	pub fn get(&self, key: &CacheKey) -> Option<HostCacheEntry> {
		self.entries.lock().get(key).cloned()
	}

	pub fn insert(&self, entry: HostCacheEntry) {
		self.entries.lock().put(entry.key.clone(), entry);
	}

	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Finds the best entry for `key`, optionally matching any binding when
	/// cross-network usage is allowed, per invariant I3.
	pub fn lookup(&self, key: &CacheKey, allow_cross_network: bool) -> Option<HostCacheEntry> {
		if let Some(e) = self.get(key) {
			return Some(e);
		}
		if allow_cross_network && !matches!(key.binding, Binding::Unbound) {
			let unbound_key = CacheKey {
				host: key.host.clone(),
				family: key.family,
				binding: Binding::Unbound,
			};
			return self.get(&unbound_key);
		}
		None
	}

	/// Drops every entry pinned to a network other than `current_default`
	/// (used on a default-network change), unless cross-network usage is
	/// globally allowed, in which case a flush is not required.
	pub fn flush_on_network_change(&self, allow_cross_network_usage: bool) {
		if allow_cross_network_usage {
			return;
		}
		let mut guard = self.entries.lock();
		let keys: Vec<CacheKey> = guard
			.iter()
			.filter(|(_, e)| !matches!(e.pinned_to_network, Binding::Unbound))
			.map(|(k, _)| k.clone())
			.collect();
		for k in keys {
			guard.pop(&k);
		}
	}

	pub fn snapshot(&self) -> Vec<HostCacheEntry> {
		self.entries.lock().iter().map(|(_, v)| v.clone()).collect()
	}

	pub fn freshness_of(&self, key: &CacheKey, now: Instant, max_expired_delay: std::time::Duration) -> Option<Freshness> {
		self.get(key).map(|e| e.freshness(now, max_expired_delay))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::entry::{AddressFamily, Source};
	use std::time::Duration;

	fn entry(host: &str, binding: Binding) -> HostCacheEntry {
		HostCacheEntry {
			key: CacheKey {
				host: host.into(),
				family: AddressFamily::Unspecified,
				binding,
			},
			resolved: vec!["10.0.0.1".parse().unwrap()],
			fetched_at: Instant::now(),
			ttl: Duration::from_secs(60),
			source: Source::Builtin,
			pinned_to_network: Binding::Unbound,
		}
	}

	#[test]
	fn lookup_within_ttl_returns_same_endpoints_as_last_insert() {
		// P4
		let cache = HostCache::new(16);
		let e = entry("example.com", Binding::Unbound);
		cache.insert(e.clone());
		let key = CacheKey {
			host: "example.com".into(),
			family: AddressFamily::Unspecified,
			binding: Binding::Unbound,
		};
		let got = cache.lookup(&key, false).unwrap();
		assert_eq!(got.resolved, e.resolved);
	}

	#[test]
	fn lru_evicts_oldest_when_over_capacity() {
		let cache = HostCache::new(1);
		cache.insert(entry("a.com", Binding::Unbound));
		cache.insert(entry("b.com", Binding::Unbound));
		assert_eq!(cache.len(), 1);
		let key_a = CacheKey {
			host: "a.com".into(),
			family: AddressFamily::Unspecified,
			binding: Binding::Unbound,
		};
		assert!(cache.get(&key_a).is_none());
	}

	#[test]
	fn flush_on_network_change_drops_pinned_entries_unless_cross_network_allowed() {
		let cache = HostCache::new(16);
		let mut e = entry("example.com", Binding::Unbound);
		e.pinned_to_network = Binding::Bound(crate::binding::NetworkBinding::new("wifi"));
		cache.insert(e);
		cache.flush_on_network_change(false);
		assert!(cache.is_empty());
	}

	#[test]
	fn flush_on_network_change_is_noop_when_cross_network_allowed() {
		let cache = HostCache::new(16);
		let mut e = entry("example.com", Binding::Unbound);
		e.pinned_to_network = Binding::Bound(crate::binding::NetworkBinding::new("wifi"));
		cache.insert(e);
		cache.flush_on_network_change(true);
		assert_eq!(cache.len(), 1);
	}
}
