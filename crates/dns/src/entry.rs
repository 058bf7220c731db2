use std::net::IpAddr;
use std::time::{Duration, Instant};

use crate::binding::Binding;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressFamily {
	Unspecified,
	V4Only,
	V6Only,
}

/// Where a resolution came from, per spec §3 `HostCacheEntry.source`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
	System,
	Builtin,
	HostsFile,
	CachedPersisted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Freshness {
	Fresh,
	Stale,
	Expired,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
	pub host: String,
	pub family: AddressFamily,
	pub binding: Binding,
}

#[derive(Clone, Debug)]
pub struct HostCacheEntry {
	pub key: CacheKey,
	/// IPv6 first when enabled, per spec §3.
	pub resolved: Vec<IpAddr>,
	pub fetched_at: Instant,
	pub ttl: Duration,
	pub source: Source,
	pub pinned_to_network: Binding,
}

impl HostCacheEntry {
	pub fn freshness(&self, now: Instant, max_expired_delay: Duration) -> Freshness {
		let age = now.saturating_duration_since(self.fetched_at);
		if age <= self.ttl {
			Freshness::Fresh
		} else if max_expired_delay.is_zero() || age <= self.ttl + max_expired_delay {
			Freshness::Stale
		} else {
			Freshness::Expired
		}
	}

	/// Invariant I3: an entry pinned to network N is never handed back to a
	/// caller bound to a different network unless cross-network use is
	/// explicitly allowed.
	pub fn usable_from(&self, requested: &Binding, allow_cross_network: bool) -> bool {
		if allow_cross_network {
			return true;
		}
		self.pinned_to_network.matches(requested)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn entry(ttl: Duration) -> HostCacheEntry {
		HostCacheEntry {
			key: CacheKey {
				host: "example.com".into(),
				family: AddressFamily::Unspecified,
				binding: Binding::Unbound,
			},
			resolved: vec!["127.0.0.1".parse().unwrap()],
			fetched_at: Instant::now(),
			ttl,
			source: Source::Builtin,
			pinned_to_network: Binding::Unbound,
		}
	}

	#[test]
	fn fresh_within_ttl() {
		let e = entry(Duration::from_secs(60));
		assert_eq!(e.freshness(Instant::now(), Duration::ZERO), Freshness::Fresh);
	}

	#[test]
	fn stale_past_ttl_within_max_expired_delay() {
		let e = entry(Duration::ZERO);
		std::thread::sleep(Duration::from_millis(5));
		assert_eq!(
			e.freshness(Instant::now(), Duration::from_secs(60)),
			Freshness::Stale
		);
	}

	#[test]
	fn expired_past_max_expired_delay() {
		let e = entry(Duration::ZERO);
		let later = Instant::now() + Duration::from_secs(120);
		assert_eq!(e.freshness(later, Duration::from_secs(60)), Freshness::Expired);
	}

	#[test]
	fn unbounded_max_expired_delay_never_expires() {
		let e = entry(Duration::ZERO);
		let later = Instant::now() + Duration::from_secs(86400);
		assert_eq!(e.freshness(later, Duration::ZERO), Freshness::Stale);
	}

	#[test]
	fn pinned_entry_rejects_other_network_unless_allowed() {
		let mut e = entry(Duration::from_secs(60));
		let net_a = Binding::Bound(crate::binding::NetworkBinding::new("a"));
		let net_b = Binding::Bound(crate::binding::NetworkBinding::new("b"));
		e.pinned_to_network = net_a;
		assert!(!e.usable_from(&net_b, false));
		assert!(e.usable_from(&net_b, true));
	}
}
