use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hickory_resolver::Resolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use tracing::{debug, warn};

use crate::binding::Binding;
use crate::cache::HostCache;
use crate::entry::{AddressFamily, CacheKey, HostCacheEntry, Source};
use crate::error::DnsError;
use crate::persist::PersistDebouncer;

pub struct QueryResult {
	pub endpoints: Vec<IpAddr>,
	pub ttl: Duration,
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Abstracts the underlying name-resolution transport, so `CachedResolver`'s
/// stale-vs-fresh arbitration is independent of whether answers come from
/// the built-in resolver or the platform's `getaddrinfo`.
pub trait Querier: Send + Sync {
	fn query(&self, host: String, family: AddressFamily) -> BoxFuture<'static, Result<QueryResult, DnsError>>;
}

#[derive(Clone)]
pub struct HickoryQuerier {
	resolver: Arc<Resolver<TokioConnectionProvider>>,
}

impl HickoryQuerier {
	pub fn new(cfg: ResolverConfig, opts: ResolverOpts) -> Self {
		Self {
			resolver: Arc::new(Resolver::builder_with_config(cfg, TokioConnectionProvider::default())
				.with_options(opts)
				.build()),
		}
	}

	pub fn from_system_conf() -> std::io::Result<Self> {
		let (cfg, opts) = hickory_resolver::system_conf::read_system_conf()?;
		Ok(Self::new(cfg, opts))
	}
}

impl Querier for HickoryQuerier {
	fn query(&self, host: String, family: AddressFamily) -> BoxFuture<'static, Result<QueryResult, DnsError>> {
		let resolver = self.resolver.clone();
		Box::pin(async move {
			let lookup = resolver.lookup_ip(host.as_str()).await.map_err(|e| {
				if e.is_no_records_found() || e.is_nx_domain() {
					DnsError::NameNotResolved(host.clone())
				} else {
					DnsError::Internal(e.to_string())
				}
			})?;
			let mut v4 = Vec::new();
			let mut v6 = Vec::new();
			for ip in lookup.iter() {
				match ip {
					IpAddr::V4(_) => v4.push(ip),
					IpAddr::V6(_) => v6.push(ip),
				}
			}
			let endpoints = match family {
				AddressFamily::V4Only => v4,
				AddressFamily::V6Only => v6,
				// IPv6 first, per spec §3.
				AddressFamily::Unspecified => v6.into_iter().chain(v4).collect(),
			};
			if endpoints.is_empty() {
				return Err(DnsError::NameNotResolved(host));
			}
			let ttl = lookup
				.valid_until()
				.checked_duration_since(Instant::now())
				.unwrap_or_default();
			Ok(QueryResult { endpoints, ttl })
		})
	}
}

/// Ties the host cache to a [`Querier`] and implements the fresh-vs-stale
/// arbitration algorithm of spec §4.B, steps 1-5.
pub struct CachedResolver {
	cache: Arc<HostCache>,
	querier: Arc<dyn Querier>,
	cfg: crate::config::Config,
	persist: Option<Arc<PersistDebouncer>>,
}

impl CachedResolver {
	pub fn new(querier: Arc<dyn Querier>, cfg: crate::config::Config) -> Self {
		Self {
			cache: Arc::new(HostCache::new(cfg.max_cache_entries)),
			querier,
			cfg,
			persist: None,
		}
	}

	/// Attaches an on-disk persistence debouncer (spec §4.B `persistHostCache`):
	/// every fresh resolution marks it dirty so its background `run()` loop
	/// flushes `hostcache.json` within `persistDelay`.
	pub fn with_persistence(mut self, persist: Arc<PersistDebouncer>) -> Self {
		self.persist = Some(persist);
		self
	}

	pub fn cache(&self) -> &Arc<HostCache> {
		&self.cache
	}

	pub fn on_network_change(&self) {
		self.cache.flush_on_network_change(self.cfg.allow_cross_network_usage);
	}

	/// Implements the numbered algorithm from spec §4.B.
	pub async fn resolve(
		&self,
		host: impl Into<String>,
		family: AddressFamily,
		binding: Binding,
	) -> Result<Vec<IpAddr>, DnsError> {
		let host = host.into();
		let key = CacheKey {
			host: host.clone(),
			family,
			binding: binding.clone(),
		};

		// Step 1: lookup entry (optionally matching any binding if allowed).
		let existing = self.cache.lookup(&key, self.cfg.allow_cross_network_usage);
		let now = Instant::now();
		if let Some(entry) = &existing {
			if matches!(entry.freshness(now, self.cfg.max_expired_delay), crate::entry::Freshness::Fresh) {
				// Step 2: fresh, return immediately.
				return Ok(entry.resolved.clone());
			}
		}

		// Step 3: start a background fresh lookup, arm the timeout. The
		// lookup is an owned, 'static future so it can keep running in a
		// spawned task after we hand a stale answer back to the caller.
		let use_stale_on_nxdomain = self.cfg.use_stale_on_name_not_resolved;
		let mut fresh_fut = Box::pin(fresh_lookup(
			self.cache.clone(),
			self.querier.clone(),
			key.clone(),
			use_stale_on_nxdomain,
			self.persist.clone(),
		));

		if self.cfg.fresh_lookup_timeout.is_zero() {
			// Yield immediately to stale (if eligible) and let the fresh
			// lookup continue in the background to update the cache.
			if let Some(stale) = self.stale_candidate(&existing, now) {
				tokio::spawn(async move {
					let _ = fresh_fut.await;
				});
				debug!(target: "netengine::dns", host = %host, "serving stale answer, refreshing in background");
				return Ok(stale);
			}
			return fresh_fut.await;
		}

		let timeout = tokio::time::sleep(self.cfg.fresh_lookup_timeout);
		tokio::pin!(timeout);

		tokio::select! {
			biased;
			result = &mut fresh_fut => result,
			_ = &mut timeout => {
				// Step 4: timer fired first.
				if let Some(stale) = self.stale_candidate(&existing, now) {
					tokio::spawn(async move {
						let _ = fresh_fut.await;
					});
					debug!(target: "netengine::dns", host = %host, "fresh lookup timed out, serving stale");
					Ok(stale)
				} else {
					fresh_fut.await
				}
			}
		}
	}

	fn stale_candidate(&self, existing: &Option<HostCacheEntry>, now: Instant) -> Option<Vec<IpAddr>> {
		if !self.cfg.enable_stale {
			return None;
		}
		let entry = existing.as_ref()?;
		match entry.freshness(now, self.cfg.max_expired_delay) {
			crate::entry::Freshness::Stale => Some(entry.resolved.clone()),
			_ => None,
		}
	}
}

/// Performs one fresh query and updates the cache. A free function (rather
/// than a `&self` method) so its future is `'static` and can be spawned
/// onto the background task once a stale answer has already been returned.
async fn fresh_lookup(
	cache: Arc<HostCache>,
	querier: Arc<dyn Querier>,
	key: CacheKey,
	use_stale_on_nxdomain: bool,
	persist: Option<Arc<PersistDebouncer>>,
) -> Result<Vec<IpAddr>, DnsError> {
	match querier.query(key.host.clone(), key.family).await {
		Ok(result) => {
			let entry = HostCacheEntry {
				key: key.clone(),
				resolved: result.endpoints.clone(),
				fetched_at: Instant::now(),
				ttl: result.ttl,
				source: Source::Builtin,
				pinned_to_network: key.binding.clone(),
			};
			cache.insert(entry);
			if let Some(persist) = &persist {
				persist.mark_dirty();
			}
			Ok(result.endpoints)
		},
		// Step 5: fresh failure with NXDOMAIN-shaped error.
		Err(DnsError::NameNotResolved(_)) if use_stale_on_nxdomain => {
			if let Some(stale) = cache.get(&key) {
				warn!(target: "netengine::dns", host = %key.host, "resolution failed, serving stale on NXDOMAIN");
				return Ok(stale.resolved);
			}
			Err(DnsError::NameNotResolved(key.host))
		},
		Err(other) => Err(other),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};

	struct FlakyQuerier {
		calls: AtomicUsize,
		fail_first_n: usize,
	}

	impl Querier for FlakyQuerier {
		fn query(&self, _host: String, _family: AddressFamily) -> BoxFuture<'static, Result<QueryResult, DnsError>> {
			let n = self.calls.fetch_add(1, Ordering::SeqCst);
			let fail = n < self.fail_first_n;
			Box::pin(async move {
				if fail {
					Err(DnsError::NameNotResolved("x".into()))
				} else {
					Ok(QueryResult {
						endpoints: vec!["1.2.3.4".parse().unwrap()],
						ttl: Duration::from_secs(60),
					})
				}
			})
		}
	}

	#[tokio::test]
	async fn fresh_lookup_populates_cache() {
		let q = Arc::new(FlakyQuerier {
			calls: AtomicUsize::new(0),
			fail_first_n: 0,
		});
		let resolver = CachedResolver::new(q, crate::config::Config::default());
		let ips = resolver
			.resolve("example.com", AddressFamily::Unspecified, Binding::Unbound)
			.await
			.unwrap();
		assert_eq!(ips, vec!["1.2.3.4".parse::<IpAddr>().unwrap()]);
		assert_eq!(resolver.cache.len(), 1);
	}

	#[tokio::test]
	async fn zero_timeout_serves_stale_synchronously_scenario_4() {
		// Scenario 4: stale DNS fast path.
		let q = Arc::new(FlakyQuerier {
			calls: AtomicUsize::new(0),
			fail_first_n: 0,
		});
		let mut cfg = crate::config::Config::default();
		cfg.enable_stale = true;
		cfg.fresh_lookup_timeout = Duration::ZERO;
		cfg.max_expired_delay = Duration::from_secs(3600);
		let resolver = CachedResolver::new(q.clone(), cfg);

		// Seed an expired entry directly.
		resolver.cache.insert(HostCacheEntry {
			key: CacheKey {
				host: "x".into(),
				family: AddressFamily::Unspecified,
				binding: Binding::Unbound,
			},
			resolved: vec!["9.9.9.9".parse().unwrap()],
			fetched_at: Instant::now() - Duration::from_secs(120),
			ttl: Duration::from_secs(1),
			source: Source::Builtin,
			pinned_to_network: Binding::Unbound,
		});

		let ips = resolver
			.resolve("x", AddressFamily::Unspecified, Binding::Unbound)
			.await
			.unwrap();
		assert_eq!(ips, vec!["9.9.9.9".parse::<IpAddr>().unwrap()]);
	}

	#[tokio::test]
	async fn stale_on_name_not_resolved_when_enabled() {
		let q = Arc::new(FlakyQuerier {
			calls: AtomicUsize::new(0),
			fail_first_n: 10,
		});
		let mut cfg = crate::config::Config::default();
		cfg.use_stale_on_name_not_resolved = true;
		cfg.fresh_lookup_timeout = Duration::from_millis(5);
		let resolver = CachedResolver::new(q, cfg);
		resolver.cache.insert(HostCacheEntry {
			key: CacheKey {
				host: "y".into(),
				family: AddressFamily::Unspecified,
				binding: Binding::Unbound,
			},
			resolved: vec!["8.8.8.8".parse().unwrap()],
			fetched_at: Instant::now() - Duration::from_secs(1),
			ttl: Duration::from_millis(1),
			source: Source::Builtin,
			pinned_to_network: Binding::Unbound,
		});
		tokio::time::sleep(Duration::from_millis(10)).await;
		let ips = resolver
			.resolve("y", AddressFamily::Unspecified, Binding::Unbound)
			.await
			.unwrap();
		assert_eq!(ips, vec!["8.8.8.8".parse::<IpAddr>().unwrap()]);
	}

	#[tokio::test]
	async fn fresh_resolution_marks_attached_persist_debouncer_dirty() {
		let q = Arc::new(FlakyQuerier {
			calls: AtomicUsize::new(0),
			fail_first_n: 0,
		});
		let dir = tempfile::tempdir().unwrap();
		let debouncer = Arc::new(crate::persist::PersistDebouncer::new(
			dir.path().join("hostcache.json"),
			Duration::from_secs(60),
		));
		let resolver = CachedResolver::new(q, crate::config::Config::default()).with_persistence(debouncer.clone());
		assert!(!debouncer.is_dirty());

		resolver
			.resolve("example.com", AddressFamily::Unspecified, Binding::Unbound)
			.await
			.unwrap();
		assert!(debouncer.is_dirty());
	}
}
