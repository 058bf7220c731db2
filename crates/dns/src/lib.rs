//! The DNS subsystem: a host cache with TTL/stale/expired classification,
//! stale-while-revalidate arbitration, cross-network usability rules, and
//! optional on-disk persistence (spec §4.B).

pub mod binding;
pub mod cache;
pub mod config;
pub mod entry;
pub mod error;
pub mod persist;
pub mod resolver;

pub use binding::{Binding, NetworkBinding};
pub use cache::HostCache;
pub use config::Config;
pub use entry::{AddressFamily, CacheKey, Freshness, HostCacheEntry, Source};
pub use error::DnsError;
pub use resolver::{CachedResolver, HickoryQuerier, Querier, QueryResult};

use std::sync::Arc;

/// Builds a [`CachedResolver`] wired to persistence, if configured, mirroring
/// the `dns::CachedResolver` the teacher's `client` module constructs from a
/// `ResolverConfig`/`ResolverOpts` pair.
pub fn build(cfg: Config) -> std::io::Result<(CachedResolver, Option<Arc<persist::PersistDebouncer>>)> {
	let querier: Arc<dyn Querier> = if cfg.use_builtin_resolver {
		Arc::new(HickoryQuerier::new(
			hickory_resolver::config::ResolverConfig::default(),
			hickory_resolver::config::ResolverOpts::default(),
		))
	} else {
		Arc::new(HickoryQuerier::from_system_conf()?)
	};
	let mut resolver = CachedResolver::new(querier, cfg.clone());
	let debouncer = if cfg.persist_host_cache {
		cfg.persist_path
			.clone()
			.map(|p| Arc::new(persist::PersistDebouncer::new(p, cfg.persist_delay)))
	} else {
		None
	};
	if let Some(debouncer) = &debouncer {
		resolver = resolver.with_persistence(debouncer.clone());
	}
	Ok((resolver, debouncer))
}
