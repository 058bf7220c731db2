use std::path::PathBuf;
use std::time::Duration;

use net_core::duration::serde_dur;
use net_core::duration::serde_dur_option;
use serde::{Deserialize, Serialize};

/// User-facing, unknown-key-tolerant config, per the `RawConfig` → `Config`
/// split described in SPEC_FULL.md §2 (ambient). Left permissive so the
/// JSON experimental-options bridge in `net-core::options` can target it.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawConfig {
	pub use_builtin_resolver: Option<bool>,
	pub enable_stale: Option<bool>,
	#[serde(default, with = "serde_dur_option")]
	pub fresh_lookup_timeout: Option<Duration>,
	#[serde(default, with = "serde_dur_option")]
	pub max_expired_delay: Option<Duration>,
	pub allow_cross_network_usage: Option<bool>,
	pub use_stale_on_name_not_resolved: Option<bool>,
	pub persist_host_cache: Option<bool>,
	#[serde(default, with = "serde_dur_option")]
	pub persist_delay: Option<Duration>,
	pub preestablish_connections_to_stale_dns_results: Option<bool>,
	pub persist_path: Option<PathBuf>,
	pub max_cache_entries: Option<usize>,
	pub prefer_ipv6: Option<bool>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
	pub use_builtin_resolver: bool,
	pub enable_stale: bool,
	#[serde(with = "serde_dur")]
	pub fresh_lookup_timeout: Duration,
	#[serde(with = "serde_dur")]
	pub max_expired_delay: Duration,
	pub allow_cross_network_usage: bool,
	pub use_stale_on_name_not_resolved: bool,
	pub persist_host_cache: bool,
	#[serde(with = "serde_dur")]
	pub persist_delay: Duration,
	pub preestablish_connections_to_stale_dns_results: bool,
	pub persist_path: Option<PathBuf>,
	pub max_cache_entries: usize,
	pub prefer_ipv6: bool,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			use_builtin_resolver: true,
			enable_stale: false,
			fresh_lookup_timeout: Duration::ZERO,
			max_expired_delay: Duration::ZERO,
			allow_cross_network_usage: false,
			use_stale_on_name_not_resolved: false,
			persist_host_cache: false,
			persist_delay: Duration::from_secs(60),
			preestablish_connections_to_stale_dns_results: false,
			persist_path: None,
			max_cache_entries: 1000,
			prefer_ipv6: false,
		}
	}
}

impl From<RawConfig> for Config {
	fn from(raw: RawConfig) -> Self {
		let default = Config::default();
		Config {
			use_builtin_resolver: raw.use_builtin_resolver.unwrap_or(default.use_builtin_resolver),
			enable_stale: raw.enable_stale.unwrap_or(default.enable_stale),
			fresh_lookup_timeout: raw.fresh_lookup_timeout.unwrap_or(default.fresh_lookup_timeout),
			max_expired_delay: raw.max_expired_delay.unwrap_or(default.max_expired_delay),
			allow_cross_network_usage: raw
				.allow_cross_network_usage
				.unwrap_or(default.allow_cross_network_usage),
			use_stale_on_name_not_resolved: raw
				.use_stale_on_name_not_resolved
				.unwrap_or(default.use_stale_on_name_not_resolved),
			persist_host_cache: raw.persist_host_cache.unwrap_or(default.persist_host_cache),
			persist_delay: raw.persist_delay.unwrap_or(default.persist_delay),
			preestablish_connections_to_stale_dns_results: raw
				.preestablish_connections_to_stale_dns_results
				.unwrap_or(default.preestablish_connections_to_stale_dns_results),
			persist_path: raw.persist_path.or(default.persist_path),
			max_cache_entries: raw.max_cache_entries.unwrap_or(default.max_cache_entries),
			prefer_ipv6: raw.prefer_ipv6.unwrap_or(default.prefer_ipv6),
		}
	}
}
