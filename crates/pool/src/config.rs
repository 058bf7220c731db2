use serde::{Deserialize, Serialize};
use std::time::Duration;

use net_core::duration::serde_dur;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConfig {
	pub max_idle_http1_connections_per_origin: Option<usize>,
	#[serde(default, with = "net_core::duration::serde_dur_option")]
	pub idle_http1_connection_timeout: Option<Duration>,
	pub max_queued_http1_acquires: Option<usize>,
	pub circuit_breaker_threshold: Option<u32>,
	#[serde(default, with = "net_core::duration::serde_dur_option")]
	pub circuit_breaker_base_backoff: Option<Duration>,
	#[serde(default, with = "net_core::duration::serde_dur_option")]
	pub circuit_breaker_max_backoff: Option<Duration>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
	pub max_idle_http1_connections_per_origin: usize,
	#[serde(with = "serde_dur")]
	pub idle_http1_connection_timeout: Duration,
	pub max_queued_http1_acquires: usize,
	pub circuit_breaker_threshold: u32,
	#[serde(with = "serde_dur")]
	pub circuit_breaker_base_backoff: Duration,
	#[serde(with = "serde_dur")]
	pub circuit_breaker_max_backoff: Duration,
}

impl Default for Config {
	fn default() -> Self {
		let defaults = crate::h1::Http1PoolConfig::default();
		Self {
			max_idle_http1_connections_per_origin: defaults.max_idle_per_origin,
			idle_http1_connection_timeout: defaults.idle_timeout,
			max_queued_http1_acquires: defaults.max_queued_acquires,
			circuit_breaker_threshold: defaults.breaker_threshold,
			circuit_breaker_base_backoff: defaults.breaker_base_backoff,
			circuit_breaker_max_backoff: defaults.breaker_max_backoff,
		}
	}
}

impl From<Option<RawConfig>> for Config {
	fn from(raw: Option<RawConfig>) -> Self {
		let default = Config::default();
		let Some(raw) = raw else { return default };
		Config {
			max_idle_http1_connections_per_origin: raw
				.max_idle_http1_connections_per_origin
				.unwrap_or(default.max_idle_http1_connections_per_origin),
			idle_http1_connection_timeout: raw.idle_http1_connection_timeout.unwrap_or(default.idle_http1_connection_timeout),
			max_queued_http1_acquires: raw.max_queued_http1_acquires.unwrap_or(default.max_queued_http1_acquires),
			circuit_breaker_threshold: raw.circuit_breaker_threshold.unwrap_or(default.circuit_breaker_threshold),
			circuit_breaker_base_backoff: raw.circuit_breaker_base_backoff.unwrap_or(default.circuit_breaker_base_backoff),
			circuit_breaker_max_backoff: raw.circuit_breaker_max_backoff.unwrap_or(default.circuit_breaker_max_backoff),
		}
	}
}

impl From<Config> for crate::h1::Http1PoolConfig {
	fn from(cfg: Config) -> Self {
		crate::h1::Http1PoolConfig {
			max_idle_per_origin: cfg.max_idle_http1_connections_per_origin,
			idle_timeout: cfg.idle_http1_connection_timeout,
			max_queued_acquires: cfg.max_queued_http1_acquires,
			breaker_threshold: cfg.circuit_breaker_threshold,
			breaker_base_backoff: cfg.circuit_breaker_base_backoff,
			breaker_max_backoff: cfg.circuit_breaker_max_backoff,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn raw_none_matches_default() {
		let cfg: Config = None.into();
		assert_eq!(cfg.max_idle_http1_connections_per_origin, Config::default().max_idle_http1_connections_per_origin);
	}

	#[test]
	fn unknown_fields_are_tolerated() {
		let raw: RawConfig = serde_json::from_str(r#"{"maxIdleHttp1ConnectionsPerOrigin": 10, "somethingElse": true}"#).unwrap();
		assert_eq!(raw.max_idle_http1_connections_per_origin, Some(10));
	}
}
