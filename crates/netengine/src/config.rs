//! Configuration & options, spec §4.J: a typed `Config` as ground truth,
//! with a JSON-patch bridge (`net_core::options`) for experimental knobs
//! recognized opt-in rather than reflected wholesale.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use net_core::duration::{serde_dur, serde_dur_option};
use serde::{Deserialize, Serialize};

use crate::cache::CacheMode;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawTransportConfig {
	pub enable_http2: Option<bool>,
	pub enable_quic: Option<bool>,
	pub enable_brotli: Option<bool>,
	pub quic_hints: Option<Vec<(String, u16, u16)>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransportConfig {
	pub enable_http2: bool,
	pub enable_quic: bool,
	pub enable_brotli: bool,
	pub quic_hints: Vec<(String, u16, u16)>,
}

impl Default for TransportConfig {
	fn default() -> Self {
		Self {
			enable_http2: true,
			enable_quic: false,
			enable_brotli: false,
			quic_hints: Vec::new(),
		}
	}
}

impl From<RawTransportConfig> for TransportConfig {
	fn from(raw: RawTransportConfig) -> Self {
		let d = TransportConfig::default();
		Self {
			enable_http2: raw.enable_http2.unwrap_or(d.enable_http2),
			enable_quic: raw.enable_quic.unwrap_or(d.enable_quic),
			enable_brotli: raw.enable_brotli.unwrap_or(d.enable_brotli),
			quic_hints: raw.quic_hints.unwrap_or(d.quic_hints),
		}
	}
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawCacheConfig {
	pub mode: Option<String>,
	pub max_size_bytes: Option<usize>,
	pub storage_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
	pub mode: CacheMode,
	pub max_size_bytes: usize,
	pub storage_path: Option<PathBuf>,
}

impl Default for CacheConfig {
	fn default() -> Self {
		Self {
			mode: CacheMode::Disabled,
			max_size_bytes: 10 * 1024 * 1024,
			storage_path: None,
		}
	}
}

impl From<RawCacheConfig> for CacheConfig {
	fn from(raw: RawCacheConfig) -> Self {
		let d = CacheConfig::default();
		let mode = match raw.mode.as_deref() {
			Some("IN_MEMORY") => CacheMode::InMemory,
			Some("DISK") => CacheMode::Disk,
			Some("DISK_NO_HTTP") => CacheMode::DiskNoHttp,
			Some("DISABLED") | None => d.mode,
			Some(other) => {
				tracing::warn!(target: "netengine::config", mode = other, "unrecognized cache mode, defaulting to DISABLED");
				CacheMode::Disabled
			},
		};
		Self {
			mode,
			max_size_bytes: raw.max_size_bytes.unwrap_or(d.max_size_bytes),
			storage_path: raw.storage_path.or(d.storage_path),
		}
	}
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawSecurityConfig {
	pub pinning_bypass_for_local_trust_anchors: Option<bool>,
	/// Whether to allow 0-RTT resumption even when `publicKeyPins` is
	/// configured for the target host. Default is `false`: resuming 0-RTT
	/// skips the pinning hook on early data. See DESIGN.md Open Questions.
	pub allow_zero_rtt_with_pins: Option<bool>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SecurityConfig {
	pub pinning_bypass_for_local_trust_anchors: bool,
	pub allow_zero_rtt_with_pins: bool,
}

impl From<RawSecurityConfig> for SecurityConfig {
	fn from(raw: RawSecurityConfig) -> Self {
		Self {
			pinning_bypass_for_local_trust_anchors: raw.pinning_bypass_for_local_trust_anchors.unwrap_or(false),
			allow_zero_rtt_with_pins: raw.allow_zero_rtt_with_pins.unwrap_or(false),
		}
	}
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawConfig {
	pub transport: Option<RawTransportConfig>,
	pub dns: Option<net_dns::config::RawConfig>,
	pub pool: Option<net_pool::config::RawConfig>,
	pub quic: Option<net_quic::config::RawConfig>,
	pub cache: Option<RawCacheConfig>,
	pub security: Option<RawSecurityConfig>,
	pub logging: Option<net_core::logging::RawLogging>,
	#[serde(default, with = "serde_dur_option")]
	pub connect_timeout: Option<Duration>,
	#[serde(default, with = "serde_dur_option")]
	pub request_timeout: Option<Duration>,
	#[serde(default, with = "serde_dur_option")]
	pub write_timeout: Option<Duration>,
	pub max_redirects: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct Config {
	pub transport: TransportConfig,
	pub dns: net_dns::Config,
	pub pool: net_pool::Config,
	pub quic: net_quic::Config,
	pub cache: CacheConfig,
	pub security: SecurityConfig,
	pub logging: net_core::logging::Config,
	pub connect_timeout: Duration,
	pub request_timeout: Duration,
	pub write_timeout: Duration,
	pub max_redirects: u32,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			transport: TransportConfig::default(),
			dns: net_dns::Config::default(),
			pool: net_pool::Config::default(),
			quic: net_quic::Config::default(),
			cache: CacheConfig::default(),
			security: SecurityConfig::default(),
			logging: net_core::logging::Config::default(),
			connect_timeout: Duration::from_secs(30),
			request_timeout: Duration::from_secs(300),
			write_timeout: Duration::from_secs(30),
			max_redirects: 20,
		}
	}
}

impl From<RawConfig> for Config {
	fn from(raw: RawConfig) -> Self {
		let d = Config::default();
		Self {
			transport: raw.transport.map(Into::into).unwrap_or(d.transport),
			dns: raw.dns.map(Into::into).unwrap_or(d.dns),
			pool: raw.pool.into(),
			quic: raw.quic.map(Into::into).unwrap_or(d.quic),
			cache: raw.cache.map(Into::into).unwrap_or(d.cache),
			security: raw.security.map(Into::into).unwrap_or(d.security),
			logging: raw.logging.into(),
			connect_timeout: raw.connect_timeout.unwrap_or(d.connect_timeout),
			request_timeout: raw.request_timeout.unwrap_or(d.request_timeout),
			write_timeout: raw.write_timeout.unwrap_or(d.write_timeout),
			max_redirects: raw.max_redirects.unwrap_or(d.max_redirects),
		}
	}
}

/// Experimental options recognized by the JSON-patch bridge. Unrecognized
/// keys are logged and ignored, never silently repurposed (spec §9).
pub fn recognized_experimental_options() -> Vec<net_core::options::ExperimentalOption> {
	use net_core::options::ExperimentalOption;
	vec![
		ExperimentalOption {
			name: "QUIC_allow_server_migration",
			apply: |target, value| {
				if let Some(v) = value.as_bool() {
					target["quic"]["allowServerMigration"] = serde_json::Value::Bool(v);
				}
			},
		},
		ExperimentalOption {
			name: "disable_connection_migration",
			apply: |target, value| {
				if value.as_bool() == Some(true) {
					target["quic"]["defaultNetworkMigration"] = serde_json::Value::Bool(false);
				}
			},
		},
	]
}

/// Distinct hints a given host advertised (Alt-Svc or the static config's
/// `quicHints`), consulted by the session pool when deciding whether a new
/// session may attempt QUIC first.
pub fn quic_hinted_hosts(cfg: &TransportConfig) -> HashSet<String> {
	cfg.quic_hints.iter().map(|(host, _, _)| host.clone()).collect()
}
