use std::time::Duration;

use net_core::duration::{serde_dur, serde_dur_option};
use serde::{Deserialize, Serialize};

/// Raw, unknown-key-tolerant migration knobs, per spec §4.F's Inputs list.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawConfig {
	pub default_network_migration: Option<bool>,
	pub path_degradation_migration: Option<bool>,
	pub allow_non_default_network_usage: Option<bool>,
	pub allow_server_migration: Option<bool>,
	pub migrate_idle_connections: Option<bool>,
	#[serde(default, with = "serde_dur_option")]
	pub idle_migration_period: Option<Duration>,
	#[serde(default, with = "serde_dur_option")]
	pub max_time_on_non_default_network: Option<Duration>,
	pub max_path_degrading_non_default_migrations_count: Option<u32>,
	pub max_write_error_non_default_network_migrations_count: Option<u32>,
	pub retry_pre_handshake_errors_on_non_default_network: Option<bool>,
	pub close_sessions_on_ip_change: Option<bool>,
	pub goaway_sessions_on_ip_change: Option<bool>,
	/// Widens trigger evaluation while still ON_DEFAULT instead of waiting
	/// for a degraded path to be confirmed; not a distinct state (spec §9
	/// open question, resolved in DESIGN.md).
	pub migrate_sessions_early_v2: Option<bool>,
	#[serde(default, with = "serde_dur_option")]
	pub anti_amplification_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
	pub default_network_migration: bool,
	pub path_degradation_migration: bool,
	pub allow_non_default_network_usage: bool,
	pub allow_server_migration: bool,
	pub migrate_idle_connections: bool,
	#[serde(with = "serde_dur")]
	pub idle_migration_period: Duration,
	#[serde(with = "serde_dur")]
	pub max_time_on_non_default_network: Duration,
	pub max_path_degrading_non_default_migrations_count: u32,
	pub max_write_error_non_default_network_migrations_count: u32,
	pub retry_pre_handshake_errors_on_non_default_network: bool,
	pub close_sessions_on_ip_change: bool,
	pub goaway_sessions_on_ip_change: bool,
	pub migrate_sessions_early_v2: bool,
	#[serde(with = "serde_dur")]
	pub anti_amplification_timeout: Duration,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			default_network_migration: true,
			path_degradation_migration: false,
			allow_non_default_network_usage: false,
			allow_server_migration: false,
			migrate_idle_connections: false,
			idle_migration_period: Duration::from_secs(30),
			max_time_on_non_default_network: Duration::from_secs(120),
			max_path_degrading_non_default_migrations_count: 4,
			max_write_error_non_default_network_migrations_count: 4,
			retry_pre_handshake_errors_on_non_default_network: false,
			close_sessions_on_ip_change: false,
			goaway_sessions_on_ip_change: false,
			migrate_sessions_early_v2: false,
			anti_amplification_timeout: Duration::from_secs(3),
		}
	}
}

impl From<RawConfig> for Config {
	fn from(raw: RawConfig) -> Self {
		let d = Config::default();
		Config {
			default_network_migration: raw.default_network_migration.unwrap_or(d.default_network_migration),
			path_degradation_migration: raw.path_degradation_migration.unwrap_or(d.path_degradation_migration),
			allow_non_default_network_usage: raw
				.allow_non_default_network_usage
				.unwrap_or(d.allow_non_default_network_usage),
			allow_server_migration: raw.allow_server_migration.unwrap_or(d.allow_server_migration),
			migrate_idle_connections: raw.migrate_idle_connections.unwrap_or(d.migrate_idle_connections),
			idle_migration_period: raw.idle_migration_period.unwrap_or(d.idle_migration_period),
			max_time_on_non_default_network: raw.max_time_on_non_default_network.unwrap_or(d.max_time_on_non_default_network),
			max_path_degrading_non_default_migrations_count: raw
				.max_path_degrading_non_default_migrations_count
				.unwrap_or(d.max_path_degrading_non_default_migrations_count),
			max_write_error_non_default_network_migrations_count: raw
				.max_write_error_non_default_network_migrations_count
				.unwrap_or(d.max_write_error_non_default_network_migrations_count),
			retry_pre_handshake_errors_on_non_default_network: raw
				.retry_pre_handshake_errors_on_non_default_network
				.unwrap_or(d.retry_pre_handshake_errors_on_non_default_network),
			close_sessions_on_ip_change: raw.close_sessions_on_ip_change.unwrap_or(d.close_sessions_on_ip_change),
			goaway_sessions_on_ip_change: raw.goaway_sessions_on_ip_change.unwrap_or(d.goaway_sessions_on_ip_change),
			migrate_sessions_early_v2: raw.migrate_sessions_early_v2.unwrap_or(d.migrate_sessions_early_v2),
			anti_amplification_timeout: raw.anti_amplification_timeout.unwrap_or(d.anti_amplification_timeout),
		}
	}
}

impl Config {
	/// The open question from spec §9: `pathDegradationMigration=false` with
	/// `allowNonDefaultNetworkUsage=true` is a valid-but-inert combination
	/// here, not a hard error — see DESIGN.md. Returns `true` when it's
	/// worth a one-time warning at session-pool construction.
	pub fn has_inert_path_degradation_combination(&self) -> bool {
		!self.path_degradation_migration && self.allow_non_default_network_usage
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn raw_defaults_match_explicit_default() {
		let cfg: Config = RawConfig::default().into();
		assert_eq!(cfg, Config::default());
	}

	#[test]
	fn detects_inert_combination() {
		let cfg = Config {
			path_degradation_migration: false,
			allow_non_default_network_usage: true,
			..Config::default()
		};
		assert!(cfg.has_inert_path_degradation_combination());
	}

	#[test]
	fn unknown_fields_are_tolerated() {
		let raw: RawConfig = serde_json::from_value(serde_json::json!({
			"defaultNetworkMigration": false,
			"somethingFuture": 1
		}))
		.unwrap();
		assert_eq!(raw.default_network_migration, Some(false));
	}
}
