//! Structured logging setup, shared by every subsystem. Mirrors the
//! teacher's `tracing` + `tracing-subscriber` + `tracing-appender` stack:
//! components never reach for a process-global logger, they accept a sink
//! handle (or, for the common case, install one process-wide subscriber at
//! startup via [`init`]).

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawLogging {
	pub filter: Option<String>,
	#[serde(default)]
	pub json: bool,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Config {
	pub filter: String,
	pub json: bool,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			filter: "info".to_string(),
			json: false,
		}
	}
}

impl From<Option<RawLogging>> for Config {
	fn from(raw: Option<RawLogging>) -> Self {
		let default = Config::default();
		match raw {
			None => default,
			Some(raw) => Config {
				filter: raw.filter.unwrap_or(default.filter),
				json: raw.json,
			},
		}
	}
}

/// Installs a process-wide `tracing` subscriber. Idempotent: a second call
/// is a no-op rather than a panic, so tests that each build an `Engine` can
/// call it freely.
pub fn init(cfg: &Config) {
	let filter = EnvFilter::try_new(&cfg.filter).unwrap_or_else(|_| EnvFilter::new("info"));
	let registry = tracing_subscriber::registry().with(filter);
	let result = if cfg.json {
		registry.with(tracing_subscriber::fmt::layer().json()).try_init()
	} else {
		registry.with(tracing_subscriber::fmt::layer()).try_init()
	};
	// A prior call (e.g. from another Engine in the same test process) having
	// already installed a subscriber is expected, not an error.
	let _ = result;
}
