use std::sync::Arc;
use std::time::Instant;

use net_core::binding::Binding;
use net_core::time::Clock;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::counters::MigrationCounters;
use crate::prober::PathProber;
use crate::state::{MigrationOutcome, MigrationState};

struct Inner {
	migration_state: MigrationState,
	current_network: Binding,
	default_network: Binding,
	counters: MigrationCounters,
	non_default_since: Option<Instant>,
	migration_started_at: Option<Instant>,
	last_activity: Instant,
}

/// Owns the migration state for one QUIC session. Generic over the probe
/// mechanism so unit tests can exercise every trigger without a real
/// `quinn::Endpoint`.
pub struct MigrationMachine {
	cfg: Config,
	clock: Clock,
	prober: Arc<dyn PathProber>,
	state: Mutex<Inner>,
}

impl MigrationMachine {
	pub fn new(cfg: Config, clock: Clock, prober: Arc<dyn PathProber>, default_network: Binding) -> Self {
		if cfg.has_inert_path_degradation_combination() {
			warn!(
				target: "net_quic::machine",
				"pathDegradationMigration=false with allowNonDefaultNetworkUsage=true: non-default usage \
				 will only ever come from write-error or server-directed migration, never path degradation"
			);
		}
		let now = clock.now();
		Self {
			cfg,
			clock,
			prober,
			state: Mutex::new(Inner {
				migration_state: MigrationState::OnDefault,
				current_network: default_network.clone(),
				default_network,
				counters: MigrationCounters::default(),
				non_default_since: None,
				migration_started_at: None,
				last_activity: now,
			}),
		}
	}

	pub fn state(&self) -> MigrationState {
		self.state.lock().migration_state
	}

	pub fn counters(&self) -> MigrationCounters {
		self.state.lock().counters
	}

	pub fn current_network(&self) -> Binding {
		self.state.lock().current_network.clone()
	}

	pub fn mark_activity(&self) {
		self.state.lock().last_activity = self.clock.now();
	}

	/// During MIGRATING, incoming packets from the old path are still
	/// accepted for up to `antiAmplificationTimeout` after the probe began.
	pub fn old_path_still_acceptable(&self) -> bool {
		let inner = self.state.lock();
		match inner.migration_started_at {
			Some(started) => self.clock.now().saturating_duration_since(started) <= self.cfg.anti_amplification_timeout,
			None => false,
		}
	}

	/// OS signaled a new default network `new_default`. `session_idle`
	/// reflects whether the session currently has no active streams.
	pub async fn on_default_network_changed(&self, new_default: Binding, session_idle: bool) -> MigrationOutcome {
		{
			let mut inner = self.state.lock();
			if matches!(inner.migration_state, MigrationState::Closed | MigrationState::Draining) {
				inner.default_network = new_default;
				return MigrationOutcome::NoOp;
			}
			inner.default_network = new_default.clone();

			if self.cfg.close_sessions_on_ip_change {
				inner.migration_state = MigrationState::Closed;
				return MigrationOutcome::Closed;
			}
			if self.cfg.goaway_sessions_on_ip_change {
				inner.migration_state = MigrationState::Draining;
				return MigrationOutcome::Draining;
			}
			if !self.cfg.default_network_migration {
				return MigrationOutcome::NoOp;
			}
			if session_idle {
				let fresh_enough = self.clock.now().saturating_duration_since(inner.last_activity) < self.cfg.idle_migration_period;
				if !(self.cfg.migrate_idle_connections && fresh_enough) {
					return MigrationOutcome::NoOp;
				}
			}
			inner.migration_state = MigrationState::Migrating;
			inner.migration_started_at = Some(self.clock.now());
		}

		let succeeded = self.prober.probe(&new_default).await;
		let mut inner = self.state.lock();
		if succeeded {
			inner.migration_state = MigrationState::OnDefault;
			inner.current_network = new_default;
			inner.counters.reset();
			inner.non_default_since = None;
			debug!(target: "net_quic::machine", "migrated to new default network");
			MigrationOutcome::MigratedToDefault
		} else {
			// Probe failed: stay put. A future trigger (write error, another
			// default-network change) gets another chance.
			inner.migration_state = MigrationState::OnDefault;
			MigrationOutcome::NoOp
		}
	}

	/// Sustained loss/RTT increase detected on the current path.
	/// `candidate_non_default` is the network the caller would try if a
	/// non-default migration is attempted.
	pub async fn on_path_degraded(&self, candidate_non_default: Binding) -> MigrationOutcome {
		let eligible = {
			let inner = self.state.lock();
			if matches!(inner.migration_state, MigrationState::Closed | MigrationState::Draining) {
				return MigrationOutcome::NoOp;
			}
			self.cfg.path_degradation_migration
				&& self.cfg.allow_non_default_network_usage
				&& inner.counters.path_degrading_migrations < self.cfg.max_path_degrading_non_default_migrations_count
		};

		if eligible {
			if self.prober.probe(&candidate_non_default).await {
				let mut inner = self.state.lock();
				inner.counters.path_degrading_migrations += 1;
				inner.migration_state = MigrationState::OnNonDefault;
				inner.current_network = candidate_non_default;
				inner.non_default_since = Some(self.clock.now());
				info!(target: "net_quic::machine", "migrated to non-default network after path degradation");
				return MigrationOutcome::MigratedToNonDefault;
			}
		}

		// Fall back to a same-network port migration: single probe, no
		// state change beyond the underlying path, since the session stays
		// logically on the same network.
		let port_candidate = self.state.lock().current_network.clone();
		if self.prober.probe(&port_candidate).await {
			MigrationOutcome::PortMigrated
		} else {
			MigrationOutcome::NoOp
		}
	}

	pub async fn on_write_error(&self, candidate_non_default: Binding) -> MigrationOutcome {
		let eligible = {
			let mut inner = self.state.lock();
			if matches!(inner.migration_state, MigrationState::Closed | MigrationState::Draining) {
				return MigrationOutcome::NoOp;
			}
			inner.counters.write_error_migrations += 1;
			self.cfg.allow_non_default_network_usage
				&& inner.counters.write_error_migrations <= self.cfg.max_write_error_non_default_network_migrations_count
		};

		if eligible && self.prober.probe(&candidate_non_default).await {
			let mut inner = self.state.lock();
			inner.migration_state = MigrationState::OnNonDefault;
			inner.current_network = candidate_non_default;
			inner.non_default_since = Some(self.clock.now());
			MigrationOutcome::MigratedToNonDefault
		} else {
			MigrationOutcome::NoOp
		}
	}

	/// Fires when `maxTimeOnNonDefaultNetwork` elapses while ON_NONDEFAULT.
	pub async fn on_non_default_timer_fired(&self) -> MigrationOutcome {
		let default_network = {
			let inner = self.state.lock();
			if inner.migration_state != MigrationState::OnNonDefault {
				return MigrationOutcome::NoOp;
			}
			inner.default_network.clone()
		};

		if self.prober.probe(&default_network).await {
			let mut inner = self.state.lock();
			inner.migration_state = MigrationState::OnDefault;
			inner.current_network = default_network;
			inner.counters.reset();
			inner.non_default_since = None;
			MigrationOutcome::ReturnedToDefault
		} else {
			let mut inner = self.state.lock();
			inner.non_default_since = Some(self.clock.now());
			MigrationOutcome::ExtendedOnNonDefault
		}
	}

	/// Returns `true` once `maxTimeOnNonDefaultNetwork` has elapsed since
	/// entering (or last extending on) the non-default network; the caller
	/// uses this to decide when to invoke [`Self::on_non_default_timer_fired`].
	pub fn non_default_timer_elapsed(&self) -> bool {
		let inner = self.state.lock();
		match inner.non_default_since {
			Some(since) => self.clock.now().saturating_duration_since(since) >= self.cfg.max_time_on_non_default_network,
			None => false,
		}
	}

	/// Server sent a PREFERRED_ADDRESS transport parameter / frame.
	pub async fn on_server_preferred_address(&self, server_addr: Binding) -> MigrationOutcome {
		if !self.cfg.allow_server_migration {
			return MigrationOutcome::NoOp;
		}
		if self.prober.probe(&server_addr).await {
			let mut inner = self.state.lock();
			inner.current_network = server_addr;
			MigrationOutcome::ServerPathSwitched
		} else {
			MigrationOutcome::NoOp
		}
	}

	pub fn should_retry_pre_handshake_on_alternate_network(&self) -> bool {
		self.cfg.retry_pre_handshake_errors_on_non_default_network
	}
}
