//! HTTP/2 session, spec §4.E: frame multiplexing on top of the `h2` crate
//! with per-stream/per-connection flow control handled by `h2` itself. This
//! module owns the DRAINING policy `h2` doesn't have an opinion on: a peer
//! GOAWAY marks the session DRAINING, in-flight streams finish, new stream
//! acquisition is refused, and the socket closes once every stream ends or
//! `drainDeadline` elapses (invariant I4).

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use net_pool::session::{MultiplexedSession, SessionState};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

#[derive(Clone, Copy, Debug)]
pub struct Http2Config {
	pub drain_deadline: Duration,
}

impl Default for Http2Config {
	fn default() -> Self {
		Self {
			drain_deadline: Duration::from_secs(10),
		}
	}
}

/// Wraps an `h2::client::SendRequest` handle (owned by the caller; this
/// type only tracks pool-visible lifecycle) with the DRAINING/CLOSED
/// bookkeeping the session pool needs.
pub struct Http2Session {
	state: Mutex<SessionState>,
	open_streams: AtomicUsize,
	peer_max_concurrent: AtomicU32,
	drain_complete: Notify,
	cfg: Http2Config,
}

impl Http2Session {
	pub fn new(peer_max_concurrent: u32, cfg: Http2Config) -> Arc<Self> {
		Arc::new(Self {
			state: Mutex::new(SessionState::Active),
			open_streams: AtomicUsize::new(0),
			peer_max_concurrent: AtomicU32::new(peer_max_concurrent),
			drain_complete: Notify::new(),
			cfg,
		})
	}

	/// Spec property P2: `max(activeStreams) <= peerMaxConcurrent`.
	pub fn try_open_stream(&self) -> bool {
		if *self.state.lock() != SessionState::Active {
			return false;
		}
		loop {
			let current = self.open_streams.load(Ordering::SeqCst);
			if current as u32 >= self.peer_max_concurrent.load(Ordering::SeqCst) {
				return false;
			}
			if self
				.open_streams
				.compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst)
				.is_ok()
			{
				return true;
			}
		}
	}

	pub fn close_stream(&self) {
		let remaining = self.open_streams.fetch_sub(1, Ordering::SeqCst) - 1;
		if remaining == 0 && *self.state.lock() == SessionState::Draining {
			self.drain_complete.notify_waiters();
		}
	}

	pub fn set_peer_max_concurrent(&self, max: u32) {
		self.peer_max_concurrent.store(max, Ordering::SeqCst);
	}

	/// Peer sent GOAWAY. Returns `true` if this transitioned the session
	/// (idempotent on a second GOAWAY).
	pub fn on_goaway(&self) -> bool {
		let mut state = self.state.lock();
		if *state == SessionState::Active {
			debug!(target: "netengine::h2session", "session entering DRAINING on GOAWAY");
			*state = SessionState::Draining;
			true
		} else {
			false
		}
	}

	/// Waits for in-flight streams to finish, or `drainDeadline`, whichever
	/// comes first, then marks the session CLOSED.
	pub async fn drain(&self) {
		if *self.state.lock() != SessionState::Draining {
			return;
		}
		if self.open_streams.load(Ordering::SeqCst) > 0 {
			let _ = tokio::time::timeout(self.cfg.drain_deadline, self.drain_complete.notified()).await;
		}
		*self.state.lock() = SessionState::Closed;
	}
}

impl std::fmt::Debug for Http2Session {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Http2Session")
			.field("state", &*self.state.lock())
			.field("open_streams", &self.open_streams.load(Ordering::SeqCst))
			.finish()
	}
}

impl MultiplexedSession for Http2Session {
	fn state(&self) -> SessionState {
		*self.state.lock()
	}

	fn open_stream_count(&self) -> usize {
		self.open_streams.load(Ordering::SeqCst)
	}
}
