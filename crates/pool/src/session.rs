use std::fmt;

/// Lifecycle of one multiplexed session (HTTP/2 or QUIC) inside the pool.
/// The pool only reasons about these three states; everything about frames,
/// streams, and wire protocol belongs to the session implementation itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
	/// Accepting new streams.
	Active,
	/// Received GOAWAY (or local-initiated graceful close); existing streams
	/// finish, no new streams are handed out. Acquire bypasses a draining
	/// session and dials a fresh one instead, per invariant I4.
	Draining,
	/// No longer usable; pool removes it from the key's slot.
	Closed,
}

/// What a session implementation must expose to be managed by [`crate::pool::SessionPool`].
/// Implemented by the HTTP/2 and QUIC session types in the `netengine` and
/// `net-quic` crates; the pool itself never touches `h2` or `quinn` directly.
pub trait MultiplexedSession: Send + Sync + fmt::Debug {
	fn state(&self) -> SessionState;
	fn open_stream_count(&self) -> usize;
}

#[cfg(test)]
pub(crate) mod test_support {
	use super::*;
	use parking_lot::Mutex;

	#[derive(Debug)]
	pub struct FakeSession {
		pub state: Mutex<SessionState>,
		pub streams: Mutex<usize>,
	}

	impl FakeSession {
		pub fn new() -> Self {
			Self {
				state: Mutex::new(SessionState::Active),
				streams: Mutex::new(0),
			}
		}

		pub fn set_state(&self, s: SessionState) {
			*self.state.lock() = s;
		}
	}

	impl MultiplexedSession for FakeSession {
		fn state(&self) -> SessionState {
			*self.state.lock()
		}
		fn open_stream_count(&self) -> usize {
			*self.streams.lock()
		}
	}
}
