use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, trace};

use crate::error::PoolError;
use crate::origin::SessionKey;
use crate::session::{MultiplexedSession, SessionState};

pub type DialFuture<S> = Pin<Box<dyn Future<Output = Result<Arc<S>, PoolError>> + Send>>;

/// Establishes a fresh multiplexed session for a key. Supplied by whatever
/// crate owns the wire protocol (`net-quic` or the HTTP/2 session in
/// `netengine`); the pool itself never dials a socket.
pub trait Dialer<S: MultiplexedSession>: Send + Sync {
	fn dial(&self, key: &SessionKey) -> DialFuture<S>;
}

impl<S, F> Dialer<S> for F
where
	S: MultiplexedSession,
	F: Fn(&SessionKey) -> DialFuture<S> + Send + Sync,
{
	fn dial(&self, key: &SessionKey) -> DialFuture<S> {
		(self)(key)
	}
}

enum Slot<S> {
	/// Another task is already dialing this key; waiters park on the
	/// `Notify` instead of starting a second concurrent dial, per the
	/// "at-most-one concurrent session-establishment per key" invariant.
	Dialing(Arc<Notify>),
	Ready(Arc<S>),
}

/// Per-key multiplexed session pool, per spec §4.C. Each [`SessionKey`] holds
/// at most one live session; new streams are multiplexed onto it while
/// active, and a fresh session is dialed once it starts draining or closes.
pub struct SessionPool<S: MultiplexedSession, D: Dialer<S>> {
	slots: Mutex<HashMap<SessionKey, Slot<S>>>,
	dialer: D,
}

impl<S: MultiplexedSession, D: Dialer<S>> SessionPool<S, D> {
	pub fn new(dialer: D) -> Self {
		Self {
			slots: Mutex::new(HashMap::new()),
			dialer,
		}
	}

	pub fn len(&self) -> usize {
		self.slots.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.slots.lock().is_empty()
	}

	/// Returns an active session for `key`, dialing one if none exists, is
	/// draining, or has closed. A session in DRAINING state is bypassed: the
	/// pool evicts it and dials a replacement rather than handing out a
	/// session that can no longer accept new streams (invariant I4).
	pub async fn acquire(&self, key: &SessionKey) -> Result<Arc<S>, PoolError> {
		loop {
			let wait_on = {
				let mut slots = self.slots.lock();
				match slots.get(key) {
					Some(Slot::Ready(session)) => match session.state() {
						SessionState::Active => return Ok(session.clone()),
						SessionState::Draining | SessionState::Closed => {
							trace!(target: "net_pool::pool", ?key, "evicting non-active session on acquire");
							slots.remove(key);
							None
						},
					},
					Some(Slot::Dialing(notify)) => Some(notify.clone()),
					None => None,
				}
			};

			if let Some(notify) = wait_on {
				notify.notified().await;
				continue;
			}

			let notify = Arc::new(Notify::new());
			{
				let mut slots = self.slots.lock();
				// Another task may have raced us between the unlock above and
				// here; check once more before claiming the dial.
				if slots.contains_key(key) {
					continue;
				}
				slots.insert(key.clone(), Slot::Dialing(notify.clone()));
			}

			let result = self.dialer.dial(key).await;
			let mut slots = self.slots.lock();
			return match result {
				Ok(session) => {
					debug!(target: "net_pool::pool", ?key, "dialed new session");
					slots.insert(key.clone(), Slot::Ready(session.clone()));
					drop(slots);
					notify.notify_waiters();
					Ok(session)
				},
				Err(err) => {
					slots.remove(key);
					drop(slots);
					notify.notify_waiters();
					Err(err)
				},
			};
		}
	}

	/// Drops a key's slot unconditionally, e.g. on network change when
	/// cross-network session reuse is disallowed.
	pub fn evict(&self, key: &SessionKey) {
		self.slots.lock().remove(key);
	}

	pub fn evict_all(&self) {
		self.slots.lock().clear();
	}
}

impl<S: MultiplexedSession> fmt::Debug for Slot<S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Slot::Dialing(_) => f.write_str("Dialing"),
			Slot::Ready(s) => f.debug_tuple("Ready").field(s).finish(),
		}
	}
}
