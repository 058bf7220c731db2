use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use net_core::time::Clock;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::error::PoolError;
use crate::origin::Origin;

pub type DialFuture<C> = Pin<Box<dyn Future<Output = Result<Arc<C>, PoolError>> + Send>>;

pub trait Dialer1<C>: Send + Sync {
	fn dial(&self, origin: &Origin) -> DialFuture<C>;
}

impl<C, F> Dialer1<C> for F
where
	F: Fn(&Origin) -> DialFuture<C> + Send + Sync,
{
	fn dial(&self, origin: &Origin) -> DialFuture<C> {
		(self)(origin)
	}
}

/// A pooled HTTP/1.1 connection. The pool does not pipeline requests onto
/// these: one request occupies the connection until release, per spec §4.D.
pub trait Http1Connection: Send + Sync + fmt::Debug {
	fn is_usable(&self) -> bool;
}

#[derive(Clone, Debug)]
pub struct Http1PoolConfig {
	pub max_idle_per_origin: usize,
	pub idle_timeout: Duration,
	pub max_queued_acquires: usize,
	pub breaker_threshold: u32,
	pub breaker_base_backoff: Duration,
	pub breaker_max_backoff: Duration,
}

impl Default for Http1PoolConfig {
	fn default() -> Self {
		Self {
			max_idle_per_origin: 6,
			idle_timeout: Duration::from_secs(60),
			max_queued_acquires: 64,
			breaker_threshold: 5,
			breaker_base_backoff: Duration::from_millis(250),
			breaker_max_backoff: Duration::from_secs(30),
		}
	}
}

enum BreakerState {
	Closed { consecutive_failures: u32 },
	Open { retry_at: Instant, backoff: Duration },
}

struct CircuitBreaker {
	state: Mutex<BreakerState>,
}

impl CircuitBreaker {
	fn new() -> Self {
		Self {
			state: Mutex::new(BreakerState::Closed {
				consecutive_failures: 0,
			}),
		}
	}

	/// Returns `false` while the breaker is open and its retry deadline
	/// hasn't passed yet. A single probe is let through once the deadline
	/// elapses (half-open); its outcome decides whether the breaker reopens
	/// with a doubled backoff or resets to closed.
	fn allow_request(&self, clock: &Clock) -> bool {
		let mut state = self.state.lock();
		match &*state {
			BreakerState::Closed { .. } => true,
			BreakerState::Open { retry_at, backoff } => {
				if clock.now() >= *retry_at {
					*state = BreakerState::Open {
						retry_at: clock.now() + *backoff,
						backoff: *backoff,
					};
					true
				} else {
					false
				}
			},
		}
	}

	fn record_success(&self) {
		*self.state.lock() = BreakerState::Closed {
			consecutive_failures: 0,
		};
	}

	fn record_failure(&self, clock: &Clock, cfg: &Http1PoolConfig, origin: &Origin) {
		let mut state = self.state.lock();
		let next_backoff = match &*state {
			BreakerState::Closed { consecutive_failures } => {
				let failures = consecutive_failures + 1;
				if failures < cfg.breaker_threshold {
					*state = BreakerState::Closed {
						consecutive_failures: failures,
					};
					return;
				}
				cfg.breaker_base_backoff
			},
			BreakerState::Open { backoff, .. } => (*backoff * 2).min(cfg.breaker_max_backoff),
		};
		warn!(target: "net_pool::h1", %origin, backoff_ms = next_backoff.as_millis() as u64, "circuit breaker open");
		*state = BreakerState::Open {
			retry_at: clock.now() + next_backoff,
			backoff: next_backoff,
		};
	}
}

struct IdleSlot<C> {
	conn: Arc<C>,
	parked_at: Instant,
}

struct OriginState<C> {
	idle: VecDeque<IdleSlot<C>>,
	queued_acquires: usize,
	breaker: CircuitBreaker,
}

impl<C> OriginState<C> {
	fn new() -> Self {
		Self {
			idle: VecDeque::new(),
			queued_acquires: 0,
			breaker: CircuitBreaker::new(),
		}
	}
}

/// Bounded per-origin pool of HTTP/1.1 connections, per spec §4.D: idle
/// sockets are parked with a keep-alive timer, requests never pipeline, and
/// an origin producing a burst of 5xx responses trips an exponential-backoff
/// circuit breaker that fails new acquires fast instead of queuing them.
pub struct Http1Pool<C: Http1Connection, D: Dialer1<C>> {
	origins: Mutex<HashMap<Origin, OriginState<C>>>,
	dialer: D,
	cfg: Http1PoolConfig,
	clock: Clock,
}

impl<C: Http1Connection, D: Dialer1<C>> Http1Pool<C, D> {
	pub fn new(dialer: D, cfg: Http1PoolConfig, clock: Clock) -> Self {
		Self {
			origins: Mutex::new(HashMap::new()),
			dialer,
			cfg,
			clock,
		}
	}

	pub async fn acquire(&self, origin: &Origin) -> Result<Arc<C>, PoolError> {
		{
			let mut origins = self.origins.lock();
			let state = origins.entry(origin.clone()).or_insert_with(OriginState::new);
			if !state.breaker.allow_request(&self.clock) {
				return Err(PoolError::CircuitOpen);
			}
			while let Some(slot) = state.idle.pop_front() {
				let age = self.clock.now().saturating_duration_since(slot.parked_at);
				if age <= self.cfg.idle_timeout && slot.conn.is_usable() {
					trace!(target: "net_pool::h1", %origin, "reusing idle connection");
					return Ok(slot.conn);
				}
			}
			if state.queued_acquires >= self.cfg.max_queued_acquires {
				return Err(PoolError::QueueFull);
			}
			state.queued_acquires += 1;
		}

		let result = self.dialer.dial(origin).await;

		let mut origins = self.origins.lock();
		let state = origins.entry(origin.clone()).or_insert_with(OriginState::new);
		state.queued_acquires = state.queued_acquires.saturating_sub(1);
		match result {
			Ok(conn) => {
				state.breaker.record_success();
				Ok(conn)
			},
			Err(err) => {
				state.breaker.record_failure(&self.clock, &self.cfg, origin);
				Err(err)
			},
		}
	}

	/// Returns a connection to the idle set if it's still usable and the
	/// origin isn't already at `max_idle_per_origin`; otherwise it is
	/// dropped. No pipelining: a connection is never handed to a second
	/// caller while the first still holds it.
	pub fn release(&self, origin: &Origin, conn: Arc<C>, keep_alive: bool) {
		if !keep_alive || !conn.is_usable() {
			return;
		}
		let mut origins = self.origins.lock();
		let state = origins.entry(origin.clone()).or_insert_with(OriginState::new);
		if state.idle.len() >= self.cfg.max_idle_per_origin {
			debug!(target: "net_pool::h1", %origin, "idle set full, dropping connection");
			return;
		}
		state.idle.push_back(IdleSlot {
			conn,
			parked_at: self.clock.now(),
		});
	}

	/// Feeds an application-level 5xx observation into the circuit breaker,
	/// independent of dial success/failure.
	pub fn note_response_status(&self, origin: &Origin, is_server_error: bool) {
		let mut origins = self.origins.lock();
		let state = origins.entry(origin.clone()).or_insert_with(OriginState::new);
		if is_server_error {
			state.breaker.record_failure(&self.clock, &self.cfg, origin);
		} else {
			state.breaker.record_success();
		}
	}

	/// Drops idle connections past `idle_timeout`. Call periodically from
	/// the executor's maintenance tick; `acquire` also self-sweeps lazily.
	pub fn sweep_idle(&self) {
		let mut origins = self.origins.lock();
		for state in origins.values_mut() {
			state.idle.retain(|slot| {
				self.clock.now().saturating_duration_since(slot.parked_at) <= self.cfg.idle_timeout && slot.conn.is_usable()
			});
		}
	}

	pub fn idle_count(&self, origin: &Origin) -> usize {
		self.origins.lock().get(origin).map(|s| s.idle.len()).unwrap_or(0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::origin::Scheme;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[derive(Debug)]
	struct FakeConn {
		usable: std::sync::atomic::AtomicBool,
	}
	impl Http1Connection for FakeConn {
		fn is_usable(&self) -> bool {
			self.usable.load(Ordering::SeqCst)
		}
	}

	struct AlwaysOk;
	impl Dialer1<FakeConn> for AlwaysOk {
		fn dial(&self, _origin: &Origin) -> DialFuture<FakeConn> {
			Box::pin(async {
				Ok(Arc::new(FakeConn {
					usable: std::sync::atomic::AtomicBool::new(true),
				}))
			})
		}
	}

	struct AlwaysFail {
		calls: AtomicUsize,
	}
	impl Dialer1<FakeConn> for AlwaysFail {
		fn dial(&self, _origin: &Origin) -> DialFuture<FakeConn> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			Box::pin(async { Err(PoolError::DialFailed("refused".into())) })
		}
	}

	fn origin() -> Origin {
		Origin::new(Scheme::Http, "example.com", 80)
	}

	#[tokio::test]
	async fn released_connection_is_reused() {
		let pool = Http1Pool::new(AlwaysOk, Http1PoolConfig::default(), Clock::mock());
		let o = origin();
		let conn = pool.acquire(&o).await.unwrap();
		pool.release(&o, conn.clone(), true);
		assert_eq!(pool.idle_count(&o), 1);
		let reused = pool.acquire(&o).await.unwrap();
		assert!(Arc::ptr_eq(&conn, &reused));
	}

	#[tokio::test]
	async fn not_keep_alive_is_not_parked() {
		let pool = Http1Pool::new(AlwaysOk, Http1PoolConfig::default(), Clock::mock());
		let o = origin();
		let conn = pool.acquire(&o).await.unwrap();
		pool.release(&o, conn, false);
		assert_eq!(pool.idle_count(&o), 0);
	}

	#[tokio::test]
	async fn repeated_dial_failures_trip_circuit_breaker() {
		let cfg = Http1PoolConfig {
			breaker_threshold: 3,
			..Default::default()
		};
		let pool = Http1Pool::new(
			AlwaysFail {
				calls: AtomicUsize::new(0),
			},
			cfg,
			Clock::mock(),
		);
		let o = origin();
		for _ in 0..3 {
			assert!(matches!(pool.acquire(&o).await, Err(PoolError::DialFailed(_))));
		}
		assert!(matches!(pool.acquire(&o).await, Err(PoolError::CircuitOpen)));
	}

	#[tokio::test]
	async fn breaker_half_opens_after_backoff_elapses() {
		let cfg = Http1PoolConfig {
			breaker_threshold: 1,
			breaker_base_backoff: Duration::from_secs(1),
			..Default::default()
		};
		let clock = Clock::mock();
		let pool = Http1Pool::new(AlwaysOk, cfg, clock.clone());
		let o = origin();
		pool.note_response_status(&o, true);
		assert!(matches!(pool.acquire(&o).await, Err(PoolError::CircuitOpen)));
		clock.advance(Duration::from_secs(2));
		assert!(pool.acquire(&o).await.is_ok());
	}
}
