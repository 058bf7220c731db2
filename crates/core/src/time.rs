//! Time source indirection. Production code calls [`Clock::Real`]; tests use
//! [`Clock::Mock`] to deterministically exercise TTL expiry, stale-DNS
//! windows, and migration timers without sleeping.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Clone)]
pub enum Clock {
	Real,
	Mock(Arc<MockClock>),
}

impl std::fmt::Debug for Clock {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Clock::Real => write!(f, "Clock::Real"),
			Clock::Mock(_) => write!(f, "Clock::Mock"),
		}
	}
}

impl Default for Clock {
	fn default() -> Self {
		Clock::Real
	}
}

impl Clock {
	pub fn now(&self) -> Instant {
		match self {
			Clock::Real => Instant::now(),
			Clock::Mock(m) => m.now(),
		}
	}

	pub fn mock() -> Self {
		Clock::Mock(Arc::new(MockClock::new()))
	}

	/// Advances a mock clock; a no-op on `Clock::Real`.
	pub fn advance(&self, by: Duration) {
		if let Clock::Mock(m) = self {
			m.advance(by);
		}
	}
}

pub struct MockClock {
	epoch: Instant,
	offset_millis: AtomicU64,
}

impl MockClock {
	fn new() -> Self {
		Self {
			epoch: Instant::now(),
			offset_millis: AtomicU64::new(0),
		}
	}

	fn now(&self) -> Instant {
		self.epoch + Duration::from_millis(self.offset_millis.load(Ordering::SeqCst))
	}

	fn advance(&self, by: Duration) {
		self.offset_millis.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
	}
}
