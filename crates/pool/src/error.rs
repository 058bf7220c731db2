use net_core::error::ErrorCategory;

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
	#[error("dial failed: {0}")]
	DialFailed(String),

	#[error("session is draining and cannot accept new streams")]
	Draining,

	#[error("session closed")]
	Closed,

	#[error("origin queue is full")]
	QueueFull,

	#[error("circuit breaker open for this origin")]
	CircuitOpen,

	#[error("pool shut down")]
	ShuttingDown,
}

impl PoolError {
	pub fn category(&self) -> ErrorCategory {
		match self {
			PoolError::DialFailed(_) => ErrorCategory::ConnectionReset,
			PoolError::Draining | PoolError::Closed => ErrorCategory::ConnectionReset,
			PoolError::QueueFull | PoolError::CircuitOpen => ErrorCategory::Timeout,
			PoolError::ShuttingDown => ErrorCategory::Canceled,
		}
	}
}
