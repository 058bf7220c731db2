use net_core::error::ErrorCategory;

#[derive(Debug, thiserror::Error)]
pub enum QuicError {
	#[error("path probe failed")]
	ProbeFailed,
	#[error("pre-handshake failure: {0}")]
	PreHandshake(String),
	#[error("session closed")]
	Closed,
	#[error("network changed")]
	NetworkChanged,
}

impl QuicError {
	pub fn category(&self) -> ErrorCategory {
		match self {
			QuicError::ProbeFailed | QuicError::PreHandshake(_) => ErrorCategory::QuicProtocol,
			QuicError::Closed => ErrorCategory::ConnectionReset,
			QuicError::NetworkChanged => ErrorCategory::NetworkChanged,
		}
	}
}
