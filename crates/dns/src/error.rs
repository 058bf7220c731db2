use net_core::error::ErrorCategory;

#[derive(thiserror::Error, Debug, Clone)]
pub enum DnsError {
	#[error("name not resolved: {0}")]
	NameNotResolved(String),
	#[error("resolution timed out")]
	Timeout,
	#[error("the default network changed mid-resolution")]
	NetworkChanged,
	#[error("internal resolver error: {0}")]
	Internal(String),
}

impl DnsError {
	pub fn category(&self) -> ErrorCategory {
		match self {
			DnsError::NameNotResolved(_) => ErrorCategory::Resolution,
			DnsError::Timeout => ErrorCategory::Timeout,
			DnsError::NetworkChanged => ErrorCategory::NetworkChanged,
			DnsError::Internal(_) => ErrorCategory::Internal,
		}
	}
}
