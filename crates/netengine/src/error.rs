//! Per-subsystem error enums that the façade converts into the closed wire
//! taxonomy (`net_core::error::EngineError`), per spec §6/§7.

use net_core::error::{EngineError, ErrorCategory};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
	#[error("cache directory is already open by another engine: {0}")]
	DirectoryInUse(std::path::PathBuf),
	#[error("cache io error: {0}")]
	Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
	#[error("redirect limit exceeded")]
	TooManyRedirects,
	#[error("request canceled")]
	Canceled,
	#[error(transparent)]
	Dns(#[from] net_dns::DnsError),
	#[error(transparent)]
	Pool(#[from] net_pool::PoolError),
	#[error(transparent)]
	Quic(#[from] net_quic::QuicError),
	#[error("pinned public key mismatch for {0}")]
	PinMismatch(String),
	#[error("timed out waiting for {0}")]
	Timeout(&'static str),
}

/// Stable numeric codes, one per taxonomy member named in spec §6. Codes are
/// ours to assign (closed, internal to this crate); only their stability
/// across a release matters, not their literal values.
mod codes {
	pub const TOO_MANY_REDIRECTS: u32 = 100;
	pub const CANCELED: u32 = 101;
	pub const DNS_NAME_NOT_RESOLVED: u32 = 200;
	pub const DNS_TIMEOUT: u32 = 201;
	pub const DNS_NETWORK_CHANGED: u32 = 202;
	pub const DNS_INTERNAL: u32 = 203;
	pub const POOL: u32 = 300;
	pub const QUIC: u32 = 400;
	pub const PIN_MISMATCH: u32 = 500;
	pub const TIMEOUT: u32 = 600;
}

impl From<RequestError> for EngineError {
	fn from(err: RequestError) -> Self {
		match &err {
			RequestError::TooManyRedirects => EngineError::new(ErrorCategory::Internal, codes::TOO_MANY_REDIRECTS, err.to_string()),
			RequestError::Canceled => EngineError::new(ErrorCategory::Canceled, codes::CANCELED, err.to_string()),
			RequestError::Dns(dns) => {
				let code = match dns {
					net_dns::DnsError::NameNotResolved(_) => codes::DNS_NAME_NOT_RESOLVED,
					net_dns::DnsError::Timeout => codes::DNS_TIMEOUT,
					net_dns::DnsError::NetworkChanged => codes::DNS_NETWORK_CHANGED,
					net_dns::DnsError::Internal(_) => codes::DNS_INTERNAL,
				};
				EngineError::new(dns.category(), code, err.to_string())
			},
			RequestError::Pool(pool) => EngineError::new(pool.category(), codes::POOL, err.to_string()),
			RequestError::Quic(quic) => EngineError::new(quic.category(), codes::QUIC, err.to_string()),
			RequestError::PinMismatch(_) => EngineError::new(ErrorCategory::TlsHandshake, codes::PIN_MISMATCH, err.to_string()),
			RequestError::Timeout(_) => EngineError::new(ErrorCategory::Timeout, codes::TIMEOUT, err.to_string()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn pin_mismatch_maps_to_tls_handshake_category() {
		let err: EngineError = RequestError::PinMismatch("pinned.example".into()).into();
		assert_eq!(err.category, ErrorCategory::TlsHandshake);
	}

	#[test]
	fn dns_name_not_resolved_maps_to_resolution_category() {
		let err: EngineError = RequestError::Dns(net_dns::DnsError::NameNotResolved("x".into())).into();
		assert_eq!(err.category, ErrorCategory::Resolution);
	}
}
