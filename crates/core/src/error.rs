use std::fmt;

/// The closed set of stable, wire-visible failure categories from the error
/// taxonomy (spec §6/§7). Every subsystem-local error type (`DnsError`,
/// `PoolError`, `QuicError`, ...) converts into one of these via `From`; the
/// façade never invents a new category at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
	Resolution,
	ConnectionReset,
	TlsHandshake,
	Http2Protocol,
	QuicProtocol,
	Timeout,
	NetworkChanged,
	Canceled,
	Internal,
}

impl fmt::Display for ErrorCategory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			ErrorCategory::Resolution => "resolution",
			ErrorCategory::ConnectionReset => "connection-reset",
			ErrorCategory::TlsHandshake => "tls-handshake",
			ErrorCategory::Http2Protocol => "http2-protocol",
			ErrorCategory::QuicProtocol => "quic-protocol",
			ErrorCategory::Timeout => "timeout",
			ErrorCategory::NetworkChanged => "network-changed",
			ErrorCategory::Canceled => "canceled",
			ErrorCategory::Internal => "internal",
		};
		f.write_str(s)
	}
}

/// A stable numeric code plus an optional underlying-protocol code, carried
/// on every terminal failure delivered to a user callback (spec §7).
#[derive(Debug, Clone)]
pub struct EngineError {
	pub category: ErrorCategory,
	pub code: u32,
	pub protocol_code: Option<i64>,
	pub message: String,
}

impl EngineError {
	pub fn new(category: ErrorCategory, code: u32, message: impl Into<String>) -> Self {
		Self {
			category,
			code,
			protocol_code: None,
			message: message.into(),
		}
	}

	pub fn with_protocol_code(mut self, code: i64) -> Self {
		self.protocol_code = Some(code);
		self
	}
}

impl fmt::Display for EngineError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} (code {}): {}", self.category, self.code, self.message)
	}
}

impl std::error::Error for EngineError {}

/// Retry disposition for an error raised inside the network task (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
	/// Retry transparently on a fresh stream/session; never surfaced.
	RetryTransparent,
	/// Retry once on an alternate network, gated by a policy flag.
	RetryPolicy,
	/// Surface via `onFailed`.
	FatalToStream,
	/// Tear down the owning session; pool purges it.
	FatalToSession,
	/// Log and continue serving other requests.
	FatalToEngine,
}
