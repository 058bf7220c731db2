//! Response and redirect info snapshots handed to a [`crate::callback::RequestCallback`].
//! Cross-thread-safe by construction (plain owned data), matching spec §5's
//! "read-only handles may be delivered cross-thread" note.

#[derive(Clone, Debug, Default)]
pub struct UrlResponseInfo {
	pub url: String,
	pub status: u16,
	pub headers: Vec<(String, String)>,
	/// ALPN/transport the response actually came back on, e.g. `"h2"`,
	/// `"h3"`, `"http/1.1"`.
	pub negotiated_protocol: Option<String>,
	pub was_cached: bool,
	pub received_byte_count: u64,
}

#[derive(Clone, Debug)]
pub struct RedirectInfo {
	pub new_location: String,
	pub status: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedirectDecision {
	Follow,
	Drop,
}
