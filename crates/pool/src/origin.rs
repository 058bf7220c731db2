use std::fmt;

use net_core::binding::Binding;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scheme {
	Http,
	Https,
}

/// (scheme, host, port). Host equality is case-insensitive, per spec §3.
#[derive(Clone, Debug)]
pub struct Origin {
	pub scheme: Scheme,
	host: String,
	host_lower: String,
	pub port: u16,
}

impl Origin {
	pub fn new(scheme: Scheme, host: impl Into<String>, port: u16) -> Self {
		let host = host.into();
		let host_lower = host.to_ascii_lowercase();
		Self {
			scheme,
			host,
			host_lower,
			port,
		}
	}

	pub fn host(&self) -> &str {
		&self.host
	}
}

impl fmt::Display for Origin {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let scheme = match self.scheme {
			Scheme::Http => "http",
			Scheme::Https => "https",
		};
		write!(f, "{scheme}://{}:{}", self.host, self.port)
	}
}

impl PartialEq for Origin {
	fn eq(&self, other: &Self) -> bool {
		self.scheme == other.scheme && self.port == other.port && self.host_lower == other.host_lower
	}
}
impl Eq for Origin {}

impl std::hash::Hash for Origin {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.scheme.hash(state);
		self.port.hash(state);
		self.host_lower.hash(state);
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrivacyMode {
	Enabled,
	Disabled,
}

/// Uniquely identifies a session bucket in the pool, per spec §3.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionKey {
	pub origin: Origin,
	pub binding: Binding,
	pub privacy_mode: PrivacyMode,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn origin_equality_is_case_insensitive_on_host() {
		let a = Origin::new(Scheme::Https, "Example.com", 443);
		let b = Origin::new(Scheme::Https, "example.COM", 443);
		assert_eq!(a, b);
	}

	#[test]
	fn origin_equality_considers_port_and_scheme() {
		let a = Origin::new(Scheme::Https, "example.com", 443);
		let b = Origin::new(Scheme::Https, "example.com", 8443);
		let c = Origin::new(Scheme::Http, "example.com", 443);
		assert_ne!(a, b);
		assert_ne!(a, c);
	}
}
