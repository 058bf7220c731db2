use http::{HeaderMap, Method};

/// Identifies a request for HTTP cache purposes: method + normalized URL +
/// the request headers relevant to any `Vary` the cached response names.
/// Two requests with the same `Fingerprint` may share a `CacheEntry`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint {
	method: String,
	normalized_url: String,
	vary_headers: Vec<(String, String)>,
}

impl Fingerprint {
	pub fn new(method: &Method, url: &url::Url, vary_relevant: &HeaderMap) -> Self {
		let mut vary_headers: Vec<(String, String)> = vary_relevant
			.iter()
			.map(|(name, value)| (name.as_str().to_ascii_lowercase(), value.to_str().unwrap_or("").to_string()))
			.collect();
		vary_headers.sort();
		Self {
			method: method.as_str().to_string(),
			normalized_url: normalize(url),
			vary_headers,
		}
	}
}

fn normalize(url: &url::Url) -> String {
	let mut u = url.clone();
	u.set_fragment(None);
	u.to_string()
}
