//! Shared harness for the crate-level integration tests: a scriptable
//! [`Connector`] that answers `exchange` calls from a fixed queue, so a test
//! can drive the engine through DNS resolution, connection acquisition, and
//! the request state machine without a real socket.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use net_pool::h1::Http1Connection;
use net_pool::origin::{Origin, SessionKey};
use netengine::engine::{AnySession, BoxFuture, ConnectionHandle, Connector, DynHttp1Connection, ExchangeResult, OutboundRequest};
use netengine::RequestError;
use parking_lot::Mutex;

#[derive(Debug)]
struct ScriptedConn;

impl Http1Connection for ScriptedConn {
	fn is_usable(&self) -> bool {
		true
	}
}

/// One scripted HTTP exchange.
pub struct ScriptedResponse {
	pub status: u16,
	pub headers: Vec<(http::HeaderName, http::HeaderValue)>,
	pub body: Bytes,
	pub delay: Duration,
}

impl ScriptedResponse {
	pub fn ok(body: &'static str) -> Self {
		Self {
			status: 200,
			headers: Vec::new(),
			body: Bytes::from_static(body.as_bytes()),
			delay: Duration::ZERO,
		}
	}

	pub fn redirect_to(location: &str) -> Self {
		Self {
			status: 302,
			headers: vec![(http::header::LOCATION, http::HeaderValue::from_str(location).unwrap())],
			body: Bytes::new(),
			delay: Duration::ZERO,
		}
	}
}

/// A [`Connector`] whose responses are scripted in advance, consumed one per
/// `exchange` call in order. `dial_delay` lets a test land a cancellation in
/// the window before `dial_http1` resolves; `chain_spki` lets pin-mismatch
/// scenarios report a certificate chain without a real TLS handshake.
pub struct TestConnector {
	responses: Mutex<VecDeque<ScriptedResponse>>,
	dial_delay: Duration,
	pub chain_spki: Vec<[u8; 32]>,
	sent_headers: Arc<Mutex<Vec<http::HeaderMap>>>,
}

impl TestConnector {
	pub fn new(responses: Vec<ScriptedResponse>) -> Self {
		Self {
			responses: Mutex::new(responses.into()),
			dial_delay: Duration::ZERO,
			chain_spki: Vec::new(),
			sent_headers: Arc::new(Mutex::new(Vec::new())),
		}
	}

	/// A handle onto the headers of every `exchange` call, cloneable before
	/// the connector itself is moved into `Engine::build`.
	pub fn sent_headers_handle(&self) -> Arc<Mutex<Vec<http::HeaderMap>>> {
		self.sent_headers.clone()
	}

	pub fn with_dial_delay(mut self, delay: Duration) -> Self {
		self.dial_delay = delay;
		self
	}

	pub fn with_chain_spki(mut self, chain_spki: Vec<[u8; 32]>) -> Self {
		self.chain_spki = chain_spki;
		self
	}
}

impl Connector for TestConnector {
	fn dial_http1(&self, _origin: &Origin) -> net_pool::h1::DialFuture<DynHttp1Connection> {
		let delay = self.dial_delay;
		Box::pin(async move {
			if !delay.is_zero() {
				tokio::time::sleep(delay).await;
			}
			Ok(Arc::new(ScriptedConn) as Arc<DynHttp1Connection>)
		})
	}

	fn dial_session(&self, _key: &SessionKey, _prefer_http3: bool) -> net_pool::pool::DialFuture<AnySession> {
		Box::pin(async { Err(net_pool::PoolError::DialFailed("no multiplexed transport in this harness".into())) })
	}

	fn exchange(&self, _on: ConnectionHandle, req: OutboundRequest) -> BoxFuture<'static, Result<ExchangeResult, RequestError>> {
		self.sent_headers.lock().push(req.headers);
		let next = self.responses.lock().pop_front();
		let chain_spki = self.chain_spki.clone();
		Box::pin(async move {
			let scripted =
				next.ok_or_else(|| RequestError::Pool(net_pool::PoolError::DialFailed("harness ran out of scripted responses".into())))?;
			if !scripted.delay.is_zero() {
				tokio::time::sleep(scripted.delay).await;
			}
			let mut headers = http::HeaderMap::new();
			for (name, value) in scripted.headers {
				headers.insert(name, value);
			}
			Ok(ExchangeResult {
				status: scripted.status,
				headers,
				body: scripted.body,
				negotiated_protocol: "http/1.1",
				chain_spki_sha256: chain_spki,
				chain_anchored_to_local_trust_anchor: false,
			})
		})
	}
}

/// HTTP/1.1-only config: these tests exercise the request state machine and
/// cache, not the multiplexed-session pool.
pub fn test_config() -> netengine::Config {
	let mut cfg = netengine::Config::default();
	cfg.transport.enable_http2 = false;
	cfg.transport.enable_quic = false;
	cfg
}
