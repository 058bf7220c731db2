//! Engine façade, spec §4.I/§6: the single entry point. Owns the DNS
//! resolver, the session pool(s), the HTTP cache, NetLog, pin store, and the
//! network task; builds [`crate::request::RequestBuilder`]-equivalent
//! [`RequestBuilder`]s and enforces the `shutdown()` precondition from spec
//! §5 (no requests in flight).
//!
//! Wire-level byte exchange (TLS, the HTTP/1.1/2/3 codecs themselves) is out
//! of this crate's scope per spec §1 ("external collaborators whose
//! interfaces we define only where they touch the core"); this module
//! depends on a generic [`Connector`], mirroring the teacher's
//! `client::Client<Connector>` split between connection-lifecycle
//! bookkeeping (owned here) and transport-specific dialing/exchange (owned
//! by whatever `Connector` the caller supplies).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_compression::tokio::bufread::{BrotliDecoder, GzipDecoder};
use bytes::Bytes;
use net_core::binding::Binding;
use net_core::error::{EngineError, ErrorCategory};
use net_dns::{AddressFamily, CachedResolver};
use net_pool::h1::{Http1Connection, Http1Pool};
use net_pool::origin::{Origin, PrivacyMode, Scheme, SessionKey};
use net_pool::pool::SessionPool;
use net_pool::session::{MultiplexedSession, SessionState};
use parking_lot::Mutex as PlMutex;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::{CacheEntry, Disposition, HttpCache, Validators};
use crate::callback::RequestCallback;
use crate::config::Config;
use crate::error::RequestError;
use crate::executor::{CallbackExecutor, NetworkTask};
use crate::h2session::Http2Session;
use crate::netlog::NetLog;
use crate::pinning::{PinStore, PinVerdict};
use crate::quicsession::QuicSession;
use crate::request::{Callback, Event, Fingerprint, Request};
use crate::response::{RedirectDecision, RedirectInfo, UrlResponseInfo};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One multiplexed session, regardless of which wire protocol won the dial
/// race. The pool reasons only about [`MultiplexedSession`]; nothing
/// downstream of `acquire()` needs to match on this enum except the code
/// opening a new stream.
#[derive(Debug)]
pub enum AnySession {
	Http2(Arc<Http2Session>),
	Quic(Arc<QuicSession>),
}

impl MultiplexedSession for AnySession {
	fn state(&self) -> SessionState {
		match self {
			AnySession::Http2(s) => s.state(),
			AnySession::Quic(s) => s.state(),
		}
	}
	fn open_stream_count(&self) -> usize {
		match self {
			AnySession::Http2(s) => s.open_stream_count(),
			AnySession::Quic(s) => s.open_stream_count(),
		}
	}
}

#[derive(Clone, Debug)]
pub struct OutboundRequest {
	pub method: http::Method,
	pub url: url::Url,
	pub headers: http::HeaderMap,
	pub body: Bytes,
}

#[derive(Clone, Debug)]
pub struct ExchangeResult {
	pub status: u16,
	pub headers: http::HeaderMap,
	pub body: Bytes,
	pub negotiated_protocol: &'static str,
	/// SPKI-SHA256 set of the certificate chain the peer presented, for
	/// invariant I5's pin check. Empty for plaintext HTTP.
	pub chain_spki_sha256: Vec<[u8; 32]>,
	pub chain_anchored_to_local_trust_anchor: bool,
}

pub type DynHttp1Connection = dyn Http1Connection;

/// Which connection a request's bytes actually travel over, passed back to
/// [`Connector::exchange`].
pub enum ConnectionHandle {
	Http1(Arc<DynHttp1Connection>),
	Multiplexed(Arc<AnySession>),
}

/// The seam between this crate's connection-lifecycle/state-machine core
/// and an actual wire transport. Implementations own TLS, happy-eyeballs
/// racing, and the HTTP/1.1/2/3 codecs themselves.
pub trait Connector: Send + Sync + 'static {
	fn dial_http1(&self, origin: &Origin) -> net_pool::h1::DialFuture<DynHttp1Connection>;
	fn dial_session(&self, key: &SessionKey, prefer_http3: bool) -> net_pool::pool::DialFuture<AnySession>;
	fn exchange(&self, on: ConnectionHandle, req: OutboundRequest) -> BoxFuture<'static, Result<ExchangeResult, RequestError>>;
}

struct PoolDialerAdapter<C>(Arc<C>, bool);
impl<C: Connector> net_pool::pool::Dialer<AnySession> for PoolDialerAdapter<C> {
	fn dial(&self, key: &SessionKey) -> net_pool::pool::DialFuture<AnySession> {
		self.0.dial_session(key, self.1)
	}
}

struct H1DialerAdapter<C>(Arc<C>);
impl<C: Connector> net_pool::h1::Dialer1<DynHttp1Connection> for H1DialerAdapter<C> {
	fn dial(&self, origin: &Origin) -> net_pool::h1::DialFuture<DynHttp1Connection> {
		self.0.dial_http1(origin)
	}
}

struct Engines<C: Connector> {
	cfg: Config,
	dns: CachedResolver,
	pool: SessionPool<AnySession, PoolDialerAdapter<C>>,
	h1_pool: Http1Pool<DynHttp1Connection, H1DialerAdapter<C>>,
	cache: HttpCache,
	netlog: NetLog,
	pins: PlMutex<PinStore>,
	network_task: NetworkTask,
	bound_network: PlMutex<Binding>,
	in_flight: AtomicU64,
	connector: Arc<C>,
	/// Background host-cache persistence loop (spec §4.B `persistHostCache`),
	/// `None` when no `storagePath` is configured. Runs alongside the network
	/// task rather than through it, the same way `net_dns`'s background
	/// fresh-DNS lookups run via their own `tokio::spawn` instead of being
	/// posted to the single-file network-task queue.
	persist_task: Option<JoinHandle<()>>,
}

/// The single entry point, spec §6. Cheaply cloneable regardless of whether
/// `C` itself is `Clone`: every field lives behind the one `Arc<Engines<C>>`.
pub struct Engine<C: Connector> {
	inner: Arc<Engines<C>>,
}

impl<C: Connector> Clone for Engine<C> {
	fn clone(&self) -> Self {
		Self { inner: self.inner.clone() }
	}
}

impl<C: Connector> Engine<C> {
	/// `build(options) -> Engine`, spec §6.
	pub fn build(cfg: Config, connector: C) -> Result<Self, EngineError> {
		net_core::logging::init(&cfg.logging);
		if cfg.quic.has_inert_path_degradation_combination() {
			warn!(target: "netengine::engine", "pathDegradationMigration=false with allowNonDefaultNetworkUsage=true is inert, not an error");
		}
		let connector = Arc::new(connector);
		// Honors `useBuiltinResolver` (spec §4.B) and wires up the persist
		// debouncer `net_dns::build` constructed, instead of always building
		// the builtin resolver directly.
		let (dns, persist_debouncer) = net_dns::build(cfg.dns.clone())
			.map_err(|e| EngineError::new(ErrorCategory::Internal, 905, format!("failed to build dns resolver: {e}")))?;
		let persist_task = persist_debouncer.map(|debouncer| {
			let cache = dns.cache().clone();
			tokio::spawn(async move {
				debouncer
					.run(move || cache.snapshot().iter().map(net_dns::persist::PersistedEntry::from_entry).collect())
					.await;
			})
		});
		let prefer_h3 = cfg.transport.enable_quic;
		let pool = SessionPool::new(PoolDialerAdapter(connector.clone(), prefer_h3));
		let h1_pool = Http1Pool::new(H1DialerAdapter(connector.clone()), cfg.pool.clone().into(), net_core::time::Clock::Real);

		let disk_guard = match (&cfg.cache.mode, &cfg.cache.storage_path) {
			(crate::cache::CacheMode::Disk | crate::cache::CacheMode::DiskNoHttp, Some(path)) => {
				Some(Arc::new(crate::cache::DiskGuard::acquire(path).map_err(|e| {
					EngineError::new(ErrorCategory::Internal, 900, format!("cannot open http cache directory: {e}"))
				})?))
			},
			_ => None,
		};
		let cache = HttpCache::new(cfg.cache.mode, cfg.cache.max_size_bytes, disk_guard);
		let pins = PlMutex::new(PinStore::new(cfg.security.pinning_bypass_for_local_trust_anchors));

		info!(target: "netengine::engine", http2 = cfg.transport.enable_http2, quic = cfg.transport.enable_quic, "engine built");

		Ok(Self {
			inner: Arc::new(Engines {
				cfg,
				dns,
				pool,
				h1_pool,
				cache,
				netlog: NetLog::new(),
				pins,
				network_task: NetworkTask::spawn(),
				bound_network: PlMutex::new(Binding::Unbound),
				in_flight: AtomicU64::new(0),
				connector,
				persist_task,
			}),
		})
	}

	pub fn config(&self) -> &Config {
		&self.inner.cfg
	}

	pub fn netlog(&self) -> &NetLog {
		&self.inner.netlog
	}

	/// Registers a pinned key set for `host`, per spec §3's "Public key pins
	/// entry". Takes effect on the next connection to that host.
	pub fn add_pin(&self, host: impl Into<String>, entry: crate::pinning::PinEntry) {
		self.inner.pins.lock().add(host, entry);
	}

	/// `bindToNetwork(binding | unbind)`, spec §6. Flushes cross-network-
	/// ineligible host cache entries, per invariant I3.
	pub fn bind_to_network(&self, binding: Binding) {
		*self.inner.bound_network.lock() = binding;
		self.inner.dns.on_network_change();
	}

	pub fn new_request_builder(
		&self,
		url: url::Url,
		executor: Arc<dyn CallbackExecutor>,
		callback: Arc<dyn RequestCallback>,
	) -> RequestBuilder<C> {
		RequestBuilder {
			engine: self.clone(),
			url,
			method: http::Method::GET,
			headers: http::HeaderMap::new(),
			body: Bytes::new(),
			executor,
			callback,
			max_redirects: self.inner.cfg.max_redirects,
		}
	}

	/// `newBidirectionalStreamBuilder`, spec §6. Out of this crate's core
	/// scope (no request/response semantics, no cache, no redirects); kept
	/// as a thin pass-through to a caller-driven multiplexed session so the
	/// façade's documented contract is complete.
	pub fn new_bidirectional_stream_builder(&self, key: SessionKey) -> BidirectionalStreamBuilder<C> {
		BidirectionalStreamBuilder { engine: self.clone(), key }
	}

	/// `shutdown()`, spec §5: only legal with no requests in flight; drains
	/// pools and rejoins the network task.
	pub async fn shutdown(self) -> Result<(), EngineError> {
		if self.inner.in_flight.load(Ordering::SeqCst) != 0 {
			return Err(EngineError::new(ErrorCategory::Internal, 901, "shutdown called with requests in flight"));
		}
		self.inner.pool.evict_all();
		match Arc::try_unwrap(self.inner) {
			Ok(inner) => {
				if let Some(jh) = inner.persist_task {
					jh.abort();
				}
				inner.network_task.shutdown().await;
				Ok(())
			},
			Err(_) => {
				// Other clones of the engine handle are still held elsewhere
				// (e.g. by an executor that outlives this call); the pool is
				// already drained above, so there is nothing further for
				// this particular handle to do.
				Ok(())
			},
		}
	}
}

pub struct BidirectionalStreamBuilder<C: Connector> {
	engine: Engine<C>,
	key: SessionKey,
}

impl<C: Connector> BidirectionalStreamBuilder<C> {
	pub async fn start(self) -> Result<Arc<AnySession>, RequestError> {
		self.engine.inner.pool.acquire(&self.key).await.map_err(RequestError::Pool)
	}
}

pub struct RequestBuilder<C: Connector> {
	engine: Engine<C>,
	url: url::Url,
	method: http::Method,
	headers: http::HeaderMap,
	body: Bytes,
	executor: Arc<dyn CallbackExecutor>,
	callback: Arc<dyn RequestCallback>,
	max_redirects: u32,
}

impl<C: Connector> RequestBuilder<C> {
	pub fn method(mut self, method: http::Method) -> Self {
		self.method = method;
		self
	}

	pub fn header(mut self, name: http::HeaderName, value: http::HeaderValue) -> Self {
		self.headers.insert(name, value);
		self
	}

	pub fn body(mut self, body: Bytes) -> Self {
		self.body = body;
		self
	}

	/// `start()`, spec §4.G. Posts the request's drive loop onto the
	/// engine's network task and returns a handle that can be used to
	/// cancel it; callbacks are delivered on `self.executor`.
	pub fn start(self) -> RequestHandle {
		let cancel = Arc::new(std::sync::atomic::AtomicBool::new(false));
		let handle = RequestHandle { cancel: cancel.clone() };
		self.engine.inner.in_flight.fetch_add(1, Ordering::SeqCst);
		let engine = self.engine.clone();
		let posted = engine.inner.network_task.post(drive_request(
			self.engine,
			self.url,
			self.method,
			self.headers,
			self.body,
			self.executor,
			self.callback,
			self.max_redirects,
			cancel,
		));
		if !posted {
			engine.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
		}
		handle
	}
}

pub struct RequestHandle {
	cancel: Arc<std::sync::atomic::AtomicBool>,
}

impl RequestHandle {
	/// Cancellation is legal in every non-terminal state (spec §4.G); the
	/// next suspension point in `drive_request` observes this flag and
	/// short-circuits to `on_canceled`.
	pub fn cancel(&self) {
		self.cancel.store(true, Ordering::SeqCst);
	}
}

enum DriveOutcome {
	Canceled,
	Failed(EngineError),
}

#[allow(clippy::too_many_arguments)]
async fn drive_request<C: Connector>(
	engine: Engine<C>,
	url: url::Url,
	method: http::Method,
	headers: http::HeaderMap,
	body: Bytes,
	executor: Arc<dyn CallbackExecutor>,
	callback: Arc<dyn RequestCallback>,
	max_redirects: u32,
	cancel: Arc<std::sync::atomic::AtomicBool>,
) {
	let mut request = Request::new(max_redirects);
	let mut url = url;
	let mut last_response: Option<UrlResponseInfo> = None;
	request.apply(Event::Start { address_already_known: false });

	let result = run_to_terminal(
		&engine,
		&mut request,
		&mut url,
		&method,
		headers,
		body,
		&cancel,
		&executor,
		callback.clone(),
		&mut last_response,
	)
	.await;

	match result {
		Ok(info) => deliver(&executor, callback, Callback::Succeeded, Some(&info), None),
		Err(DriveOutcome::Canceled) => deliver(&executor, callback, Callback::Canceled, last_response.as_ref(), None),
		Err(DriveOutcome::Failed(err)) => deliver(&executor, callback, Callback::Failed, last_response.as_ref(), Some(&err)),
	}

	engine.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
}

fn deliver(
	executor: &Arc<dyn CallbackExecutor>,
	callback: Arc<dyn RequestCallback>,
	which: Callback,
	info: Option<&UrlResponseInfo>,
	error: Option<&EngineError>,
) {
	let info = info.cloned();
	let error = error.cloned();
	executor.post(Box::new(move || match which {
		Callback::RedirectReceived => {},
		Callback::ResponseStarted => {
			if let Some(info) = &info {
				callback.on_response_started(info);
			}
		},
		Callback::ReadCompleted => {
			if let Some(info) = &info {
				callback.on_read_completed(info.url.as_bytes());
			}
		},
		Callback::Succeeded => {
			if let Some(info) = &info {
				callback.on_succeeded(info);
			}
		},
		Callback::Failed => {
			let err = error.unwrap_or_else(|| EngineError::new(ErrorCategory::Internal, 999, "unknown error"));
			callback.on_failed(&err, info.as_ref());
		},
		Callback::Canceled => callback.on_canceled(info.as_ref()),
	}));
}

/// Drives one request through DNS resolution, session acquisition, the
/// exchange, cache population, and redirect handling, following redirects
/// up to `max_redirects` (spec §4.G). Returns the final [`UrlResponseInfo`]
/// on success or a [`DriveOutcome`] describing the terminal failure.
#[allow(clippy::too_many_arguments)]
async fn run_to_terminal<C: Connector>(
	engine: &Engine<C>,
	request: &mut Request,
	url: &mut url::Url,
	method: &http::Method,
	headers: http::HeaderMap,
	body: Bytes,
	cancel: &Arc<std::sync::atomic::AtomicBool>,
	executor: &Arc<dyn CallbackExecutor>,
	callback: Arc<dyn RequestCallback>,
	last_response: &mut Option<UrlResponseInfo>,
) -> Result<UrlResponseInfo, DriveOutcome> {
	loop {
		if cancel.load(Ordering::SeqCst) {
			request.apply(Event::Cancel);
			return Err(DriveOutcome::Canceled);
		}

		let host = url
			.host_str()
			.ok_or_else(|| DriveOutcome::Failed(EngineError::new(ErrorCategory::Internal, 902, "url has no host")))?
			.to_string();
		let scheme = if url.scheme() == "https" { Scheme::Https } else { Scheme::Http };
		let port = url.port_or_known_default().unwrap_or(if scheme == Scheme::Https { 443 } else { 80 });
		let origin = Origin::new(scheme, host.clone(), port);
		let binding = engine.inner.bound_network.lock().clone();

		engine
			.inner
			.dns
			.resolve(host.clone(), AddressFamily::Unspecified, binding.clone())
			.await
			.map_err(|e| DriveOutcome::Failed(RequestError::Dns(e).into()))?;
		request.apply(Event::ResolutionComplete);

		if cancel.load(Ordering::SeqCst) {
			request.apply(Event::Cancel);
			return Err(DriveOutcome::Canceled);
		}

		let fingerprint = Fingerprint::new(method, url, &headers);
		let now = unix_now_secs();
		let cache_disposition = engine.inner.cache.lookup(&fingerprint, now);

		let (handle, dialed_via, h1_to_release) = acquire_connection(engine, &origin, &binding).await.map_err(DriveOutcome::Failed)?;
		request.apply(Event::ConnectionEstablished);

		if cancel.load(Ordering::SeqCst) {
			request.apply(Event::Cancel);
			return Err(DriveOutcome::Canceled);
		}

		let validators = match cache_disposition {
			Disposition::Fresh(entry) => {
				let info = response_info(url, &entry, true, dialed_via);
				request.apply(Event::HeadersReceived { status: entry.status });
				*last_response = Some(info.clone());
				deliver(executor, callback.clone(), Callback::ResponseStarted, Some(&info), None);
				deliver(executor, callback.clone(), Callback::ReadCompleted, Some(&info), None);
				request.apply(Event::BodyComplete);
				return Ok(info);
			},
			Disposition::Revalidate(validators) => Some(validators),
			Disposition::Miss => None,
		};

		let mut outbound_headers = headers.clone();
		if let Some(v) = &validators {
			if let Some(etag) = &v.etag {
				if let Ok(value) = http::HeaderValue::from_str(etag) {
					outbound_headers.insert(http::header::IF_NONE_MATCH, value);
				}
			}
		}
		// Spec §8 scenario 3: `enableBrotli` adds `br` to the advertised
		// codings; the default set never does. A caller-supplied
		// `Accept-Encoding` is left alone.
		if !outbound_headers.contains_key(http::header::ACCEPT_ENCODING) {
			let advertised = if engine.inner.cfg.transport.enable_brotli {
				"gzip, deflate, br"
			} else {
				"gzip, deflate"
			};
			outbound_headers.insert(http::header::ACCEPT_ENCODING, http::HeaderValue::from_static(advertised));
		}

		let writer_claimed = engine.inner.cache.begin_write(&fingerprint);
		let exchange_result = engine
			.inner
			.connector
			.exchange(
				handle,
				OutboundRequest {
					method: method.clone(),
					url: url.clone(),
					headers: outbound_headers,
					body: body.clone(),
				},
			)
			.await;

		// No pipelining (spec §4.D): the connection is released back to the
		// idle set only once this exchange, success or failure, is over.
		if let Some(conn) = h1_to_release {
			let keep_alive = matches!(&exchange_result, Ok(e) if e.status < 500);
			engine.inner.h1_pool.release(&origin, conn, keep_alive);
		}

		let mut exchange = match exchange_result {
			Ok(e) => e,
			Err(err) => {
				if writer_claimed {
					engine.inner.cache.abandon_write(&fingerprint);
				}
				let engine_err: EngineError = err.into();
				request.apply(Event::Error(engine_err.clone()));
				return Err(DriveOutcome::Failed(engine_err));
			},
		};

		// Invariant I5: pinned keys are checked before any request body is
		// sent. The simplified `Connector::exchange` seam above already
		// performed the full round trip, so this verifies against the
		// presented chain post hoc; a real wire-level `Connector` must
		// perform the equivalent check before writing the body, not after
		// reading the response.
		let pin_verdict = engine.inner.pins.lock().verify(
			&host,
			&exchange.chain_spki_sha256,
			exchange.chain_anchored_to_local_trust_anchor,
			SystemTime::now(),
		);
		if pin_verdict == PinVerdict::Mismatch {
			if writer_claimed {
				engine.inner.cache.abandon_write(&fingerprint);
			}
			let engine_err: EngineError = RequestError::PinMismatch(host.clone()).into();
			request.apply(Event::Error(engine_err.clone()));
			return Err(DriveOutcome::Failed(engine_err));
		}

		let (decoded_headers, decoded_body) = decode_response_body(exchange.headers.clone(), exchange.body.clone()).await;
		exchange.headers = decoded_headers;
		exchange.body = decoded_body;

		let status = exchange.status;
		let header_pairs: Vec<(String, String)> = exchange
			.headers
			.iter()
			.map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or("").to_string()))
			.collect();

		if writer_claimed && (200..300).contains(&status) {
			engine.inner.cache.insert(
				fingerprint.clone(),
				CacheEntry {
					status,
					headers: header_pairs.clone(),
					body: Some(exchange.body.clone()),
					validators: Validators {
						etag: exchange.headers.get(http::header::ETAG).and_then(|v| v.to_str().ok()).map(String::from),
						last_modified: exchange.headers.get(http::header::LAST_MODIFIED).and_then(|v| v.to_str().ok()).map(String::from),
					},
					freshness_lifetime_secs: freshness_lifetime(&exchange.headers),
					stored_at_unix_secs: now,
				},
			);
		} else if writer_claimed {
			engine.inner.cache.abandon_write(&fingerprint);
		}

		let info = UrlResponseInfo {
			url: url.to_string(),
			status,
			headers: header_pairs,
			negotiated_protocol: Some(exchange.negotiated_protocol.to_string()),
			was_cached: false,
			received_byte_count: exchange.body.len() as u64,
		};
		*last_response = Some(info.clone());

		let callbacks = request.apply(Event::HeadersReceived { status });
		if callbacks.contains(&Callback::RedirectReceived) {
			let location = exchange.headers.get(http::header::LOCATION).and_then(|v| v.to_str().ok()).map(String::from);
			let Some(location) = location else {
				let engine_err = EngineError::new(ErrorCategory::Internal, 903, "redirect with no Location header");
				request.apply(Event::Error(engine_err.clone()));
				return Err(DriveOutcome::Failed(engine_err));
			};
			let new_url = url
				.join(&location)
				.map_err(|_| DriveOutcome::Failed(EngineError::new(ErrorCategory::Internal, 904, "invalid redirect Location")))?;

			let redirect_info = RedirectInfo {
				new_location: new_url.to_string(),
				status,
			};
			let decision = callback.on_redirect_received(&redirect_info);
			let event = match decision {
				RedirectDecision::Follow => Event::RedirectFollowed,
				RedirectDecision::Drop => Event::RedirectDeclined,
			};
			let after = request.apply(event);
			if after.contains(&Callback::Failed) {
				return Err(DriveOutcome::Failed(RequestError::TooManyRedirects.into()));
			}
			if after.contains(&Callback::Succeeded) {
				return Ok(info);
			}
			*url = new_url;
			continue;
		}

		deliver(executor, callback.clone(), Callback::ResponseStarted, Some(&info), None);
		deliver(executor, callback.clone(), Callback::ReadCompleted, Some(&info), None);
		request.apply(Event::BodyComplete);
		return Ok(info);
	}
}

/// Transparently undoes a response's `Content-Encoding`, so `on_read_completed`
/// and the HTTP cache see the same decoded bytes a caller that never asked
/// for compression would have gotten. Strips the header on success so the
/// delivered `UrlResponseInfo` matches what was actually handed back;
/// leaves header and body untouched on an unrecognized or malformed
/// encoding. Grounded on the teacher's `http::compression::decode_body`
/// (`async_compression::tokio::bufread` decoders over a `BufReader`).
async fn decode_response_body(mut headers: http::HeaderMap, body: Bytes) -> (http::HeaderMap, Bytes) {
	let encoding = headers
		.get(http::header::CONTENT_ENCODING)
		.and_then(|v| v.to_str().ok())
		.map(str::to_ascii_lowercase);
	let decoded = match encoding.as_deref() {
		Some("br") => read_decoded(BrotliDecoder::new(BufReader::new(&body[..]))).await,
		Some("gzip") => read_decoded(GzipDecoder::new(BufReader::new(&body[..]))).await,
		_ => None,
	};
	match decoded {
		Some(decoded_body) => {
			headers.remove(http::header::CONTENT_ENCODING);
			(headers, decoded_body)
		},
		None => (headers, body),
	}
}

async fn read_decoded<D: AsyncRead + Unpin>(mut decoder: D) -> Option<Bytes> {
	let mut out = Vec::new();
	match decoder.read_to_end(&mut out).await {
		Ok(_) => Some(Bytes::from(out)),
		Err(err) => {
			warn!(target: "netengine::engine", error = %err, "failed to decode response body, leaving it encoded");
			None
		},
	}
}

fn response_info(url: &url::Url, entry: &CacheEntry, was_cached: bool, dialed_via: &'static str) -> UrlResponseInfo {
	UrlResponseInfo {
		url: url.to_string(),
		status: entry.status,
		headers: entry.headers.clone(),
		negotiated_protocol: Some(dialed_via.to_string()),
		was_cached,
		received_byte_count: entry.body.as_ref().map(|b| b.len() as u64).unwrap_or(0),
	}
}

#[allow(clippy::type_complexity)]
async fn acquire_connection<C: Connector>(
	engine: &Engine<C>,
	origin: &Origin,
	binding: &Binding,
) -> Result<(ConnectionHandle, &'static str, Option<Arc<DynHttp1Connection>>), EngineError> {
	let key = SessionKey {
		origin: origin.clone(),
		binding: binding.clone(),
		privacy_mode: PrivacyMode::Disabled,
	};
	if engine.inner.cfg.transport.enable_http2 || engine.inner.cfg.transport.enable_quic {
		if let Ok(session) = engine.inner.pool.acquire(&key).await {
			let proto = match &*session {
				AnySession::Http2(_) => "h2",
				AnySession::Quic(_) => "h3",
			};
			return Ok((ConnectionHandle::Multiplexed(session), proto, None));
		}
	}
	let conn = engine.inner.h1_pool.acquire(origin).await.map_err(|e| EngineError::from(RequestError::Pool(e)))?;
	Ok((ConnectionHandle::Http1(conn.clone()), "http/1.1", Some(conn)))
}

fn freshness_lifetime(headers: &http::HeaderMap) -> u64 {
	headers
		.get(http::header::CACHE_CONTROL)
		.and_then(|v| v.to_str().ok())
		.and_then(|s| {
			s.split(',').find_map(|directive| {
				let directive = directive.trim();
				directive.strip_prefix("max-age=").and_then(|n| n.parse().ok())
			})
		})
		.unwrap_or(0)
}

fn unix_now_secs() -> u64 {
	SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::callback::recording::{Recorded, RecordingCallback};
	use crate::executor::InlineExecutor;
	use std::sync::atomic::AtomicUsize;

	#[derive(Debug)]
	struct FakeConn;
	impl Http1Connection for FakeConn {
		fn is_usable(&self) -> bool {
			true
		}
	}

	struct FakeConnector {
		exchanges: AtomicUsize,
	}

	impl Connector for FakeConnector {
		fn dial_http1(&self, _origin: &Origin) -> net_pool::h1::DialFuture<DynHttp1Connection> {
			Box::pin(async { Ok(Arc::new(FakeConn) as Arc<DynHttp1Connection>) })
		}

		fn dial_session(&self, _key: &SessionKey, _prefer_http3: bool) -> net_pool::pool::DialFuture<AnySession> {
			Box::pin(async { Err(net_pool::PoolError::DialFailed("no multiplexed transport in test".into())) })
		}

		fn exchange(&self, _on: ConnectionHandle, _req: OutboundRequest) -> BoxFuture<'static, Result<ExchangeResult, RequestError>> {
			let n = self.exchanges.fetch_add(1, Ordering::SeqCst);
			Box::pin(async move {
				if n == 0 {
					let mut headers = http::HeaderMap::new();
					headers.insert(http::header::LOCATION, http::HeaderValue::from_static("http://b.example/"));
					Ok(ExchangeResult {
						status: 302,
						headers,
						body: Bytes::new(),
						negotiated_protocol: "http/1.1",
						chain_spki_sha256: Vec::new(),
						chain_anchored_to_local_trust_anchor: false,
					})
				} else {
					Ok(ExchangeResult {
						status: 200,
						headers: http::HeaderMap::new(),
						body: Bytes::from_static(b"ok"),
						negotiated_protocol: "http/1.1",
						chain_spki_sha256: Vec::new(),
						chain_anchored_to_local_trust_anchor: false,
					})
				}
			})
		}
	}

	fn test_config() -> Config {
		let mut cfg = Config::default();
		cfg.transport.enable_http2 = false;
		cfg.transport.enable_quic = false;
		cfg
	}

	#[tokio::test]
	async fn redirect_then_success_delivers_expected_callbacks() {
		let engine = Engine::build(
			test_config(),
			FakeConnector {
				exchanges: AtomicUsize::new(0),
			},
		)
		.unwrap();
		let callback = Arc::new(RecordingCallback::default());
		let builder = engine.new_request_builder(
			url::Url::parse("http://a.example/").unwrap(),
			Arc::new(InlineExecutor),
			callback.clone(),
		);
		builder.start();
		tokio::time::sleep(std::time::Duration::from_millis(50)).await;
		let events = callback.events.lock().clone();
		assert_eq!(events.last(), Some(&Recorded::Succeeded));
	}

	#[tokio::test]
	async fn shutdown_rejects_with_requests_in_flight() {
		let engine = Engine::build(
			test_config(),
			FakeConnector {
				exchanges: AtomicUsize::new(0),
			},
		)
		.unwrap();
		engine.inner.in_flight.fetch_add(1, Ordering::SeqCst);
		let err = engine.shutdown().await.unwrap_err();
		assert_eq!(err.category, ErrorCategory::Internal);
	}
}
