//! CLI front end for the engine: parses a URL (and an optional JSON config
//! file, in the same unknown-key-tolerant `RawConfig` shape every subsystem
//! accepts), builds one [`netengine::Engine`], drives a single request
//! through it, and prints the result.
//!
//! The [`HyperConnector`] here is a demonstration wire transport, not a
//! production one: it dials plaintext HTTP/1.1 with `hyper`'s client codec
//! and never attempts HTTP/2, HTTP/3, or TLS. Those are genuine wire-level
//! protocol implementations, explicitly out of the engine crate's scope;
//! a real deployment supplies its own `Connector`.

use std::collections::HashMap;
use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use clap::Parser;
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1 as h1;
use hyper_util::rt::TokioIo;
use net_pool::h1::{DialFuture, Http1Connection};
use net_pool::origin::{Origin, Scheme, SessionKey};
use netengine::engine::{AnySession, BoxFuture, Connector, ConnectionHandle, ExchangeResult, OutboundRequest};
use netengine::{Config, Engine, InlineExecutor, RequestCallback, RequestError, UrlResponseInfo};
use tokio::net::TcpStream;
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "netengine", about = "Drives one request through the engine for manual/smoke testing")]
struct Args {
	url: String,

	/// Path to a JSON config file, deserialized the same way every
	/// subsystem's RawConfig is: unrecognized keys are tolerated.
	#[arg(long)]
	config: Option<std::path::PathBuf>,

	#[arg(long, default_value = "GET")]
	method: String,
}

struct HyperConn {
	usable: AtomicBool,
}

impl std::fmt::Debug for HyperConn {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HyperConn").field("usable", &self.usable.load(Ordering::SeqCst)).finish()
	}
}

impl Http1Connection for HyperConn {
	fn is_usable(&self) -> bool {
		self.usable.load(Ordering::SeqCst)
	}
}

type SendRequest = h1::SendRequest<Full<Bytes>>;

/// Demonstration [`Connector`]: plaintext HTTP/1.1 only. `dial_http1` stores
/// the `hyper` `SendRequest` half keyed by the data address of the `Arc`
/// handle it hands back to the pool, which is stable for a connection's
/// whole lifetime in the pool (the same `Arc` is reused out of the idle set
/// on every subsequent `acquire`, never reconstructed); `exchange` looks the
/// sender back up by that same key.
struct HyperConnector {
	conns: AsyncMutex<HashMap<usize, SendRequest>>,
}

impl HyperConnector {
	fn new() -> Self {
		Self {
			conns: AsyncMutex::new(HashMap::new()),
		}
	}

	async fn register(&self, key: usize, send_request: SendRequest) {
		self.conns.lock().await.insert(key, send_request);
	}
}

fn conn_key(handle: &Arc<dyn Http1Connection>) -> usize {
	Arc::as_ptr(handle) as *const () as usize
}

impl Connector for HyperConnector {
	fn dial_http1(&self, origin: &Origin) -> DialFuture<dyn Http1Connection> {
		let host = origin.host().to_string();
		let port = origin.port;
		let scheme = origin.scheme;
		Box::pin(async move {
			if scheme == Scheme::Https {
				return Err(net_pool::PoolError::DialFailed(
					"this demonstration connector only dials plaintext http1; TLS is a genuine wire-level protocol left to a production Connector".into(),
				));
			}
			let addr = (host.as_str(), port)
				.to_socket_addrs()
				.map_err(|e| net_pool::PoolError::DialFailed(e.to_string()))?
				.next()
				.ok_or_else(|| net_pool::PoolError::DialFailed("no address resolved".into()))?;
			let stream = TcpStream::connect(addr).await.map_err(|e| net_pool::PoolError::DialFailed(e.to_string()))?;
			let io = TokioIo::new(stream);
			let (send_request, conn) = h1::handshake(io).await.map_err(|e| net_pool::PoolError::DialFailed(e.to_string()))?;
			tokio::spawn(async move {
				if let Err(err) = conn.await {
					warn!(target: "netengine_app::connector", %err, "http1 connection driver exited");
				}
			});
			let handle: Arc<dyn Http1Connection> = Arc::new(HyperConn {
				usable: AtomicBool::new(true),
			});
			// The `Arc`'s data address is the key `exchange` uses to look the
			// `SendRequest` half back up, since the pool hands us back this
			// same `Arc` (never a reconstructed one) for the connection's
			// whole idle-pool lifetime.
			self.register(conn_key(&handle), send_request).await;
			Ok(handle)
		})
	}

	fn dial_session(&self, _key: &SessionKey, _prefer_http3: bool) -> net_pool::pool::DialFuture<AnySession> {
		Box::pin(async { Err(net_pool::PoolError::DialFailed("h2/h3 dialing is not implemented by this demonstration connector".into())) })
	}

	fn exchange(&self, on: ConnectionHandle, req: OutboundRequest) -> BoxFuture<'static, Result<ExchangeResult, RequestError>> {
		Box::pin(async move {
			let handle = match on {
				ConnectionHandle::Http1(h) => h,
				ConnectionHandle::Multiplexed(_) => {
					return Err(RequestError::Pool(net_pool::PoolError::DialFailed(
						"demonstration connector received a multiplexed handle it never dials".into(),
					)));
				},
			};
			let key = conn_key(&handle);
			let mut conns = self.conns.lock().await;
			let send_request = conns
				.get_mut(&key)
				.ok_or_else(|| RequestError::Pool(net_pool::PoolError::DialFailed(format!("no registered hyper connection for handle (key {key})"))))?;

			let host = req.url.host_str().unwrap_or_default();
			let path = if req.url.query().is_some() {
				format!("{}?{}", req.url.path(), req.url.query().unwrap())
			} else {
				req.url.path().to_string()
			};
			let mut builder = hyper::Request::builder().method(req.method).uri(path).header(hyper::header::HOST, host);
			for (name, value) in req.headers.iter() {
				builder = builder.header(name.clone(), value.clone());
			}
			let outbound = builder
				.body(Full::new(req.body))
				.map_err(|e| RequestError::Pool(net_pool::PoolError::DialFailed(e.to_string())))?;

			let response = send_request
				.send_request(outbound)
				.await
				.map_err(|e| RequestError::Pool(net_pool::PoolError::DialFailed(e.to_string())))?;
			let status = response.status().as_u16();
			let headers = response.headers().clone();
			let body = response
				.into_body()
				.collect()
				.await
				.map_err(|e| RequestError::Pool(net_pool::PoolError::DialFailed(e.to_string())))?
				.to_bytes();

			Ok(ExchangeResult {
				status,
				headers,
				body,
				negotiated_protocol: "http/1.1",
				chain_spki_sha256: Vec::new(),
				chain_anchored_to_local_trust_anchor: false,
			})
		})
	}
}

struct PrintingCallback {
	done: AsyncMutex<Option<oneshot::Sender<()>>>,
}

impl RequestCallback for PrintingCallback {
	fn on_succeeded(&self, info: &UrlResponseInfo) {
		println!("{} {}", info.status, info.url);
		for (name, value) in &info.headers {
			println!("{name}: {value}");
		}
		println!("({} bytes, protocol {:?}, cached={})", info.received_byte_count, info.negotiated_protocol, info.was_cached);
		self.signal_done();
	}

	fn on_failed(&self, error: &net_core::error::EngineError, _info: Option<&UrlResponseInfo>) {
		eprintln!("request failed: {error}");
		self.signal_done();
	}

	fn on_canceled(&self, _info: Option<&UrlResponseInfo>) {
		eprintln!("request canceled");
		self.signal_done();
	}
}

impl PrintingCallback {
	fn signal_done(&self) {
		if let Some(tx) = self.done.try_lock().ok().and_then(|mut g| g.take()) {
			let _ = tx.send(());
		}
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	let cfg = match &args.config {
		Some(path) => {
			let text = fs_err::tokio::read_to_string(path).await?;
			let raw: netengine::config::RawConfig = serde_json::from_str(&text)?;
			Config::from(raw)
		},
		None => Config::default(),
	};

	let engine = Engine::build(cfg, HyperConnector::new()).map_err(|e| anyhow::anyhow!("{e}"))?;
	info!(target: "netengine_app", url = %args.url, "starting request");

	let url = url::Url::parse(&args.url)?;
	let method = args.method.parse::<http::Method>()?;
	let (tx, rx) = oneshot::channel();
	let callback = Arc::new(PrintingCallback { done: AsyncMutex::new(Some(tx)) });

	let builder = engine
		.new_request_builder(url, Arc::new(InlineExecutor), callback)
		.method(method);
	let _handle = builder.start();

	let _ = rx.await;
	engine.shutdown().await.map_err(|e| anyhow::anyhow!("{e}"))?;
	Ok(())
}
