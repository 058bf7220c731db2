//! HTTP client engine: multiplexes requests over HTTP/1.1, HTTP/2, and
//! HTTP/3 with DNS resolution, connection pooling, QUIC migration, HTTP
//! caching, and public key pinning, behind one [`engine::Engine`] façade.
//!
//! Wire-level byte transport lives in callers of this crate: see
//! [`engine::Connector`] for the seam this crate dials through and
//! exchanges requests over. `net-dns`, `net-pool`, and `net-quic` provide
//! the DNS, pooling, and migration-policy subsystems this crate wires
//! together; `h2session`/`quicsession` adapt their session types onto
//! `net_pool::MultiplexedSession`.

pub mod cache;
pub mod callback;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod h2session;
pub mod netlog;
pub mod pinning;
pub mod quicsession;
pub mod request;
pub mod response;

pub use callback::RequestCallback;
pub use config::Config;
pub use engine::{AnySession, BidirectionalStreamBuilder, Connector, Engine, RequestBuilder, RequestHandle};
pub use error::RequestError;
pub use executor::{CallbackExecutor, InlineExecutor, NetworkTask, TokioExecutor};
pub use netlog::NetLog;
pub use pinning::{PinEntry, PinStore, PinVerdict};
pub use response::{RedirectDecision, RedirectInfo, UrlResponseInfo};
