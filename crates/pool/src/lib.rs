//! Connection and session pooling: one multiplexed session per
//! [`origin::SessionKey`] (HTTP/2 or QUIC, spec §4.C) plus a bounded
//! HTTP/1.1 connection pool with a circuit breaker (spec §4.D). Neither
//! pool speaks a wire protocol itself; both are generic over a connection
//! type supplied by `net-quic` or `netengine`.

pub mod config;
pub mod error;
pub mod h1;
pub mod origin;
pub mod pool;
pub mod session;

pub use config::Config;
pub use error::PoolError;
pub use h1::{Dialer1, Http1Connection, Http1Pool, Http1PoolConfig};
pub use origin::{Origin, PrivacyMode, Scheme, SessionKey};
pub use pool::{Dialer, SessionPool};
pub use session::{MultiplexedSession, SessionState};
