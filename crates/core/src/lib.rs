//! Shared ambient stack for the `netengine` workspace: error taxonomy, time
//! source, duration `serde` helpers, logging setup, and the experimental
//! options bridge. Every other crate in the workspace depends on this one
//! and nothing else in the workspace; it has no knowledge of DNS, pooling,
//! QUIC, or the request state machine.

pub mod binding;
pub mod bow;
pub mod duration;
pub mod error;
pub mod logging;
pub mod options;
pub mod time;

pub mod prelude {
	pub use crate::binding::{Binding, NetworkBinding};
	pub use crate::error::{EngineError, ErrorCategory, RetryDisposition};
	pub use crate::time::Clock;
}
