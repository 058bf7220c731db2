//! QUIC connection-migration state machine, spec §4.F — the hardest
//! algorithm in the system. This crate owns only the migration policy
//! (states, counters, trigger evaluation); wire-level QUIC (handshake,
//! stream framing, congestion control) is `quinn`/`quinn-proto`, driven
//! from `netengine`'s QUIC session wrapper.

pub mod config;
pub mod counters;
pub mod error;
pub mod machine;
pub mod prober;
pub mod state;

pub use config::Config;
pub use counters::MigrationCounters;
pub use error::QuicError;
pub use machine::MigrationMachine;
pub use prober::{BoxFuture, PathProber};
pub use state::{MigrationOutcome, MigrationState};
