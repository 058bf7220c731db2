//! `Binding`/`NetworkBinding` live in `net-core` since `net-pool` and
//! `net-quic` need them too; re-exported here so existing `crate::binding::*`
//! imports in this crate keep working.
pub use net_core::binding::{Binding, NetworkBinding};
