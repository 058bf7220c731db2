use std::future::Future;
use std::pin::Pin;

use net_core::binding::Binding;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Probes a candidate path (local network or server-advertised address)
/// before the migration machine commits to it. The real implementation
/// dials `quinn::Endpoint::connect`-style path validation; tests and the
/// machine's own unit tests supply a fake.
pub trait PathProber: Send + Sync {
	fn probe(&self, candidate: &Binding) -> BoxFuture<'static, bool>;
}

impl<F> PathProber for F
where
	F: Fn(&Binding) -> BoxFuture<'static, bool> + Send + Sync,
{
	fn probe(&self, candidate: &Binding) -> BoxFuture<'static, bool> {
		(self)(candidate)
	}
}
