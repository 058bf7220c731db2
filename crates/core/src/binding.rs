use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// An opaque token identifying which L3 network a socket (or a DNS lookup)
/// should be pinned to. Equality is by identity, not by any descriptive
/// payload the host OS attaches, per spec §3.
#[derive(Clone, Debug)]
pub struct NetworkBinding(Arc<BindingInner>);

#[derive(Debug)]
struct BindingInner {
	id: u64,
	label: String,
}

impl NetworkBinding {
	pub fn new(label: impl Into<String>) -> Self {
		Self(Arc::new(BindingInner {
			id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
			label: label.into(),
		}))
	}

	pub fn label(&self) -> &str {
		&self.0.label
	}
}

impl PartialEq for NetworkBinding {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}
impl Eq for NetworkBinding {}

impl std::hash::Hash for NetworkBinding {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		(Arc::as_ptr(&self.0) as usize).hash(state)
	}
}

/// A request's network pin: either a specific [`NetworkBinding`] or
/// "unbound" (use whatever the OS considers the default network).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Binding {
	#[default]
	Unbound,
	Bound(NetworkBinding),
}

impl Binding {
	pub fn matches(&self, other: &Binding) -> bool {
		match (self, other) {
			(Binding::Unbound, Binding::Unbound) => true,
			(Binding::Bound(a), Binding::Bound(b)) => a == b,
			_ => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn distinct_bindings_are_not_equal_even_with_same_label() {
		let a = NetworkBinding::new("wifi");
		let b = NetworkBinding::new("wifi");
		assert_ne!(a, b);
		assert_eq!(a, a.clone());
	}
}
