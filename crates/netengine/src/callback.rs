//! Request callback contract, spec §6: "polymorphic over capability set".
//! Rather than a deep class hierarchy of optional-hook callback types (the
//! pattern spec §9's design notes call out for replacement), every request
//! carries one `dyn RequestCallback` trait object; a caller only overrides
//! the hooks it cares about; the default bodies are no-ops. Exactly one of
//! `on_succeeded`/`on_failed`/`on_canceled` fires per request (enforced by
//! `crate::request::Request`, not by this trait).

use net_core::error::EngineError;

use crate::response::{RedirectDecision, RedirectInfo, UrlResponseInfo};

pub trait RequestCallback: Send + Sync {
	fn on_redirect_received(&self, _info: &RedirectInfo) -> RedirectDecision {
		RedirectDecision::Follow
	}

	fn on_response_started(&self, _info: &UrlResponseInfo) {}

	fn on_read_completed(&self, _chunk: &[u8]) {}

	fn on_succeeded(&self, _info: &UrlResponseInfo) {}

	fn on_failed(&self, _error: &EngineError, _info: Option<&UrlResponseInfo>) {}

	fn on_canceled(&self, _info: Option<&UrlResponseInfo>) {}
}

/// A callback that records every invocation, for tests that assert on the
/// exact sequence spec property P1 describes.
#[cfg(any(test, feature = "test-support"))]
pub mod recording {
	use super::*;
	use parking_lot::Mutex;

	#[derive(Clone, Debug, PartialEq)]
	pub enum Recorded {
		RedirectReceived,
		ResponseStarted,
		ReadCompleted,
		Succeeded,
		Failed,
		Canceled,
	}

	#[derive(Default)]
	pub struct RecordingCallback {
		pub events: Mutex<Vec<Recorded>>,
	}

	impl RequestCallback for RecordingCallback {
		fn on_redirect_received(&self, _info: &RedirectInfo) -> RedirectDecision {
			self.events.lock().push(Recorded::RedirectReceived);
			RedirectDecision::Follow
		}
		fn on_response_started(&self, _info: &UrlResponseInfo) {
			self.events.lock().push(Recorded::ResponseStarted);
		}
		fn on_read_completed(&self, _chunk: &[u8]) {
			self.events.lock().push(Recorded::ReadCompleted);
		}
		fn on_succeeded(&self, _info: &UrlResponseInfo) {
			self.events.lock().push(Recorded::Succeeded);
		}
		fn on_failed(&self, _error: &EngineError, _info: Option<&UrlResponseInfo>) {
			self.events.lock().push(Recorded::Failed);
		}
		fn on_canceled(&self, _info: Option<&UrlResponseInfo>) {
			self.events.lock().push(Recorded::Canceled);
		}
	}
}
