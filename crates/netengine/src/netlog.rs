//! NetLog: a chronological JSON event stream, toggled by
//! `startNetLogToFile`/`stopNetLog` (spec §6).

use std::path::PathBuf;
use std::sync::Arc;

use fs_err::tokio::File;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

#[derive(Clone, Debug, Serialize)]
pub struct NetLogEvent {
	pub timestamp_unix_millis: u64,
	pub source: String,
	pub event_type: String,
	pub params: Value,
}

struct Sink {
	file: File,
	include_sensitive: bool,
}

/// Process-wide NetLog toggle. `None` means logging is off and `log()`
/// calls are free (a single atomic-free lock check).
#[derive(Clone, Default)]
pub struct NetLog {
	sink: Arc<Mutex<Option<Sink>>>,
}

impl NetLog {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn start_to_file(&self, path: impl Into<PathBuf>, include_sensitive: bool) -> std::io::Result<()> {
		let file = File::create(path.into()).await?;
		*self.sink.lock() = Some(Sink { file, include_sensitive });
		Ok(())
	}

	pub fn stop(&self) {
		*self.sink.lock() = None;
	}

	pub fn is_active(&self) -> bool {
		self.sink.lock().is_some()
	}

	/// Appends one JSON-lines event. Sensitive params (header values, URLs
	/// with query strings) are only written when the active sink was
	/// started with `include_sensitive`; callers pass the already-redacted
	/// form in `params` otherwise.
	pub async fn log(&self, event: NetLogEvent, sensitive: bool) {
		let mut guard = self.sink.lock();
		let Some(sink) = guard.as_mut() else { return };
		if sensitive && !sink.include_sensitive {
			return;
		}
		let Ok(mut line) = serde_json::to_vec(&event) else { return };
		line.push(b'\n');
		let _ = sink.file.write_all(&line).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn inactive_by_default() {
		let netlog = NetLog::new();
		assert!(!netlog.is_active());
	}

	#[tokio::test]
	async fn start_then_stop_toggles_active() {
		let dir = tempfile::tempdir().unwrap();
		let netlog = NetLog::new();
		netlog.start_to_file(dir.path().join("netlog.json"), false).await.unwrap();
		assert!(netlog.is_active());
		netlog.stop();
		assert!(!netlog.is_active());
	}
}
