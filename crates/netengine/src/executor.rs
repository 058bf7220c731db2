//! Executor/task runtime, spec §4.A: one dedicated network task owns all
//! mutable session/socket/timer state; jobs posted to it run strictly in
//! posting order, modeling the "single-threaded cooperative network task"
//! as a `tokio` task draining an ordered channel rather than an OS thread,
//! since the rest of the workspace is already `tokio`-native.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Delivers callbacks to user code. Production callers post to whatever
/// executor the caller's `Request` was built with; tests use
/// [`InlineExecutor`] to observe callbacks synchronously.
pub trait CallbackExecutor: Send + Sync {
	fn post(&self, job: Box<dyn FnOnce() + Send>);
}

pub struct InlineExecutor;

impl CallbackExecutor for InlineExecutor {
	fn post(&self, job: Box<dyn FnOnce() + Send>) {
		job();
	}
}

pub struct TokioExecutor;

impl CallbackExecutor for TokioExecutor {
	fn post(&self, job: Box<dyn FnOnce() + Send>) {
		tokio::task::spawn_blocking(job);
	}
}

/// The network task: a single `tokio` task that drains jobs in order.
/// Mutations to sessions, the host cache, and the HTTP cache are only ever
/// made from jobs run here, so no internal lock is ever held across an
/// `.await` that also touches user code.
pub struct NetworkTask {
	tx: mpsc::UnboundedSender<Job>,
	handle: JoinHandle<()>,
}

impl NetworkTask {
	pub fn spawn() -> Self {
		let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
		let handle = tokio::spawn(async move {
			while let Some(job) = rx.recv().await {
				job.await;
			}
		});
		Self { tx, handle }
	}

	/// Posts a job; returns `false` if the task has already shut down.
	pub fn post<F>(&self, job: F) -> bool
	where
		F: Future<Output = ()> + Send + 'static,
	{
		self.tx.send(Box::pin(job)).is_ok()
	}

	/// Stops accepting new jobs and waits for the queue to drain.
	pub async fn shutdown(self) {
		drop(self.tx);
		let _ = self.handle.await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[tokio::test]
	async fn jobs_run_in_posting_order() {
		let task = NetworkTask::spawn();
		let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
		for i in 0..5 {
			let order = order.clone();
			task.post(async move { order.lock().push(i) });
		}
		task.shutdown().await;
		assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
	}

	#[tokio::test]
	async fn inline_executor_runs_synchronously() {
		let ran = Arc::new(AtomicUsize::new(0));
		let executor = InlineExecutor;
		let ran2 = ran.clone();
		executor.post(Box::new(move || {
			ran2.fetch_add(1, Ordering::SeqCst);
		}));
		assert_eq!(ran.load(Ordering::SeqCst), 1);
	}
}
