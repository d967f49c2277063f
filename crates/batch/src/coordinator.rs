use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tally_worker::TaskClass;
use tracing::{trace, warn};

use crate::config::BatchConfig;
use crate::dispatch::dispatch;
use crate::executor::Executor;
use crate::invocation::{InvocationFuture, invocation};
use crate::stats::{BatchStats, Counters};
use crate::store::{Batch, PendingStore, Push};
use crate::wire::Request;
use crate::Error;

/// Entry point for submitting calls that should be coalesced into batches.
///
/// Cheap to clone; clones share one queue, one timer and one executor.
#[derive(Clone)]
pub struct BatchCoordinator {
	inner: Arc<Inner>,
}

struct Inner {
	store: Mutex<PendingStore>,
	executor: Arc<dyn Executor>,
	config: BatchConfig,
	counters: Counters,
}

impl fmt::Debug for BatchCoordinator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BatchCoordinator")
			.field("config", &self.inner.config)
			.field("stats", &self.stats())
			.finish_non_exhaustive()
	}
}

impl BatchCoordinator {
	/// Creates a coordinator sending batches to `executor`.
	pub fn new(executor: impl Executor, config: BatchConfig) -> Self {
		Self::with_shared(Arc::new(executor), config)
	}

	/// Creates a coordinator over an already shared executor.
	pub fn with_shared(executor: Arc<dyn Executor>, config: BatchConfig) -> Self {
		Self {
			inner: Arc::new(Inner {
				store: Mutex::new(PendingStore::new(config.max_pending)),
				executor,
				config,
				counters: Counters::default(),
			}),
		}
	}

	/// Queues one call and returns its future without waiting.
	///
	/// The first call after an idle period arms the debounce timer; later calls
	/// join the batch already waiting behind it. When the queue is bounded and
	/// full, the returned future is already rejected with
	/// [`Error::QueueFull`].
	pub fn submit(&self, operation: impl Into<String>, args: Vec<Value>) -> InvocationFuture {
		let (invocation, future) = invocation(Request::new(operation, args));
		let push = self.inner.store.lock().push(invocation);

		match push {
			Push::Arm { generation } => {
				let debounce = self.inner.config.debounce();
				trace!(generation, debounce_ms = debounce.as_millis() as u64, "batch.arm");
				let inner = Arc::clone(&self.inner);
				tally_worker::spawn_after(TaskClass::Debounce, debounce, async move {
					let batch = inner.store.lock().detach(generation);
					inner.run(batch).await;
				});
			}
			Push::Joined => {}
			Push::Full(refused) => {
				let capacity = self.inner.config.max_pending.unwrap_or_default();
				warn!(operation = %refused.request.operation, capacity, "batch.queue_full");
				self.inner.counters.refused();
				refused.settle.reject(Error::QueueFull { capacity });
			}
		}
		future
	}

	/// Dispatches everything queued right now, without waiting for the timer.
	///
	/// Returns the number of invocations dispatched. The armed timer for the
	/// drained window becomes a no-op. The dispatch runs on its own task, so
	/// dropping this future still lets the batch settle.
	pub async fn flush(&self) -> usize {
		let batch = self.inner.store.lock().detach_now();
		let size = batch.as_ref().map_or(0, |b| b.items.len());
		let inner = Arc::clone(&self.inner);
		let task = tally_worker::spawn(TaskClass::Debounce, async move { inner.run(batch).await });
		if let Err(err) = task.await {
			warn!(error = %err, "batch.flush_failed");
		}
		size
	}

	/// Number of invocations waiting for the next dispatch.
	pub fn pending(&self) -> usize {
		self.inner.store.lock().len()
	}

	/// Active configuration.
	pub fn config(&self) -> &BatchConfig {
		&self.inner.config
	}

	/// Counter snapshot.
	pub fn stats(&self) -> BatchStats {
		self.inner.counters.snapshot(self.pending())
	}
}

impl Inner {
	async fn run(&self, batch: Option<Batch>) {
		let Some(batch) = batch else {
			trace!("batch.flush_empty");
			return;
		};
		dispatch(batch, Arc::clone(&self.executor), self.config.dispatch_timeout(), &self.counters).await;
	}
}

#[cfg(test)]
mod tests;
