use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Point-in-time coordinator counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
	/// Batches handed to the executor.
	pub batches: u64,
	/// Invocations handed to the executor.
	pub invocations: u64,
	/// Invocations fulfilled with a value.
	pub fulfilled: u64,
	/// Invocations rejected for any reason, including a full queue.
	pub rejected: u64,
	/// Executor calls that failed or timed out as a whole.
	pub transport_failures: u64,
	/// Batches currently awaiting the executor.
	pub in_flight: usize,
	/// Invocations queued behind the debounce timer.
	pub pending: usize,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
	batches: AtomicU64,
	invocations: AtomicU64,
	fulfilled: AtomicU64,
	rejected: AtomicU64,
	transport_failures: AtomicU64,
	in_flight: AtomicUsize,
}

impl Counters {
	/// Counts a batch handed to the executor. It stays in flight until the
	/// returned guard drops, whichever way the dispatch ends.
	pub(crate) fn dispatch_started(&self, size: usize) -> InFlight<'_> {
		self.batches.fetch_add(1, Ordering::Relaxed);
		self.invocations.fetch_add(size as u64, Ordering::Relaxed);
		self.in_flight.fetch_add(1, Ordering::AcqRel);
		InFlight(self)
	}

	pub(crate) fn dispatch_finished(&self, fulfilled: usize, rejected: usize, transport_failed: bool) {
		self.fulfilled.fetch_add(fulfilled as u64, Ordering::Relaxed);
		self.rejected.fetch_add(rejected as u64, Ordering::Relaxed);
		if transport_failed {
			self.transport_failures.fetch_add(1, Ordering::Relaxed);
		}
	}

	pub(crate) fn refused(&self) {
		self.rejected.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn snapshot(&self, pending: usize) -> BatchStats {
		BatchStats {
			batches: self.batches.load(Ordering::Relaxed),
			invocations: self.invocations.load(Ordering::Relaxed),
			fulfilled: self.fulfilled.load(Ordering::Relaxed),
			rejected: self.rejected.load(Ordering::Relaxed),
			transport_failures: self.transport_failures.load(Ordering::Relaxed),
			in_flight: self.in_flight.load(Ordering::Acquire),
			pending,
		}
	}
}

#[must_use]
pub(crate) struct InFlight<'a>(&'a Counters);

impl Drop for InFlight<'_> {
	fn drop(&mut self) {
		self.0.in_flight.fetch_sub(1, Ordering::AcqRel);
	}
}
