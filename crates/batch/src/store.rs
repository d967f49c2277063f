//! Pending-batch store.
//!
//! Holds queued invocations and the scheduling phase of the current
//! accumulation window. A [`Batch`] can only be produced by detaching, and
//! every detach returns the store to [`Phase::Idle`], so the scheduling flag is
//! always clear by the time a batch reaches the executor.

use std::mem;

use crate::invocation::Invocation;

/// Scheduling phase of the accumulation window.
///
/// There is no dispatching phase here: a detached [`Batch`] owns the window
/// while it is sent, and the store is already back to [`Phase::Idle`] by then.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
	/// Nothing queued, no timer armed.
	Idle,
	/// A timer for `generation` is armed and the queue is non-empty.
	Scheduled { generation: u64 },
}

/// Outcome of queueing one invocation.
pub(crate) enum Push {
	/// First item of a new window: the caller must arm a timer for `generation`.
	Arm { generation: u64 },
	/// Joined the window already waiting behind an armed timer.
	Joined,
	/// The queue is at its bound; the invocation is handed back unqueued.
	Full(Invocation),
}

/// Detached snapshot of one accumulation window, in submission order.
pub(crate) struct Batch {
	pub(crate) generation: u64,
	pub(crate) items: Vec<Invocation>,
}

pub(crate) struct PendingStore {
	queue: Vec<Invocation>,
	phase: Phase,
	last_generation: u64,
	capacity: Option<usize>,
}

impl PendingStore {
	pub(crate) fn new(capacity: Option<usize>) -> Self {
		Self {
			queue: Vec::new(),
			phase: Phase::Idle,
			last_generation: 0,
			capacity,
		}
	}

	/// Appends `invocation` at the tail.
	pub(crate) fn push(&mut self, invocation: Invocation) -> Push {
		if self.capacity.is_some_and(|cap| self.queue.len() >= cap) {
			return Push::Full(invocation);
		}
		self.queue.push(invocation);
		match self.phase {
			Phase::Scheduled { .. } => Push::Joined,
			Phase::Idle => {
				self.last_generation = self.last_generation.wrapping_add(1);
				let generation = self.last_generation;
				self.phase = Phase::Scheduled { generation };
				Push::Arm { generation }
			}
		}
	}

	/// Detaches the window armed for `generation`.
	///
	/// Returns `None` for a stale timer whose window was already drained by an
	/// explicit flush.
	pub(crate) fn detach(&mut self, generation: u64) -> Option<Batch> {
		match self.phase {
			Phase::Scheduled { generation: current } if current == generation => self.take(),
			_ => None,
		}
	}

	/// Detaches whatever is queued, regardless of the armed generation.
	pub(crate) fn detach_now(&mut self) -> Option<Batch> {
		self.take()
	}

	fn take(&mut self) -> Option<Batch> {
		let Phase::Scheduled { generation } = mem::replace(&mut self.phase, Phase::Idle) else {
			return None;
		};
		if self.queue.is_empty() {
			return None;
		}
		Some(Batch {
			generation,
			items: mem::take(&mut self.queue),
		})
	}

	pub(crate) fn len(&self) -> usize {
		self.queue.len()
	}

	#[cfg(test)]
	pub(crate) fn phase(&self) -> Phase {
		self.phase
	}
}
