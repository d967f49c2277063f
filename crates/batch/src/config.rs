use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default debounce window.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Coordinator tuning, deserializable from the `[batch]` config table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
	/// Debounce window in milliseconds.
	pub debounce_ms: u64,
	/// Upper bound on queued, not yet dispatched invocations. Unbounded when absent.
	pub max_pending: Option<usize>,
	/// Timeout for one executor call in milliseconds. No timeout when absent.
	pub dispatch_timeout_ms: Option<u64>,
}

impl Default for BatchConfig {
	fn default() -> Self {
		Self {
			debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
			max_pending: None,
			dispatch_timeout_ms: None,
		}
	}
}

impl BatchConfig {
	/// Debounce window.
	pub fn debounce(&self) -> Duration {
		Duration::from_millis(self.debounce_ms)
	}

	/// Executor call timeout, if any.
	pub fn dispatch_timeout(&self) -> Option<Duration> {
		self.dispatch_timeout_ms.map(Duration::from_millis)
	}

	/// Sets the debounce window.
	#[must_use]
	pub fn with_debounce(mut self, debounce: Duration) -> Self {
		self.debounce_ms = debounce.as_millis() as u64;
		self
	}

	/// Bounds the pending queue.
	#[must_use]
	pub fn with_max_pending(mut self, max_pending: usize) -> Self {
		self.max_pending = Some(max_pending);
		self
	}

	/// Sets the executor call timeout.
	#[must_use]
	pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
		self.dispatch_timeout_ms = Some(timeout.as_millis() as u64);
		self
	}
}
