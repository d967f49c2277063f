use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Backend settings, deserializable from the `[backend]` config table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
	/// Artificial delay before each batch is answered, in milliseconds.
	pub simulated_latency_ms: u64,
	/// Replacement rate table file. The embedded tables are used when absent.
	pub rates: Option<PathBuf>,
}

impl BackendConfig {
	/// Artificial per-batch delay.
	pub fn simulated_latency(&self) -> Duration {
		Duration::from_millis(self.simulated_latency_ms)
	}
}
