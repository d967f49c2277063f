use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tally_batch::{Executor, Request, Response, TransportError};
use tracing::debug;

use crate::config::BackendConfig;
use crate::ops::evaluate;
use crate::table::RateTables;
use crate::Result;

/// In-process backend evaluating batches against rate tables.
///
/// An optional artificial latency stands in for a network round trip.
#[derive(Debug, Clone)]
pub struct LocalExecutor {
	tables: Arc<RateTables>,
	latency: Duration,
}

impl LocalExecutor {
	/// Creates an executor over `tables` with no artificial latency.
	pub fn new(tables: RateTables) -> Self {
		Self {
			tables: Arc::new(tables),
			latency: Duration::ZERO,
		}
	}

	/// Builds an executor from backend settings, loading replacement tables if configured.
	pub fn from_config(config: &BackendConfig) -> Result<Self> {
		let tables = match &config.rates {
			Some(path) => RateTables::load(path)?,
			None => RateTables::builtin()?,
		};
		Ok(Self::new(tables).with_latency(config.simulated_latency()))
	}

	/// Delays every batch by `latency`.
	#[must_use]
	pub fn with_latency(mut self, latency: Duration) -> Self {
		self.latency = latency;
		self
	}

	/// Tables in use.
	pub fn tables(&self) -> &RateTables {
		&self.tables
	}
}

#[async_trait]
impl Executor for LocalExecutor {
	async fn execute(&self, batch: Vec<Request>) -> Result<Vec<Response>, TransportError> {
		if !self.latency.is_zero() {
			tokio::time::sleep(self.latency).await;
		}
		let responses: Vec<Response> = batch.iter().map(|req| evaluate(&self.tables, req)).collect();
		let failed = responses.iter().filter(|r| matches!(r, Response::Error { .. })).count();
		debug!(size = batch.len(), failed, "rates.execute");
		Ok(responses)
	}
}
