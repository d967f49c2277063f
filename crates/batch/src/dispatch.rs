//! Batch dispatch and positional settlement.

use std::sync::Arc;
use std::time::Duration;

use tally_worker::TaskClass;
use tracing::{debug, warn};

use crate::executor::Executor;
use crate::invocation::Settle;
use crate::stats::Counters;
use crate::store::Batch;
use crate::wire::{Request, Response};
use crate::Error;

/// Per-batch settlement tally.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Settled {
	pub(crate) fulfilled: usize,
	pub(crate) rejected: usize,
	pub(crate) surplus: usize,
}

/// Sends `batch` to `executor` once and settles every invocation in it.
pub(crate) async fn dispatch(batch: Batch, executor: Arc<dyn Executor>, timeout: Option<Duration>, counters: &Counters) {
	let Batch { generation, items } = batch;
	let size = items.len();
	let (requests, settles): (Vec<Request>, Vec<Settle>) = items.into_iter().map(|inv| (inv.request, inv.settle)).unzip();

	let in_flight = counters.dispatch_started(size);
	debug!(generation, size, "batch.dispatch");

	let outcome = call(executor, requests, timeout).await;
	let transport_failed = outcome.is_err();
	if let Err(err) = &outcome {
		warn!(generation, size, error = %err, "batch.transport_failed");
	}

	let settled = settle(settles, outcome);
	if settled.surplus > 0 {
		warn!(generation, size, surplus = settled.surplus, "batch.surplus_responses");
	}
	counters.dispatch_finished(settled.fulfilled, settled.rejected, transport_failed);
	drop(in_flight);
	debug!(generation, fulfilled = settled.fulfilled, rejected = settled.rejected, "batch.settled");
}

/// Runs the executor on its own task so a panic surfaces as a
/// [`JoinError`](tokio::task::JoinError) instead of unwinding the dispatcher.
async fn call(executor: Arc<dyn Executor>, requests: Vec<Request>, timeout: Option<Duration>) -> Result<Vec<Response>, Error> {
	let mut task = tally_worker::spawn(TaskClass::Backend, async move { executor.execute(requests).await });
	let joined = match timeout {
		Some(limit) => match tokio::time::timeout(limit, &mut task).await {
			Ok(joined) => joined,
			Err(_) => {
				task.abort();
				return Err(Error::Timeout(limit));
			}
		},
		None => task.await,
	};
	match joined {
		Ok(result) => result.map_err(|err| Error::Dispatch(err.to_string())),
		Err(err) => Err(Error::Dispatch(format!("executor task failed: {err}"))),
	}
}

/// Matches `outcome` to `settles` by position.
///
/// Missing positions reject with [`Error::MissingResult`]; a failed outcome
/// rejects every position with the same error.
pub(crate) fn settle(settles: Vec<Settle>, outcome: Result<Vec<Response>, Error>) -> Settled {
	let mut tally = Settled::default();
	let responses = match outcome {
		Ok(responses) => responses,
		Err(err) => {
			tally.rejected = settles.len();
			for settle in settles {
				settle.reject(err.clone());
			}
			return tally;
		}
	};

	tally.surplus = responses.len().saturating_sub(settles.len());
	let mut responses = responses.into_iter();
	for (index, settle) in settles.into_iter().enumerate() {
		match responses.next() {
			Some(Response::Result { result }) => {
				tally.fulfilled += 1;
				settle.fulfill(result);
			}
			Some(Response::Error { error }) => {
				tally.rejected += 1;
				settle.reject(Error::Remote(error));
			}
			None => {
				tally.rejected += 1;
				settle.reject(Error::MissingResult { index });
			}
		}
	}
	tally
}
