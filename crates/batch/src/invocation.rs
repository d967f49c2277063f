//! Per-call settlement pairs.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::wire::Request;
use crate::{Error, Result};

/// A queued call: the request plus the capability to settle its future.
pub(crate) struct Invocation {
	pub(crate) request: Request,
	pub(crate) settle: Settle,
}

/// Exclusive capability to settle one [`InvocationFuture`].
///
/// Settling consumes the capability, so a future transitions at most once.
#[derive(Debug)]
pub(crate) struct Settle {
	tx: oneshot::Sender<Result<Value>>,
}

impl Settle {
	/// Fulfils the paired future. Returns `false` if the caller stopped waiting.
	pub(crate) fn fulfill(self, value: Value) -> bool {
		self.tx.send(Ok(value)).is_ok()
	}

	/// Rejects the paired future. Returns `false` if the caller stopped waiting.
	pub(crate) fn reject(self, error: Error) -> bool {
		self.tx.send(Err(error)).is_ok()
	}
}

/// Creates an invocation and the future observing it.
pub(crate) fn invocation(request: Request) -> (Invocation, InvocationFuture) {
	let (tx, rx) = oneshot::channel();
	(
		Invocation {
			request,
			settle: Settle { tx },
		},
		InvocationFuture { rx },
	)
}

pin_project! {
	/// Eventual outcome of one submitted call.
	///
	/// Resolves once the batch containing the call has been answered. Dropping
	/// the future does not withdraw the call; its outcome is discarded.
	#[must_use = "the outcome of a submitted call is only observable through its future"]
	#[derive(Debug)]
	pub struct InvocationFuture {
		#[pin]
		rx: oneshot::Receiver<Result<Value>>,
	}
}

impl Future for InvocationFuture {
	type Output = Result<Value>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let this = self.project();
		match ready!(this.rx.poll(cx)) {
			Ok(outcome) => Poll::Ready(outcome),
			Err(_) => Poll::Ready(Err(Error::Abandoned)),
		}
	}
}
