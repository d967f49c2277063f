use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use tokio::time::sleep;

use super::*;
use crate::{Response, TransportError};

type Reply = Box<dyn Fn(usize, &[Request]) -> Result<Vec<Response>, TransportError> + Send + Sync>;

/// Records every batch it receives and answers through `reply`.
struct Scripted {
	calls: Mutex<Vec<Vec<Request>>>,
	latency: Duration,
	reply: Reply,
}

impl Scripted {
	fn new(latency: Duration, reply: impl Fn(usize, &[Request]) -> Result<Vec<Response>, TransportError> + Send + Sync + 'static) -> Arc<Self> {
		Arc::new(Self {
			calls: Mutex::new(Vec::new()),
			latency,
			reply: Box::new(reply),
		})
	}

	fn arithmetic(latency: Duration) -> Arc<Self> {
		Self::new(latency, |_, batch| Ok(batch.iter().map(evaluate).collect()))
	}

	fn calls(&self) -> Vec<Vec<Request>> {
		self.calls.lock().clone()
	}

	fn operations(&self, call: usize) -> Vec<String> {
		self.calls.lock()[call].iter().map(|req| req.operation.clone()).collect()
	}
}

#[async_trait]
impl Executor for Scripted {
	async fn execute(&self, batch: Vec<Request>) -> Result<Vec<Response>, TransportError> {
		let call = {
			let mut calls = self.calls.lock();
			calls.push(batch.clone());
			calls.len() - 1
		};
		if !self.latency.is_zero() {
			sleep(self.latency).await;
		}
		(self.reply)(call, &batch)
	}
}

fn evaluate(req: &Request) -> Response {
	let arg = |i: usize| req.args.get(i).and_then(Value::as_i64).unwrap_or_default();
	match req.operation.as_str() {
		"echo" => Response::ok(req.args.first().cloned().unwrap_or(Value::Null)),
		"add" => Response::ok(arg(0) + arg(1)),
		"mul" => Response::ok(arg(0) * arg(1)),
		"div" if arg(1) == 0 => Response::err("division by zero"),
		"div" => Response::ok(arg(0) / arg(1)),
		other => Response::err(format!("Operation not supported: {other}")),
	}
}

fn coordinator(executor: &Arc<Scripted>, config: BatchConfig) -> BatchCoordinator {
	BatchCoordinator::new(Arc::clone(executor), config)
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn add_mul_div_share_one_round_trip() {
	let exec = Scripted::arithmetic(Duration::from_secs(1));
	let coord = coordinator(&exec, BatchConfig::default());

	let add = coord.submit("add", vec![json!(2), json!(3)]);
	sleep(Duration::from_millis(20)).await;
	let mul = coord.submit("mul", vec![json!(4), json!(5)]);
	sleep(Duration::from_millis(30)).await;
	let div = coord.submit("div", vec![json!(10), json!(0)]);

	let (add, mul, div) = tokio::join!(add, mul, div);
	assert_eq!(add, Ok(json!(5)));
	assert_eq!(mul, Ok(json!(20)));
	let err = div.unwrap_err();
	assert!(err.to_string().contains("division by zero"), "{err}");

	assert_eq!(exec.calls().len(), 1);
	assert_eq!(exec.operations(0), vec!["add", "mul", "div"]);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn nothing_is_sent_before_the_debounce_window_closes() {
	let exec = Scripted::arithmetic(Duration::ZERO);
	let coord = coordinator(&exec, BatchConfig::default().with_debounce(Duration::from_millis(100)));

	let fut = coord.submit("add", vec![json!(1), json!(1)]);
	sleep(Duration::from_millis(99)).await;
	assert!(exec.calls().is_empty());
	assert_eq!(coord.pending(), 1);

	assert_eq!(fut.await, Ok(json!(2)));
	assert_eq!(coord.pending(), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn one_failing_item_does_not_affect_siblings() {
	let exec = Scripted::arithmetic(Duration::ZERO);
	let coord = coordinator(&exec, BatchConfig::default());

	let futures: Vec<_> = [("add", 1, 1), ("nope", 0, 0), ("mul", 3, 3), ("add", 2, 2)]
		.into_iter()
		.map(|(op, a, b)| coord.submit(op, vec![json!(a), json!(b)]))
		.collect();

	let mut outcomes = Vec::new();
	for fut in futures {
		outcomes.push(fut.await);
	}
	assert_eq!(
		outcomes,
		vec![
			Ok(json!(2)),
			Err(Error::Remote("Operation not supported: nope".into())),
			Ok(json!(9)),
			Ok(json!(4)),
		]
	);

	let stats = coord.stats();
	assert_eq!((stats.batches, stats.invocations, stats.fulfilled, stats.rejected), (1, 4, 3, 1));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn short_response_rejects_missing_tail() {
	let exec = Scripted::new(Duration::ZERO, |_, batch| Ok(batch.iter().take(2).map(evaluate).collect()));
	let coord = coordinator(&exec, BatchConfig::default());

	let futures: Vec<_> = (0..4).map(|n| coord.submit("echo", vec![json!(n)])).collect();
	let mut outcomes = Vec::new();
	for fut in futures {
		outcomes.push(fut.await);
	}
	assert_eq!(
		outcomes,
		vec![
			Ok(json!(0)),
			Ok(json!(1)),
			Err(Error::MissingResult { index: 2 }),
			Err(Error::MissingResult { index: 3 }),
		]
	);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn transport_failure_rejects_batch_and_leaves_store_ready() {
	let exec = Scripted::new(Duration::ZERO, |call, batch| {
		if call == 0 {
			Err(TransportError::Backend("backend unavailable".into()))
		} else {
			Ok(batch.iter().map(evaluate).collect())
		}
	});
	let coord = coordinator(&exec, BatchConfig::default());

	let a = coord.submit("add", vec![json!(1), json!(2)]);
	let b = coord.submit("mul", vec![json!(3), json!(4)]);
	let (a, b) = tokio::join!(a, b);
	let expected = Error::Dispatch("backend error: backend unavailable".into());
	assert_eq!(a, Err(expected.clone()));
	assert_eq!(b, Err(expected));
	assert_eq!(coord.pending(), 0);

	let stats = coord.stats();
	assert_eq!((stats.transport_failures, stats.rejected, stats.in_flight), (1, 2, 0));

	let c = coord.submit("add", vec![json!(5), json!(5)]);
	assert_eq!(c.await, Ok(json!(10)));
	assert_eq!(exec.calls().len(), 2);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn panicking_backend_rejects_batch_as_dispatch_failure() {
	let exec = Scripted::new(Duration::ZERO, |call, batch| {
		if call == 0 {
			panic!("backend bug");
		}
		Ok(batch.iter().map(evaluate).collect())
	});
	let coord = coordinator(&exec, BatchConfig::default());

	let a = coord.submit("add", vec![json!(1), json!(2)]);
	let b = coord.submit("mul", vec![json!(3), json!(4)]);
	let (a, b) = tokio::join!(a, b);
	for outcome in [&a, &b] {
		assert!(matches!(outcome, Err(Error::Dispatch(msg)) if msg.contains("panicked")), "{outcome:?}");
	}

	let stats = coord.stats();
	assert_eq!((stats.batches, stats.rejected, stats.transport_failures, stats.in_flight), (1, 2, 1, 0));

	let c = coord.submit("add", vec![json!(5), json!(5)]);
	assert_eq!(c.await, Ok(json!(10)));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn dropped_flush_still_settles_the_batch() {
	let exec = Scripted::arithmetic(Duration::from_secs(1));
	let coord = coordinator(&exec, BatchConfig::default());

	let a = coord.submit("echo", vec![json!(1)]);
	let flushed = tokio::time::timeout(Duration::from_millis(10), coord.flush()).await;
	assert!(flushed.is_err());
	assert_eq!(coord.stats().in_flight, 1);

	assert_eq!(a.await, Ok(json!(1)));
	let stats = coord.stats();
	assert_eq!((stats.fulfilled, stats.in_flight), (1, 0));
	assert_eq!(exec.calls().len(), 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn submissions_during_dispatch_start_a_new_batch() {
	let exec = Scripted::arithmetic(Duration::from_secs(1));
	let coord = coordinator(&exec, BatchConfig::default());

	let first = coord.submit("add", vec![json!(1), json!(1)]);
	sleep(Duration::from_millis(150)).await;
	assert_eq!(exec.calls().len(), 1);
	assert_eq!(coord.stats().in_flight, 1);

	let second = coord.submit("add", vec![json!(2), json!(2)]);
	sleep(Duration::from_millis(150)).await;
	assert_eq!(exec.calls().len(), 2, "second batch must not wait for the first to return");
	assert_eq!(coord.stats().in_flight, 2);

	assert_eq!(first.await, Ok(json!(2)));
	assert_eq!(second.await, Ok(json!(4)));
	assert_eq!(coord.stats().in_flight, 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn next_submission_after_idle_arms_a_fresh_timer() {
	let exec = Scripted::arithmetic(Duration::ZERO);
	let coord = coordinator(&exec, BatchConfig::default());

	assert_eq!(coord.submit("echo", vec![json!("a")]).await, Ok(json!("a")));
	sleep(Duration::from_secs(5)).await;
	assert_eq!(coord.submit("echo", vec![json!("b")]).await, Ok(json!("b")));

	assert_eq!(exec.calls().len(), 2);
	assert_eq!(coord.stats().batches, 2);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn explicit_flush_turns_armed_timer_into_noop() {
	let exec = Scripted::arithmetic(Duration::ZERO);
	let coord = coordinator(&exec, BatchConfig::default());

	let a = coord.submit("echo", vec![json!(1)]);
	assert_eq!(coord.flush().await, 1);
	assert_eq!(a.await, Ok(json!(1)));

	sleep(Duration::from_millis(10)).await;
	let b = coord.submit("echo", vec![json!(2)]);

	// The first window's timer fires at 100ms and must not take `b` early.
	sleep(Duration::from_millis(95)).await;
	assert_eq!(exec.calls().len(), 1);
	assert_eq!(coord.pending(), 1);

	assert_eq!(b.await, Ok(json!(2)));
	assert_eq!(exec.calls().len(), 2);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn flush_on_empty_store_sends_nothing() {
	let exec = Scripted::arithmetic(Duration::ZERO);
	let coord = coordinator(&exec, BatchConfig::default());

	assert_eq!(coord.flush().await, 0);
	assert!(exec.calls().is_empty());
	assert_eq!(coord.stats(), BatchStats::default());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn full_queue_rejects_immediately() {
	let exec = Scripted::arithmetic(Duration::ZERO);
	let coord = coordinator(&exec, BatchConfig::default().with_max_pending(2));

	let a = coord.submit("echo", vec![json!(1)]);
	let b = coord.submit("echo", vec![json!(2)]);
	let c = coord.submit("echo", vec![json!(3)]);
	assert_eq!(c.await, Err(Error::QueueFull { capacity: 2 }));
	assert_eq!(coord.pending(), 2);

	assert_eq!(a.await, Ok(json!(1)));
	assert_eq!(b.await, Ok(json!(2)));
	assert_eq!(coord.submit("echo", vec![json!(4)]).await, Ok(json!(4)));
	assert_eq!(coord.stats().rejected, 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn slow_backend_times_out_whole_batch() {
	let exec = Scripted::arithmetic(Duration::from_secs(10));
	let coord = coordinator(&exec, BatchConfig::default().with_dispatch_timeout(Duration::from_secs(1)));

	let a = coord.submit("echo", vec![json!(1)]);
	let b = coord.submit("echo", vec![json!(2)]);
	let (a, b) = tokio::join!(a, b);
	assert_eq!(a, Err(Error::Timeout(Duration::from_secs(1))));
	assert_eq!(b, Err(Error::Timeout(Duration::from_secs(1))));

	let stats = coord.stats();
	assert_eq!((stats.pending, stats.in_flight, stats.transport_failures), (0, 0, 1));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn dropped_future_does_not_disturb_batch() {
	let exec = Scripted::arithmetic(Duration::ZERO);
	let coord = coordinator(&exec, BatchConfig::default());

	drop(coord.submit("echo", vec![json!("gone")]));
	let kept = coord.submit("echo", vec![json!("kept")]);
	assert_eq!(kept.await, Ok(json!("kept")));

	assert_eq!(exec.operations(0).len(), 2);
	assert_eq!(coord.stats().fulfilled, 2);
}

proptest! {
	#[test]
	fn one_window_means_one_call_in_submission_order(values in prop::collection::vec(-1000i64..1000, 1..40)) {
		let rt = tokio::runtime::Builder::new_current_thread().enable_time().start_paused(true).build().unwrap();
		rt.block_on(async {
			let exec = Scripted::arithmetic(Duration::from_millis(5));
			let coord = coordinator(&exec, BatchConfig::default());

			let futures: Vec<_> = values.iter().map(|v| coord.submit("echo", vec![json!(v)])).collect();
			let mut results = Vec::with_capacity(futures.len());
			for fut in futures {
				results.push(fut.await.unwrap());
			}

			let calls = exec.calls();
			prop_assert_eq!(calls.len(), 1);
			let sent: Vec<i64> = calls[0].iter().map(|req| req.args[0].as_i64().unwrap()).collect();
			prop_assert_eq!(&sent, &values);
			let received: Vec<i64> = results.iter().map(|v| v.as_i64().unwrap()).collect();
			prop_assert_eq!(&received, &values);
			Ok(())
		})?;
	}
}
