//! Coordinator batching over a real client/server pair.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tally_batch::{BatchConfig, BatchCoordinator, Error, Executor};
use tally_rates::{LocalExecutor, RateTables};
use tally_rpc::{RpcClient, serve};
use tokio::io::{duplex, split};

fn connect() -> (RpcClient, tokio::task::JoinHandle<Result<(), tally_batch::TransportError>>) {
	let (near, far) = duplex(64 * 1024);
	let (far_read, far_write) = split(far);
	let backend: Arc<dyn Executor> = Arc::new(LocalExecutor::new(RateTables::builtin().unwrap()));
	let server = tokio::spawn(serve(far_read, far_write, backend));
	let (near_read, near_write) = split(near);
	(RpcClient::spawn(near_read, near_write), server)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn one_window_is_one_frame_with_per_item_results() {
	let (client, _server) = connect();
	let coordinator = BatchCoordinator::new(client, BatchConfig::default().with_debounce(Duration::from_millis(20)));

	let (sum, product, quotient, bad, tax) = tokio::join!(
		coordinator.submit("add", vec![json!(2), json!(3)]),
		coordinator.submit("mul", vec![json!(4), json!(5)]),
		coordinator.submit("div", vec![json!(1), json!(0)]),
		coordinator.submit("bogus", vec![]),
		coordinator.submit("income_tax", vec![json!("2024-25"), json!(90_000)]),
	);

	assert_eq!(sum.unwrap(), json!(5));
	assert_eq!(product.unwrap(), json!(20));
	assert_eq!(quotient.unwrap_err(), Error::Remote("division by zero".into()));
	assert_eq!(bad.unwrap_err(), Error::Remote("Operation not supported: bogus".into()));
	assert_eq!(tax.unwrap(), json!(17_788.0));

	let stats = coordinator.stats();
	assert_eq!(stats.batches, 1);
	assert_eq!(stats.invocations, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn server_exit_rejects_later_batches() {
	let (near, far) = duplex(1024);
	drop(far);
	let (near_read, near_write) = split(near);
	let client = RpcClient::spawn(near_read, near_write);
	let coordinator = BatchCoordinator::new(client, BatchConfig::default().with_debounce(Duration::from_millis(5)));

	let err = coordinator.submit("add", vec![json!(1), json!(1)]).await.unwrap_err();
	assert!(matches!(err, Error::Dispatch(_)), "{err:?}");
}
