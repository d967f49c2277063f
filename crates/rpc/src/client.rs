use std::collections::HashMap;

use async_trait::async_trait;
use tally_batch::{Executor, Request, Response, TransportError};
use tally_worker::TaskClass;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use crate::protocol::{BatchFrame, CounterIdGen, ReplyFrame, spawn_reader, write_frame};

type Reply = oneshot::Sender<Result<Vec<Response>, TransportError>>;

struct Call {
	batch: Vec<Request>,
	reply: Reply,
}

/// Executor that forwards batches to a remote [`serve`](crate::serve) loop.
///
/// Cloning is cheap; every clone shares the connection.
#[derive(Debug, Clone)]
pub struct RpcClient {
	calls: mpsc::UnboundedSender<Call>,
}

impl std::fmt::Debug for Call {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Call").field("size", &self.batch.len()).finish()
	}
}

impl RpcClient {
	/// Starts the connection task over `reader`/`writer`.
	///
	/// The task exits when the peer closes its side, on the first I/O error,
	/// or once every client handle is dropped. Outstanding calls then fail
	/// with [`TransportError::Disconnected`].
	pub fn spawn<R, W>(reader: R, writer: W) -> Self
	where
		R: AsyncRead + Unpin + Send + 'static,
		W: AsyncWrite + Unpin + Send + 'static,
	{
		let (calls, rx) = mpsc::unbounded_channel();
		tally_worker::spawn(TaskClass::Transport, client_loop(rx, BufReader::new(reader), writer));
		Self { calls }
	}

	/// Returns `true` once the connection task has exited.
	pub fn is_closed(&self) -> bool {
		self.calls.is_closed()
	}
}

#[async_trait]
impl Executor for RpcClient {
	async fn execute(&self, batch: Vec<Request>) -> Result<Vec<Response>, TransportError> {
		let (reply, rx) = oneshot::channel();
		self.calls.send(Call { batch, reply }).map_err(|_| TransportError::Disconnected)?;
		rx.await.map_err(|_| TransportError::Disconnected)?
	}
}

async fn client_loop<R, W>(mut calls: mpsc::UnboundedReceiver<Call>, reader: BufReader<R>, mut writer: W)
where
	R: AsyncRead + Unpin + Send + 'static,
	W: AsyncWrite + Unpin + Send + 'static,
{
	let mut frames = spawn_reader::<ReplyFrame, _>(reader);
	let mut ids = CounterIdGen::new();
	let mut outgoing: HashMap<u64, Reply> = HashMap::new();

	loop {
		tokio::select! {
			call = calls.recv() => {
				let Some(Call { batch, reply }) = call else {
					trace!("rpc.client.handles_dropped");
					break;
				};
				let id = ids.next();
				let size = batch.len();
				if let Err(err) = write_frame(&mut writer, &BatchFrame { id, batch }).await {
					warn!(id, error = %err, "rpc.client.write_failed");
					let _ = reply.send(Err(err));
					break;
				}
				debug!(id, size, "rpc.client.sent");
				outgoing.insert(id, reply);
			}
			frame = frames.recv() => match frame {
				Some(Ok(frame)) => {
					let id = frame.id();
					match outgoing.remove(&id) {
						Some(reply) => {
							let _ = reply.send(frame.into_outcome());
						}
						None => warn!(id, "rpc.client.unknown_reply"),
					}
				}
				Some(Err(TransportError::Codec(err))) => {
					warn!(error = %err, "rpc.client.bad_frame");
				}
				Some(Err(err)) => {
					warn!(error = %err, "rpc.client.read_failed");
					break;
				}
				None => {
					debug!(outstanding = outgoing.len(), "rpc.client.peer_closed");
					break;
				}
			},
		}
	}

	for (_, reply) in outgoing.drain() {
		let _ = reply.send(Err(TransportError::Disconnected));
	}
}
