use std::collections::HashMap;
use std::sync::Arc;

use tally_batch::{Executor, TransportError};
use tally_worker::{TaskClass, WorkerJoinSet};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::task::Id;
use tracing::{debug, info, warn};

use crate::protocol::{BatchFrame, ReplyFrame, spawn_reader, write_frame};

/// Answers [`BatchFrame`]s from `input` on `output` using `executor`.
///
/// Frames are evaluated concurrently and replies are written as they
/// complete. Once `input` ends, in-flight frames are still answered before
/// returning. Undecodable lines are logged and skipped since they carry no
/// id to reply to.
///
/// # Errors
///
/// Returns the first I/O error from either side of the connection.
pub async fn serve<R, W>(input: R, mut output: W, executor: Arc<dyn Executor>) -> Result<(), TransportError>
where
	R: AsyncRead + Unpin + Send + 'static,
	W: AsyncWrite + Unpin,
{
	let mut frames = spawn_reader::<BatchFrame, _>(BufReader::new(input));
	let mut tasks = WorkerJoinSet::new(TaskClass::Backend);
	let mut frame_ids: HashMap<Id, u64> = HashMap::new();
	let mut input_open = true;
	let mut read_error = None;

	info!("rpc.serve.start");
	loop {
		tokio::select! {
			frame = frames.recv(), if input_open => match frame {
				Some(Ok(BatchFrame { id, batch })) => {
					debug!(id, size = batch.len(), "rpc.serve.frame");
					let executor = Arc::clone(&executor);
					let handle = tasks.spawn(async move {
						match executor.execute(batch).await {
							Ok(responses) => ReplyFrame::Answered { id, responses },
							Err(err) => ReplyFrame::Failed { id, error: err.to_string() },
						}
					});
					frame_ids.insert(handle.id(), id);
				}
				Some(Err(TransportError::Codec(err))) => warn!(error = %err, "rpc.serve.bad_frame"),
				Some(Err(err)) => {
					warn!(error = %err, "rpc.serve.read_failed");
					read_error = Some(err);
					input_open = false;
				}
				None => input_open = false,
			},
			Some(joined) = tasks.join_next_with_id(), if !tasks.is_empty() => {
				let reply = match joined {
					Ok((task, reply)) => {
						frame_ids.remove(&task);
						reply
					}
					Err(err) => {
						let Some(id) = frame_ids.remove(&err.id()) else {
							continue;
						};
						warn!(id, error = %err, "rpc.serve.task_failed");
						ReplyFrame::Failed { id, error: "backend task failed".into() }
					}
				};
				write_frame(&mut output, &reply).await?;
			}
			else => break,
		}
	}

	info!("rpc.serve.stop");
	match read_error {
		Some(err) => Err(err),
		None => Ok(()),
	}
}
