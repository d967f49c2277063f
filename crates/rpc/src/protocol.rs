//! Frame shapes and newline-delimited JSON codec.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tally_batch::{Request, Response, TransportError};
use tally_worker::TaskClass;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Simple counter-based frame id generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct CounterIdGen(pub u64);

impl CounterIdGen {
	/// Creates a new counter starting at 0.
	#[must_use]
	pub const fn new() -> Self {
		Self(0)
	}

	/// Generates the next unique ID and increments the counter.
	#[allow(clippy::should_implement_trait, reason = "convention")]
	pub fn next(&mut self) -> u64 {
		let id = self.0;
		self.0 = self.0.wrapping_add(1);
		id
	}
}

/// Client to server: one batch to evaluate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFrame {
	/// Correlates the reply.
	pub id: u64,
	/// Requests in batch order.
	pub batch: Vec<Request>,
}

/// Server to client: the answer to one [`BatchFrame`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplyFrame {
	/// The server could not evaluate the batch at all.
	Failed {
		/// Id of the answered frame.
		id: u64,
		/// Reason.
		error: String,
	},
	/// Per-item responses in batch order.
	Answered {
		/// Id of the answered frame.
		id: u64,
		/// One response per request.
		responses: Vec<Response>,
	},
}

impl ReplyFrame {
	/// Id of the answered frame.
	pub fn id(&self) -> u64 {
		match self {
			Self::Failed { id, .. } | Self::Answered { id, .. } => *id,
		}
	}

	/// Converts into an executor outcome.
	pub fn into_outcome(self) -> Result<Vec<Response>, TransportError> {
		match self {
			Self::Answered { responses, .. } => Ok(responses),
			Self::Failed { error, .. } => Err(TransportError::Backend(error)),
		}
	}
}

/// Reads one frame. Returns `None` at end of stream; blank lines are skipped.
pub async fn read_frame<T>(input: &mut (impl AsyncBufRead + Unpin)) -> Result<Option<T>, TransportError>
where
	T: DeserializeOwned,
{
	let mut line = String::new();
	loop {
		line.clear();
		if input.read_line(&mut line).await? == 0 {
			return Ok(None);
		}
		let trimmed = line.trim();
		if trimmed.is_empty() {
			continue;
		}
		return Ok(Some(serde_json::from_str(trimmed)?));
	}
}

/// Writes one frame followed by a newline and flushes.
pub async fn write_frame<T>(output: &mut (impl AsyncWrite + Unpin), frame: &T) -> Result<(), TransportError>
where
	T: Serialize,
{
	let mut buf = serde_json::to_vec(frame)?;
	buf.push(b'\n');
	output.write_all(&buf).await?;
	output.flush().await?;
	Ok(())
}

/// Moves frame reading onto its own task so callers can `select!` on a
/// cancel-safe channel instead of a partially read line.
///
/// Undecodable lines are reported and skipped. The channel closes after end
/// of stream or after an I/O error, which is delivered last.
pub(crate) fn spawn_reader<T, R>(mut input: R) -> mpsc::UnboundedReceiver<Result<T, TransportError>>
where
	T: DeserializeOwned + Send + 'static,
	R: AsyncBufRead + Unpin + Send + 'static,
{
	let (tx, rx) = mpsc::unbounded_channel();
	tally_worker::spawn(TaskClass::Transport, async move {
		loop {
			match read_frame::<T>(&mut input).await {
				Ok(Some(frame)) => {
					if tx.send(Ok(frame)).is_err() {
						break;
					}
				}
				Ok(None) => break,
				Err(TransportError::Codec(err)) => {
					if tx.send(Err(TransportError::Codec(err))).is_err() {
						break;
					}
				}
				Err(err) => {
					let _ = tx.send(Err(err));
					break;
				}
			}
		}
		tracing::trace!("rpc.reader.closed");
	});
	rx
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;
	use tokio::io::BufReader;

	use super::*;

	#[test]
	fn frames_use_documented_shapes() {
		let frame = BatchFrame {
			id: 7,
			batch: vec![Request::new("add", vec![json!(2), json!(3)])],
		};
		assert_eq!(
			serde_json::to_value(&frame).unwrap(),
			json!({ "id": 7, "batch": [{ "operation": "add", "args": [2, 3] }] })
		);

		let failed: ReplyFrame = serde_json::from_value(json!({ "id": 3, "error": "down" })).unwrap();
		assert_eq!(failed.id(), 3);
		assert!(matches!(failed.into_outcome(), Err(TransportError::Backend(msg)) if msg == "down"));

		let answered: ReplyFrame = serde_json::from_value(json!({ "id": 4, "responses": [{ "result": 1 }, { "error": "x" }] })).unwrap();
		assert_eq!(answered.into_outcome().unwrap(), vec![Response::ok(1), Response::err("x")]);
	}

	#[test]
	fn counter_ids_are_sequential() {
		let mut ids = CounterIdGen::new();
		assert_eq!((ids.next(), ids.next(), ids.next()), (0, 1, 2));
	}

	#[tokio::test]
	async fn codec_skips_blank_lines_and_stops_at_eof() {
		let mut wire = Vec::new();
		write_frame(&mut wire, &BatchFrame { id: 1, batch: vec![] }).await.unwrap();
		wire.extend_from_slice(b"\n\n");
		write_frame(&mut wire, &BatchFrame { id: 2, batch: vec![] }).await.unwrap();

		let mut input = BufReader::new(wire.as_slice());
		let first: Option<BatchFrame> = read_frame(&mut input).await.unwrap();
		let second: Option<BatchFrame> = read_frame(&mut input).await.unwrap();
		let end: Option<BatchFrame> = read_frame(&mut input).await.unwrap();
		assert_eq!(first.map(|f| f.id), Some(1));
		assert_eq!(second.map(|f| f.id), Some(2));
		assert!(end.is_none());
	}

	#[tokio::test]
	async fn reader_reports_garbage_and_keeps_going() {
		let wire = b"not json\n{\"id\":5,\"batch\":[]}\n".to_vec();
		let mut frames = spawn_reader::<BatchFrame, _>(BufReader::new(std::io::Cursor::new(wire)));

		assert!(matches!(frames.recv().await, Some(Err(TransportError::Codec(_)))));
		assert_eq!(frames.recv().await.unwrap().unwrap().id, 5);
		assert!(frames.recv().await.is_none());
	}
}
