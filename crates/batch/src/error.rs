use std::io;
use std::time::Duration;

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Why an invocation was rejected.
///
/// Cloneable because a single dispatch failure is delivered to every
/// invocation of the affected batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// The backend reported a failure for this item only.
	#[error("{0}")]
	Remote(String),
	/// The response batch ended before this item's position.
	#[error("missing result for batch item {index}")]
	MissingResult {
		/// Position of the item in its batch.
		index: usize,
	},
	/// The executor call for the whole batch failed.
	#[error("batch dispatch failed: {0}")]
	Dispatch(String),
	/// The executor call exceeded the configured dispatch timeout.
	#[error("batch dispatch timed out after {0:?}")]
	Timeout(Duration),
	/// The pending queue was at its configured bound.
	#[error("pending queue is full (capacity {capacity})")]
	QueueFull {
		/// Configured bound.
		capacity: usize,
	},
	/// The settle capability was dropped without settling.
	#[error("invocation abandoned before settlement")]
	Abandoned,
}

/// Failure of an executor call as a whole.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TransportError {
	/// Input/output errors from the underlying channel.
	#[error("{0}")]
	Io(#[from] io::Error),
	/// A frame could not be encoded or decoded.
	#[error("codec error: {0}")]
	Codec(#[from] serde_json::Error),
	/// The peer went away before answering.
	#[error("backend disconnected")]
	Disconnected,
	/// The backend rejected the batch as a whole.
	#[error("backend error: {0}")]
	Backend(String),
}
