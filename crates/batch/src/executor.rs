use std::sync::Arc;

use async_trait::async_trait;

use crate::TransportError;
use crate::wire::{Request, Response};

/// The backend a coordinator sends its batches to.
///
/// Implementations must answer with exactly one [`Response`] per [`Request`],
/// in request order. The coordinator rejects the tail of a short answer and
/// ignores surplus entries, but never reorders.
#[async_trait]
pub trait Executor: Send + Sync + 'static {
	/// Evaluates one batch.
	async fn execute(&self, batch: Vec<Request>) -> Result<Vec<Response>, TransportError>;
}

#[async_trait]
impl<E> Executor for Arc<E>
where
	E: Executor + ?Sized,
{
	async fn execute(&self, batch: Vec<Request>) -> Result<Vec<Response>, TransportError> {
		(**self).execute(batch).await
	}
}
