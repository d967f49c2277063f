use std::future::Future;

use tokio::task::{AbortHandle, Id, JoinError, JoinSet};

use crate::TaskClass;

/// Classified wrapper over a tokio [`JoinSet`].
///
/// Spawns are routed through the same runtime handle as [`crate::spawn`], so
/// the set works from threads without an entered runtime.
#[derive(Debug)]
pub struct WorkerJoinSet<T> {
	class: TaskClass,
	inner: JoinSet<T>,
}

impl<T> WorkerJoinSet<T>
where
	T: Send + 'static,
{
	/// Creates an empty join set for the given task class.
	pub fn new(class: TaskClass) -> Self {
		Self { class, inner: JoinSet::new() }
	}

	/// Returns the number of tasks currently in the set.
	pub fn len(&self) -> usize {
		self.inner.len()
	}

	/// Returns `true` if the set is empty.
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	/// Spawns a future into the set.
	///
	/// The returned handle's [`id`](AbortHandle::id) identifies the task in
	/// [`Self::join_next_with_id`] results and in [`JoinError::id`].
	pub fn spawn<F>(&mut self, fut: F) -> AbortHandle
	where
		F: Future<Output = T> + Send + 'static,
	{
		tracing::trace!(worker_class = self.class.as_str(), pending = self.inner.len(), "worker.join_set.spawn");
		let handle = crate::spawn::runtime_handle();
		let _guard = handle.enter();
		self.inner.spawn(fut)
	}

	/// Waits for the next completed task.
	pub async fn join_next(&mut self) -> Option<Result<T, JoinError>> {
		self.inner.join_next().await
	}

	/// Waits for the next completed task, reporting its id.
	pub async fn join_next_with_id(&mut self) -> Option<Result<(Id, T), JoinError>> {
		self.inner.join_next_with_id().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn joins_every_spawned_task() {
		let mut set = WorkerJoinSet::new(TaskClass::Backend);
		for i in 0..4u32 {
			set.spawn(async move { i * 2 });
		}
		assert_eq!(set.len(), 4);

		let mut seen = Vec::new();
		while let Some(out) = set.join_next().await {
			seen.push(out.unwrap());
		}
		seen.sort_unstable();
		assert_eq!(seen, vec![0, 2, 4, 6]);
		assert!(set.is_empty());
	}

	#[tokio::test]
	async fn ids_match_spawn_handles() {
		let mut set = WorkerJoinSet::new(TaskClass::Backend);
		let ok = set.spawn(async { 1u8 });
		let failed = set.spawn(async { None::<u8>.expect("boom") });

		let mut seen_ok = false;
		let mut seen_failed = false;
		while let Some(out) = set.join_next_with_id().await {
			match out {
				Ok((id, value)) => {
					assert_eq!(id, ok.id());
					assert_eq!(value, 1);
					seen_ok = true;
				}
				Err(err) => {
					assert_eq!(err.id(), failed.id());
					assert!(err.is_panic());
					seen_failed = true;
				}
			}
		}
		assert!(seen_ok && seen_failed);
	}
}
