//! Recurring sweep task bound to a [`ResponseCache`]'s lifetime.

// std
use std::sync::Weak;
// crates.io
use tokio::{
	task::JoinHandle,
	time::{self, MissedTickBehavior},
};
// self
use crate::{_prelude::*, cache::ResponseCache};

/// Owns the background sweep task; stopping or dropping the handle aborts it.
#[derive(Debug)]
pub struct SweeperHandle {
	task: JoinHandle<()>,
}
impl SweeperHandle {
	/// Spawns a task that calls [`ResponseCache::sweep`] every `interval`.
	///
	/// The task holds a weak reference and exits once the cache is dropped. Spawning requires a
	/// Tokio runtime on the current thread.
	pub fn spawn(cache: &Arc<ResponseCache>, interval: std::time::Duration) -> Self {
		let cache = Arc::downgrade(cache);
		let task = tokio::spawn(run(cache, interval));

		Self { task }
	}

	/// Aborts the sweep task.
	pub fn stop(&self) {
		self.task.abort();
	}

	/// Returns `true` once the task has exited.
	pub fn is_finished(&self) -> bool {
		self.task.is_finished()
	}
}
impl Drop for SweeperHandle {
	fn drop(&mut self) {
		self.task.abort();
	}
}

async fn run(cache: Weak<ResponseCache>, interval: std::time::Duration) {
	let mut ticker = time::interval(interval);

	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
	// First tick completes immediately.
	ticker.tick().await;

	loop {
		ticker.tick().await;

		let Some(cache) = cache.upgrade() else { break };
		let removed = cache.sweep();

		#[cfg(feature = "tracing")]
		{
			if removed > 0 {
				tracing::debug!(removed, remaining = cache.len(), "portal_request.cache.sweep");
			}
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = removed;
		}
	}
}
