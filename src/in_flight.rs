//! In-flight registry that collapses concurrent identical requests into one dispatch.
//!
//! [`InFlightRegistry::begin_or_join`] is synchronous: the fingerprint is checked and, if
//! absent, registered before the caller reaches its first `.await`. The leader's work runs on
//! its own Tokio task, so callers that stop waiting do not cancel the underlying request, and
//! an RAII guard removes the entry when the task settles, even on panic.

// std
use std::sync::{
	Weak,
	atomic::{AtomicU64, Ordering},
};
// crates.io
use futures::future::{BoxFuture, FutureExt, Shared};
// self
use crate::{_prelude::*, fingerprint::Fingerprint};

/// Outcome shared by every caller attached to one in-flight request.
pub type SharedOutcome = Shared<BoxFuture<'static, Result<Value>>>;

struct Entry {
	generation: u64,
	outcome: SharedOutcome,
}

/// Tracks requests whose network call has been dispatched but not yet settled.
#[derive(Default)]
pub struct InFlightRegistry {
	entries: Mutex<HashMap<Fingerprint, Entry>>,
	generations: AtomicU64,
}
impl InFlightRegistry {
	/// Attaches to the in-flight request for `fingerprint`, or starts one via `factory`.
	///
	/// `factory` is invoked at most once per registration and never while another
	/// registration for the same fingerprint is live. Must be called within a Tokio runtime.
	pub fn begin_or_join<F, Fut>(self: &Arc<Self>, fingerprint: Fingerprint, factory: F) -> Flight
	where
		F: FnOnce() -> Fut,
		Fut: 'static + Send + Future<Output = Result<Value>>,
	{
		let mut entries = self.entries.lock();

		if let Some(entry) = entries.get(&fingerprint) {
			return Flight { role: FlightRole::Joined, outcome: entry.outcome.clone() };
		}

		let generation = self.generations.fetch_add(1, Ordering::Relaxed);
		let guard = EntryGuard {
			registry: Arc::downgrade(self),
			fingerprint: fingerprint.clone(),
			generation,
		};
		let work = factory();
		// The lock is still held, so the guard cannot run before the entry exists.
		let task = tokio::spawn(async move {
			let _guard = guard;

			work.await
		});
		let outcome = async move {
			task.await.unwrap_or_else(|e| Err(Error::Interrupted { reason: e.to_string() }))
		}
		.boxed()
		.shared();

		entries.insert(fingerprint, Entry { generation, outcome: outcome.clone() });

		Flight { role: FlightRole::Leader, outcome }
	}

	/// Returns `true` when a request with `fingerprint` is currently in flight.
	pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
		self.entries.lock().contains_key(fingerprint)
	}

	/// Number of in-flight requests.
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	/// Returns `true` when nothing is in flight.
	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}

	fn release(&self, fingerprint: &Fingerprint, generation: u64) {
		let mut entries = self.entries.lock();

		if entries.get(fingerprint).is_some_and(|entry| entry.generation == generation) {
			entries.remove(fingerprint);
		}
	}
}
impl Debug for InFlightRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("InFlightRegistry").field("len", &self.len()).finish()
	}
}

/// Whether the caller started the request or attached to an existing one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlightRole {
	/// Caller's factory produced the request.
	Leader,
	/// Caller attached to a request started by someone else.
	Joined,
}

/// Handle returned by [`InFlightRegistry::begin_or_join`].
#[must_use = "a flight does nothing for the caller unless awaited"]
pub struct Flight {
	role: FlightRole,
	outcome: SharedOutcome,
}
impl Flight {
	/// Role this caller plays.
	pub fn role(&self) -> FlightRole {
		self.role
	}

	/// Waits for the shared outcome.
	pub async fn wait(self) -> Result<Value> {
		self.outcome.await
	}
}
impl Debug for Flight {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Flight").field("role", &self.role).finish()
	}
}

struct EntryGuard {
	registry: Weak<InFlightRegistry>,
	fingerprint: Fingerprint,
	generation: u64,
}
impl Drop for EntryGuard {
	fn drop(&mut self) {
		if let Some(registry) = self.registry.upgrade() {
			registry.release(&self.fingerprint, self.generation);
		}
	}
}
