// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Why a refresh was sent to the session provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshTrigger {
	/// The session was missing or about to lapse before a request.
	Proactive,
	/// The backend answered 401 with the current token.
	Rejected,
}

/// Counters for session refreshes, split by what triggered them.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	proactive: AtomicU64,
	rejected: AtomicU64,
	reused: AtomicU64,
	failed: AtomicU64,
}
impl RefreshMetrics {
	/// Provider refresh calls of either trigger.
	pub fn attempts(&self) -> u64 {
		self.proactive() + self.rejected()
	}

	/// Provider refresh calls made ahead of a request.
	pub fn proactive(&self) -> u64 {
		self.proactive.load(Ordering::Relaxed)
	}

	/// Provider refresh calls made after a 401.
	pub fn rejected(&self) -> u64 {
		self.rejected.load(Ordering::Relaxed)
	}

	/// Rejections answered with a session another caller had already rotated in.
	pub fn reused(&self) -> u64 {
		self.reused.load(Ordering::Relaxed)
	}

	/// Provider refresh calls that returned an error.
	pub fn failures(&self) -> u64 {
		self.failed.load(Ordering::Relaxed)
	}

	pub(crate) fn record_refresh(&self, trigger: RefreshTrigger) {
		let counter = match trigger {
			RefreshTrigger::Proactive => &self.proactive,
			RefreshTrigger::Rejected => &self.rejected,
		};

		counter.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_reuse(&self) {
		self.reused.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failed.fetch_add(1, Ordering::Relaxed);
	}
}
