//! Time-to-live response cache keyed by request fingerprint.
//!
//! Entries expire lazily on read once `now - stored_at >= ttl`, are removed eagerly by
//! [`ResponseCache::sweep`], and can be invalidated by endpoint prefix. The cache is owned by
//! the executor; nothing else writes to it.

pub mod sweeper;

pub use sweeper::SweeperHandle;

// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	fingerprint::Fingerprint,
};

/// Cache lifetime used when no TTL is configured.
pub const DEFAULT_TTL: Duration = Duration::minutes(10);

/// Cached response body plus the instant it was stored.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
	/// Decoded response payload.
	pub payload: Value,
	/// Instant the payload was written.
	pub stored_at: OffsetDateTime,
}
impl CacheEntry {
	fn is_expired_at(&self, now: OffsetDateTime, ttl: Duration) -> bool {
		now - self.stored_at >= ttl
	}
}

/// In-memory TTL store for cacheable responses.
pub struct ResponseCache {
	ttl: Duration,
	clock: Arc<dyn Clock>,
	entries: RwLock<HashMap<Fingerprint, CacheEntry>>,
}
impl ResponseCache {
	/// Creates a cache with the provided TTL and clock.
	pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
		Self { ttl, clock, entries: Default::default() }
	}

	/// Configured TTL.
	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Returns the cached payload, dropping the entry if it has outlived the TTL.
	pub fn get(&self, fingerprint: &Fingerprint) -> Option<Value> {
		let now = self.clock.now();

		{
			let entries = self.entries.read();
			let entry = entries.get(fingerprint)?;

			if !entry.is_expired_at(now, self.ttl) {
				return Some(entry.payload.clone());
			}
		}

		let mut entries = self.entries.write();

		// Another writer may have refreshed the entry between the two locks.
		if entries.get(fingerprint).is_some_and(|entry| entry.is_expired_at(now, self.ttl)) {
			entries.remove(fingerprint);
		}

		None
	}

	/// Stores `payload`, overwriting any existing entry and stamping the current time.
	pub fn put(&self, fingerprint: Fingerprint, payload: Value) {
		let entry = CacheEntry { payload, stored_at: self.clock.now() };

		self.entries.write().insert(fingerprint, entry);
	}

	/// Removes entries whose fingerprint starts with `prefix`, or every entry when `None`.
	///
	/// Returns the number of removed entries.
	pub fn invalidate(&self, prefix: Option<&str>) -> usize {
		let mut entries = self.entries.write();
		let before = entries.len();

		match prefix {
			Some(prefix) => entries.retain(|fingerprint, _| !fingerprint.starts_with(prefix)),
			None => entries.clear(),
		}

		before - entries.len()
	}

	/// Removes every expired entry and returns how many were dropped.
	pub fn sweep(&self) -> usize {
		let now = self.clock.now();
		let mut entries = self.entries.write();
		let before = entries.len();

		entries.retain(|_, entry| !entry.is_expired_at(now, self.ttl));

		before - entries.len()
	}

	/// Number of stored entries, expired ones included.
	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}
}
impl Default for ResponseCache {
	fn default() -> Self {
		Self::new(DEFAULT_TTL, Arc::new(SystemClock))
	}
}
impl Debug for ResponseCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ResponseCache").field("ttl", &self.ttl).field("len", &self.len()).finish()
	}
}
