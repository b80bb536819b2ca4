//! Token lifecycle policy: when to refresh a session, never how.
//!
//! [`TokenManager::ensure_fresh_session`] is the proactive path that runs before a request and
//! refreshes when the session is absent or lapses within the look-ahead window.
//! [`TokenManager::refresh_after_rejection`] is the reactive path invoked after a 401 and
//! performs at most one refresh. Both share a singleflight guard so concurrent callers collapse
//! onto one provider call, and neither retries a failed refresh.

mod metrics;

pub use metrics::{RefreshMetrics, RefreshTrigger};

// self
use crate::{
	_prelude::*,
	clock::Clock,
	obs::{self, OperationKind, OperationSpan, Outcome},
	session::{Session, SessionProvider},
};

/// Look-ahead window used when none is configured.
pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::seconds(60);

/// Decides when the session must be refreshed and delegates the refresh to the provider.
pub struct TokenManager {
	provider: Arc<dyn SessionProvider>,
	clock: Arc<dyn Clock>,
	refresh_window: Duration,
	refresh_guard: AsyncMutex<()>,
	metrics: RefreshMetrics,
}
impl TokenManager {
	/// Creates a manager; negative windows are clamped to zero.
	pub fn new(
		provider: Arc<dyn SessionProvider>,
		clock: Arc<dyn Clock>,
		refresh_window: Duration,
	) -> Self {
		Self {
			provider,
			clock,
			refresh_window: if refresh_window.is_negative() { Duration::ZERO } else { refresh_window },
			refresh_guard: AsyncMutex::new(()),
			metrics: RefreshMetrics::default(),
		}
	}

	/// Configured look-ahead window.
	pub fn refresh_window(&self) -> Duration {
		self.refresh_window
	}

	/// Refresh counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Returns a session that stays valid beyond the look-ahead window, refreshing if needed.
	pub async fn ensure_fresh_session(&self) -> Result<Session> {
		if let Some(session) = self.usable_session().await? {
			return Ok(session);
		}

		let _singleflight = self.refresh_guard.lock().await;

		// A concurrent caller may have refreshed while this one waited on the guard.
		if let Some(session) = self.usable_session().await? {
			return Ok(session);
		}

		self.refresh(RefreshTrigger::Proactive).await
	}

	/// Performs the single refresh allowed after the backend rejected `rejected`.
	///
	/// When the provider already holds a different, usable session (another caller refreshed in
	/// the meantime) that session is returned without a second provider call.
	pub async fn refresh_after_rejection(&self, rejected: &Session) -> Result<Session> {
		let _singleflight = self.refresh_guard.lock().await;

		if let Some(session) = self.usable_session().await?
			&& session.access_token != rejected.access_token
		{
			self.metrics.record_reuse();

			return Ok(session);
		}

		self.refresh(RefreshTrigger::Rejected).await
	}

	fn needs_refresh(&self, session: &Session, now: OffsetDateTime) -> bool {
		session.is_expired_at(now) || session.expires_within(self.refresh_window, now)
	}

	async fn usable_session(&self) -> Result<Option<Session>> {
		let current = self.provider.current_session().await?;
		let now = self.clock.now();

		Ok(current.filter(|session| !self.needs_refresh(session, now)))
	}

	async fn refresh(&self, trigger: RefreshTrigger) -> Result<Session> {
		const KIND: OperationKind = OperationKind::Refresh;

		let span = OperationSpan::new(KIND, "refresh_session");

		obs::record_outcome(KIND, Outcome::Attempt);
		self.metrics.record_refresh(trigger);

		let result = span.instrument(self.provider.refresh_session()).await;

		match &result {
			Ok(_) => obs::record_outcome(KIND, Outcome::Success),
			Err(_) => {
				self.metrics.record_failure();
				obs::record_outcome(KIND, Outcome::Failure);
			},
		}

		result.map_err(Error::from)
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("refresh_window", &self.refresh_window)
			.field("metrics", &self.metrics)
			.finish()
	}
}
