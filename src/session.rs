//! Session provider boundary: the external auth service that owns access tokens.
//!
//! The request layer only reads sessions and asks for refreshes; token issuance, parsing, and
//! persistence stay behind [`SessionProvider`].

pub mod refresh_token;

pub use refresh_token::RefreshTokenProvider;

// self
use crate::{_prelude::*, error::SessionError};

/// Boxed future returned by [`SessionProvider`] methods.
pub type SessionFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SessionError>> + 'a + Send>>;

/// Facade over the external auth provider.
pub trait SessionProvider
where
	Self: Send + Sync,
{
	/// Returns the current session, if the user is signed in.
	fn current_session(&self) -> SessionFuture<'_, Option<Session>>;

	/// Asks the provider to mint a new session.
	fn refresh_session(&self) -> SessionFuture<'_, Session>;
}

/// Redacting wrapper for bearer and refresh tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);
impl Secret {
	/// Wraps a token value.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the raw token. Never log the result.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("Secret(<redacted>)")
	}
}

/// Access token plus its expiry, as issued by the session provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
	/// Bearer token presented to the backend.
	pub access_token: Secret,
	/// Instant the access token stops being accepted.
	pub expires_at: OffsetDateTime,
}
impl Session {
	/// Creates a session from a raw token and expiry.
	pub fn new(access_token: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { access_token: Secret::new(access_token), expires_at }
	}

	/// Returns `true` once `now` reaches the expiry instant.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		now >= self.expires_at
	}

	/// Returns `true` when the session lapses within `window` of `now`.
	pub fn expires_within(&self, window: Duration, now: OffsetDateTime) -> bool {
		self.expires_at - now <= window
	}

	/// `Authorization` header value for this session.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.access_token.expose())
	}
}
