//! Session provider backed by a hosted auth service's refresh-token grant.
//!
//! The provider keeps the signed-in session and its refresh token in memory. A refresh POSTs
//! `{"refresh_token": ...}` as JSON to the configured token endpoint; providers that do not
//! rotate refresh tokens keep the previous one.

// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	error::{DecodeError, SessionError},
	http::{HttpTransport, TransportBody, TransportRequest},
	request::Method,
	session::{Secret, Session, SessionFuture, SessionProvider},
};

#[derive(Clone, Debug)]
struct SignedIn {
	session: Session,
	refresh_token: Option<Secret>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
	access_token: String,
	#[serde(default)]
	refresh_token: Option<String>,
	#[serde(default)]
	expires_in: Option<i64>,
	#[serde(default)]
	expires_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
	#[serde(default)]
	error_description: Option<String>,
	#[serde(default)]
	msg: Option<String>,
	#[serde(default)]
	error: Option<String>,
}
impl ErrorBody {
	fn into_message(self) -> Option<String> {
		self.error_description.or(self.msg).or(self.error)
	}
}

/// [`SessionProvider`] that refreshes through an auth service's token endpoint.
pub struct RefreshTokenProvider<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	token_endpoint: Url,
	headers: BTreeMap<String, String>,
	clock: Arc<dyn Clock>,
	state: RwLock<Option<SignedIn>>,
}
impl<T> RefreshTokenProvider<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a signed-out provider that refreshes against `token_endpoint`.
	pub fn new(transport: impl Into<Arc<T>>, token_endpoint: Url) -> Self {
		Self {
			transport: transport.into(),
			token_endpoint,
			headers: BTreeMap::new(),
			clock: Arc::new(SystemClock),
			state: RwLock::new(None),
		}
	}

	/// Adds a header sent with every refresh call (for example a project API key).
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Overrides the clock used to turn `expires_in` into an instant.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Installs a session obtained from sign-in.
	pub fn seed(&self, session: Session, refresh_token: Option<String>) {
		*self.state.write() =
			Some(SignedIn { session, refresh_token: refresh_token.map(Secret::new) });
	}

	/// Forgets the session and refresh token.
	pub fn sign_out(&self) {
		*self.state.write() = None;
	}

	async fn refresh_now(&self) -> Result<Session, SessionError> {
		let refresh_token = {
			let state = self.state.read();
			let signed_in = state.as_ref().ok_or(SessionError::NotSignedIn)?;

			signed_in.refresh_token.clone().ok_or(SessionError::MissingRefreshToken)?
		};
		let body = serde_json::json!({ "refresh_token": refresh_token.expose() });
		let mut headers = self
			.headers
			.iter()
			.map(|(name, value)| (name.clone(), value.clone()))
			.collect::<Vec<_>>();

		headers.push(("content-type".into(), "application/json".into()));

		let request = TransportRequest {
			method: Method::Post,
			url: self.token_endpoint.clone(),
			headers,
			body: TransportBody::Text(body.to_string()),
		};
		let response = self.transport.send(request).await?;

		if !response.is_success() {
			let message = serde_json::from_slice::<ErrorBody>(&response.body)
				.ok()
				.and_then(ErrorBody::into_message)
				.or(response.reason)
				.unwrap_or_else(|| format!("HTTP {}", response.status));

			return Err(SessionError::Rejected { status: response.status, message });
		}

		let mut deserializer = serde_json::Deserializer::from_slice(&response.body);
		let token: TokenResponse = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(DecodeError::from)?;
		let now = self.clock.now();
		let expires_at = match (token.expires_at, token.expires_in) {
			(Some(unix), _) => OffsetDateTime::from_unix_timestamp(unix)
				.map_err(|_| SessionError::ExpiryOutOfRange)?,
			(None, Some(secs)) if secs > 0 =>
				now.checked_add(Duration::seconds(secs)).ok_or(SessionError::ExpiryOutOfRange)?,
			(None, Some(_)) => return Err(SessionError::NonPositiveExpiry),
			(None, None) => return Err(SessionError::MissingExpiry),
		};

		if expires_at <= now {
			return Err(SessionError::NonPositiveExpiry);
		}

		let session = Session::new(token.access_token, expires_at);
		let rotated = token.refresh_token.map(Secret::new).unwrap_or(refresh_token);

		*self.state.write() =
			Some(SignedIn { session: session.clone(), refresh_token: Some(rotated) });

		Ok(session)
	}
}
impl<T> SessionProvider for RefreshTokenProvider<T>
where
	T: ?Sized + HttpTransport,
{
	fn current_session(&self) -> SessionFuture<'_, Option<Session>> {
		let current = self.state.read().as_ref().map(|signed_in| signed_in.session.clone());

		Box::pin(async move { Ok(current) })
	}

	fn refresh_session(&self) -> SessionFuture<'_, Session> {
		Box::pin(self.refresh_now())
	}
}
impl<T> Debug for RefreshTokenProvider<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshTokenProvider")
			.field("token_endpoint", &self.token_endpoint.as_str())
			.field("signed_in", &self.state.read().is_some())
			.finish()
	}
}
