//! Error types shared by the cache, session, transport, and executor layers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type SharedError = Arc<dyn StdError + Send + Sync>;

/// Canonical error surfaced by every public request operation.
///
/// The type is `Clone` because a single failure is delivered to every caller joined on the
/// same in-flight request.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Backend answered with a non-2xx status that survived the retry policy.
	#[error(transparent)]
	Request(#[from] RequestError),
	/// Session provider could not supply a usable session.
	#[error(transparent)]
	Session(#[from] SessionError),
	/// No response was received (DNS, TCP, TLS, malformed request parts).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Response body could not be decoded.
	#[error(transparent)]
	Decode(#[from] DecodeError),

	/// Structured request body could not be serialized.
	#[error("Request body could not be encoded: {message}.")]
	Encode {
		/// Serializer-supplied reason.
		message: String,
	},
	/// In-flight task ended without producing an outcome.
	#[error("In-flight request was interrupted: {reason}.")]
	Interrupted {
		/// Runtime-supplied reason (panic or cancellation).
		reason: String,
	},
}
impl Error {
	/// Returns the HTTP status carried by the error, if the backend produced one.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Request(e) => Some(e.status),
			Self::Session(SessionError::Rejected { status, .. }) => Some(*status),
			_ => None,
		}
	}

	/// Returns `true` when the caller should treat the failure as "sign in again".
	pub fn is_unauthorized(&self) -> bool {
		matches!(self, Self::Request(e) if e.status == 401) || matches!(self, Self::Session(_))
	}
}

/// Normalized failure shape for non-2xx backend responses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
#[error("Request failed with status {status}: {message}.")]
pub struct RequestError {
	/// HTTP status code returned by the backend.
	pub status: u16,
	/// Message extracted from the error body, or the status line text.
	pub message: String,
}
impl RequestError {
	/// Creates a new request error.
	pub fn new(status: u16, message: impl Into<String>) -> Self {
		Self { status, message: message.into() }
	}

	/// Terminal authorization failure surfaced when the reactive refresh cannot recover.
	pub fn unauthorized() -> Self {
		Self::new(401, "unauthorized")
	}
}

/// Session provider failures.
#[derive(Clone, Debug, ThisError)]
pub enum SessionError {
	/// No session exists and nothing is available to mint one.
	#[error("No signed-in session is available.")]
	NotSignedIn,
	/// Stored session has no refresh token to rotate with.
	#[error("Stored session is missing a refresh token.")]
	MissingRefreshToken,
	/// Auth service rejected the refresh.
	#[error("Auth service rejected the session refresh with status {status}: {message}.")]
	Rejected {
		/// HTTP status code returned by the auth service.
		status: u16,
		/// Provider-supplied reason string.
		message: String,
	},
	/// Token response omitted every expiry field.
	#[error("Token response is missing expires_in and expires_at.")]
	MissingExpiry,
	/// Token response carried a non-positive lifetime.
	#[error("Token response expiry must lie in the future.")]
	NonPositiveExpiry,
	/// Token response expiry cannot be represented as a timestamp.
	#[error("Token response expiry is out of range.")]
	ExpiryOutOfRange,
	/// Token response was not the expected JSON shape.
	#[error(transparent)]
	Decode(#[from] DecodeError),
	/// Transport failure while contacting the auth service.
	#[error(transparent)]
	Transport(#[from] TransportError),
}

/// Transport-level failures (no HTTP response was produced).
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
	/// Request could not be assembled by the transport (bad header, bad MIME type).
	#[error("Request could not be assembled: {reason}.")]
	InvalidRequest {
		/// Transport-supplied reason.
		reason: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Arc::new(src) }
	}

	/// Builds an [`TransportError::InvalidRequest`] from any displayable reason.
	pub fn invalid_request(reason: impl Display) -> Self {
		Self::InvalidRequest { reason: reason.to_string() }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Configuration and validation failures raised while building or addressing the client.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed: {reason}.")]
	HttpClientBuild {
		/// Builder-supplied reason.
		reason: String,
	},
	/// Builder was finalized without a session provider.
	#[error("A session provider is required.")]
	MissingSessionProvider,
	/// Base URL must use HTTP or HTTPS.
	#[error("Base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Offending URL.
		url: String,
	},
	/// Cache TTL must be positive.
	#[error("Cache TTL must be positive.")]
	NonPositiveCacheTtl,
	/// Sweep interval must be positive.
	#[error("Sweep interval must be positive.")]
	NonPositiveSweepInterval,
	/// The cache sweeper needs a Tokio runtime to live on.
	#[error("The cache sweeper requires a running Tokio runtime.")]
	RuntimeUnavailable,
	/// Endpoint could not be resolved against the base URL.
	#[error("Endpoint `{endpoint}` does not form a valid URL.")]
	InvalidEndpoint {
		/// Endpoint as supplied by the caller.
		endpoint: String,
	},
}

/// Response decoding failure.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Response body could not be decoded at `{path}`: {message}.")]
pub struct DecodeError {
	/// JSON path of the offending field (`.` for the document root).
	pub path: String,
	/// Parser-supplied reason.
	pub message: String,
}
impl From<serde_path_to_error::Error<serde_json::Error>> for DecodeError {
	fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
		Self { path: e.path().to_string(), message: e.inner().to_string() }
	}
}
impl From<serde_json::Error> for DecodeError {
	fn from(e: serde_json::Error) -> Self {
		Self { path: ".".into(), message: e.to_string() }
	}
}
