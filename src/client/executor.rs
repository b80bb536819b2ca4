//! Request executor: cache lookup, in-flight join, and the bounded refresh-and-retry loop.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	cache::ResponseCache,
	error::{ConfigError, DecodeError, RequestError},
	fingerprint::Fingerprint,
	http::{HttpTransport, TransportBody, TransportRequest, TransportResponse},
	in_flight::{FlightRole, InFlightRegistry},
	obs::{self, OperationKind, OperationSpan, Outcome},
	request::{FileUpload, Method, MultipartPayload, RequestBody, RequestOptions},
	session::Session,
	token::TokenManager,
};

/// A 401 is retried at most this many times, each time after one reactive refresh.
const MAX_AUTH_RETRIES: u8 = 1;

#[derive(Debug, Deserialize)]
struct ErrorBody {
	#[serde(default)]
	error: Option<String>,
}

#[derive(Clone)]
pub(crate) struct Executor {
	pub(crate) base_url: Url,
	pub(crate) transport: Arc<dyn HttpTransport>,
	pub(crate) cache: Arc<ResponseCache>,
	pub(crate) in_flight: Arc<InFlightRegistry>,
	pub(crate) tokens: Arc<TokenManager>,
}
impl Executor {
	pub(crate) async fn execute(&self, endpoint: &str, options: RequestOptions) -> Result<Value> {
		const KIND: OperationKind = OperationKind::Request;

		let span = OperationSpan::for_endpoint(KIND, "api_request", endpoint);
		let flight = {
			let _entered = span.clone().entered();

			obs::record_outcome(KIND, Outcome::Attempt);

			let fingerprint = Fingerprint::compute(endpoint, &options);

			if options.is_cacheable()
				&& let Some(payload) = self.cache.get(&fingerprint)
			{
				obs::record_outcome(KIND, Outcome::CacheHit);

				return Ok(payload);
			}

			let executor = self.clone();
			let leader_span = span.clone();
			let endpoint = endpoint.to_owned();
			let key = fingerprint.clone();

			// Registration happens here, before the caller's first suspension point.
			self.in_flight.begin_or_join(fingerprint, move || {
				let run_span = leader_span.clone();

				leader_span.instrument(async move {
					executor.run(endpoint, key, options, run_span).await
				})
			})
		};

		if flight.role() == FlightRole::Joined {
			obs::record_outcome(KIND, Outcome::Joined);
		}

		let result = span.instrument(flight.wait()).await;

		record_result(KIND, &result);

		result
	}

	pub(crate) async fn execute_as<T>(&self, endpoint: &str, options: RequestOptions) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let payload = self.execute(endpoint, options).await?;

		serde_path_to_error::deserialize(payload).map_err(|e| DecodeError::from(e).into())
	}

	pub(crate) async fn upload(
		&self,
		endpoint: &str,
		file: FileUpload,
		extra_fields: &BTreeMap<String, String>,
	) -> Result<Value> {
		const KIND: OperationKind = OperationKind::Upload;

		let span = OperationSpan::for_endpoint(KIND, "upload_file", endpoint);

		obs::record_outcome(KIND, Outcome::Attempt);

		let options = RequestOptions::with_method(Method::Post)
			.multipart(MultipartPayload::for_upload(file, extra_fields));
		let result = span.instrument(self.send_upload(endpoint, options, &span)).await;

		record_result(KIND, &result);

		result
	}

	pub(crate) fn resolve(&self, endpoint: &str) -> Result<Url, ConfigError> {
		let invalid = || ConfigError::InvalidEndpoint { endpoint: endpoint.to_owned() };

		if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
			return Url::parse(endpoint).map_err(|_| invalid());
		}

		let base = self.base_url.as_str().trim_end_matches('/');
		let path = endpoint.trim_start_matches('/');

		Url::parse(&format!("{base}/{path}")).map_err(|_| invalid())
	}

	async fn run(
		self,
		endpoint: String,
		fingerprint: Fingerprint,
		options: RequestOptions,
		span: OperationSpan,
	) -> Result<Value> {
		let url = self.resolve(&endpoint)?;
		let mut session = self.fresh_session().await?;
		let mut retries = 0;
		let response = loop {
			let response = self.transport.send(assemble(&url, &options, &session)).await?;

			if response.status != 401 || retries >= MAX_AUTH_RETRIES {
				break response;
			}

			retries += 1;
			session = self
				.tokens
				.refresh_after_rejection(&session)
				.await
				.map_err(|e| auth_failure("refresh_after_rejection", e))?;

			obs::record_outcome(OperationKind::Request, Outcome::Retry);
		};

		span.record_status(response.status);

		let payload = interpret(response)?;

		if options.is_cacheable() {
			self.cache.put(fingerprint, payload.clone());
		}

		Ok(payload)
	}

	async fn fresh_session(&self) -> Result<Session> {
		self.tokens
			.ensure_fresh_session()
			.await
			.map_err(|e| auth_failure("ensure_fresh_session", e))
	}

	async fn send_upload(
		&self,
		endpoint: &str,
		options: RequestOptions,
		span: &OperationSpan,
	) -> Result<Value> {
		let url = self.resolve(endpoint)?;
		let session = self.fresh_session().await?;
		let response = self.transport.send(assemble(&url, &options, &session)).await?;

		span.record_status(response.status);

		interpret(response)
	}
}
impl Debug for Executor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Executor")
			.field("base_url", &self.base_url.as_str())
			.field("cache", &self.cache)
			.field("in_flight", &self.in_flight)
			.finish()
	}
}

fn record_result<T>(kind: OperationKind, result: &Result<T>) {
	match result {
		Ok(_) => obs::record_outcome(kind, Outcome::Success),
		Err(_) => obs::record_outcome(kind, Outcome::Failure),
	}
}

/// Merges caller headers under the session's bearer token and encodes the body.
// Every refresh failure reaches the caller as the same 401 a rejected request would produce.
fn auth_failure(stage: &'static str, _cause: Error) -> Error {
	#[cfg(feature = "tracing")]
	tracing::debug!(stage, error = %_cause, "portal_request.refresh_failed");
	#[cfg(not(feature = "tracing"))]
	let _ = stage;

	RequestError::unauthorized().into()
}

fn assemble(url: &Url, options: &RequestOptions, session: &Session) -> TransportRequest {
	let opaque = options.body.as_ref().is_some_and(RequestBody::is_opaque);
	let mut headers = options
		.headers
		.iter()
		.filter(|(name, _)| !name.eq_ignore_ascii_case("authorization"))
		.filter(|(name, _)| !(opaque && name.eq_ignore_ascii_case("content-type")))
		.map(|(name, value)| (name.clone(), value.clone()))
		.collect::<Vec<_>>();

	if !opaque && !headers.iter().any(|(name, _)| name.eq_ignore_ascii_case("content-type")) {
		headers.push(("content-type".into(), "application/json".into()));
	}

	headers.push(("authorization".into(), session.bearer()));

	let body = match &options.body {
		None => TransportBody::Empty,
		Some(RequestBody::Json(value)) => TransportBody::Text(value.to_string()),
		Some(RequestBody::Binary(bytes)) => TransportBody::Binary(bytes.clone()),
		Some(RequestBody::Multipart(form)) => TransportBody::Multipart(form.clone()),
	};

	TransportRequest { method: options.effective_method(), url: url.clone(), headers, body }
}

fn interpret(response: TransportResponse) -> Result<Value> {
	if !response.is_success() {
		let message = serde_json::from_slice::<ErrorBody>(&response.body)
			.ok()
			.and_then(|body| body.error)
			.or(response.reason)
			.unwrap_or_else(|| format!("HTTP {}", response.status));

		return Err(RequestError::new(response.status, message).into());
	}
	if response.body.iter().all(u8::is_ascii_whitespace) {
		return Ok(Value::Null);
	}

	serde_json::from_slice(&response.body).map_err(|e| DecodeError::from(e).into())
}
