//! Public request API and its builder.
//!
//! [`ApiClient`] is the single chokepoint screens call through. It owns the response cache,
//! the in-flight registry, and the token manager as explicit instances, so each client (and
//! each test) gets its own independently resettable stores. Clones share all of them.

mod executor;

// crates.io
use serde::de::DeserializeOwned;
// self
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;
use crate::{
	_prelude::*,
	cache::{DEFAULT_TTL, ResponseCache, SweeperHandle},
	client::executor::Executor,
	clock::{Clock, SystemClock},
	error::ConfigError,
	http::HttpTransport,
	in_flight::InFlightRegistry,
	request::{FileUpload, Method, RequestOptions},
	session::SessionProvider,
	token::{DEFAULT_REFRESH_WINDOW, TokenManager},
};

/// Portal request client combining caching, deduplication, and session-aware retry.
#[derive(Clone)]
pub struct ApiClient {
	executor: Executor,
	sweeper: Option<Arc<SweeperHandle>>,
}
impl ApiClient {
	/// Starts configuring a client whose relative endpoints resolve against `base_url`.
	pub fn builder(base_url: Url) -> ApiClientBuilder {
		ApiClientBuilder::new(base_url)
	}

	/// Issues a request and returns the decoded JSON payload.
	///
	/// Cacheable requests (`GET` without `no_cache`) are served from the cache while fresh.
	/// Every request, cacheable or not, joins an identical in-flight request when one exists.
	/// A 401 triggers exactly one session refresh and one retry.
	pub async fn api_request(&self, endpoint: &str, options: RequestOptions) -> Result<Value> {
		self.executor.execute(endpoint, options).await
	}

	/// Same as [`ApiClient::api_request`], decoding the payload into `T`.
	pub async fn api_request_as<T>(&self, endpoint: &str, options: RequestOptions) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.executor.execute_as(endpoint, options).await
	}

	/// Cacheable `GET`.
	pub async fn get(&self, endpoint: &str) -> Result<Value> {
		self.api_request(endpoint, RequestOptions::get()).await
	}

	/// `POST` with a JSON body.
	pub async fn post(&self, endpoint: &str, body: Value) -> Result<Value> {
		self.api_request(endpoint, RequestOptions::with_method(Method::Post).json(body)).await
	}

	/// `PUT` with a JSON body.
	pub async fn put(&self, endpoint: &str, body: Value) -> Result<Value> {
		self.api_request(endpoint, RequestOptions::with_method(Method::Put).json(body)).await
	}

	/// `PATCH` with a JSON body.
	pub async fn patch(&self, endpoint: &str, body: Value) -> Result<Value> {
		self.api_request(endpoint, RequestOptions::with_method(Method::Patch).json(body)).await
	}

	/// `DELETE` without a body.
	pub async fn delete(&self, endpoint: &str) -> Result<Value> {
		self.api_request(endpoint, RequestOptions::with_method(Method::Delete)).await
	}

	/// Uploads `file` as multipart form field `file`, plus each entry of `extra_fields`.
	///
	/// Uploads bypass the cache and the in-flight registry and are never retried; the session
	/// is still refreshed proactively before sending.
	pub async fn upload_file(
		&self,
		endpoint: &str,
		file: FileUpload,
		extra_fields: BTreeMap<String, String>,
	) -> Result<Value> {
		self.executor.upload(endpoint, file, &extra_fields).await
	}

	/// Drops cached variants of `endpoint_prefix`, or the whole cache for `None`.
	///
	/// Returns the number of removed entries.
	pub fn clear_cache(&self, endpoint_prefix: Option<&str>) -> usize {
		self.executor.cache.invalidate(endpoint_prefix)
	}

	/// Response cache shared by this client and its clones.
	pub fn cache(&self) -> &Arc<ResponseCache> {
		&self.executor.cache
	}

	/// In-flight registry shared by this client and its clones.
	pub fn in_flight(&self) -> &Arc<InFlightRegistry> {
		&self.executor.in_flight
	}

	/// Token manager shared by this client and its clones.
	pub fn tokens(&self) -> &Arc<TokenManager> {
		&self.executor.tokens
	}

	/// Background sweeper, when enabled.
	pub fn sweeper(&self) -> Option<&SweeperHandle> {
		self.sweeper.as_deref()
	}

	/// Resolves `endpoint` the way requests do.
	pub fn resolve(&self, endpoint: &str) -> Result<Url> {
		self.executor.resolve(endpoint).map_err(Error::from)
	}
}
impl Debug for ApiClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("executor", &self.executor)
			.field("sweeper", &self.sweeper.is_some())
			.finish()
	}
}

/// Builder for [`ApiClient`] values.
pub struct ApiClientBuilder {
	base_url: Url,
	session_provider: Option<Arc<dyn SessionProvider>>,
	cache_ttl: Duration,
	refresh_window: Duration,
	// `None` follows the cache TTL; `Some(None)` disables the sweeper.
	sweep_interval: Option<Option<Duration>>,
	clock: Arc<dyn Clock>,
}
impl ApiClientBuilder {
	/// Creates a builder with the default TTL, refresh window, and system clock.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			session_provider: None,
			cache_ttl: DEFAULT_TTL,
			refresh_window: DEFAULT_REFRESH_WINDOW,
			sweep_interval: None,
			clock: Arc::new(SystemClock),
		}
	}

	/// Sets the session provider (required).
	pub fn session_provider(mut self, provider: Arc<dyn SessionProvider>) -> Self {
		self.session_provider = Some(provider);

		self
	}

	/// Overrides the cache TTL (defaults to 10 minutes).
	pub fn cache_ttl(mut self, ttl: Duration) -> Self {
		self.cache_ttl = ttl;

		self
	}

	/// Overrides the proactive refresh look-ahead (defaults to 60 seconds).
	pub fn refresh_window(mut self, window: Duration) -> Self {
		self.refresh_window = window;

		self
	}

	/// Overrides the sweep interval; `None` disables the background sweeper.
	pub fn sweep_interval(mut self, interval: Option<Duration>) -> Self {
		self.sweep_interval = Some(interval);

		self
	}

	/// Overrides the clock used for TTL and expiry decisions.
	pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Builds a client backed by a default reqwest transport.
	#[cfg(feature = "reqwest")]
	pub fn build(self) -> Result<ApiClient> {
		let client = ReqwestClient::builder()
			.build()
			.map_err(|e| ConfigError::HttpClientBuild { reason: e.to_string() })?;

		self.build_with_transport(Arc::new(ReqwestTransport::with_client(client)))
	}

	/// Builds a client that sends every request through `transport`.
	pub fn build_with_transport(self, transport: Arc<dyn HttpTransport>) -> Result<ApiClient> {
		let provider = self.session_provider.ok_or(ConfigError::MissingSessionProvider)?;

		if !matches!(self.base_url.scheme(), "http" | "https") {
			return Err(ConfigError::UnsupportedScheme { url: self.base_url.to_string() }.into());
		}
		if !self.cache_ttl.is_positive() {
			return Err(ConfigError::NonPositiveCacheTtl.into());
		}

		let cache = Arc::new(ResponseCache::new(self.cache_ttl, self.clock.clone()));
		let sweeper = match self.sweep_interval.unwrap_or(Some(self.cache_ttl)) {
			Some(interval) => Some(Arc::new(spawn_sweeper(&cache, interval)?)),
			None => None,
		};
		let tokens = Arc::new(TokenManager::new(provider, self.clock, self.refresh_window));
		let executor = Executor {
			base_url: self.base_url,
			transport,
			cache,
			in_flight: Default::default(),
			tokens,
		};

		Ok(ApiClient { executor, sweeper })
	}
}
impl Debug for ApiClientBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClientBuilder")
			.field("base_url", &self.base_url.as_str())
			.field("session_provider_set", &self.session_provider.is_some())
			.field("cache_ttl", &self.cache_ttl)
			.field("refresh_window", &self.refresh_window)
			.field("sweep_interval", &self.sweep_interval)
			.finish()
	}
}

fn spawn_sweeper(
	cache: &Arc<ResponseCache>,
	interval: Duration,
) -> Result<SweeperHandle, ConfigError> {
	if !interval.is_positive() {
		return Err(ConfigError::NonPositiveSweepInterval);
	}

	let interval =
		std::time::Duration::try_from(interval).map_err(|_| ConfigError::NonPositiveSweepInterval)?;

	tokio::runtime::Handle::try_current().map_err(|_| ConfigError::RuntimeUnavailable)?;

	Ok(SweeperHandle::spawn(cache, interval))
}
