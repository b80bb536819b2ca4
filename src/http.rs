//! Transport primitives for backend and auth-service calls.
//!
//! [`HttpTransport`] is the layer's only dependency on an HTTP stack. The executor hands it a
//! fully assembled [`TransportRequest`] (headers already merged, body already encoded) and
//! interprets the returned [`TransportResponse`] itself, so transports never make policy
//! decisions about retries, caching, or error bodies.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
#[cfg(feature = "reqwest")]
use reqwest::multipart::{Form, Part};
// self
#[cfg(feature = "reqwest")] use crate::request::MultipartPart;
use crate::{
	_prelude::*,
	error::TransportError,
	request::{Method, MultipartPayload},
};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP clients able to execute one request.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by the
/// executor's spawned in-flight tasks, and the returned future must be `Send` for the same
/// reason. A non-2xx status is a successful send; only "no response at all" is an error.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Dispatches `request` and collects the full response body.
	fn send(&self, request: TransportRequest) -> TransportFuture<'_>;
}

/// Fully assembled outbound request.
#[derive(Clone, Debug)]
pub struct TransportRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute request URL.
	pub url: Url,
	/// Header pairs in send order.
	pub headers: Vec<(String, String)>,
	/// Encoded body.
	pub body: TransportBody,
}
impl TransportRequest {
	/// Returns the first header value matching `name` case-insensitively.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}
}

/// Encoded request body.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum TransportBody {
	/// No body.
	#[default]
	Empty,
	/// Text body (JSON-encoded structured data).
	Text(String),
	/// Raw bytes.
	Binary(Vec<u8>),
	/// Multipart form; the transport generates the boundary and its content type.
	Multipart(MultipartPayload),
}

/// Status and body returned by the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
	/// HTTP status code.
	pub status: u16,
	/// Status line text, when the transport knows it.
	pub reason: Option<String>,
	/// Raw body.
	pub body: Vec<u8>,
}
impl TransportResponse {
	/// Builds a response with a JSON body.
	pub fn json(status: u16, body: &Value) -> Self {
		Self { status, reason: None, body: body.to_string().into_bytes() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// [`HttpTransport`] backed by a [`ReqwestClient`], including multipart encoding for uploads.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let TransportRequest { method, url, headers, body } = request;
			let mut builder = self.0.request(reqwest_method(method), url);

			for (name, value) in headers {
				builder = builder.header(name, value);
			}

			builder = match body {
				TransportBody::Empty => builder,
				TransportBody::Text(text) => builder.body(text),
				TransportBody::Binary(bytes) => builder.body(bytes),
				TransportBody::Multipart(form) => builder.multipart(reqwest_form(form)?),
			};

			let response = builder.send().await?;
			let status = response.status();
			let reason = status.canonical_reason().map(str::to_owned);
			let body = response.bytes().await?.to_vec();

			Ok(TransportResponse { status: status.as_u16(), reason, body })
		})
	}
}

#[cfg(feature = "reqwest")]
fn reqwest_method(method: Method) -> reqwest::Method {
	match method {
		Method::Get => reqwest::Method::GET,
		Method::Post => reqwest::Method::POST,
		Method::Put => reqwest::Method::PUT,
		Method::Patch => reqwest::Method::PATCH,
		Method::Delete => reqwest::Method::DELETE,
	}
}

#[cfg(feature = "reqwest")]
fn reqwest_form(payload: MultipartPayload) -> Result<Form, TransportError> {
	payload.parts.into_iter().try_fold(Form::new(), |form, part| match part {
		MultipartPart::Text { name, value } => Ok(form.text(name, value)),
		MultipartPart::File { name, file } => {
			let mut part = Part::bytes(file.bytes).file_name(file.file_name);

			if let Some(content_type) = file.content_type {
				part = part.mime_str(&content_type).map_err(TransportError::invalid_request)?;
			}

			Ok(form.part(name, part))
		},
	})
}
