//! Caller-facing request options and body kinds.

// self
use crate::_prelude::*;

/// HTTP methods issued by portal screens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// Read-style request; the only cacheable method.
	#[default]
	Get,
	/// Create.
	Post,
	/// Replace.
	Put,
	/// Partial update.
	Patch,
	/// Delete.
	Delete,
}
impl Method {
	/// Returns the canonical upper-case method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Options accepted by [`ApiClient::api_request`](crate::ApiClient::api_request).
///
/// Options are immutable once submitted; the executor only reads them.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
	/// Explicit method; `None` behaves like [`Method::Get`].
	pub method: Option<Method>,
	/// Caller headers merged beneath the session-derived authorization header.
	pub headers: BTreeMap<String, String>,
	/// Optional body.
	pub body: Option<RequestBody>,
	/// Opts a read-style request out of the response cache.
	pub no_cache: bool,
}
impl RequestOptions {
	/// Options for a plain `GET`.
	pub fn get() -> Self {
		Self::default()
	}

	/// Options with the provided method and no body.
	pub fn with_method(method: Method) -> Self {
		Self { method: Some(method), ..Self::default() }
	}

	/// Sets (or replaces) a caller header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Attaches a structured JSON body.
	pub fn json(mut self, value: Value) -> Self {
		self.body = Some(RequestBody::Json(value));

		self
	}

	/// Serializes `value` into a structured JSON body.
	pub fn try_json<T>(self, value: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		let value = serde_json::to_value(value)
			.map_err(|e| Error::Encode { message: e.to_string() })?;

		Ok(self.json(value))
	}

	/// Attaches a raw binary body.
	pub fn binary(mut self, bytes: impl Into<Vec<u8>>) -> Self {
		self.body = Some(RequestBody::Binary(bytes.into()));

		self
	}

	/// Attaches a multipart body.
	pub fn multipart(mut self, payload: MultipartPayload) -> Self {
		self.body = Some(RequestBody::Multipart(payload));

		self
	}

	/// Opts out of the response cache.
	pub fn no_cache(mut self) -> Self {
		self.no_cache = true;

		self
	}

	/// Effective method, defaulting to `GET`.
	pub fn effective_method(&self) -> Method {
		self.method.unwrap_or_default()
	}

	/// Returns `true` for read-style requests that have not opted out of caching.
	pub fn is_cacheable(&self) -> bool {
		self.effective_method() == Method::Get && !self.no_cache
	}
}

/// Request body kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
	/// Structured data, encoded as JSON text.
	Json(Value),
	/// Raw bytes passed through unchanged.
	Binary(Vec<u8>),
	/// Multipart form passed through unchanged; the transport owns the boundary header.
	Multipart(MultipartPayload),
}
impl RequestBody {
	/// Returns `true` for bodies whose content type is negotiated by the transport.
	pub fn is_opaque(&self) -> bool {
		matches!(self, Self::Binary(_) | Self::Multipart(_))
	}
}

/// Ordered multipart form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultipartPayload {
	/// Parts in submission order.
	pub parts: Vec<MultipartPart>,
}
impl MultipartPayload {
	/// Appends a text field.
	pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.parts.push(MultipartPart::Text { name: name.into(), value: value.into() });

		self
	}

	/// Appends a file part.
	pub fn file(mut self, name: impl Into<String>, file: FileUpload) -> Self {
		self.parts.push(MultipartPart::File { name: name.into(), file });

		self
	}

	/// Builds the upload form: `file` first, then each extra field.
	pub fn for_upload(file: FileUpload, extra_fields: &BTreeMap<String, String>) -> Self {
		extra_fields
			.iter()
			.fold(Self::default().file("file", file), |form, (name, value)| {
				form.text(name.as_str(), value.as_str())
			})
	}
}

/// Single multipart part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MultipartPart {
	/// Plain text field.
	Text {
		/// Field name.
		name: String,
		/// Field value.
		value: String,
	},
	/// Binary file field.
	File {
		/// Field name.
		name: String,
		/// File content and metadata.
		file: FileUpload,
	},
}

/// In-memory file handed to [`ApiClient::upload_file`](crate::ApiClient::upload_file).
#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
	/// File name reported to the backend.
	pub file_name: String,
	/// MIME type, when known.
	pub content_type: Option<String>,
	/// Raw content.
	pub bytes: Vec<u8>,
}
impl FileUpload {
	/// Creates a file upload without a MIME type.
	pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
		Self { file_name: file_name.into(), content_type: None, bytes: bytes.into() }
	}

	/// Sets the MIME type.
	pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
		self.content_type = Some(content_type.into());

		self
	}
}
impl Debug for FileUpload {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FileUpload")
			.field("file_name", &self.file_name)
			.field("content_type", &self.content_type)
			.field("len", &self.bytes.len())
			.finish()
	}
}
