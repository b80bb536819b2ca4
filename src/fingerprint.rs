//! Deterministic request fingerprints keyed by endpoint plus canonicalized options.
//!
//! A fingerprint has the shape `{endpoint}#{digest}`. The endpoint stays readable so cache
//! invalidation can match on a plain prefix, while the digest is a base64 (no padding)
//! SHA-256 over the canonical JSON of the method, the lower-cased headers, and the body.
//! Object keys are sorted recursively before hashing, so two logically equal option sets
//! always collide, and binary or multipart bodies hash their raw bytes.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use serde_json::Map;
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	request::{MultipartPart, RequestBody, RequestOptions},
};

const SEPARATOR: char = '#';

/// Identity of a request for caching and deduplication.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);
impl Fingerprint {
	/// Computes the fingerprint for `endpoint` and `options`; `no_cache` does not participate.
	pub fn compute(endpoint: &str, options: &RequestOptions) -> Self {
		let material = canonical_material(options);
		let mut hasher = Sha256::new();

		hasher.update(material.to_string().as_bytes());

		if let Some(body) = &options.body {
			hash_opaque_body(&mut hasher, body);
		}

		let digest = STANDARD_NO_PAD.encode(hasher.finalize());

		Self(format!("{endpoint}{SEPARATOR}{digest}"))
	}

	/// Endpoint component of the fingerprint.
	pub fn endpoint(&self) -> &str {
		self.0.rsplit_once(SEPARATOR).map_or(self.0.as_str(), |(endpoint, _)| endpoint)
	}

	/// Returns `true` when the fingerprint begins with `prefix`.
	pub fn starts_with(&self, prefix: &str) -> bool {
		self.0.starts_with(prefix)
	}

	/// Full fingerprint string.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Debug for Fingerprint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Fingerprint({})", self.0)
	}
}
impl Display for Fingerprint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

fn canonical_material(options: &RequestOptions) -> Value {
	let headers = options
		.headers
		.iter()
		.map(|(name, value)| (name.to_ascii_lowercase(), Value::String(value.clone())))
		.collect::<BTreeMap<_, _>>()
		.into_iter()
		.collect::<Map<_, _>>();
	let body = match &options.body {
		None => Value::Null,
		Some(RequestBody::Json(value)) => canonicalize(value),
		Some(RequestBody::Binary(bytes)) => serde_json::json!({ "binary": bytes.len() }),
		Some(RequestBody::Multipart(form)) => Value::Array(
			form.parts
				.iter()
				.map(|part| match part {
					MultipartPart::Text { name, value } => serde_json::json!({ name: value }),
					MultipartPart::File { name, file } => serde_json::json!({
						name: { "file_name": file.file_name, "len": file.bytes.len() }
					}),
				})
				.collect(),
		),
	};

	serde_json::json!({
		"method": options.effective_method().as_str(),
		"headers": headers,
		"body": body,
	})
}

/// Rebuilds `value` with every object's keys in sorted order.
pub(crate) fn canonicalize(value: &Value) -> Value {
	match value {
		Value::Object(map) => {
			let sorted = map
				.iter()
				.map(|(key, value)| (key.clone(), canonicalize(value)))
				.collect::<BTreeMap<_, _>>();

			Value::Object(sorted.into_iter().collect())
		},
		Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
		other => other.clone(),
	}
}

fn hash_opaque_body(hasher: &mut Sha256, body: &RequestBody) {
	match body {
		RequestBody::Json(_) => {},
		RequestBody::Binary(bytes) => hasher.update(bytes),
		RequestBody::Multipart(form) =>
			for part in &form.parts {
				if let MultipartPart::File { file, .. } = part {
					hasher.update(&file.bytes);
				}
			},
	}
}
