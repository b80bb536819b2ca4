//! Optional observability helpers for request-layer operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (on by default) to wrap each operation in a span named
//!   `portal_request.op` carrying `op`, `stage`, and `endpoint` fields, and to emit a `debug` event
//!   per recorded outcome.
//! - Enable `metrics` to increment the `portal_request_total` counter for every outcome, labeled by
//!   `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the request layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// [`ApiClient::api_request`](crate::ApiClient::api_request).
	Request,
	/// [`ApiClient::upload_file`](crate::ApiClient::upload_file).
	Upload,
	/// Session refresh issued by the token manager.
	Refresh,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::Request => "request",
			OperationKind::Upload => "upload",
			OperationKind::Refresh => "refresh",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to an operation.
	Attempt,
	/// Served from the response cache without touching the network.
	CacheHit,
	/// Attached to an identical in-flight request.
	Joined,
	/// Retried once after a 401 and a successful refresh.
	Retry,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::CacheHit => "cache_hit",
			Outcome::Joined => "joined",
			Outcome::Retry => "retry",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
