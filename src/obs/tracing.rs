// self
use crate::{_prelude::*, obs::OperationKind};

/// Future returned by [`OperationSpan::instrument`] with the `tracing` feature on.
#[cfg(feature = "tracing")]
pub type Instrumented<F> = tracing::instrument::Instrumented<F>;
/// Without `tracing`, [`OperationSpan::instrument`] hands the future back unchanged.
#[cfg(not(feature = "tracing"))]
pub type Instrumented<F> = F;

/// `portal_request.op` span carried through a request, upload or refresh.
///
/// Compiles to an empty struct when the `tracing` feature is off.
#[derive(Clone, Debug)]
pub struct OperationSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OperationSpan {
	/// Span with no endpoint, used for session refreshes.
	pub fn new(kind: OperationKind, stage: &'static str) -> Self {
		Self::for_endpoint(kind, stage, "")
	}

	/// Span for a call against `endpoint`; `status` stays empty until recorded.
	pub fn for_endpoint(kind: OperationKind, stage: &'static str, endpoint: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"portal_request.op",
				op = kind.as_str(),
				stage,
				endpoint,
				status = tracing::field::Empty
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage, endpoint);

			Self {}
		}
	}

	/// Fills the `status` field once the backend has answered.
	pub fn record_status(&self, status: u16) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("status", status);
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = status;
		}
	}

	/// Keeps the span entered until the returned guard drops. Never hold it across an `.await`.
	pub fn entered(self) -> OperationSpanGuard {
		#[cfg(feature = "tracing")]
		{
			OperationSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			OperationSpanGuard {}
		}
	}

	/// Wraps `fut` so the span is entered on every poll.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Exits the span on drop.
pub struct OperationSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for OperationSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("OperationSpanGuard(..)")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn entered_guard_exists_with_or_without_tracing() {
		let _guard = OperationSpan::new(OperationKind::Upload, "test").entered();
	}

	#[tokio::test]
	async fn instrument_passes_output_through() {
		let span = OperationSpan::for_endpoint(OperationKind::Request, "test", "/api/users");
		let value = span.instrument(async { 42 }).await;

		span.record_status(200);

		assert_eq!(value, 42);
	}
}
