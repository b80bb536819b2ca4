// self
use crate::obs::{OperationKind, Outcome};

/// Records an operation outcome via the global metrics recorder and, when tracing is enabled,
/// as a `debug` event inside the current span.
pub fn record_outcome(kind: OperationKind, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"portal_request_total",
			"op" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(op = kind.as_str(), outcome = outcome.as_str(), "portal_request.outcome");
	}
	#[cfg(not(any(feature = "metrics", feature = "tracing")))]
	{
		let _ = (kind, outcome);
	}
}
