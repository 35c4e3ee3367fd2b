// std
use std::time::Duration as StdDuration;
// self
use crate::obs::{FlowKind, FlowOutcome};

/// Counter incremented once per attempt and once per terminal outcome.
pub const FLOW_TOTAL: &str = "app_token_broker_flow_total";
/// Histogram of completed flow durations in seconds, labeled by outcome.
pub const FLOW_DURATION_SECONDS: &str = "app_token_broker_flow_duration_seconds";

/// Bumps [`FLOW_TOTAL`] when the `metrics` feature is enabled.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(FLOW_TOTAL, "flow" => kind.as_str(), "outcome" => outcome.as_str())
		.increment(1);

	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

/// Records how long a finished flow took when the `metrics` feature is enabled.
pub fn record_flow_duration(kind: FlowKind, outcome: FlowOutcome, elapsed: StdDuration) {
	#[cfg(feature = "metrics")]
	metrics::histogram!(
		FLOW_DURATION_SECONDS,
		"flow" => kind.as_str(),
		"outcome" => outcome.as_str()
	)
	.record(elapsed.as_secs_f64());

	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome, elapsed);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recording_without_a_recorder_is_harmless() {
		record_flow_outcome(FlowKind::Membership, FlowOutcome::Failure);
		record_flow_duration(FlowKind::Exchange, FlowOutcome::Success, StdDuration::from_millis(5));
	}
}
