//! Observability helpers shared by the broker, platform calls, and the refresh client.
//!
//! # Feature Flags
//!
//! - Spans named `app_token_broker.flow` carry the `flow` (operation) and `stage` (call site)
//!   fields and are always emitted through `tracing`.
//! - Enable `metrics` to increment the `app_token_broker_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`, and to record completed flow
//!   durations in `app_token_broker_flow_duration_seconds`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// std
use std::time::Instant;
// self
use crate::_prelude::*;

/// Operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Assertion exchange for an installation credential.
	Exchange,
	/// Installation account lookup used for organization auto-detection.
	InstallationLookup,
	/// Organization or team membership verification.
	Membership,
	/// End-to-end credential issuance performed by the broker.
	Issue,
	/// Client-side credential refresh.
	Refresh,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Exchange => "exchange",
			FlowKind::InstallationLookup => "installation_lookup",
			FlowKind::Membership => "membership",
			FlowKind::Issue => "issue",
			FlowKind::Refresh => "refresh",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside a flow span, recording attempt and outcome.
pub async fn observe<T, Fut>(kind: FlowKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = FlowSpan::new(kind, stage);
	let started = Instant::now();

	record_flow_outcome(kind, FlowOutcome::Attempt);

	let result = span.instrument(fut).await;
	let outcome = if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure };

	record_flow_outcome(kind, outcome);
	record_flow_duration(kind, outcome, started.elapsed());

	result
}
