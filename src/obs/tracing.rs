// crates.io
use tracing::{Instrument, instrument::Instrumented};
use tracing_subscriber::{EnvFilter, fmt};
// self
use crate::{_prelude::*, obs::FlowKind};

/// A span builder used by broker operations.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		let span = tracing::info_span!("app_token_broker.flow", flow = kind.as_str(), stage);

		Self { span }
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		fut.instrument(self.span.clone())
	}
}

/// Installs the global subscriber: `RUST_LOG` filtering (default `info`), human or JSON lines.
///
/// Calling it twice is harmless; the second installation attempt is ignored.
pub fn init_tracing(json: bool) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	let builder = fmt().with_env_filter(filter).with_target(false);
	let result = if json { builder.json().try_init() } else { builder.try_init() };

	if let Err(e) = result {
		tracing::debug!("Tracing subscriber already installed: {e}.");
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = FlowSpan::new(FlowKind::Refresh, "instrument_wraps_future");
		let value = FlowSpan::instrument(&span, async { 42 }).await;

		assert_eq!(value, 42);
	}

	#[test]
	fn init_tracing_is_idempotent() {
		init_tracing(false);
		init_tracing(true);
	}
}
