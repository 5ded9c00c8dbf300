// self
use crate::obs::{FlowKind, FlowOutcome};

/// Increments `oauth2_relay_flow_total` for the flow and outcome.
///
/// Compiles to nothing unless the `metrics` feature is enabled.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!("oauth2_relay_flow_total", "flow" => kind.as_str(), "outcome" => outcome.as_str())
		.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}
