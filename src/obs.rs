//! Observability helpers for relay flows.
//!
//! Every flow runs inside an `oauth2_relay.flow` span carrying `flow` and `stage` fields, and
//! every callback transition emits one structured event. With the `metrics` feature enabled,
//! the `oauth2_relay_flow_total` counter is incremented per attempt, success, and failure,
//! labeled by `flow` and `outcome`.

mod counters;
mod metrics;
mod span;
mod stage;

pub use counters::*;
pub use metrics::*;
pub use span::*;
pub use stage::*;

/// Flow kinds observed by the relay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Provider redirect handled end to end.
	Callback,
	/// Refresh gate for an existing token set.
	Refresh,
	/// Authorize URL construction.
	Authorize,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Callback => "callback",
			FlowKind::Refresh => "refresh",
			FlowKind::Authorize => "authorize",
		}
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
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
