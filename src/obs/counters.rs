// std
use std::sync::atomic::{AtomicU64, Ordering};

/// In-process counters for callback handling, shared by every clone of a relay.
#[derive(Debug, Default)]
pub struct FlowCounters {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	report_failures: AtomicU64,
	refreshes: AtomicU64,
}
impl FlowCounters {
	/// Callbacks started.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Callbacks that completed.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Callbacks that ended in `Failed`.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Outcome reports that failed and were swallowed.
	pub fn report_failures(&self) -> u64 {
		self.report_failures.load(Ordering::Relaxed)
	}

	/// Refresh grants actually sent to the provider.
	pub fn refreshes(&self) -> u64 {
		self.refreshes.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_report_failure(&self) {
		self.report_failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh(&self) {
		self.refreshes.fetch_add(1, Ordering::Relaxed);
	}
}
