// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for provisioning recovery paths.
#[derive(Debug, Default)]
pub struct ProvisionMetrics {
	adoptions: AtomicU64,
	conflicts: AtomicU64,
	retries: AtomicU64,
}
impl ProvisionMetrics {
	/// Returns how many times an existing record was adopted.
	pub fn adoptions(&self) -> u64 {
		self.adoptions.load(Ordering::Relaxed)
	}

	/// Returns how many token writes were rejected with a version conflict.
	pub fn conflicts(&self) -> u64 {
		self.conflicts.load(Ordering::Relaxed)
	}

	/// Returns how many token writes succeeded only after refetching.
	pub fn retries(&self) -> u64 {
		self.retries.load(Ordering::Relaxed)
	}

	pub(crate) fn record_adoption(&self) {
		self.adoptions.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_conflict(&self) {
		self.conflicts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_retry(&self) {
		self.retries.fetch_add(1, Ordering::Relaxed);
	}
}
