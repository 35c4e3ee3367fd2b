// std
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

/// Point-in-time copy of [`RefreshMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshSnapshot {
	/// Calls answered from the cache.
	pub cache_hits: u64,
	/// Broker requests made.
	pub attempts: u64,
	/// Broker requests that produced a usable credential.
	pub successes: u64,
	/// Broker requests that failed and cleared the cache.
	pub failures: u64,
}

/// Counters kept by a [`CredentialClient`](super::CredentialClient).
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	cache_hits: AtomicU64,
	attempts: AtomicU64,
	successes: AtomicU64,
	failures: AtomicU64,
}
impl RefreshMetrics {
	/// Calls answered from the cache without contacting the broker.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Relaxed)
	}

	/// Broker requests made; each one is a refresh.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Relaxed)
	}

	/// Refreshes that produced a usable credential.
	pub fn successes(&self) -> u64 {
		self.successes.load(Relaxed)
	}

	/// Refreshes that failed.
	pub fn failures(&self) -> u64 {
		self.failures.load(Relaxed)
	}

	/// Reads every counter at once.
	pub fn snapshot(&self) -> RefreshSnapshot {
		RefreshSnapshot {
			cache_hits: self.cache_hits(),
			attempts: self.attempts(),
			successes: self.successes(),
			failures: self.failures(),
		}
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Relaxed);
	}

	pub(crate) fn record_refresh(&self, succeeded: bool) {
		self.attempts.fetch_add(1, Relaxed);

		if succeeded {
			self.successes.fetch_add(1, Relaxed);
		} else {
			self.failures.fetch_add(1, Relaxed);
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn snapshot_reflects_recorded_events() {
		let metrics = RefreshMetrics::default();

		metrics.record_cache_hit();
		metrics.record_refresh(true);
		metrics.record_refresh(false);

		assert_eq!(
			metrics.snapshot(),
			RefreshSnapshot { cache_hits: 1, attempts: 2, successes: 1, failures: 1 }
		);
	}
}
