use std::{
	collections::VecDeque,
	sync::{
		Mutex,
		atomic::{AtomicBool, AtomicU64, Ordering},
	},
};

use tokio::sync::Notify;

/// Counter snapshot for one tracer's delivery path. Eviction and send
/// failures are never raised to the producer; these counters are the only
/// place they surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliveryStats {
	pub enqueued: u64,
	pub dropped: u64,
	pub delivered: u64,
	pub failed: u64,
}

/// Bounded hand-off between producer tasks and the background sender.
///
/// Enqueue never blocks and never fails the caller: when the queue is full
/// the oldest unsent run is evicted and counted. Many producers may enqueue
/// concurrently; a single worker drains.
pub struct DeliveryQueue {
	capacity: usize,
	inner: Mutex<VecDeque<String>>,
	notify: Notify,
	closed: AtomicBool,
	enqueued: AtomicU64,
	dropped: AtomicU64,
	delivered: AtomicU64,
	failed: AtomicU64,
}
impl DeliveryQueue {
	pub fn new(capacity: usize) -> Self {
		Self {
			capacity: capacity.max(1),
			inner: Mutex::new(VecDeque::new()),
			notify: Notify::new(),
			closed: AtomicBool::new(false),
			enqueued: AtomicU64::new(0),
			dropped: AtomicU64::new(0),
			delivered: AtomicU64::new(0),
			failed: AtomicU64::new(0),
		}
	}

	/// Returns whether the payload was accepted. A full queue evicts its
	/// oldest entry rather than rejecting the new one; only a closed queue
	/// refuses work.
	pub fn enqueue(&self, payload: String) -> bool {
		if self.closed.load(Ordering::Acquire) {
			self.dropped.fetch_add(1, Ordering::Relaxed);

			return false;
		}

		{
			let mut inner = self.inner.lock().unwrap_or_else(|err| err.into_inner());

			if inner.len() >= self.capacity {
				inner.pop_front();
				self.dropped.fetch_add(1, Ordering::Relaxed);
				tracing::debug!("Delivery queue full; evicted the oldest unsent run.");
			}

			inner.push_back(payload);
		}

		self.enqueued.fetch_add(1, Ordering::Relaxed);
		self.notify.notify_one();

		true
	}

	pub fn pop(&self) -> Option<String> {
		self.inner.lock().unwrap_or_else(|err| err.into_inner()).pop_front()
	}

	pub fn len(&self) -> usize {
		self.inner.lock().unwrap_or_else(|err| err.into_inner()).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub async fn notified(&self) {
		self.notify.notified().await;
	}

	/// Stops accepting new runs and wakes the worker so it can drain what is
	/// left and exit.
	pub fn close(&self) {
		self.closed.store(true, Ordering::Release);
		self.notify.notify_waiters();
		self.notify.notify_one();
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::Acquire)
	}

	pub fn record_delivered(&self) {
		self.delivered.fetch_add(1, Ordering::Relaxed);
	}

	pub fn record_failed(&self) {
		self.failed.fetch_add(1, Ordering::Relaxed);
	}

	pub fn record_discarded(&self, count: u64) {
		self.dropped.fetch_add(count, Ordering::Relaxed);
	}

	pub fn stats(&self) -> DeliveryStats {
		DeliveryStats {
			enqueued: self.enqueued.load(Ordering::Relaxed),
			dropped: self.dropped.load(Ordering::Relaxed),
			delivered: self.delivered.load(Ordering::Relaxed),
			failed: self.failed.load(Ordering::Relaxed),
		}
	}
}
