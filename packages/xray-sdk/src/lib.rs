//! Producer-side capture for pipeline decision traces.
//!
//! A [`Tracer`] is an explicit context object, not a process-wide singleton:
//! construct one per pipeline and pass it to the code being traced. Runs and
//! steps are scoped guards — dropping a guard finalizes it, so a step is
//! recorded even when the pipeline bails out early with `?`. Capture never
//! raises into the producer: delivery failures, queue evictions, and usage
//! errors are counted and logged, nothing more.
//!
//! ```no_run
//! # async fn demo() {
//! let tracer = xray_sdk::Tracer::new(
//! 	xray_sdk::TracerConfig::new("competitor_selection")
//! 		.endpoint("http://127.0.0.1:8090"),
//! );
//! let mut run = tracer.start_run();
//!
//! run.insert_context("user_id", serde_json::json!("usr_123"));
//!
//! {
//! 	let mut step = run.step("price_filter", "filter");
//!
//! 	step.add_decision("filtered_out", "price 299 exceeds max 250", Default::default());
//! 	step.set_counts(300, 40);
//! }
//!
//! run.finish();
//! tracer.shutdown().await;
//! # }
//! ```

pub mod client;
pub mod queue;
pub mod run;

mod error;

pub use client::IngestionClient;
pub use error::{Error, Result};
pub use queue::{DeliveryQueue, DeliveryStats};
pub use run::{RunGuard, StepGuard};

use std::{
	env,
	sync::{Arc, Mutex},
	time::Duration,
};

use tokio::task::JoinHandle;

/// Env toggle that disables all delivery from producers without touching
/// collector state. Any non-empty value counts.
pub const KILL_SWITCH_ENV: &str = "XRAY_DISABLED";

const DEFAULT_QUEUE_CAPACITY: usize = 128;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Clone, Debug)]
pub struct TracerConfig {
	pub pipeline_name: String,
	pub pipeline_version: String,
	/// Collector base URL. Without one the tracer runs in local-only mode:
	/// runs are buffered and can be inspected, nothing is sent.
	pub endpoint: Option<String>,
	pub enabled: bool,
	pub queue_capacity: usize,
	pub request_timeout: Duration,
	pub shutdown_grace: Duration,
}
impl TracerConfig {
	pub fn new(pipeline_name: impl Into<String>) -> Self {
		let kill_switch =
			env::var(KILL_SWITCH_ENV).map(|value| !value.is_empty()).unwrap_or(false);

		Self {
			pipeline_name: pipeline_name.into(),
			pipeline_version: "1.0".to_string(),
			endpoint: None,
			enabled: !kill_switch,
			queue_capacity: DEFAULT_QUEUE_CAPACITY,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
		}
	}

	pub fn pipeline_version(mut self, version: impl Into<String>) -> Self {
		self.pipeline_version = version.into();

		self
	}

	pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
		self.endpoint = Some(endpoint.into());

		self
	}

	pub fn enabled(mut self, enabled: bool) -> Self {
		self.enabled = enabled;

		self
	}

	pub fn queue_capacity(mut self, capacity: usize) -> Self {
		self.queue_capacity = capacity;

		self
	}

	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;

		self
	}

	pub fn shutdown_grace(mut self, grace: Duration) -> Self {
		self.shutdown_grace = grace;

		self
	}
}

/// Entry point for instrumentation. When an endpoint is configured the
/// constructor spawns the background delivery worker, so it must be called
/// inside a Tokio runtime; local-only and disabled tracers have no such
/// requirement.
pub struct Tracer {
	pipeline_name: String,
	pipeline_version: String,
	enabled: bool,
	shutdown_grace: Duration,
	queue: Option<Arc<DeliveryQueue>>,
	worker: Mutex<Option<JoinHandle<()>>>,
}
impl Tracer {
	pub fn new(config: TracerConfig) -> Self {
		let mut queue = None;
		let mut worker = None;

		if config.enabled && let Some(endpoint) = config.endpoint.as_deref() {
			match IngestionClient::new(endpoint, config.request_timeout) {
				Ok(client) => {
					let shared = Arc::new(DeliveryQueue::new(config.queue_capacity));

					worker = Some(tokio::spawn(client::run_worker(shared.clone(), client)));
					queue = Some(shared);
				},
				Err(err) => {
					tracing::warn!(error = %err, "Failed to build ingestion client; tracing stays local.");
				},
			}
		}

		Self {
			pipeline_name: config.pipeline_name,
			pipeline_version: config.pipeline_version,
			enabled: config.enabled,
			shutdown_grace: config.shutdown_grace,
			queue,
			worker: Mutex::new(worker),
		}
	}

	pub fn is_enabled(&self) -> bool {
		self.enabled
	}

	pub fn pipeline_name(&self) -> &str {
		&self.pipeline_name
	}

	/// Opens a run. The guard finalizes on drop; call
	/// [`RunGuard::finish`] for an explicit close or [`RunGuard::fail`]
	/// first to record a pipeline fault.
	pub fn start_run(&self) -> RunGuard<'_> {
		RunGuard::open(self)
	}

	pub fn stats(&self) -> DeliveryStats {
		self.queue.as_ref().map(|queue| queue.stats()).unwrap_or_default()
	}

	pub(crate) fn submit(&self, payload: String) {
		if let Some(queue) = self.queue.as_ref() {
			queue.enqueue(payload);
		}
	}

	pub(crate) fn pipeline_version(&self) -> &str {
		&self.pipeline_version
	}

	/// Best-effort flush: stops the queue, then gives the worker a bounded
	/// grace period to drain. Runs still unsent at the deadline are
	/// discarded and counted as dropped.
	pub async fn shutdown(&self) {
		let Some(queue) = self.queue.as_ref() else {
			return;
		};

		queue.close();

		let handle = self.worker.lock().unwrap_or_else(|err| err.into_inner()).take();
		let Some(mut handle) = handle else {
			return;
		};

		if tokio::time::timeout(self.shutdown_grace, &mut handle).await.is_err() {
			handle.abort();

			let remaining = queue.len() as u64;

			if remaining > 0 {
				queue.record_discarded(remaining);
			}

			tracing::warn!(remaining, "Shutdown flush deadline exceeded; discarding unsent runs.");
		}
	}
}
