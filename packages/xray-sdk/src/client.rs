use std::{sync::Arc, time::Duration};

use reqwest::{Client, header};

use crate::{Result, queue::DeliveryQueue};

/// Fire-and-forget HTTP delivery to the collector. One POST per run with a
/// strict timeout; no retries, no persistence across restarts.
pub struct IngestionClient {
	http: Client,
	endpoint: String,
}
impl IngestionClient {
	pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
		let http = Client::builder().timeout(timeout).build()?;

		Ok(Self { http, endpoint: endpoint.trim_end_matches('/').to_string() })
	}

	pub async fn deliver(&self, payload: &str) -> Result<()> {
		let response = self
			.http
			.post(format!("{}/api/runs", self.endpoint))
			.header(header::CONTENT_TYPE, "application/json")
			.body(payload.to_string())
			.send()
			.await?;

		response.error_for_status()?;

		Ok(())
	}
}

/// Drains the queue until it is closed and empty. Every failure is terminal
/// for that run: counted, logged at debug, never surfaced to the producer.
pub(crate) async fn run_worker(queue: Arc<DeliveryQueue>, client: IngestionClient) {
	loop {
		let Some(payload) = queue.pop() else {
			if queue.is_closed() {
				break;
			}

			queue.notified().await;

			continue;
		};

		match client.deliver(&payload).await {
			Ok(()) => queue.record_delivered(),
			Err(err) => {
				queue.record_failed();
				tracing::debug!(error = %err, "Run delivery failed; dropping the run.");
			},
		}
	}
}
