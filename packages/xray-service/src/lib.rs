pub mod analytics;
pub mod ingest;
pub mod runs;
pub mod steps;

mod error;

pub use analytics::{StepPerformance, StepPerformanceRequest, StepPerformanceResponse};
pub use error::{Error, Result};
pub use ingest::IngestResponse;
pub use runs::{DeleteRunResponse, RunDetail, RunListRequest, RunListResponse, RunSummary};
pub use steps::{StepListRequest, StepListResponse, StepTraceItem};

use xray_config::Config;
use xray_storage::db::Db;

pub struct XrayService {
	pub cfg: Config,
	pub db: Db,
}
impl XrayService {
	pub fn new(cfg: Config, db: Db) -> Self {
		Self { cfg, db }
	}

	/// Clamps a caller-supplied page size to the configured ceiling.
	pub(crate) fn page_limit(&self, requested: Option<u32>) -> i64 {
		let limit = requested.unwrap_or(self.cfg.collector.default_page_size);

		limit.min(self.cfg.collector.max_page_size).max(1) as i64
	}
}
