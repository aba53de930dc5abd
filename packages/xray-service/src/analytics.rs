use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};

use crate::{Result, XrayService};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct StepPerformanceRequest {
	pub pipeline_name: Option<String>,
	pub step_type: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepPerformance {
	pub step_type: String,
	pub step_name: String,
	pub count: i64,
	pub avg_reduction_rate: f64,
	pub avg_duration_ms: f64,
	pub max_reduction_rate: f64,
	pub min_reduction_rate: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepPerformanceResponse {
	pub analytics: Vec<StepPerformance>,
}

#[derive(Debug, sqlx::FromRow)]
struct PerformanceRow {
	step_type: String,
	step_name: String,
	count: i64,
	avg_reduction_rate: Option<f64>,
	avg_duration_ms: Option<f64>,
	max_reduction_rate: Option<f64>,
	min_reduction_rate: Option<f64>,
}

impl XrayService {
	/// Aggregate performance per `(step_type, step_name)`. The store computes
	/// the aggregates; this only supplies grouping and filter parameters.
	pub async fn step_performance(
		&self,
		req: StepPerformanceRequest,
	) -> Result<StepPerformanceResponse> {
		let mut builder = QueryBuilder::<Postgres>::new(
			"SELECT step_type, step_name, COUNT(*) AS count, \
			 AVG(reduction_rate) AS avg_reduction_rate, \
			 AVG(duration_ms) AS avg_duration_ms, \
			 MAX(reduction_rate) AS max_reduction_rate, \
			 MIN(reduction_rate) AS min_reduction_rate \
			 FROM step_traces JOIN pipeline_runs USING (run_id) WHERE TRUE",
		);

		if let Some(pipeline_name) = req.pipeline_name.as_deref() {
			builder.push(" AND pipeline_name = ");
			builder.push_bind(pipeline_name.to_string());
		}
		if let Some(step_type) = req.step_type.as_deref() {
			builder.push(" AND step_type = ");
			builder.push_bind(step_type.to_string());
		}

		builder.push(" GROUP BY step_type, step_name ORDER BY step_type, step_name");

		let rows: Vec<PerformanceRow> = builder.build_query_as().fetch_all(&self.db.pool).await?;
		let analytics = rows
			.into_iter()
			.map(|row| StepPerformance {
				step_type: row.step_type,
				step_name: row.step_name,
				count: row.count,
				avg_reduction_rate: round(row.avg_reduction_rate.unwrap_or(0.0), 3),
				avg_duration_ms: round(row.avg_duration_ms.unwrap_or(0.0), 2),
				max_reduction_rate: round(row.max_reduction_rate.unwrap_or(0.0), 3),
				min_reduction_rate: round(row.min_reduction_rate.unwrap_or(0.0), 3),
			})
			.collect();

		Ok(StepPerformanceResponse { analytics })
	}
}

fn round(value: f64, places: u32) -> f64 {
	let factor = 10_f64.powi(places as i32);

	(value * factor).round() / factor
}
