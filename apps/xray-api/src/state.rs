use std::sync::Arc;

use xray_service::XrayService;
use xray_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<XrayService>,
}
impl AppState {
	pub async fn new(config: xray_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let service = XrayService::new(config, db);

		Ok(Self { service: Arc::new(service) })
	}
}
