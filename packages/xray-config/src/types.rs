use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub collector: Collector,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
	#[serde(default)]
	pub bind_localhost_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

/// Ingestion and query limits for the collector side.
#[derive(Debug, Deserialize)]
pub struct Collector {
	#[serde(default = "default_max_payload_bytes")]
	pub max_payload_bytes: usize,
	#[serde(default = "default_page_size")]
	pub default_page_size: u32,
	#[serde(default = "default_max_page_size")]
	pub max_page_size: u32,
}

fn default_max_payload_bytes() -> usize {
	10 * 1024 * 1024
}

fn default_page_size() -> u32 {
	100
}

fn default_max_page_size() -> u32 {
	1_000
}
