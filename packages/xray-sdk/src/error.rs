pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid tracer configuration: {message}")]
	Config { message: String },
	#[error(transparent)]
	Http(#[from] reqwest::Error),
}
