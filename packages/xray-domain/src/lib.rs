pub mod model;
pub mod sampling;
pub mod time_serde;

pub use model::{Candidate, Decision, RunTrace, StepTrace, reduction_rate};
pub use sampling::apply_sampling;
