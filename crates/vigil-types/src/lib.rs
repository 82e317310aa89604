pub mod health;
pub mod status;

pub use health::{HealthSnapshot, HealthVerdict, FAILURES_KEY, SUCCESSES_KEY};
pub use status::HealthStatus;
