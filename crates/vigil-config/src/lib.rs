pub mod error;
pub mod loader;
pub mod model;
pub mod time_format;
pub mod validate;

pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, ENV_PREFIX};
pub use model::{
    AlertRuleConfig, AppConfig, HttpTarget, MonitoringConfig, TargetConfig, TargetKind,
    TcpTarget, TransportEntry,
};
