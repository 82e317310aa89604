use thiserror::Error;

/// 配置错误，全部在启动阶段报告
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Duplicate transport name: {0}")]
    DuplicateTransport(String),

    #[error("Duplicate target name: {0}")]
    DuplicateTarget(String),

    #[error("Target '{target}' references unknown transport '{transport}'")]
    UnknownTransport { target: String, transport: String },

    #[error("Invalid transport '{name}': {reason}")]
    InvalidTransport { name: String, reason: String },

    #[error("Invalid target '{name}': {reason}")]
    InvalidTarget { name: String, reason: String },

    #[error("Invalid alert rule for target '{target}': {reason}")]
    InvalidRule { target: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Load(err.to_string())
    }
}
