use crate::config::{LogFormat, LoggingConfig};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Failed to initialize logging: {0}")]
    InitError(String),
}

/// 构建日志过滤器：设置了 `RUST_LOG` 时使用环境变量，否则使用配置的级别
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(&directives)
            .map_err(|e| LoggingError::InvalidFilter(format!("{}: {}", directives, e))),
        _ => EnvFilter::try_new(config.level.as_str())
            .map_err(|e| LoggingError::InvalidFilter(e.to_string())),
    }
}

/// 安装全局 tracing subscriber，只能成功调用一次
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(config.with_target))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_target(config.with_target))
            .try_init(),
    };

    result.map_err(|e| LoggingError::InitError(e.to_string()))
}
