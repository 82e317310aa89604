use thiserror::Error;

/// Vigil 统一错误类型
#[derive(Error, Debug)]
pub enum VigilError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Channel send error: {0}")]
    ChannelSend(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, VigilError>;

impl<T> From<tokio::sync::broadcast::error::SendError<T>> for VigilError {
    fn from(err: tokio::sync::broadcast::error::SendError<T>) -> Self {
        VigilError::ChannelSend(err.to_string())
    }
}
