use crate::message::AlertMessage;
use anyhow::Result;
use async_trait::async_trait;

/// 投递结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResult {
    pub success: bool,
    pub message: String,
}

impl DeliveryResult {
    pub fn success() -> Self {
        Self {
            success: true,
            message: "Alert delivered successfully".to_string(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// 告警传输通道 trait
///
/// 实现方可以按自身介质格式化告警；返回 `Err` 或失败结果都只会被记录，
/// 不会影响告警规则的状态。
#[async_trait]
pub trait Transport: Send + Sync {
    /// 投递告警
    async fn deliver(&self, alert: &AlertMessage) -> Result<DeliveryResult>;

    /// 配置中的通道名称
    fn name(&self) -> &str;

    /// 通道类型（email、slack 等）
    fn kind(&self) -> &'static str;

    /// 是否启用
    fn is_enabled(&self) -> bool {
        true
    }
}
