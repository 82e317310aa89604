use serde::{Deserialize, Serialize};
use std::fmt;

/// 健康状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthStatus {
    /// 尚未检查或无法判定
    #[default]
    Unknown,
    /// 正常
    Healthy,
    /// 降级（可用但异常）
    Degraded,
    /// 不可用
    Unhealthy,
}

impl HealthStatus {
    /// Degraded 和 Unhealthy 在阈值判断中一视同仁
    pub fn is_failing(&self) -> bool {
        matches!(self, HealthStatus::Degraded | HealthStatus::Unhealthy)
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Unknown => "Unknown",
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Degraded => "Degraded",
            HealthStatus::Unhealthy => "Unhealthy",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
