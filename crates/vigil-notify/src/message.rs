use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use vigil_types::{HealthStatus, HealthVerdict};

/// 告警类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// 连续失败达到阈值
    Failure,
    /// 从失败状态恢复
    Recovery,
    /// 发布全部结果模式下的例行报告
    Report,
}

/// 渲染后的告警消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertMessage {
    /// 监控目标名称
    pub target: String,

    /// 检查状态
    pub status: HealthStatus,

    /// 描述
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// 检查耗时
    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    /// 检查附带的数据
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,

    /// 投递所用的通道名称
    pub transport: String,

    /// 告警类型
    pub kind: AlertKind,

    /// 告警时间（快照采集时间）
    pub timestamp: DateTime<Utc>,

    /// 触发时的连续失败次数
    pub failed_count: u32,
}

impl AlertMessage {
    pub fn new(
        target: impl Into<String>,
        verdict: &HealthVerdict,
        transport: impl Into<String>,
        kind: AlertKind,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            target: target.into(),
            status: verdict.status,
            description: verdict.description.clone(),
            duration: verdict.duration,
            data: verdict.data.clone(),
            transport: transport.into(),
            kind,
            timestamp,
            failed_count: 0,
        }
    }

    pub fn with_failed_count(mut self, failed_count: u32) -> Self {
        self.failed_count = failed_count;
        self
    }

    /// 标题，例如 `[Unhealthy] payments-api`
    pub fn title(&self) -> String {
        match self.kind {
            AlertKind::Recovery => format!("[Recovered] {}", self.target),
            _ => format!("[{}] {}", self.status, self.target),
        }
    }

    pub fn description_or_default(&self) -> &str {
        self.description.as_deref().unwrap_or("No description")
    }

    pub fn failures(&self) -> Vec<String> {
        self.verdict().failures()
    }

    pub fn successes(&self) -> Vec<String> {
        self.verdict().successes()
    }

    fn verdict(&self) -> HealthVerdict {
        HealthVerdict {
            status: self.status,
            description: None,
            duration: self.duration,
            data: self.data.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_from_verdict() {
        let verdict = HealthVerdict::unhealthy("connection refused")
            .with_duration(Duration::from_millis(250))
            .with_data("Failures", json!(["primary"]));

        let message = AlertMessage::new("redis", &verdict, "ops-mail", AlertKind::Failure, Utc::now())
            .with_failed_count(3);

        assert_eq!(message.title(), "[Unhealthy] redis");
        assert_eq!(message.description_or_default(), "connection refused");
        assert_eq!(message.failures(), vec!["primary"]);
        assert_eq!(message.failed_count, 3);
    }

    #[test]
    fn test_recovery_title() {
        let message = AlertMessage::new(
            "redis",
            &HealthVerdict::healthy(),
            "ops-mail",
            AlertKind::Recovery,
            Utc::now(),
        );
        assert_eq!(message.title(), "[Recovered] redis");
        assert_eq!(message.description_or_default(), "No description");
    }
}
