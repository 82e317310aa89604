use crate::status::HealthStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// 多端点检查中失败端点列表所在的数据键
pub const FAILURES_KEY: &str = "Failures";

/// 多端点检查中成功端点列表所在的数据键
pub const SUCCESSES_KEY: &str = "Successes";

/// 单次健康检查结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthVerdict {
    /// 状态
    pub status: HealthStatus,

    /// 描述
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// 检查耗时
    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    /// 额外数据
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
}

impl HealthVerdict {
    pub fn new(status: HealthStatus) -> Self {
        Self {
            status,
            description: None,
            duration: Duration::ZERO,
            data: Map::new(),
        }
    }

    pub fn healthy() -> Self {
        Self::new(HealthStatus::Healthy)
    }

    pub fn degraded(description: impl Into<String>) -> Self {
        Self::new(HealthStatus::Degraded).with_description(description)
    }

    pub fn unhealthy(description: impl Into<String>) -> Self {
        Self::new(HealthStatus::Unhealthy).with_description(description)
    }

    pub fn unknown() -> Self {
        Self::new(HealthStatus::Unknown)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// 数据包中 `Failures` 键下的条目
    pub fn failures(&self) -> Vec<String> {
        self.list(FAILURES_KEY)
    }

    /// 数据包中 `Successes` 键下的条目
    pub fn successes(&self) -> Vec<String> {
        self.list(SUCCESSES_KEY)
    }

    fn list(&self, key: &str) -> Vec<String> {
        match self.data.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }
}

/// 一次监控周期产生的全部检查结果
///
/// 创建后不可修改，由所有订阅的发布者只读共享。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    entries: BTreeMap<String, HealthVerdict>,

    #[serde(with = "humantime_serde")]
    total_duration: Duration,

    captured_at: DateTime<Utc>,
}

impl HealthSnapshot {
    pub fn new(captured_at: DateTime<Utc>) -> Self {
        Self {
            entries: BTreeMap::new(),
            total_duration: Duration::ZERO,
            captured_at,
        }
    }

    /// 以当前时间创建快照
    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    pub fn with_entry(mut self, name: impl Into<String>, verdict: HealthVerdict) -> Self {
        self.entries.insert(name.into(), verdict);
        self
    }

    pub fn with_total_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    pub fn get(&self, name: &str) -> Option<&HealthVerdict> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HealthVerdict)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_duration(&self) -> Duration {
        self.total_duration
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// 快照整体状态：取最差的单项状态
    pub fn overall_status(&self) -> HealthStatus {
        let mut overall = HealthStatus::Healthy;
        for verdict in self.entries.values() {
            overall = match (overall, verdict.status) {
                (_, HealthStatus::Unhealthy) | (HealthStatus::Unhealthy, _) => {
                    HealthStatus::Unhealthy
                }
                (_, HealthStatus::Degraded) | (HealthStatus::Degraded, _) => HealthStatus::Degraded,
                (_, HealthStatus::Unknown) | (HealthStatus::Unknown, _) => HealthStatus::Unknown,
                _ => HealthStatus::Healthy,
            };
        }
        overall
    }
}
