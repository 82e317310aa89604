use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vigil_alert::AlertPolicy;
use vigil_logging::LoggingConfig;
use vigil_notify::TransportSettings;

/// 应用配置
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub monitoring: MonitoringConfig,

    #[serde(default)]
    pub transports: Vec<TransportEntry>,

    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

impl AppConfig {
    pub fn transport(&self, name: &str) -> Option<&TransportEntry> {
        self.transports.iter().find(|t| t.name == name)
    }

    pub fn target(&self, name: &str) -> Option<&TargetConfig> {
        self.targets.iter().find(|t| t.name == name)
    }
}

/// 监控循环配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MonitoringConfig {
    /// 两次检查之间的间隔
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// 快照广播通道容量，消费落后超过该值时丢弃旧快照
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

fn default_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_bus_capacity() -> usize {
    16
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            bus_capacity: default_bus_capacity(),
        }
    }
}

/// 命名的通道配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TransportEntry {
    pub name: String,

    #[serde(flatten)]
    pub settings: TransportSettings,
}

/// 监控目标
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TargetConfig {
    pub name: String,

    pub kind: TargetKind,

    #[serde(default)]
    pub alerts: Vec<AlertRuleConfig>,
}

/// 目标类型，按 `type` 字段区分
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetKind {
    Http(HttpTarget),
    Tcp(TcpTarget),
}

fn default_expected_status() -> u16 {
    200
}

fn default_check_timeout() -> Duration {
    Duration::from_secs(10)
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HttpTarget {
    /// 一个或多个端点，部分失败时为 Degraded
    pub urls: Vec<String>,

    #[serde(default = "default_expected_status")]
    pub expected_status: u16,

    #[serde(default = "default_check_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// 响应时间超过该值时判定为 Degraded
    #[serde(default, with = "humantime_serde")]
    pub degraded_after: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TcpTarget {
    pub host: String,

    pub port: u16,

    #[serde(default = "default_check_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_fail_count() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// 告警规则配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AlertRuleConfig {
    pub transport: String,

    #[serde(default, with = "humantime_serde")]
    pub alert_every: Duration,

    #[serde(default = "default_fail_count")]
    pub alert_by_fail_count: u32,

    #[serde(default)]
    pub alert_once: bool,

    #[serde(default)]
    pub alert_on_service_recovered: bool,

    #[serde(default)]
    pub publish_all_results: bool,

    #[serde(default, with = "crate::time_format::option")]
    pub start_alerting_on: Option<NaiveTime>,

    #[serde(default, with = "crate::time_format::option")]
    pub stop_alerting_on: Option<NaiveTime>,

    #[serde(default)]
    pub timezone: Option<String>,

    #[serde(default = "default_true")]
    pub cooldown_after_recovery: bool,
}

impl AlertRuleConfig {
    pub fn new(transport: impl Into<String>) -> Self {
        Self {
            transport: transport.into(),
            alert_every: Duration::ZERO,
            alert_by_fail_count: default_fail_count(),
            alert_once: false,
            alert_on_service_recovered: false,
            publish_all_results: false,
            start_alerting_on: None,
            stop_alerting_on: None,
            timezone: None,
            cooldown_after_recovery: true,
        }
    }

    /// 转换为运行时规则配置（应先通过校验）
    pub fn to_policy(&self) -> AlertPolicy {
        let mut policy = AlertPolicy::new(self.transport.clone())
            .with_alert_every(self.alert_every)
            .with_fail_count(self.alert_by_fail_count)
            .with_alert_once(self.alert_once)
            .with_recovery_alert(self.alert_on_service_recovered)
            .with_publish_all_results(self.publish_all_results)
            .with_cooldown_after_recovery(self.cooldown_after_recovery);

        if let (Some(start), Some(stop)) = (self.start_alerting_on, self.stop_alerting_on) {
            policy = policy.with_window(start, stop);
        }
        if let Some(timezone) = &self.timezone {
            policy = policy.with_timezone(timezone.clone());
        }
        policy
    }
}
