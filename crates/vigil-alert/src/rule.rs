use chrono::{DateTime, NaiveTime, Utc};
use parking_lot::Mutex;
use std::time::Duration;
use vigil_core::{in_timezone, is_cooldown_elapsed, is_within_window, DAY};
use vigil_notify::AlertKind;
use vigil_types::HealthStatus;

/// 允许告警的时间窗口，`start > stop` 表示跨越午夜
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertingWindow {
    pub start: NaiveTime,
    pub stop: NaiveTime,
}

impl AlertingWindow {
    pub fn new(start: NaiveTime, stop: NaiveTime) -> Self {
        Self { start, stop }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        is_within_window(self.start, self.stop, time)
    }
}

/// 告警规则配置（每个目标 × 通道一条）
#[derive(Debug, Clone, PartialEq)]
pub struct AlertPolicy {
    /// 通道名称
    pub transport: String,

    /// 两次告警的最小间隔，0 表示不限流
    pub alert_every: Duration,

    /// 首次告警前需要的连续失败次数
    pub alert_by_fail_count: u32,

    /// 同一故障期间只告警一次
    pub alert_once: bool,

    /// 恢复时额外发送一次告警
    pub alert_on_service_recovered: bool,

    /// 忽略限流和阈值，发布每一次结果
    pub publish_all_results: bool,

    /// 告警时间窗口
    pub window: Option<AlertingWindow>,

    /// IANA 时区，用于时间窗口和冷却判断
    pub timezone: Option<String>,

    /// 恢复告警是否更新上次发布时间（从而开始新的冷却期）
    pub cooldown_after_recovery: bool,
}

impl AlertPolicy {
    pub fn new(transport: impl Into<String>) -> Self {
        Self {
            transport: transport.into(),
            alert_every: Duration::ZERO,
            alert_by_fail_count: 1,
            alert_once: false,
            alert_on_service_recovered: false,
            publish_all_results: false,
            window: None,
            timezone: None,
            cooldown_after_recovery: true,
        }
    }

    pub fn with_alert_every(mut self, alert_every: Duration) -> Self {
        self.alert_every = alert_every;
        self
    }

    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.alert_by_fail_count = count.max(1);
        self
    }

    pub fn with_alert_once(mut self, alert_once: bool) -> Self {
        self.alert_once = alert_once;
        self
    }

    pub fn with_recovery_alert(mut self, enabled: bool) -> Self {
        self.alert_on_service_recovered = enabled;
        self
    }

    pub fn with_publish_all_results(mut self, enabled: bool) -> Self {
        self.publish_all_results = enabled;
        self
    }

    pub fn with_window(mut self, start: NaiveTime, stop: NaiveTime) -> Self {
        self.window = Some(AlertingWindow::new(start, stop));
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn with_cooldown_after_recovery(mut self, enabled: bool) -> Self {
        self.cooldown_after_recovery = enabled;
        self
    }
}

/// 不发送告警的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    OutsideWindow,
    BelowThreshold,
    AlreadyAlerted,
    Cooldown,
    NotFailing,
    UnknownStatus,
}

/// 单条规则对一次检查结果的判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Notify { kind: AlertKind, failed_count: u32 },
    Suppress(SuppressReason),
}

impl Decision {
    pub fn is_notify(&self) -> bool {
        matches!(self, Decision::Notify { .. })
    }
}

/// 规则运行时状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleState {
    /// 连续失败次数
    pub failed_count: u32,

    /// 上次观察到的状态
    pub last_status: HealthStatus,

    /// 上次检查时间
    pub last_check: Option<DateTime<Utc>>,

    /// 上次发布告警的时间，`None` 表示从未发布
    pub last_published: Option<DateTime<Utc>>,

    /// 当前故障期间是否已经发送过告警
    pub episode_alerted: bool,
}

impl RuleState {
    /// 依次执行：状态记账、时间窗口、发布全部结果、失败阈值、冷却/仅一次
    pub fn apply(&mut self, policy: &AlertPolicy, status: HealthStatus, now: DateTime<Utc>) -> Decision {
        self.last_check = Some(now);

        let previous_failures = self.failed_count;
        let recovered = status.is_healthy() && previous_failures > 0;
        match status {
            HealthStatus::Healthy => {
                self.failed_count = 0;
                self.episode_alerted = false;
            }
            HealthStatus::Degraded | HealthStatus::Unhealthy => {
                self.failed_count = self.failed_count.saturating_add(1);
            }
            HealthStatus::Unknown => {}
        }
        self.last_status = status;

        if let Some(window) = &policy.window {
            let local = in_timezone(now, policy.timezone.as_deref());
            if !window.contains(local.time()) {
                return Decision::Suppress(SuppressReason::OutsideWindow);
            }
        }

        if policy.publish_all_results {
            let kind = if recovered {
                AlertKind::Recovery
            } else if status.is_failing() {
                self.episode_alerted = true;
                AlertKind::Failure
            } else {
                AlertKind::Report
            };
            self.last_published = Some(now);
            return Decision::Notify {
                kind,
                failed_count: if recovered { previous_failures } else { self.failed_count },
            };
        }

        match status {
            HealthStatus::Degraded | HealthStatus::Unhealthy => {
                if self.failed_count < policy.alert_by_fail_count {
                    return Decision::Suppress(SuppressReason::BelowThreshold);
                }
                if policy.alert_once && self.episode_alerted {
                    return Decision::Suppress(SuppressReason::AlreadyAlerted);
                }
                if !self.cooldown_elapsed(policy, now) {
                    return Decision::Suppress(SuppressReason::Cooldown);
                }

                self.episode_alerted = true;
                self.last_published = Some(now);
                Decision::Notify {
                    kind: AlertKind::Failure,
                    failed_count: self.failed_count,
                }
            }
            HealthStatus::Healthy if recovered && policy.alert_on_service_recovered => {
                // 恢复告警不受冷却限制
                if policy.cooldown_after_recovery {
                    self.last_published = Some(now);
                }
                Decision::Notify {
                    kind: AlertKind::Recovery,
                    failed_count: previous_failures,
                }
            }
            HealthStatus::Healthy => Decision::Suppress(SuppressReason::NotFailing),
            HealthStatus::Unknown => Decision::Suppress(SuppressReason::UnknownStatus),
        }
    }

    fn cooldown_elapsed(&self, policy: &AlertPolicy, now: DateTime<Utc>) -> bool {
        let Some(last) = self.last_published else {
            return true;
        };
        if policy.alert_every.is_zero() {
            return true;
        }

        // 比上次发布更早的快照（并发乱序）不能触发告警
        let Ok(since) = now.signed_duration_since(last).to_std() else {
            return false;
        };

        if since >= DAY {
            return since >= policy.alert_every;
        }

        // 冷却按真实时间计算，用 UTC 时刻比较，不受夏令时跳变影响
        is_cooldown_elapsed(last.time(), policy.alert_every, now.time())
    }
}

/// 告警规则：配置 + 受锁保护的运行时状态
#[derive(Debug)]
pub struct AlertRule {
    policy: AlertPolicy,
    state: Mutex<RuleState>,
}

impl AlertRule {
    pub fn new(policy: AlertPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(RuleState::default()),
        }
    }

    pub fn policy(&self) -> &AlertPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &str {
        &self.policy.transport
    }

    /// 当前状态的副本
    pub fn state(&self) -> RuleState {
        self.state.lock().clone()
    }

    /// 在规则锁内完成一次判定和状态更新
    pub fn evaluate(&self, status: HealthStatus, now: DateTime<Utc>) -> Decision {
        let mut state = self.state.lock();
        state.apply(&self.policy, status, now)
    }
}
