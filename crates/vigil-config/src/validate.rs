use crate::error::{ConfigError, Result};
use crate::model::{AlertRuleConfig, AppConfig, HttpTarget, TargetKind, TcpTarget};
use std::collections::HashSet;
use tracing::warn;
use vigil_notify::validate_http_url;

impl AppConfig {
    /// 启动前校验整个配置，任何错误都是致命的
    pub fn validate(&self) -> Result<()> {
        self.validate_with_transports::<&str>(&[])
    }

    /// 同 [`AppConfig::validate`]，但规则还可以引用配置文件之外预先注册的通道
    pub fn validate_with_transports<S: AsRef<str>>(&self, external: &[S]) -> Result<()> {
        if self.monitoring.interval.is_zero() {
            return Err(ConfigError::Invalid(
                "monitoring.interval must be greater than 0".to_string(),
            ));
        }
        if self.monitoring.bus_capacity == 0 {
            return Err(ConfigError::Invalid(
                "monitoring.bus_capacity must be greater than 0".to_string(),
            ));
        }

        let mut transports: HashSet<&str> = external.iter().map(|name| name.as_ref()).collect();
        for entry in &self.transports {
            if entry.name.trim().is_empty() {
                return Err(ConfigError::Invalid("Transport name must not be empty".to_string()));
            }
            if !transports.insert(entry.name.as_str()) {
                return Err(ConfigError::DuplicateTransport(entry.name.clone()));
            }
            entry
                .settings
                .validate()
                .map_err(|e| ConfigError::InvalidTransport {
                    name: entry.name.clone(),
                    reason: e.to_string(),
                })?;
        }

        let mut targets = HashSet::new();
        for target in &self.targets {
            if target.name.trim().is_empty() {
                return Err(ConfigError::Invalid("Target name must not be empty".to_string()));
            }
            if !targets.insert(target.name.as_str()) {
                return Err(ConfigError::DuplicateTarget(target.name.clone()));
            }

            target
                .kind
                .validate()
                .map_err(|reason| ConfigError::InvalidTarget {
                    name: target.name.clone(),
                    reason,
                })?;

            if target.alerts.is_empty() {
                warn!(service = %target.name, "Target has no alert rules");
            }

            for rule in &target.alerts {
                if !transports.contains(rule.transport.as_str()) {
                    return Err(ConfigError::UnknownTransport {
                        target: target.name.clone(),
                        transport: rule.transport.clone(),
                    });
                }
                rule.validate().map_err(|reason| ConfigError::InvalidRule {
                    target: target.name.clone(),
                    reason,
                })?;
            }
        }

        Ok(())
    }
}

impl TargetKind {
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            TargetKind::Http(http) => http.validate(),
            TargetKind::Tcp(tcp) => tcp.validate(),
        }
    }
}

impl HttpTarget {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.urls.is_empty() {
            return Err("at least one url is required".to_string());
        }
        for url in &self.urls {
            validate_http_url("url", url).map_err(|e| e.to_string())?;
        }
        if !(100..=599).contains(&self.expected_status) {
            return Err(format!("expected_status {} is not an HTTP status", self.expected_status));
        }
        if self.timeout.is_zero() {
            return Err("timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl TcpTarget {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("host must not be empty".to_string());
        }
        if self.port == 0 {
            return Err("port must be greater than 0".to_string());
        }
        if self.timeout.is_zero() {
            return Err("timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl AlertRuleConfig {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.alert_by_fail_count == 0 {
            return Err("alert_by_fail_count must be at least 1".to_string());
        }
        if self.start_alerting_on.is_some() != self.stop_alerting_on.is_some() {
            return Err(
                "start_alerting_on and stop_alerting_on must be set together".to_string(),
            );
        }
        if matches!(&self.timezone, Some(tz) if tz.trim().is_empty()) {
            return Err("timezone must not be empty".to_string());
        }
        Ok(())
    }
}
