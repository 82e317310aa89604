//! 监控适配器：对某个依赖执行一次检查并给出结论

mod http;
mod tcp;

pub use http::HttpMonitor;
pub use tcp::TcpMonitor;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use vigil_config::TargetKind;
use vigil_types::HealthVerdict;

/// 监控器
///
/// `check` 自己负责超时，不应该 panic；调度器仍会隔离 panic 并记为 Unknown。
#[async_trait]
pub trait Monitor: Send + Sync {
    /// 目标名称，也是快照中的键
    fn name(&self) -> &str;

    async fn check(&self) -> HealthVerdict;
}

/// 一组监控器，名称唯一
#[derive(Default)]
pub struct MonitorSet {
    monitors: Vec<Arc<dyn Monitor>>,
}

impl MonitorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, monitor: Arc<dyn Monitor>) -> anyhow::Result<()> {
        if self.get(monitor.name()).is_some() {
            anyhow::bail!("Monitor already registered: {}", monitor.name());
        }
        debug!(service = %monitor.name(), "Monitor registered");
        self.monitors.push(monitor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Monitor>> {
        self.monitors.iter().find(|m| m.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Monitor>> {
        self.monitors.iter()
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    pub fn into_vec(self) -> Vec<Arc<dyn Monitor>> {
        self.monitors
    }
}

/// 根据目标类型创建监控器并登记
pub trait TargetRegistration {
    fn register(&self, name: &str, monitors: &mut MonitorSet) -> anyhow::Result<()>;
}

impl TargetRegistration for TargetKind {
    fn register(&self, name: &str, monitors: &mut MonitorSet) -> anyhow::Result<()> {
        self.validate()
            .map_err(|reason| anyhow::anyhow!("Invalid target '{}': {}", name, reason))?;

        let monitor: Arc<dyn Monitor> = match self {
            TargetKind::Http(http) => Arc::new(HttpMonitor::new(name, http.clone())?),
            TargetKind::Tcp(tcp) => Arc::new(TcpMonitor::new(name, tcp.clone())),
        };
        monitors.add(monitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vigil_config::{HttpTarget, TcpTarget};

    fn tcp_kind() -> TargetKind {
        TargetKind::Tcp(TcpTarget {
            host: "127.0.0.1".to_string(),
            port: 6379,
            timeout: Duration::from_secs(1),
        })
    }

    #[test]
    fn test_register_targets() {
        let mut monitors = MonitorSet::new();
        tcp_kind().register("cache", &mut monitors).unwrap();
        TargetKind::Http(HttpTarget {
            urls: vec!["http://127.0.0.1:8080/health".to_string()],
            expected_status: 200,
            timeout: Duration::from_secs(1),
            degraded_after: None,
        })
        .register("api", &mut monitors)
        .unwrap();

        assert_eq!(monitors.len(), 2);
        assert_eq!(monitors.get("api").unwrap().name(), "api");
    }

    #[test]
    fn test_register_duplicate_name() {
        let mut monitors = MonitorSet::new();
        tcp_kind().register("cache", &mut monitors).unwrap();
        assert!(tcp_kind().register("cache", &mut monitors).is_err());
    }

    #[test]
    fn test_register_invalid_target() {
        let mut monitors = MonitorSet::new();
        let kind = TargetKind::Tcp(TcpTarget {
            host: String::new(),
            port: 22,
            timeout: Duration::from_secs(1),
        });
        assert!(kind.register("ssh", &mut monitors).is_err());
        assert!(monitors.is_empty());
    }
}
