use crate::message::AlertMessage;
use crate::transport::{DeliveryResult, Transport};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 内存通道：按目标名称保存所有投递过的告警
pub struct MemoryTransport {
    name: String,
    alerts: DashMap<String, Vec<AlertMessage>>,
    delivered: AtomicUsize,
}

impl MemoryTransport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alerts: DashMap::new(),
            delivered: AtomicUsize::new(0),
        }
    }

    /// 某个目标收到的告警（按投递顺序）
    pub fn alerts_for(&self, target: &str) -> Vec<AlertMessage> {
        self.alerts
            .get(target)
            .map(|alerts| alerts.value().clone())
            .unwrap_or_default()
    }

    /// 投递总数
    pub fn count(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    pub fn targets(&self) -> Vec<String> {
        self.alerts.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn clear(&self) {
        self.alerts.clear();
        self.delivered.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn deliver(&self, alert: &AlertMessage) -> anyhow::Result<DeliveryResult> {
        self.alerts
            .entry(alert.target.clone())
            .or_default()
            .push(alert.clone());
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(DeliveryResult::success())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::AlertKind;
    use chrono::Utc;
    use vigil_types::HealthVerdict;

    #[tokio::test]
    async fn test_memory_transport_keeps_alerts_by_target() {
        let transport = MemoryTransport::new("memory");
        let verdict = HealthVerdict::unhealthy("down");

        for target in ["db", "db", "cache"] {
            let alert = AlertMessage::new(target, &verdict, "memory", AlertKind::Failure, Utc::now());
            let result = transport.deliver(&alert).await.unwrap();
            assert!(result.success);
        }

        assert_eq!(transport.count(), 3);
        assert_eq!(transport.alerts_for("db").len(), 2);
        assert_eq!(transport.alerts_for("cache").len(), 1);
        assert!(transport.alerts_for("queue").is_empty());

        transport.clear();
        assert_eq!(transport.count(), 0);
        assert!(transport.targets().is_empty());
    }
}
