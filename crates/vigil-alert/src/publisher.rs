//! 告警发布：把监控目标的告警规则应用到每个健康快照上。

use crate::observer::{Observer, ObserverRegistry, ObserverToken};
use crate::rule::{AlertPolicy, AlertRule, Decision};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use vigil_notify::{AlertMessage, Transport};
use vigil_types::{HealthSnapshot, HealthVerdict};

struct BoundRule {
    rule: AlertRule,
    transport: Arc<dyn Transport>,
}

/// 发布者运行统计
#[derive(Debug, Default)]
pub struct PublisherStats {
    evaluated: AtomicU64,
    notified: AtomicU64,
    suppressed: AtomicU64,
    delivery_failures: AtomicU64,
    observer_failures: AtomicU64,
}

impl PublisherStats {
    pub fn evaluated(&self) -> u64 {
        self.evaluated.load(Ordering::Relaxed)
    }

    pub fn notified(&self) -> u64 {
        self.notified.load(Ordering::Relaxed)
    }

    pub fn suppressed(&self) -> u64 {
        self.suppressed.load(Ordering::Relaxed)
    }

    pub fn delivery_failures(&self) -> u64 {
        self.delivery_failures.load(Ordering::Relaxed)
    }

    pub fn observer_failures(&self) -> u64 {
        self.observer_failures.load(Ordering::Relaxed)
    }
}

/// 单个监控目标的告警发布者
///
/// 持有该目标的全部告警规则，每收到一个快照就逐条规则判定是否告警。
/// 可以被多个任务并发调用：每条规则的状态更新都在该规则自己的锁内完成，
/// 投递和通知观察者时不持有任何锁。
pub struct Publisher {
    target: String,
    rules: Vec<BoundRule>,
    observers: ObserverRegistry,
    stats: PublisherStats,
}

impl Publisher {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            rules: Vec::new(),
            observers: ObserverRegistry::new(),
            stats: PublisherStats::default(),
        }
    }

    pub fn with_rule(mut self, policy: AlertPolicy, transport: Arc<dyn Transport>) -> Self {
        self.add_rule(policy, transport);
        self
    }

    pub fn add_rule(&mut self, policy: AlertPolicy, transport: Arc<dyn Transport>) {
        debug!(
            service = %self.target,
            transport = %policy.transport,
            "Adding alert rule"
        );
        self.rules.push(BoundRule {
            rule: AlertRule::new(policy),
            transport,
        });
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn rules(&self) -> impl Iterator<Item = &AlertRule> {
        self.rules.iter().map(|bound| &bound.rule)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn stats(&self) -> &PublisherStats {
        &self.stats
    }

    pub fn subscribe(&self, observer: Arc<dyn Observer>) -> ObserverToken {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&self, token: ObserverToken) -> bool {
        self.observers.unsubscribe(token)
    }

    /// 用快照中本目标的检查结果评估所有规则
    ///
    /// 所有规则评估完成后返回。取消令牌在每条规则评估前检查；
    /// 已经更新了状态的规则会完成投递。
    pub async fn publish(&self, snapshot: &HealthSnapshot, cancel: &CancellationToken) {
        let Some(verdict) = snapshot.get(&self.target) else {
            debug!(service = %self.target, "Snapshot has no entry for target");
            return;
        };

        let now = snapshot.captured_at();
        join_all(
            self.rules
                .iter()
                .map(|bound| self.process_rule(bound, verdict, now, cancel)),
        )
        .await;
    }

    async fn process_rule(
        &self,
        bound: &BoundRule,
        verdict: &HealthVerdict,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) {
        if cancel.is_cancelled() {
            debug!(
                service = %self.target,
                transport = %bound.rule.transport(),
                "Publish cancelled before rule evaluation"
            );
            return;
        }

        self.stats.evaluated.fetch_add(1, Ordering::Relaxed);

        let (kind, failed_count) = match bound.rule.evaluate(verdict.status, now) {
            Decision::Notify { kind, failed_count } => (kind, failed_count),
            Decision::Suppress(reason) => {
                self.stats.suppressed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    service = %self.target,
                    transport = %bound.rule.transport(),
                    status = %verdict.status,
                    reason = ?reason,
                    "Alert suppressed"
                );
                return;
            }
        };

        let message = AlertMessage::new(
            self.target.as_str(),
            verdict,
            bound.rule.transport(),
            kind,
            now,
        )
        .with_failed_count(failed_count);

        self.deliver(bound.transport.as_ref(), &message).await;
        self.stats.notified.fetch_add(1, Ordering::Relaxed);

        let failures = self.observers.notify(&self.target, verdict);
        if failures > 0 {
            self.stats
                .observer_failures
                .fetch_add(failures as u64, Ordering::Relaxed);
        }
    }

    async fn deliver(&self, transport: &dyn Transport, message: &AlertMessage) {
        if !transport.is_enabled() {
            debug!(transport = %transport.name(), "Transport disabled, skipping delivery");
            return;
        }

        match AssertUnwindSafe(transport.deliver(message)).catch_unwind().await {
            Ok(Ok(result)) if result.success => {
                info!(
                    service = %message.target,
                    transport = %transport.name(),
                    kind = ?message.kind,
                    "Alert delivered: {}",
                    message.title()
                );
            }
            Ok(Ok(result)) => {
                self.stats.delivery_failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    service = %message.target,
                    transport = %transport.name(),
                    "Alert delivery failed: {}",
                    result.message
                );
            }
            Ok(Err(e)) => {
                self.stats.delivery_failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    service = %message.target,
                    transport = %transport.name(),
                    error = %e,
                    "Alert delivery error"
                );
            }
            Err(_) => {
                self.stats.delivery_failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    service = %message.target,
                    transport = %transport.name(),
                    "Transport panicked during delivery"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use support::{CancellingTransport, FailingTransport};
    use chrono::TimeZone;
    use std::sync::atomic::AtomicUsize;
    use vigil_notify::MemoryTransport;

    mod support {
        use tokio_util::sync::CancellationToken;
        use vigil_notify::{AlertMessage, DeliveryResult, Transport};

        /// 总是报错的通道
        pub struct FailingTransport;

        #[async_trait::async_trait]
        impl Transport for FailingTransport {
            async fn deliver(&self, _alert: &AlertMessage) -> anyhow::Result<DeliveryResult> {
                anyhow::bail!("smtp unreachable")
            }

            fn name(&self) -> &str {
                "broken"
            }

            fn kind(&self) -> &'static str {
                "test"
            }
        }

        /// 投递时触发取消的通道
        pub struct CancellingTransport {
            pub token: CancellationToken,
        }

        #[async_trait::async_trait]
        impl Transport for CancellingTransport {
            async fn deliver(&self, _alert: &AlertMessage) -> anyhow::Result<DeliveryResult> {
                self.token.cancel();
                Ok(DeliveryResult::success())
            }

            fn name(&self) -> &str {
                "cancelling"
            }

            fn kind(&self) -> &'static str {
                "test"
            }
        }
    }

    fn snapshot_at(second: u32, verdict: HealthVerdict) -> HealthSnapshot {
        HealthSnapshot::new(Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, second).unwrap())
            .with_entry("api", verdict)
    }

    #[tokio::test]
    async fn test_publish_delivers_and_notifies() {
        let inbox = Arc::new(MemoryTransport::new("inbox"));
        let publisher = Publisher::new("api").with_rule(AlertPolicy::new("inbox"), inbox.clone());

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        publisher.subscribe(Arc::new(move |target: &str, _: &HealthVerdict| -> anyhow::Result<()> {
            assert_eq!(target, "api");
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        let cancel = CancellationToken::new();
        publisher
            .publish(&snapshot_at(0, HealthVerdict::unhealthy("500")), &cancel)
            .await;

        let alerts = inbox.alerts_for("api");
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].transport, "inbox");
        assert_eq!(alerts[0].failed_count, 1);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(publisher.stats().notified(), 1);
    }

    #[tokio::test]
    async fn test_publish_ignores_other_targets() {
        let inbox = Arc::new(MemoryTransport::new("inbox"));
        let publisher = Publisher::new("db").with_rule(AlertPolicy::new("inbox"), inbox.clone());

        publisher
            .publish(&snapshot_at(0, HealthVerdict::unhealthy("500")), &CancellationToken::new())
            .await;

        assert_eq!(inbox.count(), 0);
        assert_eq!(publisher.stats().evaluated(), 0);
    }

    #[tokio::test]
    async fn test_failing_transport_does_not_block_others() {
        let inbox = Arc::new(MemoryTransport::new("inbox"));
        let publisher = Publisher::new("api")
            .with_rule(AlertPolicy::new("broken"), Arc::new(FailingTransport))
            .with_rule(AlertPolicy::new("inbox"), inbox.clone());

        publisher
            .publish(&snapshot_at(0, HealthVerdict::unhealthy("500")), &CancellationToken::new())
            .await;

        assert_eq!(inbox.count(), 1);
        assert_eq!(publisher.stats().delivery_failures(), 1);
        assert_eq!(publisher.stats().notified(), 2);

        // 投递失败也算已发布，状态照常更新
        for rule in publisher.rules() {
            assert!(rule.state().last_published.is_some());
        }
    }

    #[tokio::test]
    async fn test_cancelled_publish_leaves_state_untouched() {
        let inbox = Arc::new(MemoryTransport::new("inbox"));
        let publisher = Publisher::new("api").with_rule(AlertPolicy::new("inbox"), inbox.clone());

        let cancel = CancellationToken::new();
        cancel.cancel();
        publisher
            .publish(&snapshot_at(0, HealthVerdict::unhealthy("500")), &cancel)
            .await;

        assert_eq!(inbox.count(), 0);
        let state = publisher.rules().next().unwrap().state();
        assert_eq!(state.failed_count, 0);
        assert!(state.last_check.is_none());
    }

    #[tokio::test]
    async fn test_cancel_during_delivery_skips_remaining_rules() {
        let cancel = CancellationToken::new();
        let inbox = Arc::new(MemoryTransport::new("inbox"));
        let publisher = Publisher::new("api")
            .with_rule(
                AlertPolicy::new("cancelling"),
                Arc::new(CancellingTransport {
                    token: cancel.clone(),
                }),
            )
            .with_rule(AlertPolicy::new("inbox"), inbox.clone());

        publisher
            .publish(&snapshot_at(0, HealthVerdict::unhealthy("500")), &cancel)
            .await;

        let mut rules = publisher.rules();
        let first = rules.next().unwrap().state();
        let second = rules.next().unwrap().state();

        // 已开始投递的规则照常完成，后续规则不再评估
        assert!(first.last_published.is_some());
        assert!(second.last_check.is_none());
        assert_eq!(second.failed_count, 0);
        assert_eq!(inbox.count(), 0);
        assert_eq!(publisher.stats().evaluated(), 1);
        assert_eq!(publisher.stats().notified(), 1);
    }

    #[tokio::test]
    async fn test_unsubscribed_observer_is_not_called() {
        let inbox = Arc::new(MemoryTransport::new("inbox"));
        let publisher = Publisher::new("api").with_rule(AlertPolicy::new("inbox"), inbox.clone());

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let token = publisher.subscribe(Arc::new(move |_: &str, _: &HealthVerdict| -> anyhow::Result<()> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        assert!(publisher.unsubscribe(token));

        publisher
            .publish(&snapshot_at(0, HealthVerdict::unhealthy("500")), &CancellationToken::new())
            .await;

        assert_eq!(inbox.count(), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }
}
