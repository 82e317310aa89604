use dashmap::DashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};
use vigil_types::HealthVerdict;

/// 告警决策观察者
///
/// 每当发布者决定发送告警时，都会以 (目标名称, 检查结果) 调用一次。
pub trait Observer: Send + Sync {
    fn on_alert(&self, target: &str, verdict: &HealthVerdict) -> anyhow::Result<()>;
}

impl<F> Observer for F
where
    F: Fn(&str, &HealthVerdict) -> anyhow::Result<()> + Send + Sync,
{
    fn on_alert(&self, target: &str, verdict: &HealthVerdict) -> anyhow::Result<()> {
        self(target, verdict)
    }
}

/// 订阅凭证，用于取消订阅
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverToken(u64);

/// 观察者注册表，支持并发订阅、取消订阅和通知
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: AtomicU64,
    observers: DashMap<u64, Arc<dyn Observer>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn Observer>) -> ObserverToken {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.observers.insert(id, observer);
        ObserverToken(id)
    }

    /// 返回是否确实移除了观察者
    pub fn unsubscribe(&self, token: ObserverToken) -> bool {
        self.observers.remove(&token.0).is_some()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// 通知所有观察者，返回失败（出错或 panic）的数量
    ///
    /// 先复制一份观察者列表再逐个调用，回调期间不持有任何锁。
    pub fn notify(&self, target: &str, verdict: &HealthVerdict) -> usize {
        let observers: Vec<Arc<dyn Observer>> = self
            .observers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut failures = 0;
        for observer in observers {
            match catch_unwind(AssertUnwindSafe(|| observer.on_alert(target, verdict))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    warn!(service = %target, error = %e, "Observer failed");
                }
                Err(_) => {
                    failures += 1;
                    error!(service = %target, "Observer panicked");
                }
            }
        }
        failures
    }
}

/// 将告警决策写入日志的观察者
pub struct LogObserver;

impl Observer for LogObserver {
    fn on_alert(&self, target: &str, verdict: &HealthVerdict) -> anyhow::Result<()> {
        info!(
            service = %target,
            status = %verdict.status,
            description = verdict.description.as_deref().unwrap_or(""),
            "Alert published"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_observer(counter: Arc<AtomicUsize>) -> Arc<dyn Observer> {
        Arc::new(move |_: &str, _: &HealthVerdict| -> anyhow::Result<()> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let registry = ObserverRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let token = registry.subscribe(counting_observer(counter.clone()));
        assert_eq!(registry.len(), 1);

        registry.notify("db", &HealthVerdict::unhealthy("down"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        assert!(registry.unsubscribe(token));
        assert!(!registry.unsubscribe(token));
        assert!(registry.is_empty());

        registry.notify("db", &HealthVerdict::unhealthy("down"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failing_observers_are_isolated() {
        let registry = ObserverRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        registry.subscribe(Arc::new(|_: &str, _: &HealthVerdict| -> anyhow::Result<()> {
            anyhow::bail!("observer error")
        }));
        registry.subscribe(Arc::new(|_: &str, _: &HealthVerdict| -> anyhow::Result<()> {
            panic!("observer panic")
        }));
        registry.subscribe(counting_observer(counter.clone()));
        registry.subscribe(Arc::new(LogObserver));

        let failures = registry.notify("db", &HealthVerdict::unhealthy("down"));
        assert_eq!(failures, 2);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_subscribe() {
        let registry = Arc::new(ObserverRegistry::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                let counter = counter.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        let token = registry.subscribe(counting_observer(counter.clone()));
                        registry.notify("db", &HealthVerdict::healthy());
                        registry.unsubscribe(token);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(registry.is_empty());
        assert!(counter.load(Ordering::SeqCst) >= 200);
    }
}
