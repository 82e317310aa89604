use crate::monitor::Monitor;
use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use vigil_alert::Publisher;
use vigil_core::SnapshotBus;
use vigil_types::{HealthSnapshot, HealthVerdict};

/// 监控调度器：按固定间隔运行所有监控器，并把快照广播到总线
pub struct MonitorScheduler {
    monitors: Vec<Arc<dyn Monitor>>,
    interval: Duration,
    bus: Arc<SnapshotBus>,
}

impl MonitorScheduler {
    pub fn new(monitors: Vec<Arc<dyn Monitor>>, interval: Duration, bus: Arc<SnapshotBus>) -> Self {
        Self {
            monitors,
            interval,
            bus,
        }
    }

    pub fn bus(&self) -> &Arc<SnapshotBus> {
        &self.bus
    }

    /// 并发运行所有监控器，组装成一个快照
    pub async fn collect(&self) -> HealthSnapshot {
        let started = Instant::now();

        let results = join_all(self.monitors.iter().map(|monitor| async move {
            let verdict = match AssertUnwindSafe(monitor.check()).catch_unwind().await {
                Ok(verdict) => verdict,
                Err(_) => {
                    error!(service = %monitor.name(), "Monitor panicked");
                    HealthVerdict::unknown().with_description("Monitor panicked")
                }
            };
            (monitor.name().to_string(), verdict)
        }))
        .await;

        results
            .into_iter()
            .fold(HealthSnapshot::new(Utc::now()), |snapshot, (name, verdict)| {
                snapshot.with_entry(name, verdict)
            })
            .with_total_duration(started.elapsed())
    }

    /// 运行监控循环直到取消
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            monitors = self.monitors.len(),
            interval = ?self.interval,
            "Monitor scheduler started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let snapshot = tokio::select! {
                        _ = cancel.cancelled() => break,
                        snapshot = self.collect() => snapshot,
                    };

                    debug!(
                        entries = snapshot.len(),
                        overall = %snapshot.overall_status(),
                        duration_ms = snapshot.total_duration().as_millis() as u64,
                        "Health snapshot collected"
                    );

                    if let Err(e) = self.bus.publish(snapshot) {
                        warn!(error = %e, "Snapshot dropped, no publisher is listening");
                    }
                }
            }
        }

        info!("Monitor scheduler stopped");
    }
}

/// 为发布者启动一个消费快照的任务
///
/// 每个快照在该任务内顺序发布，因此同一发布者看到的检查时间单调不减。
pub fn spawn_publisher_worker(
    publisher: Arc<Publisher>,
    bus: &SnapshotBus,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let mut receiver = bus.subscribe();

    tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => break,
                received = receiver.recv() => received,
            };

            match received {
                Ok(snapshot) => publisher.publish(&snapshot, &cancel).await,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        service = %publisher.target(),
                        skipped,
                        "Publisher lagged behind, skipped snapshots"
                    );
                }
                Err(RecvError::Closed) => break,
            }
        }

        debug!(service = %publisher.target(), "Publisher worker stopped");
    })
}
