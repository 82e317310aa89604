use crate::monitor::{MonitorSet, TargetRegistration};
use crate::scheduler::{spawn_publisher_worker, MonitorScheduler};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vigil_alert::{LogObserver, Publisher};
use vigil_config::AppConfig;
use vigil_core::SnapshotBus;
use vigil_notify::TransportRegistry;

/// 由配置组装出的运行时：通道、发布者和监控器
pub struct App {
    config: AppConfig,
    transports: Arc<TransportRegistry>,
    publishers: Vec<Arc<Publisher>>,
    monitors: MonitorSet,
}

impl App {
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        Self::with_registry(config, Arc::new(TransportRegistry::new()))
    }

    /// 使用预先注册了自定义通道的注册表，告警规则可以引用其中的通道
    pub fn with_registry(config: AppConfig, transports: Arc<TransportRegistry>) -> anyhow::Result<Self> {
        config.validate_with_transports(&transports.names())?;

        for entry in &config.transports {
            transports.register_settings(&entry.name, &entry.settings)?;
        }

        let mut publishers = Vec::with_capacity(config.targets.len());
        let mut monitors = MonitorSet::new();
        for target in &config.targets {
            target.kind.register(&target.name, &mut monitors)?;

            let mut publisher = Publisher::new(target.name.clone());
            for rule in &target.alerts {
                let transport = transports.resolve(&rule.transport)?;
                publisher.add_rule(rule.to_policy(), transport);
            }
            publisher.subscribe(Arc::new(LogObserver));
            publishers.push(Arc::new(publisher));
        }

        info!(
            transports = transports.len(),
            targets = publishers.len(),
            "Vigil initialized"
        );

        Ok(Self {
            config,
            transports,
            publishers,
            monitors,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn transports(&self) -> &Arc<TransportRegistry> {
        &self.transports
    }

    pub fn publishers(&self) -> &[Arc<Publisher>] {
        &self.publishers
    }

    pub fn publisher(&self, target: &str) -> Option<&Arc<Publisher>> {
        self.publishers.iter().find(|p| p.target() == target)
    }

    pub fn monitors(&self) -> &MonitorSet {
        &self.monitors
    }

    /// 运行直到取消：监控循环 + 每个发布者一个 worker
    pub async fn run(self, cancel: CancellationToken) -> anyhow::Result<()> {
        let bus = Arc::new(SnapshotBus::new(self.config.monitoring.bus_capacity));

        let workers: Vec<_> = self
            .publishers
            .iter()
            .map(|publisher| spawn_publisher_worker(publisher.clone(), &bus, cancel.clone()))
            .collect();

        let scheduler = MonitorScheduler::new(
            self.monitors.into_vec(),
            self.config.monitoring.interval,
            bus,
        );
        scheduler.run(cancel).await;

        for worker in workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "Publisher worker terminated abnormally");
            }
        }

        info!("Vigil stopped");
        Ok(())
    }
}
