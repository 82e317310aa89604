use crate::error::Result;
use std::sync::Arc;
use tokio::sync::broadcast;
use vigil_types::HealthSnapshot;

/// 快照总线：每个监控周期产生的快照广播给所有发布者
#[derive(Clone)]
pub struct SnapshotBus {
    sender: broadcast::Sender<Arc<HealthSnapshot>>,
}

impl SnapshotBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<HealthSnapshot>> {
        self.sender.subscribe()
    }

    /// 广播快照，返回接收者数量
    pub fn publish(&self, snapshot: HealthSnapshot) -> Result<usize> {
        Ok(self.sender.send(Arc::new(snapshot))?)
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
