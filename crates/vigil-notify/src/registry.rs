use crate::settings::TransportSettings;
use crate::transport::Transport;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use vigil_core::{Result, VigilError};

/// 通道注册表：按名称查找通道实例
#[derive(Default)]
pub struct TransportRegistry {
    transports: RwLock<HashMap<String, Arc<dyn Transport>>>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册通道，名称重复视为配置错误
    pub fn register(&self, transport: Arc<dyn Transport>) -> Result<()> {
        let mut transports = self.transports.write();
        let name = transport.name().to_string();
        if transports.contains_key(&name) {
            return Err(VigilError::Config(format!(
                "Transport '{}' is registered twice",
                name
            )));
        }
        info!(transport = %name, kind = transport.kind(), "Registered transport");
        transports.insert(name, transport);
        Ok(())
    }

    /// 根据配置创建并注册通道
    pub fn register_settings(&self, name: &str, settings: &TransportSettings) -> Result<()> {
        let transport = settings.build(name)?;
        self.register(transport)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Transport>> {
        self.transports.read().get(name).cloned()
    }

    /// 解析告警规则引用的通道名称
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Transport>> {
        self.get(name)
            .ok_or_else(|| VigilError::NotFound(format!("Transport '{}' is not configured", name)))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.transports.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.transports.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.transports.read().is_empty()
    }
}
