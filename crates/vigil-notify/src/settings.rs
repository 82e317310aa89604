use crate::memory::MemoryTransport;
use crate::providers::{
    EmailConfig, EmailTransport, InfluxDbConfig, InfluxDbTransport, SlackConfig, SlackTransport,
    TelegramConfig, TelegramTransport,
};
use crate::transport::Transport;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use vigil_core::Result;

/// 通道配置，按 `type` 字段区分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportSettings {
    Email(EmailConfig),
    Slack(SlackConfig),
    Telegram(TelegramConfig),
    #[serde(rename = "influxdb")]
    InfluxDb(InfluxDbConfig),
    Memory,
}

impl TransportSettings {
    pub fn kind(&self) -> &'static str {
        match self {
            TransportSettings::Email(_) => "email",
            TransportSettings::Slack(_) => "slack",
            TransportSettings::Telegram(_) => "telegram",
            TransportSettings::InfluxDb(_) => "influxdb",
            TransportSettings::Memory => "memory",
        }
    }

    /// 校验必填字段，在启动阶段调用
    pub fn validate(&self) -> Result<()> {
        match self {
            TransportSettings::Email(config) => config.validate(),
            TransportSettings::Slack(config) => config.validate(),
            TransportSettings::Telegram(config) => config.validate(),
            TransportSettings::InfluxDb(config) => config.validate(),
            TransportSettings::Memory => Ok(()),
        }
    }

    /// 根据配置创建通道实例
    pub fn build(&self, name: &str) -> Result<Arc<dyn Transport>> {
        let transport: Arc<dyn Transport> = match self {
            TransportSettings::Email(config) => Arc::new(EmailTransport::new(name, config.clone())?),
            TransportSettings::Slack(config) => Arc::new(SlackTransport::new(name, config.clone())?),
            TransportSettings::Telegram(config) => {
                Arc::new(TelegramTransport::new(name, config.clone())?)
            }
            TransportSettings::InfluxDb(config) => {
                Arc::new(InfluxDbTransport::new(name, config.clone())?)
            }
            TransportSettings::Memory => Arc::new(MemoryTransport::new(name)),
        };
        Ok(transport)
    }
}
