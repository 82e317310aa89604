use super::Monitor;
use async_trait::async_trait;
use serde_json::json;
use std::time::Instant;
use tokio::net::TcpStream;
use tokio::time::timeout;
use vigil_config::TcpTarget;
use vigil_types::HealthVerdict;

/// TCP 连通性检查：能在超时内建立连接即为健康
pub struct TcpMonitor {
    name: String,
    target: TcpTarget,
}

impl TcpMonitor {
    pub fn new(name: impl Into<String>, target: TcpTarget) -> Self {
        Self {
            name: name.into(),
            target,
        }
    }

    fn address(&self) -> String {
        format!("{}:{}", self.target.host, self.target.port)
    }
}

#[async_trait]
impl Monitor for TcpMonitor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> HealthVerdict {
        let address = self.address();
        let started = Instant::now();

        let verdict = match timeout(
            self.target.timeout,
            TcpStream::connect((self.target.host.as_str(), self.target.port)),
        )
        .await
        {
            Ok(Ok(_stream)) => HealthVerdict::healthy(),
            Ok(Err(e)) => HealthVerdict::unhealthy(format!("Connection to {} failed: {}", address, e)),
            Err(_) => HealthVerdict::unhealthy(format!(
                "Connection to {} timed out after {:?}",
                address, self.target.timeout
            )),
        };

        verdict
            .with_duration(started.elapsed())
            .with_data("address", json!(address))
    }
}
