use super::Monitor;
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::json;
use std::time::{Duration, Instant};
use vigil_config::HttpTarget;
use vigil_types::HealthVerdict;

/// HTTP 检查
///
/// 并发请求所有端点：全部成功为 Healthy，部分失败为 Degraded，全部失败为 Unhealthy。
/// 全部成功但最慢的响应超过 `degraded_after` 时也判定为 Degraded。
pub struct HttpMonitor {
    name: String,
    target: HttpTarget,
    client: reqwest::Client,
}

enum Probe {
    Passed { url: String, elapsed: Duration },
    Failed { url: String, reason: String },
}

impl HttpMonitor {
    pub fn new(name: impl Into<String>, target: HttpTarget) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(target.timeout).build()?;
        Ok(Self {
            name: name.into(),
            target,
            client,
        })
    }

    async fn probe(&self, url: &str) -> Probe {
        let started = Instant::now();
        match self.client.get(url).send().await {
            Ok(response) if response.status().as_u16() == self.target.expected_status => {
                Probe::Passed {
                    url: url.to_string(),
                    elapsed: started.elapsed(),
                }
            }
            Ok(response) => Probe::Failed {
                url: url.to_string(),
                reason: format!(
                    "expected status {}, got {}",
                    self.target.expected_status,
                    response.status().as_u16()
                ),
            },
            Err(e) if e.is_timeout() => Probe::Failed {
                url: url.to_string(),
                reason: format!("timed out after {:?}", self.target.timeout),
            },
            Err(e) => Probe::Failed {
                url: url.to_string(),
                reason: e.to_string(),
            },
        }
    }
}

#[async_trait]
impl Monitor for HttpMonitor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> HealthVerdict {
        let started = Instant::now();
        let probes = join_all(self.target.urls.iter().map(|url| self.probe(url))).await;

        let mut successes = Vec::new();
        let mut failures = Vec::new();
        let mut slowest = Duration::ZERO;
        for probe in probes {
            match probe {
                Probe::Passed { url, elapsed } => {
                    slowest = slowest.max(elapsed);
                    successes.push(url);
                }
                Probe::Failed { url, reason } => failures.push(format!("{}: {}", url, reason)),
            }
        }

        let total = self.target.urls.len();
        let verdict = if failures.is_empty() {
            match self.target.degraded_after {
                Some(threshold) if slowest > threshold => HealthVerdict::degraded(format!(
                    "Slow response: {} ms (threshold {} ms)",
                    slowest.as_millis(),
                    threshold.as_millis()
                )),
                _ => HealthVerdict::healthy(),
            }
        } else if failures.len() == total {
            let description = if total == 1 {
                failures[0].clone()
            } else {
                format!("All {} endpoints failed", total)
            };
            HealthVerdict::unhealthy(description)
        } else {
            HealthVerdict::degraded(format!("{} of {} endpoints failed", failures.len(), total))
        };

        let verdict = verdict.with_duration(started.elapsed());
        if total > 1 || !failures.is_empty() {
            verdict
                .with_data("Failures", json!(failures))
                .with_data("Successes", json!(successes))
        } else {
            verdict
        }
    }
}
