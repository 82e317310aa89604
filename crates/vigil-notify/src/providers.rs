use crate::message::{AlertKind, AlertMessage};
use crate::render::{render_markdown, render_text};
use crate::transport::{DeliveryResult, Transport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vigil_core::{Result, VigilError};
use vigil_types::HealthStatus;

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_true() -> bool {
    true
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| VigilError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// 校验 http/https 地址：必须能完整解析且带有主机名
pub fn validate_http_url(field: &str, url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| VigilError::Config(format!("Invalid {} '{}': {}", field, url, e)))?;
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(VigilError::Config(format!(
                "Invalid {} '{}': unsupported scheme {}",
                field, url, scheme
            )))
        }
    }
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(VigilError::Config(format!("Invalid {} '{}': missing host", field, url))),
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(VigilError::Config(format!("{} must not be empty", field)));
    }
    Ok(())
}

// ============================================================================
// 邮件通知
// ============================================================================

fn default_smtp_port() -> u16 {
    587
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub from: String,
    pub to: Vec<String>,
    /// 使用 STARTTLS 连接中继
    #[serde(default = "default_true")]
    pub starttls: bool,
}

impl EmailConfig {
    pub fn validate(&self) -> Result<()> {
        require("smtp_host", &self.smtp_host)?;
        parse_mailbox(&self.from)?;
        if self.to.is_empty() {
            return Err(VigilError::Config("Email recipient list is empty".to_string()));
        }
        for address in &self.to {
            parse_mailbox(address)?;
        }
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<lettre::message::Mailbox> {
    address
        .parse()
        .map_err(|e| VigilError::Config(format!("Invalid email address '{}': {}", address, e)))
}

pub struct EmailTransport {
    name: String,
    from: lettre::message::Mailbox,
    to: Vec<lettre::message::Mailbox>,
    mailer: lettre::AsyncSmtpTransport<lettre::Tokio1Executor>,
}

impl EmailTransport {
    pub fn new(name: impl Into<String>, config: EmailConfig) -> Result<Self> {
        use lettre::transport::smtp::authentication::Credentials;
        use lettre::{AsyncSmtpTransport, Tokio1Executor};

        config.validate()?;

        let from = parse_mailbox(&config.from)?;
        let to = config
            .to
            .iter()
            .map(|address| parse_mailbox(address))
            .collect::<Result<Vec<_>>>()?;

        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host).map_err(|e| {
                VigilError::Config(format!("Invalid SMTP relay '{}': {}", config.smtp_host, e))
            })?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        };

        let mut builder = builder.port(config.smtp_port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            name: name.into(),
            from,
            to,
            mailer: builder.build(),
        })
    }
}

#[async_trait]
impl Transport for EmailTransport {
    async fn deliver(&self, alert: &AlertMessage) -> anyhow::Result<DeliveryResult> {
        use lettre::message::header::ContentType;
        use lettre::{AsyncTransport, Message};

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(alert.title())
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }
        let email = builder.body(render_text(alert))?;

        match self.mailer.send(email).await {
            Ok(_) => Ok(DeliveryResult::success()),
            Err(e) => Ok(DeliveryResult::failure(format!("Email send failed: {}", e))),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "email"
    }
}

// ============================================================================
// Slack 通知
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackConfig {
    pub webhook_url: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl SlackConfig {
    pub fn validate(&self) -> Result<()> {
        validate_http_url("webhook_url", &self.webhook_url)
    }
}

pub struct SlackTransport {
    name: String,
    config: SlackConfig,
    client: reqwest::Client,
}

impl SlackTransport {
    pub fn new(name: impl Into<String>, config: SlackConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            client: http_client(config.timeout)?,
            config,
        })
    }

    fn build_message(&self, alert: &AlertMessage) -> serde_json::Value {
        let color = match (alert.kind, alert.status) {
            (AlertKind::Recovery, _) | (_, HealthStatus::Healthy) => "good",
            (_, HealthStatus::Degraded) => "warning",
            (_, HealthStatus::Unhealthy) => "danger",
            (_, HealthStatus::Unknown) => "#999999",
        };

        serde_json::json!({
            "username": self.config.username.as_deref().unwrap_or("vigil"),
            "channel": self.config.channel,
            "attachments": [{
                "color": color,
                "title": alert.title(),
                "text": render_markdown(alert),
                "fields": [
                    {
                        "title": "Status",
                        "value": alert.status.as_str(),
                        "short": true
                    },
                    {
                        "title": "Duration",
                        "value": format!("{} ms", alert.duration.as_millis()),
                        "short": true
                    }
                ],
                "ts": alert.timestamp.timestamp()
            }]
        })
    }
}

#[async_trait]
impl Transport for SlackTransport {
    async fn deliver(&self, alert: &AlertMessage) -> anyhow::Result<DeliveryResult> {
        let body = self.build_message(alert);

        let response = self
            .client
            .post(&self.config.webhook_url)
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(DeliveryResult::success())
        } else {
            Ok(DeliveryResult::failure(format!(
                "Slack failed: {}",
                response.status()
            )))
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "slack"
    }
}

// ============================================================================
// Telegram 机器人通知
// ============================================================================

fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    #[serde(default = "default_telegram_api")]
    pub api_url: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl TelegramConfig {
    pub fn validate(&self) -> Result<()> {
        require("bot_token", &self.bot_token)?;
        require("chat_id", &self.chat_id)?;
        validate_http_url("api_url", &self.api_url)
    }
}

pub struct TelegramTransport {
    name: String,
    config: TelegramConfig,
    client: reqwest::Client,
}

impl TelegramTransport {
    pub fn new(name: impl Into<String>, config: TelegramConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            client: http_client(config.timeout)?,
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_url.trim_end_matches('/'),
            self.config.bot_token
        )
    }

    fn build_message(&self, alert: &AlertMessage) -> serde_json::Value {
        serde_json::json!({
            "chat_id": self.config.chat_id,
            "text": render_markdown(alert),
            "parse_mode": "Markdown",
            "disable_web_page_preview": true
        })
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn deliver(&self, alert: &AlertMessage) -> anyhow::Result<DeliveryResult> {
        let body = self.build_message(alert);

        let response = self.client.post(self.endpoint()).json(&body).send().await?;

        if response.status().is_success() {
            Ok(DeliveryResult::success())
        } else {
            Ok(DeliveryResult::failure(format!(
                "Telegram failed: {}",
                response.status()
            )))
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "telegram"
    }
}

// ============================================================================
// InfluxDB 指标写入
// ============================================================================

fn default_measurement() -> String {
    "health_check".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluxDbConfig {
    pub url: String,
    pub database: String,
    #[serde(default = "default_measurement")]
    pub measurement: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl InfluxDbConfig {
    pub fn validate(&self) -> Result<()> {
        validate_http_url("url", &self.url)?;
        require("database", &self.database)?;
        require("measurement", &self.measurement)
    }
}

pub struct InfluxDbTransport {
    name: String,
    config: InfluxDbConfig,
    client: reqwest::Client,
}

impl InfluxDbTransport {
    pub fn new(name: impl Into<String>, config: InfluxDbConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            client: http_client(config.timeout)?,
            config,
        })
    }

    /// 行协议，时间精度为毫秒
    pub fn line_protocol(&self, alert: &AlertMessage) -> String {
        format!(
            "{},target={},status={},transport={} healthy={},duration_ms={}i,failures={}i,failed_count={}i {}",
            escape(&self.config.measurement, false),
            escape(&alert.target, true),
            alert.status.as_str(),
            escape(&alert.transport, true),
            alert.status.is_healthy(),
            alert.duration.as_millis(),
            alert.failures().len(),
            alert.failed_count,
            alert.timestamp.timestamp_millis()
        )
    }
}

fn escape(value: &str, tag: bool) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == ',' || c == ' ' || (tag && c == '=') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl Transport for InfluxDbTransport {
    async fn deliver(&self, alert: &AlertMessage) -> anyhow::Result<DeliveryResult> {
        let mut request = self
            .client
            .post(format!("{}/write", self.config.url.trim_end_matches('/')))
            .query(&[("db", self.config.database.as_str()), ("precision", "ms")])
            .body(self.line_protocol(alert));

        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_ref());
        }

        let response = request.send().await?;

        if response.status().is_success() {
            Ok(DeliveryResult::success())
        } else {
            Ok(DeliveryResult::failure(format!(
                "InfluxDB write failed: {}",
                response.status()
            )))
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "influxdb"
    }
}
