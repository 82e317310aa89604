use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use vigil_config::{ConfigError, ConfigLoader};
use vigil_notify::{MemoryTransport, TransportRegistry};
use vigil_server::App;
use vigil_types::{HealthStatus, HealthVerdict};

/// 返回一个当前没有监听者的本地端口
async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

fn config_for(port: u16) -> String {
    format!(
        r#"
[monitoring]
interval = "50ms"

[[transports]]
name = "inbox"
type = "memory"

[[targets]]
name = "db"
kind = {{ type = "tcp", host = "127.0.0.1", port = {port}, timeout = "500ms" }}

[[targets.alerts]]
transport = "inbox"
alert_by_fail_count = 2
"#
    )
}

#[tokio::test]
async fn test_app_from_config() {
    let config = ConfigLoader::load_str(&config_for(5432)).unwrap();
    let app = App::from_config(config).unwrap();

    assert_eq!(app.publishers().len(), 1);
    assert_eq!(app.monitors().len(), 1);
    assert_eq!(app.transports().names(), vec!["inbox".to_string()]);

    let publisher = app.publisher("db").unwrap();
    assert_eq!(publisher.rule_count(), 1);
    assert_eq!(publisher.rules().next().unwrap().policy().alert_by_fail_count, 2);
}

const CUSTOM_TRANSPORT_CONFIG: &str = r#"
[[transports]]
name = "inbox"
type = "memory"

[[targets]]
name = "cache"
kind = { type = "tcp", host = "127.0.0.1", port = 6379 }

[[targets.alerts]]
transport = "custom"

[[targets.alerts]]
transport = "inbox"
"#;

#[tokio::test]
async fn test_app_with_custom_transport() {
    let registry = Arc::new(TransportRegistry::new());
    registry
        .register(Arc::new(MemoryTransport::new("custom")))
        .unwrap();

    // 只看配置文件时 custom 未定义
    assert!(matches!(
        ConfigLoader::load_str(CUSTOM_TRANSPORT_CONFIG),
        Err(ConfigError::UnknownTransport { .. })
    ));

    let config = ConfigLoader::load_str_with(CUSTOM_TRANSPORT_CONFIG, &registry.names()).unwrap();
    let app = App::with_registry(config.clone(), registry.clone()).unwrap();

    assert_eq!(
        app.transports().names(),
        vec!["custom".to_string(), "inbox".to_string()]
    );
    let transports: Vec<String> = app
        .publisher("cache")
        .unwrap()
        .rules()
        .map(|rule| rule.transport().to_string())
        .collect();
    assert_eq!(transports, vec!["custom".to_string(), "inbox".to_string()]);

    // 未注册 custom 的注册表仍然拒绝该配置
    assert!(App::from_config(config).is_err());
}

#[tokio::test]
async fn test_app_alerts_on_unreachable_target() {
    let port = closed_port().await;

    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("vigil.toml");
    fs::write(&path, config_for(port)).unwrap();

    let config = ConfigLoader::new(&path).with_env(false).load().unwrap();
    let app = App::from_config(config).unwrap();

    let alerts = Arc::new(AtomicUsize::new(0));
    let counter = alerts.clone();
    app.publisher("db").unwrap().subscribe(Arc::new(
        move |target: &str, verdict: &HealthVerdict| -> anyhow::Result<()> {
            assert_eq!(target, "db");
            assert_eq!(verdict.status, HealthStatus::Unhealthy);
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
    ));
    let publisher = app.publisher("db").unwrap().clone();

    let cancel = CancellationToken::new();
    let running = tokio::spawn(app.run(cancel.clone()));

    tokio::time::timeout(Duration::from_secs(10), async {
        while alerts.load(Ordering::SeqCst) < 2 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("no alert was published");

    cancel.cancel();
    running.await.unwrap().unwrap();

    // 第一次失败低于阈值，不会告警
    let stats = publisher.stats();
    assert!(stats.suppressed() >= 1);
    assert!(stats.notified() >= 2);
}
