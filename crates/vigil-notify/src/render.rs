//! 告警正文渲染

use crate::message::{AlertKind, AlertMessage};
use std::fmt::Write;

/// 纯文本正文（邮件）
pub fn render_text(alert: &AlertMessage) -> String {
    let mut body = format!("{}\n\n", alert.title());
    let _ = writeln!(body, "Target: {}", alert.target);
    let _ = writeln!(body, "Status: {}", alert.status);
    let _ = writeln!(body, "Description: {}", alert.description_or_default());
    let _ = writeln!(body, "Duration: {} ms", alert.duration.as_millis());
    if alert.kind == AlertKind::Failure {
        let _ = writeln!(body, "Consecutive failures: {}", alert.failed_count);
    }
    let _ = writeln!(body, "Time: {}", alert.timestamp.to_rfc3339());

    push_list(&mut body, "Failures", &alert.failures(), "  - ");
    push_list(&mut body, "Successes", &alert.successes(), "  - ");

    body
}

/// Markdown 正文（聊天机器人）
pub fn render_markdown(alert: &AlertMessage) -> String {
    let mut text = format!("*{}*\n\n", alert.title());
    let _ = writeln!(text, "*Status*: {}", alert.status);
    let _ = writeln!(text, "*Description*: {}", alert.description_or_default());
    let _ = writeln!(text, "*Duration*: {} ms", alert.duration.as_millis());
    let _ = writeln!(text, "*Time*: {}", alert.timestamp.to_rfc3339());

    push_list(&mut text, "*Failures*", &alert.failures(), "• ");
    push_list(&mut text, "*Successes*", &alert.successes(), "• ");

    text
}

fn push_list(out: &mut String, heading: &str, items: &[String], bullet: &str) {
    if items.is_empty() {
        return;
    }

    let _ = writeln!(out, "\n{}:", heading);
    for item in items {
        let _ = writeln!(out, "{}{}", bullet, item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use vigil_types::HealthVerdict;

    fn multi_endpoint_alert() -> AlertMessage {
        let verdict = HealthVerdict::unhealthy("1 of 2 endpoints failed")
            .with_data("Failures", json!(["https://a.example/health"]))
            .with_data("Successes", json!(["https://b.example/health"]));
        AlertMessage::new("web", &verdict, "mail", AlertKind::Failure, Utc::now()).with_failed_count(2)
    }

    #[test]
    fn test_render_text_lists() {
        let body = render_text(&multi_endpoint_alert());
        assert!(body.starts_with("[Unhealthy] web"));
        assert!(body.contains("Consecutive failures: 2"));
        assert!(body.contains("Failures:\n  - https://a.example/health"));
        assert!(body.contains("Successes:\n  - https://b.example/health"));
    }

    #[test]
    fn test_render_markdown_lists() {
        let text = render_markdown(&multi_endpoint_alert());
        assert!(text.contains("*[Unhealthy] web*"));
        assert!(text.contains("• https://a.example/health"));
    }

    #[test]
    fn test_render_without_lists() {
        let alert = AlertMessage::new(
            "web",
            &HealthVerdict::healthy(),
            "mail",
            AlertKind::Recovery,
            Utc::now(),
        );
        let body = render_text(&alert);
        assert!(!body.contains("Failures:"));
        assert!(!body.contains("Consecutive failures"));
    }
}
