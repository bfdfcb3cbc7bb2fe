//! Webhook notification delivery against a mock endpoint

use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use serde_json::Value;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};
use scholardesk::config::Settings;
use scholardesk::models::user::{User, UserRole};
use scholardesk::services::notification::params;
use scholardesk::services::{LogChannel, NotificationChannel, NotificationService, WebhookChannel};

fn recipient(language: &str) -> User {
    let now = Utc::now();
    User {
        id: 42,
        email: "amina@example.com".to_string(),
        full_name: "Amina Yusuf".to_string(),
        phone: None,
        role: UserRole::Applicant,
        language_code: language.to_string(),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn service_for(server: &MockServer) -> NotificationService {
    let webhook = WebhookChannel::new(&format!("{}/notify", server.uri()), Duration::from_secs(2)).unwrap();
    let channels: Vec<Arc<dyn NotificationChannel>> = vec![Arc::new(LogChannel), Arc::new(webhook)];
    NotificationService::with_channels(true, "en", channels)
}

#[tokio::test]
async fn test_webhook_receives_rendered_notification() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notify"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let service = service_for(&server);
    let parameters = params([
        ("scholarship_title", "Engineering Excellence".to_string()),
        ("status", "meeting".to_string()),
    ]);
    let delivered = service.notify(&recipient("en"), "application_status", &parameters).await;
    assert_eq!(delivered, 2);

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["recipient_id"], 42);
    assert_eq!(body["template_key"], "application_status");
    assert_eq!(body["language"], "en");
    let text = body["body"].as_str().unwrap();
    assert!(text.contains("Engineering Excellence"));
    assert!(text.contains("meeting"));
}

#[tokio::test]
async fn test_webhook_failure_does_not_fail_notify() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let service = service_for(&server);
    let parameters = params([("reference", "TK-ABCD2345".to_string()), ("excerpt", "Sent".to_string())]);
    let delivered = service.notify(&recipient("fr"), "ticket_reply", &parameters).await;

    assert_eq!(delivered, 1);
    let stats = service.get_stats();
    assert_eq!(stats.total_sent, 1);
    assert_eq!(stats.total_failed, 1);
    assert_eq!(stats.sent_by_language.get("fr"), Some(&1));
}

#[tokio::test]
async fn test_configured_webhook_is_wired() {
    let server = MockServer::start().await;
    let mut settings = Settings::default();
    settings.notifications.webhook_url = Some(format!("{}/notify", server.uri()));

    let service = NotificationService::new(&settings.notifications).unwrap();
    assert_eq!(service.channel_names(), vec!["log", "webhook"]);

    settings.notifications.webhook_url = Some("not a url".to_string());
    assert!(NotificationService::new(&settings.notifications).is_err());
}
