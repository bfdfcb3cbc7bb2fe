//! Notification service implementation
//!
//! Messages are rendered from per-language templates with `{placeholder}`
//! substitution and handed to every configured delivery channel. Delivery
//! failures are logged and counted but never propagate to the caller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn, debug};
use crate::config::settings::NotificationsConfig;
use crate::models::user::User;
use crate::utils::errors::{ScholarDeskError, Result};

/// Languages that notification templates exist for
pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "fr"];

/// Message template structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub key: String,
    pub subject: String,
    pub content: HashMap<String, String>, // language -> content mapping
}

/// A rendered message addressed to one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub recipient_id: i64,
    pub recipient_email: String,
    pub template_key: String,
    pub language: String,
    pub subject: String,
    pub body: String,
}

/// Notification statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationStats {
    pub total_sent: u64,
    pub total_failed: u64,
    pub sent_by_language: HashMap<String, u64>,
    pub sent_by_template: HashMap<String, u64>,
}

/// Somewhere a rendered notification can be delivered
#[async_trait]
pub trait NotificationChannel: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    async fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Writes notifications to the log
#[derive(Debug, Clone, Default)]
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        info!(
            recipient_id = notification.recipient_id,
            template_key = %notification.template_key,
            language = %notification.language,
            subject = %notification.subject,
            "Notification: {}",
            notification.body
        );
        Ok(())
    }
}

/// POSTs notifications as JSON to an external endpoint
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    url: String,
    client: Client,
}

impl WebhookChannel {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        url::Url::parse(url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.to_string(),
            client,
        })
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        let response = self.client.post(&self.url).json(notification).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScholarDeskError::ServiceUnavailable(format!(
                "Webhook returned {}",
                status
            )));
        }

        debug!(recipient_id = notification.recipient_id, status = status.as_u16(), "Webhook notification delivered");
        Ok(())
    }
}

/// Notification service for message handling
#[derive(Clone, Debug)]
pub struct NotificationService {
    enabled: bool,
    default_language: String,
    channels: Vec<Arc<dyn NotificationChannel>>,
    templates: HashMap<String, MessageTemplate>,
    stats: Arc<Mutex<NotificationStats>>,
}

impl NotificationService {
    /// Create a NotificationService with the log channel and, when configured, the webhook channel
    pub fn new(config: &NotificationsConfig) -> Result<Self> {
        let mut channels: Vec<Arc<dyn NotificationChannel>> = vec![Arc::new(LogChannel)];
        if let Some(url) = config.webhook_url.as_deref().filter(|u| !u.is_empty()) {
            let timeout = Duration::from_secs(config.webhook_timeout_seconds);
            channels.push(Arc::new(WebhookChannel::new(url, timeout)?));
        }

        Ok(Self::with_channels(config.enabled, &config.default_language, channels))
    }

    pub fn with_channels(enabled: bool, default_language: &str, channels: Vec<Arc<dyn NotificationChannel>>) -> Self {
        Self {
            enabled,
            default_language: default_language.to_string(),
            channels,
            templates: Self::load_default_templates(),
            stats: Arc::new(Mutex::new(NotificationStats::default())),
        }
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Render and deliver a template to `user`; returns how many channels accepted it
    pub async fn notify(&self, user: &User, template_key: &str, parameters: &HashMap<String, String>) -> usize {
        if !self.enabled {
            debug!(user_id = user.id, template_key = %template_key, "Notifications disabled, skipping");
            return 0;
        }

        let notification = match self.render(user, template_key, parameters) {
            Ok(notification) => notification,
            Err(e) => {
                warn!(user_id = user.id, template_key = %template_key, error = %e, "Failed to render notification");
                self.update_stats_failure();
                return 0;
            }
        };

        let mut delivered = 0;
        for channel in &self.channels {
            match channel.deliver(&notification).await {
                Ok(()) => {
                    delivered += 1;
                    self.update_stats_success(template_key, &notification.language);
                }
                Err(e) => {
                    self.update_stats_failure();
                    warn!(
                        channel = channel.name(),
                        user_id = user.id,
                        template_key = %template_key,
                        error = %e,
                        "Failed to deliver notification"
                    );
                }
            }
        }

        delivered
    }

    /// Build the notification for `user` in their language, falling back to the default
    pub fn render(&self, user: &User, template_key: &str, parameters: &HashMap<String, String>) -> Result<Notification> {
        let template = self.templates.get(template_key)
            .ok_or_else(|| ScholarDeskError::InvalidInput(format!("Template not found: {}", template_key)))?;

        let (language, content) = match template.content.get(&user.language_code) {
            Some(content) => (user.language_code.clone(), content),
            None => {
                let content = template.content.get(&self.default_language)
                    .ok_or_else(|| ScholarDeskError::InvalidInput(format!(
                        "Template content not found for language: {}",
                        user.language_code
                    )))?;
                (self.default_language.clone(), content)
            }
        };

        let mut parameters = parameters.clone();
        parameters.entry("full_name".to_string()).or_insert_with(|| user.full_name.clone());

        Ok(Notification {
            recipient_id: user.id,
            recipient_email: user.email.clone(),
            template_key: template_key.to_string(),
            language,
            subject: format_message(&template.subject, &parameters),
            body: format_message(content, &parameters),
        })
    }

    fn update_stats_success(&self, template_key: &str, language: &str) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.total_sent += 1;
            *stats.sent_by_language.entry(language.to_string()).or_insert(0) += 1;
            *stats.sent_by_template.entry(template_key.to_string()).or_insert(0) += 1;
        }
    }

    fn update_stats_failure(&self) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.total_failed += 1;
        }
    }

    /// Get notification statistics
    pub fn get_stats(&self) -> NotificationStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Add or update a message template
    pub fn add_template(&mut self, template: MessageTemplate) {
        self.templates.insert(template.key.clone(), template);
    }

    /// Get available template keys
    pub fn get_template_keys(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }

    fn template(key: &str, subject: &str, en: &str, fr: &str) -> (String, MessageTemplate) {
        let mut content = HashMap::new();
        content.insert("en".to_string(), en.to_string());
        content.insert("fr".to_string(), fr.to_string());
        (
            key.to_string(),
            MessageTemplate {
                key: key.to_string(),
                subject: subject.to_string(),
                content,
            },
        )
    }

    /// Load default message templates
    fn load_default_templates() -> HashMap<String, MessageTemplate> {
        [
            Self::template(
                "application_status",
                "Application update: {scholarship_title}",
                "Dear {full_name}, your application for {scholarship_title} moved to stage \"{status}\".",
                "Bonjour {full_name}, votre candidature pour {scholarship_title} est passée à l'étape \"{status}\".",
            ),
            Self::template(
                "application_rejected",
                "Application decision: {scholarship_title}",
                "Dear {full_name}, your application for {scholarship_title} was not accepted. Reason: {reason}",
                "Bonjour {full_name}, votre candidature pour {scholarship_title} n'a pas été retenue. Motif : {reason}",
            ),
            Self::template(
                "student_enrolled",
                "Welcome, {student_number}",
                "Congratulations {full_name}! You are now enrolled as student {student_number}.",
                "Félicitations {full_name} ! Vous êtes inscrit(e) sous le numéro d'étudiant {student_number}.",
            ),
            Self::template(
                "appointment_scheduled",
                "Meeting scheduled",
                "Dear {full_name}, a meeting about your application is scheduled for {scheduled_at} at {location}.",
                "Bonjour {full_name}, un entretien concernant votre candidature est prévu le {scheduled_at} à {location}.",
            ),
            Self::template(
                "activity_decision",
                "{activity_title}: {status}",
                "Dear {full_name}, your application to {activity_title} is now \"{status}\".",
                "Bonjour {full_name}, votre inscription à {activity_title} est maintenant \"{status}\".",
            ),
            Self::template(
                "ticket_reply",
                "Ticket {reference} updated",
                "Dear {full_name}, there is a new reply on ticket {reference}: {excerpt}",
                "Bonjour {full_name}, nouvelle réponse sur le ticket {reference} : {excerpt}",
            ),
            Self::template(
                "request_status",
                "Request update",
                "Dear {full_name}, your {kind} request is now \"{status}\".",
                "Bonjour {full_name}, votre demande ({kind}) est maintenant \"{status}\".",
            ),
        ]
        .into_iter()
        .collect()
    }
}

/// Replace every `{key}` with its value; unknown placeholders stay as written
pub fn format_message(template: &str, parameters: &HashMap<String, String>) -> String {
    let mut formatted = template.to_string();
    for (key, value) in parameters {
        let placeholder = format!("{{{}}}", key);
        formatted = formatted.replace(&placeholder, value);
    }
    formatted
}

/// Shorthand for building template parameters
pub fn params<const N: usize>(pairs: [(&str, String); N]) -> HashMap<String, String> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::user::UserRole;

    #[derive(Debug)]
    struct FailingChannel;

    #[async_trait]
    impl NotificationChannel for FailingChannel {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn deliver(&self, _notification: &Notification) -> Result<()> {
            Err(ScholarDeskError::ServiceUnavailable("down".to_string()))
        }
    }

    fn user(language: &str) -> User {
        User {
            id: 3,
            email: "amina@example.org".to_string(),
            full_name: "Amina Yusuf".to_string(),
            phone: None,
            role: UserRole::Applicant,
            language_code: language.to_string(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_format_message() {
        let parameters = params([("status", "meeting".to_string())]);
        assert_eq!(format_message("now {status} ({other})", &parameters), "now meeting ({other})");
    }

    #[test]
    fn test_render_uses_user_language_and_name() {
        let service = NotificationService::with_channels(true, "en", vec![]);
        let parameters = params([
            ("scholarship_title", "Global Excellence".to_string()),
            ("status", "meeting".to_string()),
        ]);

        let notification = service.render(&user("en"), "application_status", &parameters).unwrap();
        assert!(notification.body.contains("Amina Yusuf"));
        assert!(notification.body.contains("meeting"));
        assert_eq!(notification.subject, "Application update: Global Excellence");

        let fallback = service.render(&user("de"), "application_status", &parameters).unwrap();
        assert_eq!(fallback.language, "en");
    }

    #[test]
    fn test_every_template_covers_supported_languages() {
        let service = NotificationService::with_channels(true, "en", vec![]);
        for key in service.get_template_keys() {
            for language in SUPPORTED_LANGUAGES {
                let notification = service.render(&user(language), &key, &HashMap::new()).unwrap();
                assert_eq!(notification.language, *language, "{} in {}", key, language);
            }
        }

        let parameters = params([("student_number", "S2026000042".to_string())]);
        let notification = service.render(&user("fr"), "student_enrolled", &parameters).unwrap();
        assert!(notification.body.starts_with("Félicitations Amina Yusuf"));
        assert!(notification.body.contains("S2026000042"));
    }

    #[test]
    fn test_unknown_template() {
        let service = NotificationService::with_channels(true, "en", vec![]);
        assert!(service.render(&user("en"), "missing", &HashMap::new()).is_err());
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_raised() {
        let service = NotificationService::with_channels(
            true,
            "en",
            vec![Arc::new(LogChannel), Arc::new(FailingChannel)],
        );
        let parameters = params([("student_number", "S2026000001".to_string())]);

        let delivered = service.notify(&user("fr"), "student_enrolled", &parameters).await;
        assert_eq!(delivered, 1);

        let stats = service.get_stats();
        assert_eq!(stats.total_sent, 1);
        assert_eq!(stats.total_failed, 1);
        assert_eq!(stats.sent_by_language.get("fr"), Some(&1));
    }

    #[tokio::test]
    async fn test_disabled_service_sends_nothing() {
        let service = NotificationService::with_channels(false, "en", vec![Arc::new(LogChannel)]);
        assert_eq!(service.notify(&user("en"), "student_enrolled", &HashMap::new()).await, 0);
        assert_eq!(service.get_stats().total_sent, 0);
    }
}
