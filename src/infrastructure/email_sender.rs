// Email alert sender - SMTP delivery through lettre
use crate::application::alert_service::AlertSender;
use crate::domain::alert::{AlertMessage, Priority, Receiver};
use crate::error::SendError;
use crate::infrastructure::config::EmailSettings;
use async_trait::async_trait;
use lettre::message::header::{ContentType, Header, HeaderName, HeaderValue};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::{Duration, SystemTime};

/// Port on which the relay expects TLS from the first byte
const IMPLICIT_TLS_PORT: u16 = 465;
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// `X-Priority: 1|3|5`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct XPriority(u8);

impl Header for XPriority {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-Priority")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.trim().parse()?))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.to_string())
    }
}

/// `Importance: high|normal|low`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Importance(&'static str);

impl Header for Importance {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("Importance")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        match s.trim() {
            "high" => Ok(Self("high")),
            "normal" => Ok(Self("normal")),
            "low" => Ok(Self("low")),
            other => Err(format!("unknown importance '{}'", other).into()),
        }
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.to_string())
    }
}

fn priority_headers(priority: Priority) -> (XPriority, Importance) {
    match priority {
        Priority::Critical | Priority::High => (XPriority(1), Importance("high")),
        Priority::Normal => (XPriority(3), Importance("normal")),
        Priority::Low => (XPriority(5), Importance("low")),
    }
}

fn parse_mailbox(text: &str) -> Result<Mailbox, SendError> {
    text.parse()
        .map_err(|e| SendError::Delivery(format!("invalid address '{}': {}", text, e)))
}

/// Sends each alert as a plain-text email through the configured SMTP relay.
///
/// With `use_tls`, port 465 gets implicit TLS and every other port STARTTLS.
/// Without it the relay is spoken to in plain text.
#[derive(Debug, Clone)]
pub struct EmailAlertSender {
    settings: EmailSettings,
}

impl EmailAlertSender {
    pub fn new(settings: EmailSettings) -> Self {
        Self { settings }
    }

    fn sender_mailbox(&self) -> String {
        if self.settings.from_name.is_empty() {
            self.settings.from_address.clone()
        } else {
            format!("{} <{}>", self.settings.from_name, self.settings.from_address)
        }
    }

    fn build_message(&self, message: &AlertMessage, receiver: &Receiver) -> Result<Message, SendError> {
        let (x_priority, importance) = priority_headers(message.priority);
        Message::builder()
            .from(parse_mailbox(&self.sender_mailbox())?)
            .to(parse_mailbox(&receiver.mailbox())?)
            .subject(format!("[{}] {}", message.priority, message.subject))
            .date(SystemTime::from(message.timestamp))
            .header(ContentType::TEXT_PLAIN)
            .header(x_priority)
            .header(importance)
            .body(message.body.clone())
            .map_err(|e| SendError::Delivery(format!("cannot build email: {}", e)))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, SendError> {
        let host = self.settings.smtp_host.as_str();
        let builder = if !self.settings.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        } else if self.settings.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host).map_err(transport_error)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).map_err(transport_error)?
        };

        let mut builder = builder.port(self.settings.smtp_port).timeout(Some(SMTP_TIMEOUT));
        if !self.settings.smtp_user.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.settings.smtp_user.clone(),
                self.settings.smtp_password.clone(),
            ));
        }
        Ok(builder.build())
    }
}

fn transport_error(e: lettre::transport::smtp::Error) -> SendError {
    SendError::Delivery(format!("SMTP transport error: {}", e))
}

#[async_trait]
impl AlertSender for EmailAlertSender {
    fn is_enabled(&self) -> bool {
        self.settings.enabled && !self.settings.smtp_host.is_empty()
    }

    async fn send(&self, message: &AlertMessage, receiver: &Receiver) -> Result<(), SendError> {
        if !self.is_enabled() {
            return Err(SendError::Disabled);
        }

        let email = self.build_message(message, receiver)?;
        let mailer = self.transport()?;
        mailer.send(email).await.map_err(transport_error)?;

        tracing::info!(
            to = %receiver.email,
            priority = %message.priority,
            "Alert email sent: {}",
            message.subject
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn settings(enabled: bool) -> EmailSettings {
        EmailSettings {
            enabled,
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_user: String::new(),
            smtp_password: String::new(),
            from_address: "pool@example.com".to_string(),
            from_name: "Pool Monitor".to_string(),
            use_tls: true,
        }
    }

    fn message(priority: Priority) -> AlertMessage {
        AlertMessage {
            subject: "CRITICAL: Pool Water Flow Issue".to_string(),
            body: "No water flow detected.".to_string(),
            priority,
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    fn owner() -> Receiver {
        Receiver {
            email: "owner@example.com".to_string(),
            name: "Owner".to_string(),
        }
    }

    #[test]
    fn test_message_headers() {
        let sender = EmailAlertSender::new(settings(true));
        let email = sender.build_message(&message(Priority::Critical), &owner()).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();

        assert!(raw.contains("<pool@example.com>"));
        assert!(raw.contains("Pool Monitor"));
        assert!(raw.contains("<owner@example.com>"));
        assert!(raw.contains("Subject: [Critical] CRITICAL: Pool Water Flow Issue\r\n"));
        assert!(raw.contains("X-Priority: 1\r\n"));
        assert!(raw.contains("Importance: high\r\n"));
        assert!(raw.contains("Date: Sat, 01 Jun 2024 12:00:00"));
        assert!(raw.contains("No water flow detected."));
    }

    #[test]
    fn test_priority_headers() {
        assert_eq!(priority_headers(Priority::High), (XPriority(1), Importance("high")));
        assert_eq!(priority_headers(Priority::Normal), (XPriority(3), Importance("normal")));
        assert_eq!(priority_headers(Priority::Low), (XPriority(5), Importance("low")));
    }

    #[test]
    fn test_transport_for_each_tls_mode() {
        let mut implicit = settings(true);
        implicit.smtp_port = 465;
        implicit.smtp_user = "pool".to_string();
        implicit.smtp_password = "secret".to_string();
        let mut plain = settings(true);
        plain.use_tls = false;
        plain.smtp_port = 25;

        for s in [settings(true), implicit, plain] {
            assert!(EmailAlertSender::new(s).transport().is_ok());
        }
    }

    #[tokio::test]
    async fn test_disabled_sender_refuses() {
        let sender = EmailAlertSender::new(settings(false));
        assert!(!sender.is_enabled());
        let err = sender.send(&message(Priority::Normal), &owner()).await.unwrap_err();
        assert!(matches!(err, SendError::Disabled));
    }

    #[tokio::test]
    async fn test_invalid_receiver_is_a_delivery_error() {
        let sender = EmailAlertSender::new(settings(true));
        let bad = Receiver {
            email: "nobody".to_string(),
            name: String::new(),
        };
        let err = sender.send(&message(Priority::Normal), &bad).await.unwrap_err();
        assert!(matches!(err, SendError::Delivery(m) if m.contains("nobody")));
    }

    #[tokio::test]
    async fn test_unreachable_relay_is_a_delivery_error() {
        let mut closed = settings(true);
        closed.smtp_host = "127.0.0.1".to_string();
        closed.smtp_port = 1;
        closed.use_tls = false;
        let sender = EmailAlertSender::new(closed);

        let err = sender.send(&message(Priority::Critical), &owner()).await.unwrap_err();
        assert!(matches!(err, SendError::Delivery(m) if m.starts_with("SMTP transport error")));
    }
}
