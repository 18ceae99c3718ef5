//! Outbound email.
//!
//! Workflows depend on the [`Notifier`] trait rather than on SMTP directly.
//! Delivery is best effort: callers go through [`dispatch`] and
//! [`dispatch_otp`], which log a failed send and return normally so a
//! committed approval or registration never fails because of the mail server.

use std::future::Future;
use std::pin::Pin;

use lettre::message::{Mailbox, MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;
use tracing::{info, warn};

use schoolhub_config::EmailConfig;

use crate::modules::auth::otp::OtpPurpose;
use crate::utils::email_templates::{self, EmailContent};

pub type NotifyFuture<'a> = Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Invalid address '{address}': {reason}")]
    Address { address: String, reason: String },

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Transport(String),
}

pub trait Notifier: Send + Sync {
    fn send_email<'a>(&'a self, to: &'a str, subject: &'a str, html: &'a str)
    -> NotifyFuture<'a>;

    fn send_otp<'a>(
        &'a self,
        to: &'a str,
        code: &'a str,
        ttl_minutes: i64,
        purpose: OtpPurpose,
    ) -> NotifyFuture<'a> {
        Box::pin(async move {
            let email = email_templates::otp(code, ttl_minutes, purpose);
            self.send_email(to, &email.subject, &email.html).await
        })
    }
}

/// Sends `content` to `to`, logging instead of failing.
pub async fn dispatch(notifier: &dyn Notifier, to: &str, content: EmailContent) {
    if let Err(e) = notifier.send_email(to, &content.subject, &content.html).await {
        warn!(to = %to, subject = %content.subject, error = %e, "Email notification failed");
    }
}

pub async fn dispatch_otp(
    notifier: &dyn Notifier,
    to: &str,
    code: &str,
    ttl_minutes: i64,
    purpose: OtpPurpose,
) {
    if let Err(e) = notifier.send_otp(to, code, ttl_minutes, purpose).await {
        warn!(to = %to, purpose = ?purpose, error = %e, "OTP email failed");
    }
}

/// Builds the notifier for `config`: SMTP when enabled, otherwise one that
/// only logs.
pub fn notifier_from_config(config: &EmailConfig) -> Result<Box<dyn Notifier>, NotifyError> {
    if config.enabled {
        Ok(Box::new(SmtpNotifier::new(config)?))
    } else {
        info!("SMTP disabled, emails will be logged only");
        Ok(Box::new(LogNotifier))
    }
}

pub struct SmtpNotifier {
    from: Mailbox,
    transport: SmtpTransport,
}

impl SmtpNotifier {
    pub fn new(config: &EmailConfig) -> Result<Self, NotifyError> {
        let from_raw = format!("{} <{}>", config.from_name, config.from_email);
        let from = from_raw.parse().map_err(|e: lettre::address::AddressError| {
            NotifyError::Address {
                address: from_raw.clone(),
                reason: e.to_string(),
            }
        })?;

        let transport = if config.smtp_username.is_empty() {
            SmtpTransport::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .build()
        } else {
            let creds = Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            );

            SmtpTransport::relay(&config.smtp_host)
                .map_err(|e| NotifyError::Transport(e.to_string()))?
                .port(config.smtp_port)
                .credentials(creds)
                .build()
        };

        Ok(Self { from, transport })
    }

    fn build_message(&self, to: &str, subject: &str, html: &str) -> Result<Message, NotifyError> {
        let to: Mailbox = to.parse().map_err(|e: lettre::address::AddressError| {
            NotifyError::Address {
                address: to.to_string(),
                reason: e.to_string(),
            }
        })?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(email_templates::html_to_text(html)),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(html.to_string()),
                    ),
            )
            .map_err(|e| NotifyError::Build(e.to_string()))
    }
}

impl Notifier for SmtpNotifier {
    fn send_email<'a>(
        &'a self,
        to: &'a str,
        subject: &'a str,
        html: &'a str,
    ) -> NotifyFuture<'a> {
        Box::pin(async move {
            let message = self.build_message(to, subject, html)?;
            let mailer = self.transport.clone();

            tokio::task::spawn_blocking(move || mailer.send(&message))
                .await
                .map_err(|e| NotifyError::Transport(format!("Task join error: {e}")))?
                .map_err(|e| NotifyError::Transport(e.to_string()))?;

            info!(to = %to, subject = %subject, "Email sent");
            Ok(())
        })
    }
}

/// Used when SMTP is disabled.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send_email<'a>(
        &'a self,
        to: &'a str,
        subject: &'a str,
        _html: &'a str,
    ) -> NotifyFuture<'a> {
        Box::pin(async move {
            info!(to = %to, subject = %subject, "Email delivery disabled, message not sent");
            Ok(())
        })
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use recording::{RecordingNotifier, SentEmail};

#[cfg(any(test, feature = "test-utils"))]
mod recording {
    use std::sync::{Mutex, MutexGuard};

    use super::{NotifyFuture, Notifier, OtpPurpose};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SentEmail {
        pub to: String,
        pub subject: String,
        pub html: String,
        pub otp: Option<(String, OtpPurpose)>,
    }

    /// Keeps every message in memory so tests can read codes and
    /// credentials back.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        sent: Mutex<Vec<SentEmail>>,
        fail: bool,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        /// A notifier whose sends all fail, after recording them.
        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn lock(&self) -> MutexGuard<'_, Vec<SentEmail>> {
            self.sent.lock().unwrap_or_else(|e| e.into_inner())
        }

        pub fn sent(&self) -> Vec<SentEmail> {
            self.lock().clone()
        }

        pub fn sent_to(&self, to: &str) -> Vec<SentEmail> {
            self.lock().iter().filter(|m| m.to == to).cloned().collect()
        }

        /// Most recent code sent to `to` for `purpose`.
        pub fn last_otp(&self, to: &str, purpose: OtpPurpose) -> Option<String> {
            self.lock()
                .iter()
                .rev()
                .filter(|m| m.to == to)
                .find_map(|m| match &m.otp {
                    Some((code, p)) if *p == purpose => Some(code.clone()),
                    _ => None,
                })
        }

        fn record(&self, email: SentEmail) -> Result<(), super::NotifyError> {
            self.lock().push(email);
            if self.fail {
                Err(super::NotifyError::Transport("recording notifier set to fail".into()))
            } else {
                Ok(())
            }
        }
    }

    impl Notifier for RecordingNotifier {
        fn send_email<'a>(
            &'a self,
            to: &'a str,
            subject: &'a str,
            html: &'a str,
        ) -> NotifyFuture<'a> {
            let result = self.record(SentEmail {
                to: to.to_string(),
                subject: subject.to_string(),
                html: html.to_string(),
                otp: None,
            });
            Box::pin(async move { result })
        }

        fn send_otp<'a>(
            &'a self,
            to: &'a str,
            code: &'a str,
            ttl_minutes: i64,
            purpose: OtpPurpose,
        ) -> NotifyFuture<'a> {
            let email = crate::utils::email_templates::otp(code, ttl_minutes, purpose);
            let result = self.record(SentEmail {
                to: to.to_string(),
                subject: email.subject,
                html: email.html,
                otp: Some((code.to_string(), purpose)),
            });
            Box::pin(async move { result })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        let notifier = RecordingNotifier::failing();
        dispatch(
            &notifier,
            "kid@school.test",
            email_templates::teacher_signup_received("Asha"),
        )
        .await;
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_recording_keeps_otp() {
        let notifier = RecordingNotifier::new();
        dispatch_otp(&notifier, "kid@school.test", "123456", 15, OtpPurpose::Verification).await;
        assert_eq!(
            notifier.last_otp("kid@school.test", OtpPurpose::Verification),
            Some("123456".to_string())
        );
        assert!(
            notifier
                .last_otp("kid@school.test", OtpPurpose::PasswordReset)
                .is_none()
        );
    }

    #[test]
    fn test_smtp_message_has_both_parts() {
        let config = EmailConfig {
            enabled: true,
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_email: "noreply@school.test".to_string(),
            from_name: "SchoolHub".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
        };
        let notifier = SmtpNotifier::new(&config).unwrap();
        let message = notifier
            .build_message("kid@school.test", "Hello", "<p>Hi <b>there</b></p>")
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("text/plain"));
        assert!(raw.contains("text/html"));

        assert!(matches!(
            notifier.build_message("not an address", "Hello", "<p>x</p>"),
            Err(NotifyError::Address { .. })
        ));
    }
}
