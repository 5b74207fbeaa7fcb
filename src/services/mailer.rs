// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Transactional email (verification and password reset links).

use crate::config::MailConfig;
use crate::error::AppError;
use html_escape::{encode_double_quoted_attribute, encode_safe};
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::{Arc, Mutex};

/// Port on which SMTP servers expect TLS from the first byte.
const SMTPS_PORT: u16 = 465;

/// A rendered message, as recorded by the memory backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

enum Backend {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    /// Log messages instead of delivering them.
    Console,
    Memory(Arc<Mutex<Vec<OutgoingMail>>>),
}

pub struct Mailer {
    backend: Backend,
    from: String,
    frontend_url: String,
}

impl Mailer {
    /// Build from config: SMTP when a host is set, console otherwise.
    pub fn new(config: &MailConfig, frontend_url: &str) -> Result<Self, AppError> {
        let backend = match &config.smtp {
            Some(smtp) => {
                let builder = if smtp.port == SMTPS_PORT {
                    AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
                } else {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
                }
                .map_err(|e| AppError::Mail(format!("Invalid SMTP host: {}", e)))?
                .port(smtp.port);

                let builder = match (&smtp.username, &smtp.password) {
                    (Some(user), Some(password)) => {
                        builder.credentials(Credentials::new(user.clone(), password.clone()))
                    }
                    _ => builder,
                };
                tracing::info!(host = %smtp.host, port = smtp.port, "SMTP mailer configured");
                Backend::Smtp(builder.build())
            }
            None => {
                tracing::info!("No EMAIL_HOST set, emails will be logged only");
                Backend::Console
            }
        };

        Ok(Self {
            backend,
            from: config.from.clone(),
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        })
    }

    /// Mailer that records messages in memory (for tests).
    pub fn memory(from: &str, frontend_url: &str) -> Self {
        Self {
            backend: Backend::Memory(Arc::new(Mutex::new(Vec::new()))),
            from: from.to_string(),
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        }
    }

    /// Messages recorded so far by the memory backend (empty otherwise).
    pub fn outbox(&self) -> Vec<OutgoingMail> {
        match &self.backend {
            Backend::Memory(outbox) => outbox.lock().map(|o| o.clone()).unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    pub async fn send_verification_email(
        &self,
        to: &str,
        full_name: &str,
        token: &str,
    ) -> Result<(), AppError> {
        let link = format!("{}/verify-email/{}", self.frontend_url, token);
        let (html_name, html_link) = (
            encode_safe(full_name),
            encode_double_quoted_attribute(&link),
        );
        let text = format!(
            "Hello {full_name},\n\n\
             Welcome to FoodSave. Please confirm your email address by opening\n\
             the link below. The link is valid for 24 hours.\n\n{link}\n"
        );
        let html = format!(
            "<p>Hello {html_name},</p>\
             <p>Welcome to FoodSave. Please confirm your email address.</p>\
             <p><a href=\"{html_link}\">Verify email</a></p>\
             <p>The link is valid for 24 hours.</p>"
        );
        self.send(to, "Verify your FoodSave account", text, html)
            .await
    }

    pub async fn send_password_reset_email(
        &self,
        to: &str,
        full_name: &str,
        token: &str,
    ) -> Result<(), AppError> {
        let link = format!("{}/reset-password/{}", self.frontend_url, token);
        let (html_name, html_link) = (
            encode_safe(full_name),
            encode_double_quoted_attribute(&link),
        );
        let text = format!(
            "Hello {full_name},\n\n\
             A password reset was requested for your FoodSave account. Open the\n\
             link below to choose a new password. The link is valid for 1 hour.\n\n\
             {link}\n\n\
             If you did not request this, you can ignore this email.\n"
        );
        let html = format!(
            "<p>Hello {html_name},</p>\
             <p>A password reset was requested for your FoodSave account.</p>\
             <p><a href=\"{html_link}\">Reset password</a></p>\
             <p>The link is valid for 1 hour. If you did not request this, \
             you can ignore this email.</p>"
        );
        self.send(to, "Reset your FoodSave password", text, html)
            .await
    }

    async fn send(&self, to: &str, subject: &str, text: String, html: String) -> Result<(), AppError> {
        match &self.backend {
            Backend::Smtp(transport) => {
                let from: Mailbox = self
                    .from
                    .parse()
                    .map_err(|e| AppError::Mail(format!("Invalid sender address: {}", e)))?;
                let recipient: Mailbox = to
                    .parse()
                    .map_err(|e| AppError::Mail(format!("Invalid recipient address: {}", e)))?;
                let message = Message::builder()
                    .from(from)
                    .to(recipient)
                    .subject(subject)
                    .multipart(MultiPart::alternative_plain_html(text, html))
                    .map_err(|e| AppError::Mail(format!("Failed to build message: {}", e)))?;

                transport
                    .send(message)
                    .await
                    .map_err(|e| AppError::Mail(format!("SMTP delivery failed: {}", e)))?;
                tracing::info!(subject, "Email sent");
            }
            Backend::Console => {
                tracing::info!(to, subject, body = %text, "Email (console backend)");
            }
            Backend::Memory(outbox) => {
                let mut outbox = outbox
                    .lock()
                    .map_err(|_| AppError::Mail("Outbox lock poisoned".to_string()))?;
                outbox.push(OutgoingMail {
                    to: to.to_string(),
                    subject: subject.to_string(),
                    text,
                    html,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_outbox_records_links() {
        let mailer = Mailer::memory("FoodSave <noreply@foodsave.com>", "http://localhost:3000/");
        mailer
            .send_password_reset_email("a@b.com", "Kim", "tok123")
            .await
            .unwrap();

        let outbox = mailer.outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].to, "a@b.com");
        assert!(outbox[0]
            .text
            .contains("http://localhost:3000/reset-password/tok123"));
        assert!(outbox[0].html.contains("href=\"http://localhost:3000/reset-password/tok123\""));
    }

    #[tokio::test]
    async fn test_html_part_escapes_user_supplied_name() {
        let mailer = Mailer::memory("FoodSave <noreply@foodsave.com>", "http://localhost:3000");
        mailer
            .send_verification_email("a@b.com", "<a href='https://evil.example'>Kim</a> & co", "tok")
            .await
            .unwrap();

        let mail = &mailer.outbox()[0];
        assert!(!mail.html.contains("<a href='https://evil.example'>"));
        assert!(mail.html.contains("Hello &lt;a href="));
        assert!(mail.html.contains("&gt;Kim&lt;"));
        assert!(mail.html.contains(" &amp; co,"));
        assert!(mail.html.contains("href=\"http://localhost:3000/verify-email/tok\""));
        // Plain text carries the name as typed
        assert!(mail.text.contains("<a href='https://evil.example'>Kim</a> & co"));
    }

    #[tokio::test]
    async fn test_console_backend_without_smtp() {
        let config = MailConfig {
            smtp: None,
            from: "FoodSave <noreply@foodsave.com>".to_string(),
        };
        let mailer = Mailer::new(&config, "http://localhost:3000").unwrap();
        mailer
            .send_verification_email("a@b.com", "Kim", "tok")
            .await
            .unwrap();
        assert!(mailer.outbox().is_empty());
    }
}
