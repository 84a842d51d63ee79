//! Outbound verification-code mail.
//!
//! Delivery is an opaque capability behind the [`Mailer`] trait so tests can
//! swap in a capturing fake and deployments without SMTP credentials degrade
//! to logging the code server-side.

use async_trait::async_trait;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::config::SmtpConfig;
use crate::db::repositories::verification::CodePurpose;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid mail address: {0}")]
    Address(String),

    #[error("Failed to send mail: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Delivers a verification code to `to`. The code is already stored;
    /// a delivery failure surfaces to the caller as a request error.
    async fn send_verification_code(
        &self,
        to: &str,
        code: &str,
        purpose: CodePurpose,
    ) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        let from = format!("{} <{}>", config.from_name, config.username)
            .parse()
            .map_err(|_| MailError::Address(config.username.clone()))?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_verification_code(
        &self,
        to: &str,
        code: &str,
        purpose: CodePurpose,
    ) -> Result<(), MailError> {
        let subject = match purpose {
            CodePurpose::Login => "Cursor Pool login verification code",
            CodePurpose::ResetPassword => "Cursor Pool password reset code",
        };

        let body = format!(
            "<p>Your verification code is: <strong>{code}</strong></p>\
             <p>It expires in 10 minutes. If you did not request this, ignore this mail.</p>"
        );

        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse().map_err(|_| MailError::Address(to.to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body)
            .map_err(|e| MailError::Transport(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        Ok(())
    }
}

/// Fallback when no SMTP credentials are configured. Codes are logged at
/// warn level instead of delivered.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_verification_code(
        &self,
        to: &str,
        code: &str,
        purpose: CodePurpose,
    ) -> Result<(), MailError> {
        tracing::warn!(
            to = %to,
            purpose = %purpose.as_str(),
            code = %code,
            "SMTP not configured; verification code logged instead of mailed"
        );
        Ok(())
    }
}
