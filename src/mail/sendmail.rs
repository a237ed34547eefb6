use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde_json::json;
use thiserror::Error;

use crate::config::{MailConfig, MailTransport};

#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

fn validate_recipient(to_email: &str) -> Result<(), MailError> {
    if to_email.is_empty() || !to_email.contains('@') {
        return Err(MailError::InvalidAddress(to_email.to_string()));
    }
    Ok(())
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let from: Mailbox = config
            .from_email
            .parse()
            .map_err(|_| MailError::InvalidAddress(config.from_email.clone()))?;

        let builder = if config.smtp_host == "localhost" {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        } else if config.smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                .map_err(|e| MailError::Transport(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .map_err(|e| MailError::Transport(e.to_string()))?
        };

        let mut builder = builder.port(config.smtp_port);
        if !config.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ));
        }

        Ok(SmtpMailer {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        validate_recipient(&email.to)?;

        let to: Mailbox = email
            .to
            .parse()
            .map_err(|_| MailError::InvalidAddress(email.to.clone()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                email.text.clone(),
                email.html.clone(),
            ))
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        tracing::info!("✓ Email sent via SMTP to {}", email.to);
        Ok(())
    }
}

pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: String, from: String) -> Self {
        ResendMailer {
            client: reqwest::Client::new(),
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        validate_recipient(&email.to)?;

        let request_body = json!({
            "from": self.from,
            "to": email.to,
            "subject": email.subject,
            "text": email.text,
            "html": email.html,
        });

        let response = self
            .client
            .post("https://api.resend.com/emails")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| MailError::Transport(format!("Network error: {}", e)))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .unwrap_or_else(|_| "No response body".to_string());

        if !status.is_success() {
            return Err(MailError::Transport(format!(
                "Resend API error ({}): {}",
                status.as_u16(),
                response_text
            )));
        }

        let email_id = serde_json::from_str::<serde_json::Value>(&response_text)
            .ok()
            .and_then(|body| body.get("id").and_then(|v| v.as_str()).map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());

        tracing::info!("✓ Email sent to {} (id: {})", email.to, email_id);
        Ok(())
    }
}

/// Used when no transport is configured: the message is only logged.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        validate_recipient(&email.to)?;
        tracing::info!(to = %email.to, subject = %email.subject, "email not sent, log transport");
        Ok(())
    }
}

pub fn build_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    let mailer: Arc<dyn Mailer> = match config.transport {
        MailTransport::Smtp => Arc::new(SmtpMailer::new(config)?),
        MailTransport::Resend => {
            let api_key = config
                .resend_api_key
                .clone()
                .ok_or_else(|| MailError::Transport("RESEND_API_KEY is not set".to_string()))?;
            Arc::new(ResendMailer::new(api_key, config.from_email.clone()))
        }
        MailTransport::Log => Arc::new(LogMailer),
    };

    Ok(mailer)
}
