//! Outgoing mail
//!
//! `MailTransport` is the seam the mutation service sends through. The SMTP
//! implementation is built on lettre; tests use an in-memory recorder.

use crate::config::MailConfig;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// A single HTML message ready to be delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Something that can deliver a `MailMessage`
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send_mail(&self, message: MailMessage) -> Result<()>;
}

/// SMTP delivery through lettre
pub struct SmtpMailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    /// Build a transport from configuration.
    ///
    /// With credentials the connection uses TLS via `relay`; without them
    /// it talks plain SMTP, which suits local catch-all servers.
    pub fn new(config: &MailConfig) -> Result<Self> {
        let mailer = match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                    .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
                    .credentials(Credentials::new(username.clone(), password.clone()))
                    .port(config.port)
                    .build()
            }
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .port(config.port)
                .build(),
        };

        Ok(Self { mailer })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send_mail(&self, message: MailMessage) -> Result<()> {
        let email = Message::builder()
            .from(
                message
                    .from
                    .parse()
                    .map_err(|e| anyhow!("Invalid from address: {}", e))?,
            )
            .to(message
                .to
                .parse()
                .map_err(|e| anyhow!("Invalid to address: {}", e))?)
            .subject(message.subject)
            .header(ContentType::TEXT_HTML)
            .body(message.html)
            .map_err(|e| anyhow!("Failed to build email: {}", e))?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;

        Ok(())
    }
}

const EMAIL_TEMPLATE: &str = r#"<div class="email" style="
  border: 1px solid black;
  padding: 20px;
  font-family: sans-serif;
  line-height: 2;
  font-size: 20px;
">
  <h2>Hello There!</h2>
  <p>{{ body }}</p>
  <p>The Storefront team</p>
</div>"#;

/// Wrap a fragment of HTML in the standard email layout
pub fn make_a_nice_email(body: &str) -> Result<String> {
    let mut context = tera::Context::new();
    context.insert("body", body);

    // Body carries a link, so no autoescaping
    tera::Tera::one_off(EMAIL_TEMPLATE, &context, false)
        .map_err(|e| anyhow!("Failed to render email: {}", e))
}

/// Keeps every message in memory instead of delivering it
#[cfg(test)]
#[derive(Default)]
pub struct RecordingMailTransport {
    sent: std::sync::Mutex<Vec<MailMessage>>,
    fail: bool,
}

#[cfg(test)]
impl RecordingMailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose every send fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
#[async_trait]
impl MailTransport for RecordingMailTransport {
    async fn send_mail(&self, message: MailMessage) -> Result<()> {
        if self.fail {
            return Err(anyhow!("Failed to send email: connection refused"));
        }
        self.sent
            .lock()
            .map_err(|_| anyhow!("Mail recorder poisoned"))?
            .push(message);
        Ok(())
    }
}
