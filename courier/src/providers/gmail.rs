use std::time::Duration;

use async_trait::async_trait;
use lettre::address::Envelope;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use serde::{Deserialize, Serialize};

use crate::smtp::compose_message;
use crate::{Field, MailerError, MessageRecord, Provider, Transport};

pub const GMAIL_HOST: &str = "smtp.gmail.com";
pub const GMAIL_PORT: u16 = 587;

/// Gmail SMTP submission with STARTTLS and `AUTH PLAIN`.
///
/// The account username is both the envelope sender and the `From` header;
/// the record's sender is only checked for presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmailConfig {
    username: String,
    password: String,
    #[serde(default)]
    pub delay: Duration,
    #[serde(default)]
    pub message: MessageRecord,
}

impl GmailConfig {
    pub fn new<U: Into<String>, P: Into<String>>(username: U, password: P) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            delay: Duration::ZERO,
            message: MessageRecord::default(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub async fn send(&self) -> Result<(), MailerError> {
        crate::send(self).await
    }
}

/// A raw SMTP submission: envelope addresses plus the full message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSubmission {
    pub from: String,
    pub to: String,
    pub message: String,
}

#[derive(Clone)]
pub struct GmailClient {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl GmailClient {
    pub fn new(username: &str, password: &str) -> Result<Self, MailerError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(GMAIL_HOST)?
            .port(GMAIL_PORT)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .authentication(vec![Mechanism::Plain])
            .build();
        Ok(Self { transport })
    }
}

#[async_trait]
impl Transport<SmtpSubmission> for GmailClient {
    async fn deliver(&self, request: SmtpSubmission) -> Result<(), MailerError> {
        let envelope = Envelope::new(
            Some(request.from.parse::<Address>()?),
            vec![request.to.parse::<Address>()?],
        )?;
        self.transport
            .send_raw(&envelope, request.message.as_bytes())
            .await?;
        Ok(())
    }
}

impl Provider for GmailConfig {
    type Request = SmtpSubmission;
    type Client = GmailClient;

    const NAME: &'static str = "gmail";
    const REQUIRED_FIELDS: &'static [Field] = &[
        Field::HtmlBody,
        Field::Sender,
        Field::Recipient,
        Field::Subject,
    ];

    fn message(&self) -> &MessageRecord {
        &self.message
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    fn client(&self) -> Result<GmailClient, MailerError> {
        GmailClient::new(&self.username, &self.password)
    }

    fn request(&self) -> SmtpSubmission {
        let message = &self.message;
        SmtpSubmission {
            from: self.username.clone(),
            to: message.recipient.clone(),
            message: compose_message(
                &self.username,
                &message.recipient,
                &message.subject,
                &message.html_body,
            ),
        }
    }
}
