use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};

use super::SmtpSubmission;
use crate::smtp::{SmtpSession, compose_message, tls};
use crate::{Field, MailerError, MessageRecord, Provider, Transport};

/// Greeting name sent in `EHLO`.
const HELO_DOMAIN: &str = "localhost";

/// SMTP over implicit TLS to a caller-chosen server, e.g. port 465.
///
/// Like Gmail, the username doubles as the envelope sender and `From`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpSslConfig {
    username: String,
    password: String,
    server: String,
    port: u16,
    #[serde(default)]
    accept_invalid_certs: bool,
    #[serde(default)]
    pub delay: Duration,
    #[serde(default)]
    pub message: MessageRecord,
}

impl SmtpSslConfig {
    pub fn new<U, P, S>(username: U, password: P, server: S, port: u16) -> Self
    where
        U: Into<String>,
        P: Into<String>,
        S: Into<String>,
    {
        Self {
            username: username.into(),
            password: password.into(),
            server: server.into(),
            port,
            accept_invalid_certs: false,
            delay: Duration::ZERO,
            message: MessageRecord::default(),
        }
    }

    /// Skips server certificate verification. Meant for self-signed test
    /// servers only.
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn accepts_invalid_certs(&self) -> bool {
        self.accept_invalid_certs
    }

    pub async fn send(&self) -> Result<(), MailerError> {
        crate::send(self).await
    }
}

pub struct SmtpSslClient {
    server: String,
    port: u16,
    accept_invalid_certs: bool,
    username: String,
    password: String,
}

#[async_trait]
impl Transport<SmtpSubmission> for SmtpSslClient {
    async fn deliver(&self, request: SmtpSubmission) -> Result<(), MailerError> {
        tracing::debug!(server = %self.server, port = self.port, "Connecting to SMTP server");
        let stream = tls::connect(&self.server, self.port, self.accept_invalid_certs).await?;
        submit(stream, &self.username, &self.password, &request).await
    }
}

/// Runs one authenticated submission over an established stream.
///
/// The message counts as delivered once the server accepts the data; a
/// failed `QUIT` is ignored.
async fn submit<S>(
    stream: S,
    username: &str,
    password: &str,
    request: &SmtpSubmission,
) -> Result<(), MailerError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut session = SmtpSession::open(stream).await?;
    session.ehlo(HELO_DOMAIN).await?;
    session.auth_plain(username, password).await?;
    session.mail_from(&request.from).await?;
    session.rcpt_to(&request.to).await?;
    session.data().await?;
    session.send_data(&request.message).await?;

    if let Err(e) = session.quit().await {
        tracing::debug!(error = ?e, "Ignoring QUIT failure");
    }
    Ok(())
}

impl Provider for SmtpSslConfig {
    type Request = SmtpSubmission;
    type Client = SmtpSslClient;

    const NAME: &'static str = "smtp_ssl";
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

    fn client(&self) -> Result<SmtpSslClient, MailerError> {
        Ok(SmtpSslClient {
            server: self.server.clone(),
            port: self.port,
            accept_invalid_certs: self.accept_invalid_certs,
            username: self.username.clone(),
            password: self.password.clone(),
        })
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
