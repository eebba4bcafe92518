use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{check_status, http_client};
use crate::{Field, MailerError, MessageRecord, Provider, Transport};

const DEFAULT_BASE_URL: &str = "https://api.mailgun.net";

/// Mailgun messages API, scoped to a sending domain.
///
/// The public key is kept for configuration symmetry with Mailgun's own
/// tooling; sending only needs the private API key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailgunConfig {
    domain: String,
    api_key: String,
    #[serde(default)]
    public_key: String,
    #[serde(default = "default_base_url")]
    base_url: String,
    #[serde(default)]
    pub delay: Duration,
    #[serde(default)]
    pub message: MessageRecord,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl MailgunConfig {
    pub fn new<D, K, P>(domain: D, api_key: K, public_key: P) -> Self
    where
        D: Into<String>,
        K: Into<String>,
        P: Into<String>,
    {
        Self {
            domain: domain.into(),
            api_key: api_key.into(),
            public_key: public_key.into(),
            base_url: default_base_url(),
            delay: Duration::ZERO,
            message: MessageRecord::default(),
        }
    }

    /// Switches API host, e.g. `https://api.eu.mailgun.net` for EU domains.
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub async fn send(&self) -> Result<(), MailerError> {
        crate::send(self).await
    }
}

/// Form fields of `POST /v3/{domain}/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailgunRequest {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

pub struct MailgunClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

#[async_trait]
impl Transport<MailgunRequest> for MailgunClient {
    async fn deliver(&self, request: MailgunRequest) -> Result<(), MailerError> {
        let response = self
            .http
            .post(&self.endpoint)
            .basic_auth("api", Some(&self.api_key))
            .form(&request)
            .send()
            .await?;

        check_status(response).await
    }
}

impl Provider for MailgunConfig {
    type Request = MailgunRequest;
    type Client = MailgunClient;

    const NAME: &'static str = "mailgun";
    const REQUIRED_FIELDS: &'static [Field] = &[
        Field::TextBody,
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

    fn client(&self) -> Result<MailgunClient, MailerError> {
        Ok(MailgunClient {
            http: http_client()?,
            api_key: self.api_key.clone(),
            endpoint: format!(
                "{}/v3/{}/messages",
                self.base_url.trim_end_matches('/'),
                self.domain
            ),
        })
    }

    fn request(&self) -> MailgunRequest {
        MailgunRequest {
            from: self.message.sender.clone(),
            to: self.message.recipient.clone(),
            subject: self.message.subject.clone(),
            text: self.message.text_body.clone(),
        }
    }
}
