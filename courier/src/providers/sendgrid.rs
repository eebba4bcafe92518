use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{check_status, http_client};
use crate::{Field, MailerError, MessageRecord, Provider, Transport};

const DEFAULT_BASE_URL: &str = "https://api.sendgrid.com";

/// SendGrid v3 mail send, authenticated with a bearer API key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendgridConfig {
    api_key: String,
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

impl SendgridConfig {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            delay: Duration::ZERO,
            message: MessageRecord::default(),
        }
    }

    /// Points the client at a different API host, e.g. a regional endpoint.
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub async fn send(&self) -> Result<(), MailerError> {
        crate::send(self).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendgridAddress {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendgridPersonalization {
    pub to: Vec<SendgridAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendgridContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub value: String,
}

/// Body of `POST /v3/mail/send` for a single recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendgridRequest {
    pub personalizations: Vec<SendgridPersonalization>,
    pub from: SendgridAddress,
    pub subject: String,
    pub content: Vec<SendgridContent>,
}

impl SendgridRequest {
    pub fn to(&self) -> Option<&SendgridAddress> {
        self.personalizations.first().and_then(|p| p.to.first())
    }

    pub fn body(&self, content_type: &str) -> Option<&str> {
        self.content
            .iter()
            .find(|content| content.content_type == content_type)
            .map(|content| content.value.as_str())
    }
}

pub struct SendgridClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

#[async_trait]
impl Transport<SendgridRequest> for SendgridClient {
    async fn deliver(&self, request: SendgridRequest) -> Result<(), MailerError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        check_status(response).await
    }
}

impl Provider for SendgridConfig {
    type Request = SendgridRequest;
    type Client = SendgridClient;

    const NAME: &'static str = "sendgrid";
    const REQUIRED_FIELDS: &'static [Field] = &[
        Field::HtmlBody,
        Field::TextBody,
        Field::Sender,
        Field::SenderName,
        Field::Recipient,
        Field::RecipientName,
        Field::Subject,
    ];

    fn message(&self) -> &MessageRecord {
        &self.message
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    fn client(&self) -> Result<SendgridClient, MailerError> {
        Ok(SendgridClient {
            http: http_client()?,
            api_key: self.api_key.clone(),
            endpoint: format!("{}/v3/mail/send", self.base_url.trim_end_matches('/')),
        })
    }

    fn request(&self) -> SendgridRequest {
        let message = &self.message;
        SendgridRequest {
            personalizations: vec![SendgridPersonalization {
                to: vec![SendgridAddress {
                    email: message.recipient.clone(),
                    name: message.recipient_name.clone(),
                }],
            }],
            from: SendgridAddress {
                email: message.sender.clone(),
                name: message.sender_name.clone(),
            },
            subject: message.subject.clone(),
            content: vec![
                SendgridContent {
                    content_type: "text/plain".to_string(),
                    value: message.text_body.clone(),
                },
                SendgridContent {
                    content_type: "text/html".to_string(),
                    value: message.html_body.clone(),
                },
            ],
        }
    }
}
