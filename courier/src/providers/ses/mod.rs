mod signing;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use self::signing::{SigV4Signer, host_header};
use super::{check_status, http_client};
use crate::{Field, MailerError, MessageRecord, Provider, Transport};

const SERVICE: &str = "ses";
const CHARSET: &str = "UTF-8";

/// Amazon SES v2 `SendEmail`, signed with SigV4.
///
/// When the HTML body is empty the plain-text body is sent as HTML too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SesConfig {
    access_key: String,
    secret_key: String,
    region: String,
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    pub delay: Duration,
    #[serde(default)]
    pub message: MessageRecord,
}

impl SesConfig {
    pub fn new<A, S, R>(access_key: A, secret_key: S, region: R) -> Self
    where
        A: Into<String>,
        S: Into<String>,
        R: Into<String>,
    {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: region.into(),
            endpoint: None,
            delay: Duration::ZERO,
            message: MessageRecord::default(),
        }
    }

    /// Overrides the regional endpoint, e.g. a local SES emulator.
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// The full `outbound-emails` URL requests are posted to.
    pub fn endpoint(&self) -> String {
        let base = match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://email.{}.amazonaws.com", self.region),
        };
        format!("{base}/v2/email/outbound-emails")
    }

    pub async fn send(&self) -> Result<(), MailerError> {
        crate::send(self).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SesContent {
    pub data: String,
    pub charset: String,
}

impl SesContent {
    fn utf8(data: &str) -> Self {
        Self {
            data: data.to_string(),
            charset: CHARSET.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SesBody {
    pub html: SesContent,
    pub text: SesContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SesMessage {
    pub subject: SesContent,
    pub body: SesBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SesEmailContent {
    pub simple: SesMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SesDestination {
    pub to_addresses: Vec<String>,
}

/// Body of `POST /v2/email/outbound-emails`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SesRequest {
    pub from_email_address: String,
    pub destination: SesDestination,
    pub content: SesEmailContent,
}

impl SesRequest {
    pub fn html(&self) -> &str {
        &self.content.simple.body.html.data
    }

    pub fn text(&self) -> &str {
        &self.content.simple.body.text.data
    }
}

pub struct SesClient {
    http: reqwest::Client,
    signer: SigV4Signer,
    endpoint: Url,
}

#[async_trait]
impl Transport<SesRequest> for SesClient {
    async fn deliver(&self, request: SesRequest) -> Result<(), MailerError> {
        let body = serde_json::to_vec(&request)?;

        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), host_header(&self.endpoint));
        headers.insert("content-type".to_string(), "application/json".to_string());
        let signed = self
            .signer
            .sign("POST", &self.endpoint, &headers, &body, Utc::now());

        let mut builder = self.http.post(self.endpoint.clone());
        for (name, value) in &signed {
            // reqwest derives host from the URL
            if name != "host" {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }

        let response = builder.body(body).send().await?;
        check_status(response).await
    }
}

impl Provider for SesConfig {
    type Request = SesRequest;
    type Client = SesClient;

    const NAME: &'static str = "ses";
    const REQUIRED_FIELDS: &'static [Field] = &[Field::Sender, Field::Recipient, Field::Subject];

    fn message(&self) -> &MessageRecord {
        &self.message
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    fn client(&self) -> Result<SesClient, MailerError> {
        let endpoint = self.endpoint();
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| MailerError::Config(format!("Invalid SES endpoint {endpoint}: {e}")))?;

        Ok(SesClient {
            http: http_client()?,
            signer: SigV4Signer::new(&self.access_key, &self.secret_key, &self.region, SERVICE),
            endpoint,
        })
    }

    fn request(&self) -> SesRequest {
        let message = &self.message;
        let html = if message.html_body.is_empty() {
            &message.text_body
        } else {
            &message.html_body
        };

        SesRequest {
            from_email_address: message.sender.clone(),
            destination: SesDestination {
                to_addresses: vec![message.recipient.clone()],
            },
            content: SesEmailContent {
                simple: SesMessage {
                    subject: SesContent::utf8(&message.subject),
                    body: SesBody {
                        html: SesContent::utf8(html),
                        text: SesContent::utf8(&message.text_body),
                    },
                },
            },
        }
    }
}
