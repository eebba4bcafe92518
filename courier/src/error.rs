use thiserror::Error;

use crate::message::Field;

#[derive(Error, Debug)]
pub enum MailerError {
    #[error("Missing required fields: {}", format_fields(.0))]
    IncompleteMessage(Vec<Field>),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider rejected request ({status}): {body}")]
    Provider { status: u16, body: String },

    #[error("Email transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Email address error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email envelope error: {0}")]
    Envelope(#[from] lettre::error::Error),

    #[error("SMTP error: {code} - {message}")]
    Smtp { code: u16, message: String },

    #[error("Failed to parse SMTP response: {0}")]
    Parse(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MailerError {
    /// Returns `true` if the send was refused before any network call.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::IncompleteMessage(_))
    }
}

fn format_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|field| field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, MailerError>;
