use serde::{Deserialize, Serialize};
use std::fmt;

/// The content of one email.
///
/// Every provider embeds the same record; they only differ in which fields
/// must be non-empty before a send is attempted (see
/// [`Provider::REQUIRED_FIELDS`](crate::Provider::REQUIRED_FIELDS)).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub recipient_name: String,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub html_body: String,
    #[serde(default)]
    pub text_body: String,
}

/// Names a single [`MessageRecord`] field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Recipient,
    Sender,
    RecipientName,
    SenderName,
    Subject,
    HtmlBody,
    TextBody,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Recipient,
        Field::Sender,
        Field::RecipientName,
        Field::SenderName,
        Field::Subject,
        Field::HtmlBody,
        Field::TextBody,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recipient => "recipient",
            Self::Sender => "sender",
            Self::RecipientName => "recipient_name",
            Self::SenderName => "sender_name",
            Self::Subject => "subject",
            Self::HtmlBody => "html_body",
            Self::TextBody => "text_body",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MessageRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Recipient => &self.recipient,
            Field::Sender => &self.sender,
            Field::RecipientName => &self.recipient_name,
            Field::SenderName => &self.sender_name,
            Field::Subject => &self.subject,
            Field::HtmlBody => &self.html_body,
            Field::TextBody => &self.text_body,
        }
    }

    pub fn get_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Recipient => &mut self.recipient,
            Field::Sender => &mut self.sender,
            Field::RecipientName => &mut self.recipient_name,
            Field::SenderName => &mut self.sender_name,
            Field::Subject => &mut self.subject,
            Field::HtmlBody => &mut self.html_body,
            Field::TextBody => &mut self.text_body,
        }
    }

    /// Returns the fields of `required` that are empty, in the given order.
    pub fn missing(&self, required: &[Field]) -> Vec<Field> {
        required
            .iter()
            .copied()
            .filter(|field| self.get(*field).is_empty())
            .collect()
    }

    pub fn to<S: Into<String>>(mut self, address: S) -> Self {
        self.recipient = address.into();
        self
    }

    pub fn to_name<S: Into<String>>(mut self, name: S) -> Self {
        self.recipient_name = name.into();
        self
    }

    pub fn from<S: Into<String>>(mut self, address: S) -> Self {
        self.sender = address.into();
        self
    }

    pub fn from_name<S: Into<String>>(mut self, name: S) -> Self {
        self.sender_name = name.into();
        self
    }

    pub fn subject<S: Into<String>>(mut self, subject: S) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn html_body<S: Into<String>>(mut self, html: S) -> Self {
        self.html_body = html.into();
        self
    }

    pub fn text_body<S: Into<String>>(mut self, text: S) -> Self {
        self.text_body = text.into();
        self
    }
}
