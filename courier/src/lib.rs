//! One `send` call over several email providers.
//!
//! Each provider config carries its credentials, an optional pre-send delay
//! and a [`MessageRecord`]. Sending validates the record against the
//! provider's required fields, waits out the delay and makes exactly one
//! delivery attempt.
//!
//! ```no_run
//! use courier::prelude::*;
//!
//! # async fn run() -> Result<(), MailerError> {
//! let mut config = MailgunConfig::new("mg.example.com", "key-123", "");
//! config.message = MessageRecord::new()
//!     .from("sender@example.com")
//!     .to("client@example.com")
//!     .subject("Hello")
//!     .text_body("Hi there");
//! config.send().await?;
//! # Ok(())
//! # }
//! ```
pub mod config;
pub mod error;
pub mod mailer;
pub mod message;
pub mod providers;
pub mod smtp;

pub use config::{ProviderConfig, is_incomplete};
pub use error::MailerError;
pub use mailer::{Provider, Transport, send, send_with};
pub use message::{Field, MessageRecord};
pub use providers::{GmailConfig, MailgunConfig, SendgridConfig, SesConfig, SmtpSslConfig};

pub mod prelude {
    pub use crate::{
        Field, GmailConfig, MailerError, MailgunConfig, MessageRecord, Provider, ProviderConfig,
        SendgridConfig, SesConfig, SmtpSslConfig, Transport, send, send_with,
    };
}
