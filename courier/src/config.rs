use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::providers::{GmailConfig, MailgunConfig, SendgridConfig, SesConfig, SmtpSslConfig};
use crate::{Field, MailerError, MessageRecord, Provider};

/// Any one of the supported providers, selected at runtime.
///
/// ```
/// use courier::{MessageRecord, ProviderConfig, SendgridConfig};
///
/// let mut config = ProviderConfig::Sendgrid(SendgridConfig::new("SG.key"));
/// *config.message_mut() = MessageRecord::new().to("b@example.com");
/// assert!(config.is_incomplete());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum ProviderConfig {
    Sendgrid(SendgridConfig),
    Mailgun(MailgunConfig),
    Gmail(GmailConfig),
    Ses(SesConfig),
    SmtpSsl(SmtpSslConfig),
}

impl ProviderConfig {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sendgrid(_) => SendgridConfig::NAME,
            Self::Mailgun(_) => MailgunConfig::NAME,
            Self::Gmail(_) => GmailConfig::NAME,
            Self::Ses(_) => SesConfig::NAME,
            Self::SmtpSsl(_) => SmtpSslConfig::NAME,
        }
    }

    pub fn message(&self) -> &MessageRecord {
        match self {
            Self::Sendgrid(config) => &config.message,
            Self::Mailgun(config) => &config.message,
            Self::Gmail(config) => &config.message,
            Self::Ses(config) => &config.message,
            Self::SmtpSsl(config) => &config.message,
        }
    }

    pub fn message_mut(&mut self) -> &mut MessageRecord {
        match self {
            Self::Sendgrid(config) => &mut config.message,
            Self::Mailgun(config) => &mut config.message,
            Self::Gmail(config) => &mut config.message,
            Self::Ses(config) => &mut config.message,
            Self::SmtpSsl(config) => &mut config.message,
        }
    }

    pub fn delay(&self) -> Duration {
        match self {
            Self::Sendgrid(config) => config.delay,
            Self::Mailgun(config) => config.delay,
            Self::Gmail(config) => config.delay,
            Self::Ses(config) => config.delay,
            Self::SmtpSsl(config) => config.delay,
        }
    }

    pub fn set_delay(&mut self, delay: Duration) {
        match self {
            Self::Sendgrid(config) => config.delay = delay,
            Self::Mailgun(config) => config.delay = delay,
            Self::Gmail(config) => config.delay = delay,
            Self::Ses(config) => config.delay = delay,
            Self::SmtpSsl(config) => config.delay = delay,
        }
    }

    pub fn missing_fields(&self) -> Vec<Field> {
        match self {
            Self::Sendgrid(config) => config.missing_fields(),
            Self::Mailgun(config) => config.missing_fields(),
            Self::Gmail(config) => config.missing_fields(),
            Self::Ses(config) => config.missing_fields(),
            Self::SmtpSsl(config) => config.missing_fields(),
        }
    }

    pub fn is_incomplete(&self) -> bool {
        is_incomplete(self)
    }

    pub async fn send(&self) -> Result<(), MailerError> {
        match self {
            Self::Sendgrid(config) => crate::send(config).await,
            Self::Mailgun(config) => crate::send(config).await,
            Self::Gmail(config) => crate::send(config).await,
            Self::Ses(config) => crate::send(config).await,
            Self::SmtpSsl(config) => crate::send(config).await,
        }
    }

    /// Loads credentials from `MAILER_*` environment variables.
    ///
    /// `MAILER_PROVIDER` picks the variant. The message record starts empty.
    pub fn from_env() -> Result<Self, MailerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MailerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| MailerError::Config(format!("{name} is not set")))
        };

        let provider = required("MAILER_PROVIDER")?;
        let mut config = match provider.to_lowercase().as_str() {
            "sendgrid" => Self::Sendgrid(SendgridConfig::new(required("MAILER_SENDGRID_API_KEY")?)),
            "mailgun" => Self::Mailgun(MailgunConfig::new(
                required("MAILER_MAILGUN_DOMAIN")?,
                required("MAILER_MAILGUN_API_KEY")?,
                lookup("MAILER_MAILGUN_PUBLIC_KEY").unwrap_or_default(),
            )),
            "gmail" => Self::Gmail(GmailConfig::new(
                required("MAILER_GMAIL_USERNAME")?,
                required("MAILER_GMAIL_PASSWORD")?,
            )),
            "ses" => Self::Ses(SesConfig::new(
                required("MAILER_SES_ACCESS_KEY")?,
                required("MAILER_SES_SECRET_KEY")?,
                required("MAILER_SES_REGION")?,
            )),
            "smtp_ssl" => {
                let port = required("MAILER_SMTP_PORT")?;
                let port = port.parse::<u16>().map_err(|e| {
                    MailerError::Config(format!("MAILER_SMTP_PORT '{port}' is not a valid port: {e}"))
                })?;
                let accept_invalid_certs = match lookup("MAILER_SMTP_ACCEPT_INVALID_CERTS") {
                    Some(value) => parse_bool("MAILER_SMTP_ACCEPT_INVALID_CERTS", &value)?,
                    None => false,
                };
                Self::SmtpSsl(
                    SmtpSslConfig::new(
                        required("MAILER_SMTP_USERNAME")?,
                        required("MAILER_SMTP_PASSWORD")?,
                        required("MAILER_SMTP_SERVER")?,
                        port,
                    )
                    .accept_invalid_certs(accept_invalid_certs),
                )
            }
            other => {
                return Err(MailerError::Config(format!("Unknown provider '{other}'")));
            }
        };

        if let Some(delay) = lookup("MAILER_DELAY_MS") {
            let millis = delay.parse::<u64>().map_err(|e| {
                MailerError::Config(format!("MAILER_DELAY_MS '{delay}' is not a number: {e}"))
            })?;
            config.set_delay(Duration::from_millis(millis));
        }

        tracing::debug!(provider = config.name(), "Loaded provider configuration");
        Ok(config)
    }
}

/// Returns `true` if `config`'s message is missing any field its provider
/// requires.
pub fn is_incomplete(config: &ProviderConfig) -> bool {
    !config.missing_fields().is_empty()
}

fn parse_bool(name: &str, value: &str) -> Result<bool, MailerError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(MailerError::Config(format!("{name} '{value}' is not a boolean"))),
    }
}

impl From<SendgridConfig> for ProviderConfig {
    fn from(config: SendgridConfig) -> Self {
        Self::Sendgrid(config)
    }
}

impl From<MailgunConfig> for ProviderConfig {
    fn from(config: MailgunConfig) -> Self {
        Self::Mailgun(config)
    }
}

impl From<GmailConfig> for ProviderConfig {
    fn from(config: GmailConfig) -> Self {
        Self::Gmail(config)
    }
}

impl From<SesConfig> for ProviderConfig {
    fn from(config: SesConfig) -> Self {
        Self::Ses(config)
    }
}

impl From<SmtpSslConfig> for ProviderConfig {
    fn from(config: SmtpSslConfig) -> Self {
        Self::SmtpSsl(config)
    }
}
