mod gmail;
mod mailgun;
mod sendgrid;
mod ses;
mod smtp_ssl;

pub use gmail::{GMAIL_HOST, GMAIL_PORT, GmailClient, GmailConfig, SmtpSubmission};
pub use mailgun::{MailgunClient, MailgunConfig, MailgunRequest};
pub use sendgrid::{
    SendgridAddress, SendgridClient, SendgridConfig, SendgridContent, SendgridPersonalization,
    SendgridRequest,
};
pub use ses::{
    SesBody, SesClient, SesConfig, SesContent, SesDestination, SesEmailContent, SesMessage,
    SesRequest,
};
pub use smtp_ssl::{SmtpSslClient, SmtpSslConfig};

use crate::MailerError;

const USER_AGENT: &str = concat!("courier/", env!("CARGO_PKG_VERSION"));

/// A fresh HTTP client for one hosted-API send.
fn http_client() -> Result<reqwest::Client, MailerError> {
    let client = reqwest::ClientBuilder::new()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    Ok(client)
}

/// Maps a non-2xx reply from a hosted API to [`MailerError::Provider`].
async fn check_status(response: reqwest::Response) -> Result<(), MailerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to read error response body");
            String::new()
        }
    };
    tracing::error!(status = status.as_u16(), %body, "Provider API returned error status");
    Err(MailerError::Provider {
        status: status.as_u16(),
        body,
    })
}
