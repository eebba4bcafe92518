use std::time::Duration;

use async_trait::async_trait;

use crate::{Field, MailerError, MessageRecord};

/// A provider's client handle: delivers one request per call.
///
/// Every provider ships a real implementation; tests substitute stubs to
/// observe what would have gone over the wire.
#[async_trait]
pub trait Transport<R: Send + 'static>: Send + Sync {
    async fn deliver(&self, request: R) -> Result<(), MailerError>;
}

/// One delivery mechanism: its credentials, message and request shape.
pub trait Provider: Send + Sync {
    /// The provider-native request built from the message record.
    type Request: Send + 'static;

    /// The client handle built fresh for every send.
    type Client: Transport<Self::Request>;

    /// Informational tag, e.g. `"sendgrid"`.
    const NAME: &'static str;

    /// Message fields that must be non-empty before anything is sent.
    const REQUIRED_FIELDS: &'static [Field];

    fn message(&self) -> &MessageRecord;

    fn delay(&self) -> Duration;

    fn client(&self) -> Result<Self::Client, MailerError>;

    fn request(&self) -> Self::Request;

    fn missing_fields(&self) -> Vec<Field> {
        self.message().missing(Self::REQUIRED_FIELDS)
    }

    fn is_incomplete(&self) -> bool {
        !self.missing_fields().is_empty()
    }
}

/// Sends the provider's message through a freshly built client.
///
/// The message is validated before the client is built, so an incomplete
/// record never touches the network.
pub async fn send<P: Provider>(provider: &P) -> Result<(), MailerError> {
    validate(provider)?;
    let client = provider.client()?;
    send_with(provider, &client).await
}

fn validate<P: Provider>(provider: &P) -> Result<(), MailerError> {
    let missing = provider.missing_fields();
    if missing.is_empty() {
        return Ok(());
    }
    tracing::warn!(provider = P::NAME, ?missing, "Refusing to send incomplete message");
    Err(MailerError::IncompleteMessage(missing))
}

/// Validates, waits out the configured delay, then delivers exactly once.
///
/// The transport's error is returned as-is; nothing is retried.
pub async fn send_with<P, T>(provider: &P, transport: &T) -> Result<(), MailerError>
where
    P: Provider,
    T: Transport<P::Request> + ?Sized,
{
    tracing::debug!(provider = P::NAME, "Sending email");

    validate(provider)?;

    let delay = provider.delay();
    if !delay.is_zero() {
        tracing::debug!(provider = P::NAME, ?delay, "Delaying send");
        tokio::time::sleep(delay).await;
    }

    let request = provider.request();
    match transport.deliver(request).await {
        Ok(()) => {
            tracing::info!(
                provider = P::NAME,
                recipient = %provider.message().recipient,
                "Email sent"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(provider = P::NAME, error = ?e, "Failed to send email");
            Err(e)
        }
    }
}
