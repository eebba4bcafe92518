//! Implicit-TLS dialing for SMTP submission.

use std::sync::Arc;

use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::crypto::{CryptoProvider, ring};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};

use crate::MailerError;

/// Opens a TCP connection to `host:port` and completes a TLS handshake.
///
/// Certificates are checked against the platform trust store unless
/// `accept_invalid_certs` is set.
pub async fn connect(
    host: &str,
    port: u16,
    accept_invalid_certs: bool,
) -> Result<TlsStream<TcpStream>, MailerError> {
    let connector = TlsConnector::from(Arc::new(client_config(accept_invalid_certs)?));
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|e| MailerError::Tls(format!("Invalid server name '{host}': {e}")))?;

    let stream = TcpStream::connect((host, port)).await?;
    let stream = connector.connect(server_name, stream).await?;
    Ok(stream)
}

fn client_config(accept_invalid_certs: bool) -> Result<ClientConfig, MailerError> {
    let provider = Arc::new(ring::default_provider());
    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| MailerError::Tls(e.to_string()))?;

    if accept_invalid_certs {
        tracing::warn!("TLS certificate verification is disabled");
        return Ok(builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoVerifier(provider)))
            .with_no_client_auth());
    }

    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    if !native.errors.is_empty() {
        tracing::warn!(errors = ?native.errors, "Some certificates could not be loaded");
    }
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    tracing::debug!(added, ignored, "Loaded platform root certificates");

    Ok(builder.with_root_certificates(roots).with_no_client_auth())
}

/// Accepts any server certificate. Only reachable through
/// `accept_invalid_certs(true)`.
#[derive(Debug)]
struct NoVerifier(Arc<CryptoProvider>);

impl ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, tokio_rustls::rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insecure_config_builds() {
        assert!(client_config(true).is_ok());
    }

    #[tokio::test]
    async fn test_invalid_server_name() {
        let result = connect("not a host name", 465, false).await;
        assert!(matches!(result, Err(MailerError::Tls(_))));
    }
}
