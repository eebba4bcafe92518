//! A hand-driven SMTP client session over any byte stream.

use base64::{Engine, engine::general_purpose::STANDARD as B64};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::response::Response;
use crate::MailerError;

/// Initial size of the read buffer for SMTP replies.
const BUFFER_SIZE: usize = 4096;

/// Replies larger than this are treated as a protocol violation.
const MAX_BUFFER_SIZE: usize = 1024 * 1024;

pub struct SmtpSession<S> {
    stream: S,
    buffer: Vec<u8>,
}

impl<S> SmtpSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Binds a session to `stream` and consumes the server greeting.
    pub async fn open(stream: S) -> Result<Self, MailerError> {
        let mut session = Self {
            stream,
            buffer: Vec::with_capacity(BUFFER_SIZE),
        };
        session.read_response().await?.expect(&[220])?;
        Ok(session)
    }

    pub async fn ehlo(&mut self, domain: &str) -> Result<Response, MailerError> {
        self.command(&format!("EHLO {domain}")).await?.expect(&[250])
    }

    /// Authenticates with the `PLAIN` mechanism (RFC 4616).
    pub async fn auth_plain(&mut self, username: &str, password: &str) -> Result<Response, MailerError> {
        let token = B64.encode(format!("\0{username}\0{password}"));
        tracing::debug!(username, "SMTP command: AUTH PLAIN <redacted>");
        self.write(format!("AUTH PLAIN {token}\r\n").as_bytes()).await?;
        self.read_response().await?.expect(&[235])
    }

    pub async fn mail_from(&mut self, from: &str) -> Result<Response, MailerError> {
        self.command(&format!("MAIL FROM:<{from}>")).await?.expect(&[250])
    }

    pub async fn rcpt_to(&mut self, to: &str) -> Result<Response, MailerError> {
        self.command(&format!("RCPT TO:<{to}>")).await?.expect(&[250, 251])
    }

    /// Opens the data stream; the server must answer `354`.
    pub async fn data(&mut self) -> Result<Response, MailerError> {
        self.command("DATA").await?.expect(&[354])
    }

    /// Writes the message, then the terminating dot, finalizing the message.
    pub async fn send_data(&mut self, message: &str) -> Result<Response, MailerError> {
        let mut payload = encode_data(message);
        payload.extend_from_slice(b".\r\n");
        self.write(&payload).await?;
        self.read_response().await?.expect(&[250])
    }

    pub async fn quit(&mut self) -> Result<Response, MailerError> {
        self.command("QUIT").await?.expect(&[221])
    }

    async fn command(&mut self, command: &str) -> Result<Response, MailerError> {
        tracing::debug!(command, "SMTP command");
        self.write(format!("{command}\r\n").as_bytes()).await?;
        self.read_response().await
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), MailerError> {
        self.stream.write_all(data).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn read_response(&mut self) -> Result<Response, MailerError> {
        let mut chunk = [0u8; BUFFER_SIZE];
        loop {
            if let Some((response, consumed)) = Response::parse(&self.buffer)? {
                self.buffer.drain(..consumed);
                tracing::debug!(code = response.code, "SMTP response");
                return Ok(response);
            }

            if self.buffer.len() >= MAX_BUFFER_SIZE {
                return Err(MailerError::Parse(format!(
                    "Response too large (exceeds {MAX_BUFFER_SIZE} bytes)"
                )));
            }

            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(MailerError::ConnectionClosed);
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }
}

/// Normalizes line endings to CRLF, dot-stuffs (RFC 5321 §4.5.2) and makes
/// sure the payload ends with CRLF so the terminator sits on its own line.
fn encode_data(message: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + 16);
    for line in message.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.starts_with('.') {
            out.push(b'.');
        }
        out.extend_from_slice(line.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    // `split` yields a trailing empty line when the message already ends in a newline.
    if message.ends_with('\n') {
        out.truncate(out.len() - 2);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream, duplex};

    /// Plays the server side: for every expected client line, answers with
    /// the scripted reply. Returns everything the client sent.
    async fn scripted_server(
        stream: DuplexStream,
        greeting: &'static str,
        script: Vec<(&'static str, &'static str)>,
    ) -> Vec<String> {
        let mut reader = BufReader::new(stream);
        reader.get_mut().write_all(greeting.as_bytes()).await.unwrap();

        let mut received = Vec::new();
        for (expect_prefix, reply) in script {
            let mut line = String::new();
            if reader.read_line(&mut line).await.unwrap() == 0 {
                break;
            }
            assert!(
                line.starts_with(expect_prefix),
                "expected '{expect_prefix}', got '{line}'"
            );
            received.push(line);
            reader.get_mut().write_all(reply.as_bytes()).await.unwrap();
        }
        received
    }

    #[test]
    fn test_encode_data_crlf_and_dot_stuffing() {
        let encoded = encode_data("Subject: Hi\n\n.hidden\r\nlast");
        assert_eq!(encoded, b"Subject: Hi\r\n\r\n..hidden\r\nlast\r\n".to_vec());
    }

    #[test]
    fn test_encode_data_existing_trailing_newline() {
        assert_eq!(encode_data("body\r\n"), b"body\r\n".to_vec());
        assert_eq!(encode_data("body\n"), b"body\r\n".to_vec());
    }

    #[tokio::test]
    async fn test_full_session() {
        let (client, server) = duplex(4096);
        let server = tokio::spawn(scripted_server(
            server,
            "220 mail.example.com ESMTP\r\n",
            vec![
                ("EHLO localhost", "250-mail.example.com\r\n250 AUTH PLAIN\r\n"),
                ("AUTH PLAIN AHVzZXIAcGFzcw==", "235 2.7.0 Accepted\r\n"),
                ("MAIL FROM:<user>", "250 OK\r\n"),
                ("RCPT TO:<to@example.com>", "250 OK\r\n"),
                ("DATA", "354 Go ahead\r\n"),
                ("Subject: Hi", ""),
                ("", ""),
                ("<b>hi</b>", ""),
                (".", "250 Queued\r\n"),
                ("QUIT", "221 Bye\r\n"),
            ],
        ));

        let mut session = SmtpSession::open(client).await.unwrap();
        let ehlo = session.ehlo("localhost").await.unwrap();
        assert_eq!(ehlo.lines, vec!["mail.example.com", "AUTH PLAIN"]);
        session.auth_plain("user", "pass").await.unwrap();
        session.mail_from("user").await.unwrap();
        session.rcpt_to("to@example.com").await.unwrap();
        session.data().await.unwrap();
        session.send_data("Subject: Hi\r\n\r\n<b>hi</b>").await.unwrap();
        session.quit().await.unwrap();

        let received = server.await.unwrap();
        assert_eq!(received.len(), 10);
        assert_eq!(received[8], ".\r\n");
    }

    #[tokio::test]
    async fn test_rejected_recipient() {
        let (client, server) = duplex(4096);
        let server = tokio::spawn(scripted_server(
            server,
            "220 ready\r\n",
            vec![
                ("MAIL FROM:<user>", "250 OK\r\n"),
                ("RCPT TO:<nobody@example.com>", "550 5.1.1 No such user\r\n"),
            ],
        ));

        let mut session = SmtpSession::open(client).await.unwrap();
        session.mail_from("user").await.unwrap();
        let err = session.rcpt_to("nobody@example.com").await.unwrap_err();
        match err {
            MailerError::Smtp { code, message } => {
                assert_eq!(code, 550);
                assert_eq!(message, "5.1.1 No such user");
            }
            other => panic!("Expected SMTP error, got {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_bad_greeting() {
        let (client, server) = duplex(1024);
        let server = tokio::spawn(scripted_server(server, "554 No service\r\n", vec![]));

        let err = SmtpSession::open(client).await.err().unwrap();
        assert!(matches!(err, MailerError::Smtp { code: 554, .. }));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_closed() {
        let (client, server) = duplex(1024);
        drop(server);

        let err = SmtpSession::open(client).await.err().unwrap();
        assert!(matches!(err, MailerError::ConnectionClosed));
    }
}
