use std::time::Duration;

use courier::prelude::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A request as seen by the loopback server.
#[derive(Debug)]
struct Captured {
    request_line: String,
    headers: Vec<(String, String)>,
    body: String,
}

impl Captured {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Accepts a single HTTP/1.1 request and answers with `status` and `body`.
async fn respond_once(status: &'static str, body: &'static str) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8(buf[..header_end].to_vec()).unwrap();
        let mut lines = head.split("\r\n");
        let request_line = lines.next().unwrap().to_string();
        let headers: Vec<(String, String)> = lines
            .filter(|line| !line.is_empty())
            .filter_map(|line| line.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();

        let content_length = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .map(|(_, v)| v.parse::<usize>().unwrap())
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending body");
            buf.extend_from_slice(&chunk[..n]);
        }
        let request_body =
            String::from_utf8(buf[header_end..header_end + content_length].to_vec()).unwrap();

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();

        Captured {
            request_line,
            headers,
            body: request_body,
        }
    });

    (base_url, handle)
}

fn complete() -> MessageRecord {
    MessageRecord::new()
        .from("sender@host.com")
        .from_name("Sender")
        .to("client@host.com")
        .to_name("Client")
        .subject("Test")
        .text_body("test")
        .html_body("<p>test</p>")
}

#[tokio::test]
async fn test_sendgrid_posts_json_with_bearer_token() {
    let (base_url, server) = respond_once("202 Accepted", "").await;
    let mut config = SendgridConfig::new("SG.test").with_base_url(base_url);
    config.message = complete();

    config.send().await.unwrap();

    let request = server.await.unwrap();
    assert_eq!(request.request_line, "POST /v3/mail/send HTTP/1.1");
    assert_eq!(request.header("authorization"), Some("Bearer SG.test"));
    assert_eq!(request.header("content-type"), Some("application/json"));

    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["from"], serde_json::json!({"email": "sender@host.com", "name": "Sender"}));
    assert_eq!(
        body["personalizations"][0]["to"][0],
        serde_json::json!({"email": "client@host.com", "name": "Client"})
    );
    assert_eq!(body["content"][1]["value"], "<p>test</p>");
}

#[tokio::test]
async fn test_sendgrid_error_status() {
    let (base_url, server) = respond_once("401 Unauthorized", r#"{"errors":["bad key"]}"#).await;
    let mut config = SendgridConfig::new("SG.bad").with_base_url(base_url);
    config.message = complete();

    let err = config.send().await.unwrap_err();
    server.await.unwrap();

    match err {
        MailerError::Provider { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, r#"{"errors":["bad key"]}"#);
        }
        other => panic!("Expected provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_mailgun_posts_form_with_basic_auth() {
    let (base_url, server) = respond_once("200 OK", r#"{"message":"Queued"}"#).await;
    let mut config = MailgunConfig::new("mg.example.com", "key-123", "pubkey").with_base_url(base_url);
    config.message = complete();

    config.send().await.unwrap();

    let request = server.await.unwrap();
    assert_eq!(request.request_line, "POST /v3/mg.example.com/messages HTTP/1.1");
    assert_eq!(request.header("authorization"), Some("Basic YXBpOmtleS0xMjM="));
    assert_eq!(
        request.header("content-type"),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(
        request.body,
        "from=sender%40host.com&to=client%40host.com&subject=Test&text=test"
    );
}

#[tokio::test]
async fn test_ses_posts_signed_json() {
    let (base_url, server) = respond_once("200 OK", r#"{"MessageId":"abc"}"#).await;
    let mut config = SesConfig::new("AKIDEXAMPLE", "secret", "us-east-1").with_endpoint(base_url);
    config.message = complete();
    config.message.html_body.clear();

    config.send().await.unwrap();

    let request = server.await.unwrap();
    assert_eq!(request.request_line, "POST /v2/email/outbound-emails HTTP/1.1");

    let authorization = request.header("authorization").unwrap();
    assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
    assert!(authorization.contains("/us-east-1/ses/aws4_request"));
    assert!(authorization.contains("SignedHeaders=content-type;host;x-amz-content-sha256;x-amz-date"));
    assert!(request.header("x-amz-date").is_some());

    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["FromEmailAddress"], "sender@host.com");
    assert_eq!(body["Destination"]["ToAddresses"][0], "client@host.com");
    assert_eq!(body["Content"]["Simple"]["Body"]["Html"]["Data"], "test");
}

#[tokio::test]
async fn test_incomplete_message_makes_no_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let mut config = SendgridConfig::new("SG.test").with_base_url(base_url);
    config.message = complete();
    config.message.recipient_name.clear();

    let err = config.send().await.unwrap_err();
    assert!(err.is_incomplete());

    let accepted = tokio::time::timeout(Duration::from_millis(100), listener.accept()).await;
    assert!(accepted.is_err(), "no connection should have been made");
}

#[tokio::test]
async fn test_error_status_with_truncated_body() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
        }
        // promise more body than is sent, then hang up
        stream
            .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\n\r\npartial")
            .await
            .unwrap();
        stream.shutdown().await.ok();
    });

    let mut config = SendgridConfig::new("SG.test").with_base_url(base_url);
    config.message = complete();

    let err = config.send().await.unwrap_err();
    server.await.unwrap();

    match err {
        MailerError::Provider { status, body } => {
            assert_eq!(status, 500);
            assert!(body.is_empty());
        }
        other => panic!("Expected provider error, got {other:?}"),
    }
}
