//! SMTP plumbing shared by the Gmail and direct SMTP-SSL providers.

mod response;
mod session;
pub mod tls;

pub use response::Response;
pub use session::SmtpSession;

/// Builds the minimal HTML message both SMTP providers submit.
///
/// Headers are emitted in a fixed order: `Content-Type`, `MIME-Version`,
/// `From`, `To`, `Subject`, followed by a blank line and the body verbatim.
pub fn compose_message(from: &str, to: &str, subject: &str, html_body: &str) -> String {
    let headers = [
        ("Content-Type", "text/html; charset=\"UTF-8\";"),
        ("MIME-Version", "1.0;"),
        ("From", from),
        ("To", to),
        ("Subject", subject),
    ];

    let mut message = String::with_capacity(html_body.len() + 256);
    for (name, value) in headers {
        message.push_str(name);
        message.push_str(": ");
        message.push_str(value);
        message.push_str("\r\n");
    }
    message.push_str("\r\n");
    message.push_str(html_body);
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_message_header_order() {
        let message = compose_message("me@example.com", "you@example.com", "Hello", "<b>hi</b>");
        assert_eq!(
            message,
            "Content-Type: text/html; charset=\"UTF-8\";\r\n\
             MIME-Version: 1.0;\r\n\
             From: me@example.com\r\n\
             To: you@example.com\r\n\
             Subject: Hello\r\n\
             \r\n\
             <b>hi</b>"
        );
    }
}
