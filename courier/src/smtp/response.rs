//! SMTP reply parsing.

use crate::MailerError;

/// A complete, possibly multi-line, SMTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub code: u16,
    pub lines: Vec<String>,
}

impl Response {
    pub fn new(code: u16, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    /// The reply text with lines joined by newlines.
    pub fn message(&self) -> String {
        self.lines.join("\n")
    }

    /// Turns the reply into an error unless its code is in `accepted`.
    pub fn expect(self, accepted: &[u16]) -> Result<Self, MailerError> {
        if accepted.contains(&self.code) {
            Ok(self)
        } else {
            Err(MailerError::Smtp {
                code: self.code,
                message: self.message(),
            })
        }
    }

    /// Parses one complete reply from the front of `buffer`.
    ///
    /// Returns the reply and the number of bytes it occupied, or `None` when
    /// the final line has not arrived yet.
    pub fn parse(buffer: &[u8]) -> Result<Option<(Self, usize)>, MailerError> {
        let mut consumed = 0;
        let mut code = None;
        let mut lines = Vec::new();

        while let Some(end) = buffer[consumed..].iter().position(|b| *b == b'\n') {
            let raw = &buffer[consumed..consumed + end];
            consumed += end + 1;

            let line = std::str::from_utf8(raw)
                .map_err(|e| MailerError::Parse(e.to_string()))?
                .trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }

            let (line_code, is_last, text) = parse_line(line)?;
            match code {
                Some(expected) if expected != line_code => {
                    return Err(MailerError::Parse(format!(
                        "Status code mismatch in multi-line response: expected {expected}, got {line_code}"
                    )));
                }
                Some(_) => {}
                None => code = Some(line_code),
            }
            lines.push(text.to_string());

            if is_last {
                return Ok(Some((Self::new(line_code, lines), consumed)));
            }
        }

        Ok(None)
    }
}

fn parse_line(line: &str) -> Result<(u16, bool, &str), MailerError> {
    let code = line
        .get(..3)
        .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse::<u16>().ok())
        .ok_or_else(|| MailerError::Parse(format!("Invalid status line: '{line}'")))?;

    match line.as_bytes().get(3) {
        None => Ok((code, true, "")),
        Some(b' ') => Ok((code, true, &line[4..])),
        Some(b'-') => Ok((code, false, &line[4..])),
        Some(other) => Err(MailerError::Parse(format!(
            "Invalid separator character: '{}'",
            *other as char
        ))),
    }
}
