//! FTP control-channel codec
//!
//! Parses server replies (RFC 959 §4.2), formats commands and decodes the
//! `227 Entering Passive Mode` reply. Nothing in this module touches a
//! socket; the reading helpers work on any buffered async reader.

use std::net::Ipv4Addr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::FtpError;

// ============================================================================
// Reply
// ============================================================================

/// A complete (possibly multi-line) server reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Three-digit reply code
    pub code: u16,
    /// Reply text; lines of a multi-line reply are joined with `\n`
    pub text: String,
}

impl Reply {
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    /// 1xx: the action was started, expect another reply
    pub fn is_preliminary(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// 2xx: the action completed
    pub fn is_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// 3xx: more information is needed (e.g. a password)
    pub fn is_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }

    /// 4xx: the action failed but may succeed if retried
    pub fn is_transient_negative(&self) -> bool {
        (400..500).contains(&self.code)
    }

    /// 5xx: the action failed and will keep failing
    pub fn is_permanent_negative(&self) -> bool {
        (500..600).contains(&self.code)
    }

    /// Converts a negative reply into the matching error, or anything else
    /// into [`FtpError::UnexpectedReply`] for `command`
    pub fn into_error(self, command: &str) -> FtpError {
        if self.is_permanent_negative() {
            FtpError::Permanent {
                code: self.code,
                message: self.text,
            }
        } else if self.is_transient_negative() {
            FtpError::Transient {
                code: self.code,
                message: self.text,
            }
        } else {
            FtpError::UnexpectedReply {
                command: command.to_string(),
                code: self.code,
                message: self.text,
            }
        }
    }
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code, self.text)
    }
}

// ============================================================================
// Reading replies
// ============================================================================

/// Splits one reply line into its code, separator and text
///
/// Returns `None` if the line does not start with three digits followed by
/// a space, a hyphen or the end of line.
fn split_reply_line(line: &str) -> Option<(u16, Option<char>, &str)> {
    let code_part = line.get(..3)?;
    if !code_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let code = code_part.parse().ok()?;
    let rest = &line[3..];
    let mut chars = rest.chars();
    match chars.next() {
        None => Some((code, None, "")),
        Some(sep @ (' ' | '-')) => Some((code, Some(sep), chars.as_str())),
        Some(_) => None,
    }
}

/// Reads one CRLF (or bare LF) terminated line, without the terminator
///
/// Returns `FtpError::Closed` on EOF.
async fn read_line<R>(reader: &mut R) -> Result<String, FtpError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Err(FtpError::Closed);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(line)
}

/// Reads one complete reply from the control connection
///
/// A multi-line reply starts with `NNN-` and ends at the first line that
/// starts with the same code followed by a space. Lines in between are
/// taken verbatim.
pub async fn read_reply<R>(reader: &mut R) -> Result<Reply, FtpError>
where
    R: AsyncBufRead + Unpin,
{
    let first = read_line(reader).await?;
    let (code, sep, text) =
        split_reply_line(&first).ok_or_else(|| FtpError::Malformed(first.clone()))?;

    if sep != Some('-') {
        return Ok(Reply::new(code, text));
    }

    let mut lines = vec![text.to_string()];
    loop {
        let line = read_line(reader).await?;
        match split_reply_line(&line) {
            Some((c, sep, text)) if c == code && sep != Some('-') => {
                lines.push(text.to_string());
                break;
            }
            _ => lines.push(line),
        }
    }

    Ok(Reply::new(code, lines.join("\n")))
}

// ============================================================================
// Commands
// ============================================================================

/// Formats a command line, CRLF terminated
pub fn format_command(verb: &str, arg: Option<&str>) -> String {
    match arg {
        Some(arg) => format!("{verb} {arg}\r\n"),
        None => format!("{verb}\r\n"),
    }
}

/// Renders a command for logging, hiding secrets
pub fn redact_command(verb: &str, arg: Option<&str>) -> String {
    match (verb, arg) {
        ("PASS", Some(_)) => "PASS ****".to_string(),
        (verb, Some(arg)) => format!("{verb} {arg}"),
        (verb, None) => verb.to_string(),
    }
}

// ============================================================================
// PASV
// ============================================================================

/// Data endpoint announced by a `227` reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassiveEndpoint {
    /// Host as written in the reply; often a private address behind NAT
    pub advertised_host: Ipv4Addr,
    /// Data port (`p1 * 256 + p2`)
    pub port: u16,
}

/// Parses the `(h1,h2,h3,h4,p1,p2)` tuple of a `227` reply text
///
/// Servers differ in punctuation around the tuple (some omit the
/// parentheses), so the first run of six comma-separated numbers is used.
pub fn parse_pasv(text: &str) -> Result<PassiveEndpoint, FtpError> {
    let malformed = || FtpError::Malformed(format!("227 {text}"));

    let start = text
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(malformed)?;
    let tuple: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == ' ')
        .collect();

    let numbers = tuple
        .split(',')
        .map(|n| n.trim().parse::<u8>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| malformed())?;

    let &[h1, h2, h3, h4, p1, p2] = &numbers[..] else {
        return Err(malformed());
    };

    Ok(PassiveEndpoint {
        advertised_host: Ipv4Addr::new(h1, h2, h3, h4),
        port: u16::from(p1) * 256 + u16::from(p2),
    })
}

// ============================================================================
// NLST
// ============================================================================

/// Reduces one `NLST` output line to a bare entry name
///
/// Some servers return paths (`dir/name`) instead of names; only the last
/// segment is kept. Blank lines and the `.` / `..` pseudo-entries yield
/// `None`.
pub fn listing_entry_name(line: &str) -> Option<String> {
    let trimmed = line.trim_end_matches(['\r', '\n']).trim_end_matches('/');
    let name = trimmed.rsplit('/').next().unwrap_or(trimmed);
    match name {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn parse(input: &str) -> Result<Reply, FtpError> {
        let mut reader = input.as_bytes();
        read_reply(&mut reader).await
    }

    #[tokio::test]
    async fn test_single_line_reply() {
        let reply = parse("220 Service ready\r\n").await.unwrap();
        assert_eq!(reply, Reply::new(220, "Service ready"));
        assert!(reply.is_completion());
    }

    #[tokio::test]
    async fn test_multi_line_reply() {
        let reply = parse("220-Welcome\r\n  to the server\r\n220-still going\r\n220 Ready\r\n")
            .await
            .unwrap();
        assert_eq!(reply.code, 220);
        assert_eq!(reply.text, "Welcome\n  to the server\n220-still going\nReady");
    }

    #[tokio::test]
    async fn test_bare_code_reply() {
        let reply = parse("200\r\n").await.unwrap();
        assert_eq!(reply, Reply::new(200, ""));
    }

    #[tokio::test]
    async fn test_malformed_reply() {
        assert!(matches!(
            parse("hello there\r\n").await,
            Err(FtpError::Malformed(_))
        ));
        assert!(matches!(parse("22x ok\r\n").await, Err(FtpError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_eof_is_closed() {
        assert!(matches!(parse("").await, Err(FtpError::Closed)));
        assert!(matches!(parse("220-partial\r\n").await, Err(FtpError::Closed)));
    }

    #[test]
    fn test_reply_classes() {
        assert!(Reply::new(150, "").is_preliminary());
        assert!(Reply::new(331, "").is_intermediate());
        assert!(Reply::new(450, "").is_transient_negative());
        assert!(Reply::new(550, "").is_permanent_negative());
    }

    #[test]
    fn test_into_error() {
        assert!(matches!(
            Reply::new(550, "nope").into_error("CWD"),
            FtpError::Permanent { code: 550, .. }
        ));
        assert!(matches!(
            Reply::new(451, "later").into_error("STOR"),
            FtpError::Transient { code: 451, .. }
        ));
        assert!(matches!(
            Reply::new(200, "huh").into_error("PASV"),
            FtpError::UnexpectedReply { code: 200, .. }
        ));
    }

    #[test]
    fn test_format_and_redact() {
        assert_eq!(format_command("CWD", Some("A")), "CWD A\r\n");
        assert_eq!(format_command("CDUP", None), "CDUP\r\n");
        assert_eq!(redact_command("PASS", Some("pi")), "PASS ****");
        assert_eq!(redact_command("USER", Some("mike")), "USER mike");
    }

    #[test]
    fn test_parse_pasv() {
        let ep = parse_pasv("Entering Passive Mode (192,168,50,129,195,80).").unwrap();
        assert_eq!(ep.advertised_host, Ipv4Addr::new(192, 168, 50, 129));
        assert_eq!(ep.port, 195 * 256 + 80);
    }

    #[test]
    fn test_parse_pasv_without_parentheses() {
        let ep = parse_pasv("Entering Passive Mode 10,0,0,1,4,1").unwrap();
        assert_eq!(ep.port, 1025);
    }

    #[test]
    fn test_parse_pasv_rejects_bad_tuples() {
        assert!(parse_pasv("Entering Passive Mode").is_err());
        assert!(parse_pasv("Entering Passive Mode (1,2,3,4,5)").is_err());
        assert!(parse_pasv("Entering Passive Mode (1,2,3,4,5,300)").is_err());
    }

    #[test]
    fn test_listing_entry_name() {
        assert_eq!(listing_entry_name("A"), Some("A".to_string()));
        assert_eq!(listing_entry_name("./A\r"), Some("A".to_string()));
        assert_eq!(listing_entry_name("pub/incoming/"), Some("incoming".to_string()));
        assert_eq!(listing_entry_name("."), None);
        assert_eq!(listing_entry_name(".."), None);
        assert_eq!(listing_entry_name(""), None);
    }
}
