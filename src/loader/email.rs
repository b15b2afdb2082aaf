//! RFC 5322 (.eml) decoding via mail-parser.

use std::path::Path;

use mail_parser::{Address, Message, MessageParser};
use serde::Serialize;

use crate::error::LoaderError;
use crate::loader::read_bytes;

/// Canonical fields of an email. Absent headers stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmailContent {
    pub from: Option<String>,
    pub to: Option<String>,
    pub subject: Option<String>,
    /// RFC 3339.
    pub date: Option<String>,
    pub body: Option<String>,
}

/// Read and parse an .eml file.
pub async fn load(path: &Path) -> Result<EmailContent, LoaderError> {
    let bytes = read_bytes(path).await?;
    parse(&bytes).ok_or_else(|| LoaderError::InvalidEmail {
        path: path.to_path_buf(),
    })
}

/// Parse raw message bytes. `None` when the input is not a message.
pub fn parse(bytes: &[u8]) -> Option<EmailContent> {
    let parsed = MessageParser::default().parse(bytes)?;
    Some(EmailContent {
        from: extract_sender(&parsed),
        to: extract_recipients(&parsed),
        subject: parsed.subject().map(str::to_string),
        date: parsed.date().map(|d| d.to_rfc3339()),
        body: Some(extract_text(&parsed)),
    })
}

fn extract_sender(parsed: &Message) -> Option<String> {
    parsed
        .from()
        .and_then(|addr| addr.first())
        .and_then(|a| a.address())
        .map(str::to_string)
}

fn extract_recipients(parsed: &Message) -> Option<String> {
    let addresses: Vec<&str> = match parsed.to()? {
        Address::List(addrs) => addrs.iter().filter_map(|a| a.address()).collect(),
        Address::Group(groups) => groups
            .iter()
            .flat_map(|g| g.addresses.iter().filter_map(|a| a.address()))
            .collect(),
    };
    if addresses.is_empty() {
        None
    } else {
        Some(addresses.join(", "))
    }
}

/// Plain text part, else the HTML part without tags, else empty.
fn extract_text(parsed: &Message) -> String {
    if let Some(text) = parsed.body_text(0) {
        return text.into_owned();
    }
    if let Some(html) = parsed.body_html(0) {
        return strip_html(html.as_ref());
    }
    String::new()
}

/// Remove tags and collapse whitespace.
pub fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}
