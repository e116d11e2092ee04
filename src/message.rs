//! Parsed email messages.
//!
//! A [`Message`] is an immutable snapshot of one retrieved email. It is built
//! from the raw source by the MIME parser and exposes [`Message::data`] to
//! pull text out of the HTML body with a CSS selector.
//!
//! ```
//! use mailgrab::Message;
//!
//! let raw = b"From: Shop <noreply@shop.test>\r\n\
//! Subject: Your code\r\n\
//! Content-Type: text/html\r\n\
//! \r\n\
//! <p>Use <span class=\"code\">123456</span> to sign in.</p>";
//!
//! let message = Message::parse(raw)?;
//! assert_eq!(message.subject(), Some("Your code"));
//! assert_eq!(message.data(".code")?, "123456");
//! # Ok::<(), mailgrab::Error>(())
//! ```

use crate::error::{Error, Result};
use crate::parser;
use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use std::fmt;
use tracing::warn;

/// One mailbox of an address header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxAddress {
    /// Display name, if present.
    pub name: Option<String>,
    /// Address part (`user@example.com`).
    pub address: String,
}

/// A parsed address header.
///
/// Group members are flattened into `value`; `text` keeps the group rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressObject {
    /// Every mailbox named by the header.
    pub value: Vec<MailboxAddress>,
    /// Rendering of the whole header: `Name <user@example.com>` or the bare
    /// address when there is no display name, comma-separated.
    pub text: String,
}

impl fmt::Display for AddressObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A normalized header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    /// Decoded text.
    Text(String),
    /// An address header.
    Addresses(AddressObject),
    /// The `Date` header.
    Date(DateTime<Utc>),
    /// A list of message ids (`References`).
    Ids(Vec<String>),
}

impl HeaderValue {
    /// Returns the text if this is a plain text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Header collection with lowercase keys, in message order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, HeaderValue)>,
}

impl Headers {
    /// Returns the first value for `name` (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Returns every value for `name` (case-insensitive).
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a HeaderValue> + 'a {
        self.entries
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Returns `true` if a header named `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates over all headers.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Number of header fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, HeaderValue)> for Headers {
    fn from_iter<I: IntoIterator<Item = (String, HeaderValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// A header as it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLine {
    /// Lowercase header name.
    pub key: String,
    /// Full undecoded line, `Name: value`.
    pub line: String,
}

/// Message priority marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Priority {
    /// No priority header, or a normal one.
    #[default]
    Normal,
    /// Low priority.
    Low,
    /// High priority.
    High,
}

/// A message attachment.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name from `Content-Disposition` or `Content-Type`.
    pub filename: Option<String>,
    /// Lowercase MIME type.
    pub content_type: String,
    /// `Content-ID` without angle brackets.
    pub content_id: Option<String>,
    /// `true` if the part was marked inline rather than attachment.
    pub inline: bool,
    /// Decoded content.
    pub content: Vec<u8>,
}

impl Attachment {
    /// Size of the decoded content in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("content_id", &self.content_id)
            .field("inline", &self.inline)
            .field("size", &self.size())
            .finish()
    }
}

/// One parsed email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub(crate) attachments: Vec<Attachment>,
    pub(crate) headers: Headers,
    pub(crate) header_lines: Vec<HeaderLine>,
    pub(crate) html: Option<String>,
    pub(crate) text: Option<String>,
    pub(crate) text_as_html: Option<String>,
    pub(crate) subject: Option<String>,
    pub(crate) references: Vec<String>,
    pub(crate) date: Option<DateTime<Utc>>,
    pub(crate) to: Option<AddressObject>,
    pub(crate) from: Option<AddressObject>,
    pub(crate) cc: Option<AddressObject>,
    pub(crate) bcc: Option<AddressObject>,
    pub(crate) reply_to: Option<AddressObject>,
    pub(crate) message_id: Option<String>,
    pub(crate) in_reply_to: Option<String>,
    pub(crate) priority: Priority,
}

impl Message {
    /// Parses a raw RFC 5322 message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParseEmail`] or [`Error::ExtractBody`] if the MIME
    /// structure cannot be decoded.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        parser::parse_message(raw)
    }

    /// Builds a message from an already parsed MIME tree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExtractBody`] if a body part cannot be decoded.
    pub fn from_parsed(parsed: &mailparse::ParsedMail<'_>) -> Result<Self> {
        parser::message_from_parsed(parsed)
    }

    /// Extracts the text of every element matching `selector` from the HTML body.
    ///
    /// The selector is trimmed before use. Text of all matches is concatenated
    /// in document order. A message without an HTML body yields an empty
    /// string and a `warn` event. An empty selector matches nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSelector`] if the selector does not parse.
    pub fn data(&self, selector: &str) -> Result<String> {
        let Some(html) = self.html.as_deref() else {
            warn!(
                message_id = ?self.message_id,
                selector = %selector,
                "HTML content is not available"
            );
            return Ok(String::new());
        };

        let selector = selector.trim();
        if selector.is_empty() {
            return Ok(String::new());
        }

        let parsed = Selector::parse(selector).map_err(|e| Error::InvalidSelector {
            selector: selector.to_string(),
            message: e.to_string(),
        })?;

        let document = Html::parse_document(html);
        Ok(document
            .select(&parsed)
            .flat_map(|element| element.text())
            .collect())
    }

    /// Attachments, possibly empty.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Returns `true` if the message has at least one attachment.
    #[must_use]
    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    /// Normalized headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Raw header lines in message order.
    #[must_use]
    pub fn header_lines(&self) -> &[HeaderLine] {
        &self.header_lines
    }

    /// HTML body, `None` when the message has no HTML part.
    #[must_use]
    pub fn html(&self) -> Option<&str> {
        self.html.as_deref()
    }

    /// Plain-text body.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Plain-text body rendered as HTML paragraphs, escaped.
    #[must_use]
    pub fn text_as_html(&self) -> Option<&str> {
        self.text_as_html.as_deref()
    }

    /// Subject line.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Message ids from `References`.
    #[must_use]
    pub fn references(&self) -> &[String] {
        &self.references
    }

    /// `Date` header.
    #[must_use]
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.date
    }

    /// `To` header.
    #[must_use]
    pub fn to(&self) -> Option<&AddressObject> {
        self.to.as_ref()
    }

    /// `From` header.
    #[must_use]
    pub fn from(&self) -> Option<&AddressObject> {
        self.from.as_ref()
    }

    /// `Cc` header.
    #[must_use]
    pub fn cc(&self) -> Option<&AddressObject> {
        self.cc.as_ref()
    }

    /// `Bcc` header (rarely present on received mail).
    #[must_use]
    pub fn bcc(&self) -> Option<&AddressObject> {
        self.bcc.as_ref()
    }

    /// `Reply-To` header.
    #[must_use]
    pub fn reply_to(&self) -> Option<&AddressObject> {
        self.reply_to.as_ref()
    }

    /// `Message-ID` header, angle brackets included.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// `In-Reply-To` header.
    #[must_use]
    pub fn in_reply_to(&self) -> Option<&str> {
        self.in_reply_to.as_deref()
    }

    /// Priority marker.
    #[must_use]
    pub fn priority(&self) -> Priority {
        self.priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html_message(html: &str) -> Message {
        let raw = format!("Subject: code\r\nContent-Type: text/html; charset=utf-8\r\n\r\n{html}");
        Message::parse(raw.as_bytes()).unwrap()
    }

    #[test]
    fn test_data_returns_matching_text() {
        let message = html_message(r#"<div class="code">123456</div>"#);
        assert_eq!(message.data(".code").unwrap(), "123456");
    }

    #[test]
    fn test_data_trims_selector() {
        let message = html_message(r#"<div class="code">654321</div>"#);
        assert_eq!(message.data("  .code \n").unwrap(), "654321");
    }

    #[test]
    fn test_data_concatenates_all_matches() {
        let message = html_message(r#"<p><b class="d">12</b> and <b class="d">34</b></p>"#);
        assert_eq!(message.data("b.d").unwrap(), "1234");
    }

    #[test]
    fn test_data_decodes_entities() {
        let message = html_message(r#"<span id="v">a &amp; b</span>"#);
        assert_eq!(message.data("#v").unwrap(), "a & b");
    }

    #[test]
    fn test_data_no_match_is_empty() {
        let message = html_message("<p>nothing here</p>");
        assert_eq!(message.data(".code").unwrap(), "");
    }

    #[test]
    fn test_data_without_html_is_empty() {
        let message =
            Message::parse(b"Subject: plain\r\nContent-Type: text/plain\r\n\r\nYour code is 123456")
                .unwrap();
        assert!(message.html().is_none());
        assert_eq!(message.data(".code").unwrap(), "");
        // Even a broken selector is not looked at without HTML.
        assert_eq!(message.data("<<<").unwrap(), "");
    }

    #[test]
    fn test_data_blank_selector_is_empty() {
        let message = html_message(r#"<div class="code">123456</div>"#);
        assert_eq!(message.data("").unwrap(), "");
        assert_eq!(message.data("   \n").unwrap(), "");
    }

    #[test]
    fn test_data_invalid_selector() {
        let message = html_message("<p>x</p>");
        let err = message.data(" <<< ").unwrap_err();
        match err {
            Error::InvalidSelector { selector, .. } => assert_eq!(selector, "<<<"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_headers_lookup_is_case_insensitive() {
        let headers: Headers = [
            ("subject".to_string(), HeaderValue::Text("hi".into())),
            ("received".to_string(), HeaderValue::Text("a".into())),
            ("received".to_string(), HeaderValue::Text("b".into())),
        ]
        .into_iter()
        .collect();

        assert_eq!(headers.get("Subject").and_then(HeaderValue::as_text), Some("hi"));
        assert_eq!(headers.get_all("RECEIVED").count(), 2);
        assert!(!headers.contains("to"));
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn test_attachment_debug_omits_content() {
        let attachment = Attachment {
            filename: Some("a.bin".into()),
            content_type: "application/octet-stream".into(),
            content_id: None,
            inline: false,
            content: vec![0xde, 0xad, 0xbe, 0xef],
        };
        let debug_str = format!("{attachment:?}");
        assert!(debug_str.contains("size: 4"));
        assert!(!debug_str.contains("222"));
    }
}
