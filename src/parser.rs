//! Internal module turning raw sources into [`Message`]s with mailparse.

use crate::error::{Error, Result};
use crate::message::{
    AddressObject, Attachment, HeaderLine, HeaderValue, Headers, MailboxAddress, Message, Priority,
};
use chrono::{DateTime, TimeZone, Utc};
use mailparse::{
    addrparse_header, parse_mail, DispositionType, MailAddr, MailHeader, MailHeaderMap,
    ParsedContentDisposition, ParsedMail, SingleInfo,
};

/// Headers whose values are normalized to [`AddressObject`]s.
const ADDRESS_HEADERS: [&str; 9] = [
    "from",
    "to",
    "cc",
    "bcc",
    "sender",
    "reply-to",
    "delivered-to",
    "return-path",
    "disposition-notification-to",
];

/// Bodies and attachments gathered from the MIME tree.
#[derive(Default)]
struct Parts {
    html: Option<String>,
    text: Option<String>,
    attachments: Vec<Attachment>,
}

/// Parses a raw source into a [`Message`].
pub(crate) fn parse_message(raw: &[u8]) -> Result<Message> {
    let parsed = parse_mail(raw).map_err(|source| Error::ParseEmail { source })?;
    message_from_parsed(&parsed)
}

/// Maps a parsed MIME tree onto a [`Message`].
pub(crate) fn message_from_parsed(parsed: &ParsedMail<'_>) -> Result<Message> {
    let headers = parsed.headers.as_slice();

    let mut parts = Parts::default();
    collect_parts(parsed, &mut parts)?;

    Ok(Message {
        attachments: parts.attachments,
        headers: normalize_headers(headers),
        header_lines: header_lines(headers),
        html: parts.html,
        text_as_html: parts.text.as_deref().map(text_to_html),
        text: parts.text,
        subject: headers.get_first_value("Subject"),
        references: headers
            .get_first_value("References")
            .map(|value| split_ids(&value))
            .unwrap_or_default(),
        date: headers
            .get_first_value("Date")
            .and_then(|value| parse_date(&value)),
        to: address_header(headers, "To"),
        from: address_header(headers, "From"),
        cc: address_header(headers, "Cc"),
        bcc: address_header(headers, "Bcc"),
        reply_to: address_header(headers, "Reply-To"),
        message_id: headers
            .get_first_value("Message-ID")
            .map(|value| value.trim().to_string()),
        in_reply_to: headers
            .get_first_value("In-Reply-To")
            .map(|value| value.trim().to_string()),
        priority: priority(headers),
    })
}

/// Walks the MIME tree, sorting leaves into bodies and attachments.
fn collect_parts(part: &ParsedMail<'_>, parts: &mut Parts) -> Result<()> {
    if !part.subparts.is_empty() {
        for subpart in &part.subparts {
            collect_parts(subpart, parts)?;
        }
        return Ok(());
    }

    let mimetype = part.ctype.mimetype.to_lowercase();
    if mimetype.starts_with("multipart/") {
        return Ok(());
    }

    let disposition = part.get_content_disposition();
    let is_body = disposition.disposition != DispositionType::Attachment
        && (mimetype == "text/html" || mimetype == "text/plain");

    if !is_body {
        parts
            .attachments
            .push(attachment(part, mimetype, &disposition)?);
        return Ok(());
    }

    let body = part
        .get_body()
        .map_err(|source| Error::ExtractBody { source })?;

    if mimetype == "text/html" {
        append_body(&mut parts.html, body);
    } else {
        append_body(&mut parts.text, body);
    }

    Ok(())
}

fn append_body(slot: &mut Option<String>, body: String) {
    match slot {
        Some(existing) => {
            existing.push('\n');
            existing.push_str(&body);
        }
        None => *slot = Some(body),
    }
}

fn attachment(
    part: &ParsedMail<'_>,
    content_type: String,
    disposition: &ParsedContentDisposition,
) -> Result<Attachment> {
    let filename = disposition
        .params
        .get("filename")
        .or_else(|| part.ctype.params.get("name"))
        .cloned();

    let content_id = part.headers.get_first_value("Content-ID").map(|value| {
        value
            .trim()
            .trim_start_matches('<')
            .trim_end_matches('>')
            .to_string()
    });

    let content = part
        .get_body_raw()
        .map_err(|source| Error::ExtractBody { source })?;

    Ok(Attachment {
        filename,
        content_type,
        content_id,
        inline: disposition.disposition == DispositionType::Inline,
        content,
    })
}

/// Renders plain text as escaped HTML: blank lines split paragraphs, single
/// newlines become `<br/>`.
fn text_to_html(text: &str) -> String {
    let escaped = text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace("\r\n", "\n");

    escaped
        .split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .map(|paragraph| format!("<p>{}</p>", paragraph.replace('\n', "<br/>")))
        .collect()
}

fn normalize_headers(headers: &[MailHeader<'_>]) -> Headers {
    headers
        .iter()
        .map(|header| {
            let key = header.get_key().to_lowercase();
            let value = normalize_value(&key, header);
            (key, value)
        })
        .collect()
}

fn normalize_value(key: &str, header: &MailHeader<'_>) -> HeaderValue {
    let text = header.get_value();

    if ADDRESS_HEADERS.contains(&key) {
        return match address_object_from(header) {
            Some(addresses) => HeaderValue::Addresses(addresses),
            None => HeaderValue::Text(text),
        };
    }

    match key {
        "date" => match parse_date(&text) {
            Some(date) => HeaderValue::Date(date),
            None => HeaderValue::Text(text),
        },
        "references" => HeaderValue::Ids(split_ids(&text)),
        _ => HeaderValue::Text(text),
    }
}

fn header_lines(headers: &[MailHeader<'_>]) -> Vec<HeaderLine> {
    headers
        .iter()
        .map(|header| HeaderLine {
            key: header.get_key().to_lowercase(),
            line: format!(
                "{}: {}",
                header.get_key(),
                String::from_utf8_lossy(header.get_value_raw())
            ),
        })
        .collect()
}

fn address_header(headers: &[MailHeader<'_>], name: &str) -> Option<AddressObject> {
    headers.get_first_header(name).and_then(address_object_from)
}

fn address_object_from(header: &MailHeader<'_>) -> Option<AddressObject> {
    let list = addrparse_header(header).ok()?;
    if list.is_empty() {
        return None;
    }

    let mut value = Vec::new();
    let mut rendered = Vec::with_capacity(list.len());

    for addr in list.iter() {
        match addr {
            MailAddr::Single(info) => {
                rendered.push(render_single(info));
                value.push(mailbox(info));
            }
            MailAddr::Group(group) => {
                let members: Vec<String> = group.addrs.iter().map(render_single).collect();
                rendered.push(format!("{}: {};", group.group_name, members.join(", ")));
                value.extend(group.addrs.iter().map(mailbox));
            }
        }
    }

    Some(AddressObject {
        value,
        text: rendered.join(", "),
    })
}

fn mailbox(info: &SingleInfo) -> MailboxAddress {
    MailboxAddress {
        name: info.display_name.clone().filter(|name| !name.is_empty()),
        address: info.addr.clone(),
    }
}

fn render_single(info: &SingleInfo) -> String {
    match info.display_name.as_deref() {
        Some(name) if !name.is_empty() => format!("{name} <{}>", info.addr),
        _ => info.addr.clone(),
    }
}

fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    mailparse::dateparse(value)
        .ok()
        .and_then(|timestamp| Utc.timestamp_opt(timestamp, 0).single())
}

/// Splits a `References` style value into message ids.
fn split_ids(value: &str) -> Vec<String> {
    let bracketed: Vec<String> = value
        .split('<')
        .skip(1)
        .filter_map(|chunk| chunk.split_once('>'))
        .map(|(id, _)| format!("<{}>", id.trim()))
        .collect();

    if bracketed.is_empty() {
        value.split_whitespace().map(str::to_string).collect()
    } else {
        bracketed
    }
}

fn priority(headers: &[MailHeader<'_>]) -> Priority {
    if let Some(value) = headers.get_first_value("X-Priority") {
        return match value.trim().chars().next() {
            Some('1' | '2') => Priority::High,
            Some('4' | '5') => Priority::Low,
            _ => Priority::Normal,
        };
    }

    let named = headers
        .get_first_value("Importance")
        .or_else(|| headers.get_first_value("X-MSMail-Priority"))
        .or_else(|| headers.get_first_value("Priority"));

    match named.map(|value| value.trim().to_lowercase()).as_deref() {
        Some("high" | "urgent") => Priority::High,
        Some("low" | "non-urgent") => Priority::Low,
        _ => Priority::Normal,
    }
}
