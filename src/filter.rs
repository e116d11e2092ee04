//! Criteria for selecting retrieved messages.
//!
//! Every field is optional and an absent field imposes no constraint. An empty
//! `sender` or `subject` string is treated like an absent one.
//!
//! ```
//! use mailgrab::FilterCriteria;
//!
//! let filter = FilterCriteria::new()
//!     .sender("Ethereal Bot <bot@ethereal.email>")
//!     .has_attachment(false);
//!
//! assert!(filter.subject.is_none());
//! ```

use crate::message::Message;
use chrono::{DateTime, Utc};

/// Message selection criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Required rendering of the `From` header, e.g. `Name <user@example.com>`.
    pub sender: Option<String>,
    /// Required subject.
    pub subject: Option<String>,
    /// Whether the message must (or must not) carry attachments.
    pub has_attachment: Option<bool>,
    /// Lower bound on the message date.
    ///
    /// Accepted but not evaluated by [`matches`](Self::matches) yet.
    pub date_from: Option<DateTime<Utc>>,
    /// Upper bound on the message date.
    ///
    /// Accepted but not evaluated by [`matches`](Self::matches) yet.
    pub date_until: Option<DateTime<Utc>>,
}

impl FilterCriteria {
    /// Criteria that match every message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires the `From` header text to equal `sender`.
    #[must_use]
    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Requires the subject to equal `subject`.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Requires the message to have (or not have) attachments.
    #[must_use]
    pub fn has_attachment(mut self, has_attachment: bool) -> Self {
        self.has_attachment = Some(has_attachment);
        self
    }

    /// Sets the lower date bound. Not evaluated yet.
    #[must_use]
    pub fn date_from(mut self, date: DateTime<Utc>) -> Self {
        self.date_from = Some(date);
        self
    }

    /// Sets the upper date bound. Not evaluated yet.
    #[must_use]
    pub fn date_until(mut self, date: DateTime<Utc>) -> Self {
        self.date_until = Some(date);
        self
    }

    /// Returns `true` if `message` satisfies every present criterion.
    ///
    /// A message without a `From` header (or subject) fails a present sender
    /// (or subject) criterion. Date bounds are ignored.
    #[must_use]
    pub fn matches(&self, message: &Message) -> bool {
        if let Some(sender) = non_empty(self.sender.as_deref()) {
            if message.from().map(|from| from.text.as_str()) != Some(sender) {
                return false;
            }
        }

        if let Some(subject) = non_empty(self.subject.as_deref()) {
            if message.subject() != Some(subject) {
                return false;
            }
        }

        if let Some(has_attachment) = self.has_attachment {
            if message.has_attachments() != has_attachment {
                return false;
            }
        }

        // TODO: enforce date_from / date_until against Message::date once
        // callers agree on inclusive vs exclusive bounds.
        true
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn message(from: &str, subject: &str, attachment: bool) -> Message {
        let raw = if attachment {
            format!(
                "From: {from}\r\nSubject: {subject}\r\n\
Content-Type: multipart/mixed; boundary=\"b\"\r\n\r\n\
--b\r\nContent-Type: text/plain\r\n\r\nbody\r\n\
--b\r\nContent-Type: application/octet-stream\r\n\
Content-Disposition: attachment; filename=\"a.bin\"\r\n\r\nxyz\r\n--b--\r\n"
            )
        } else {
            format!("From: {from}\r\nSubject: {subject}\r\n\r\nbody")
        };
        Message::parse(raw.as_bytes()).unwrap()
    }

    fn corpus() -> Vec<Message> {
        vec![
            message("Bot <bot@example.com>", "Code", false),
            message("Bot <bot@example.com>", "Code", true),
            message("other@example.com", "Welcome", false),
            message("other@example.com", "Code", true),
        ]
    }

    #[test]
    fn test_empty_criteria_match_everything() {
        let filter = FilterCriteria::new();
        assert!(corpus().iter().all(|m| filter.matches(m)));
    }

    #[test]
    fn test_absent_field_never_changes_result() {
        let filters = [
            FilterCriteria::new().subject("Code"),
            FilterCriteria::new().has_attachment(true),
            FilterCriteria::new().has_attachment(false),
        ];
        let senders = ["Bot <bot@example.com>", "other@example.com", "x@y.z"];

        // `sender` is absent in every filter above, so varying it must not matter.
        for filter in &filters {
            for attachment in [false, true] {
                let results: Vec<bool> = senders
                    .iter()
                    .map(|sender| filter.matches(&message(sender, "Code", attachment)))
                    .collect();
                assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
            }
        }
    }

    #[test]
    fn test_has_attachment_equivalence() {
        for m in corpus() {
            assert_eq!(
                FilterCriteria::new().has_attachment(true).matches(&m),
                !m.attachments().is_empty()
            );
            assert_eq!(
                FilterCriteria::new().has_attachment(false).matches(&m),
                m.attachments().is_empty()
            );
        }
    }

    #[test]
    fn test_sender_compares_rendered_from() {
        let filter = FilterCriteria::new().sender("Bot <bot@example.com>");
        let kept: Vec<_> = corpus().into_iter().filter(|m| filter.matches(m)).collect();
        assert_eq!(kept.len(), 2);

        let bare = FilterCriteria::new().sender("bot@example.com");
        assert!(corpus().iter().all(|m| !bare.matches(m)));
    }

    #[test]
    fn test_combined_criteria() {
        let filter = FilterCriteria::new()
            .subject("Code")
            .has_attachment(true)
            .sender("other@example.com");
        let kept: Vec<_> = corpus().into_iter().filter(|m| filter.matches(m)).collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].from().unwrap().text, "other@example.com");
    }

    #[test]
    fn test_empty_strings_impose_no_constraint() {
        let filter = FilterCriteria::new().sender("").subject("");
        assert!(corpus().iter().all(|m| filter.matches(m)));
    }

    #[test]
    fn test_missing_subject_fails_subject_criterion() {
        let m = Message::parse(b"From: a@example.com\r\n\r\nbody").unwrap();
        assert!(!FilterCriteria::new().subject("Code").matches(&m));
        assert!(FilterCriteria::new().matches(&m));
    }

    #[test]
    fn test_date_bounds_are_inert() {
        let future = Utc.with_ymd_and_hms(2999, 1, 1, 0, 0, 0).unwrap();
        let past = Utc.with_ymd_and_hms(1970, 1, 2, 0, 0, 0).unwrap();
        let filter = FilterCriteria::new().date_from(future).date_until(past);
        assert!(corpus().iter().all(|m| filter.matches(m)));
    }
}
