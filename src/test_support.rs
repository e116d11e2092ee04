//! In-memory collaborators for orchestration tests.

use crate::error::{Error, Result};
use crate::inbound::{MailboxConnection, MailboxConnector, RawMessage};
use crate::outbound::MailSender;
use async_trait::async_trait;
use lettre::transport::smtp::response::{Category, Code, Detail, Response, Severity};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Builds a minimal raw message.
pub(crate) fn raw_mail(from: &str, subject: &str, html: Option<&str>) -> Vec<u8> {
    match html {
        Some(html) => format!(
            "From: {from}\r\nSubject: {subject}\r\nContent-Type: text/html\r\n\r\n{html}"
        ),
        None => format!("From: {from}\r\nSubject: {subject}\r\n\r\nplain body"),
    }
    .into_bytes()
}

/// Counters shared between a mock and the assertions of a test.
#[derive(Debug, Default)]
pub(crate) struct Calls {
    pub connects: AtomicUsize,
    pub fetches: AtomicUsize,
    pub logouts: AtomicUsize,
    pub fetch_order: Mutex<Vec<u32>>,
}

impl Calls {
    pub(crate) fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

/// Mailbox served from memory.
#[derive(Debug, Default, Clone)]
pub(crate) struct MockConnector {
    messages: Vec<(u32, Vec<u8>)>,
    latency: HashMap<u32, Duration>,
    failing_uid: Option<u32>,
    refuse_connect: bool,
    refuse_logout: bool,
    calls: Arc<Calls>,
}

impl MockConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_message(mut self, uid: u32, source: Vec<u8>) -> Self {
        self.messages.push((uid, source));
        self
    }

    pub(crate) fn with_latency(mut self, uid: u32, latency: Duration) -> Self {
        self.latency.insert(uid, latency);
        self
    }

    pub(crate) fn failing_fetch(mut self, uid: u32) -> Self {
        self.failing_uid = Some(uid);
        self
    }

    pub(crate) fn failing_logout(mut self) -> Self {
        self.refuse_logout = true;
        self
    }

    pub(crate) fn refusing_connect(mut self) -> Self {
        self.refuse_connect = true;
        self
    }

    pub(crate) fn calls(&self) -> Arc<Calls> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl MailboxConnector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn MailboxConnection>> {
        self.calls.connects.fetch_add(1, Ordering::SeqCst);

        if self.refuse_connect {
            return Err(Error::TcpConnect {
                target: self.describe(),
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            });
        }

        Ok(Box::new(MockConnection {
            mailbox: self.clone(),
        }))
    }

    fn describe(&self) -> String {
        "mock://inbox".to_string()
    }
}

struct MockConnection {
    mailbox: MockConnector,
}

#[async_trait]
impl MailboxConnection for MockConnection {
    async fn select(&self, _mailbox: &str) -> Result<()> {
        Ok(())
    }

    async fn search_all(&self) -> Result<Vec<u32>> {
        let mut uids: Vec<u32> = self.mailbox.messages.iter().map(|(uid, _)| *uid).collect();
        uids.sort_unstable();
        Ok(uids)
    }

    async fn fetch(&self, uid: u32) -> Result<RawMessage> {
        let calls = &self.mailbox.calls;
        calls.fetches.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.mailbox.latency.get(&uid) {
            tokio::time::sleep(*latency).await;
        }

        calls
            .fetch_order
            .lock()
            .expect("fetch order lock")
            .push(uid);

        if self.mailbox.failing_uid == Some(uid) {
            return Err(Error::MissingSource { uid });
        }

        let source = self
            .mailbox
            .messages
            .iter()
            .find(|(candidate, _)| *candidate == uid)
            .map(|(_, source)| source.clone())
            .ok_or(Error::MissingSource { uid })?;

        Ok(RawMessage {
            uid,
            envelope_subject: None,
            source,
        })
    }

    async fn logout(self: Box<Self>) -> Result<()> {
        self.mailbox.calls.logouts.fetch_add(1, Ordering::SeqCst);

        if self.mailbox.refuse_logout {
            return Err(Error::ImapLogout {
                source: async_imap::error::Error::Io(std::io::Error::from(
                    std::io::ErrorKind::BrokenPipe,
                )),
            });
        }

        Ok(())
    }
}

/// Sender that records messages instead of transmitting them.
#[derive(Debug, Default, Clone)]
pub(crate) struct MockSender {
    sent: Arc<Mutex<Vec<lettre::Message>>>,
}

impl MockSender {
    pub(crate) fn sent(&self) -> usize {
        self.sent.lock().expect("sent lock").len()
    }
}

#[async_trait]
impl MailSender for MockSender {
    async fn send(&self, message: lettre::Message) -> Result<Response> {
        self.sent.lock().expect("sent lock").push(message);
        Ok(Response::new(
            Code::new(
                Severity::PositiveCompletion,
                Category::MailSystem,
                Detail::Zero,
            ),
            vec!["OK queued".to_string()],
        ))
    }
}
