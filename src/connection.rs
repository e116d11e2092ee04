//! Internal module for opening the byte stream under an IMAP session.
//!
//! Secure endpoints get a rustls TLS stream. Plain endpoints are upgraded in
//! place with `STARTTLS` when the server offers it.

use crate::config::ServerEndpoint;
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use rustls::ClientConfig;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, instrument, warn};
use webpki_roots::TLS_SERVER_ROOTS;

/// Any duplex stream an IMAP client can run over.
pub(crate) trait MailStream: AsyncRead + AsyncWrite + Unpin + Send + Debug {}

impl<T> MailStream for T where T: AsyncRead + AsyncWrite + Unpin + Send + Debug {}

/// Stream type handed to `async-imap`.
pub(crate) type BoxedStream = Box<dyn MailStream>;

static TLS_CONFIG: Lazy<Arc<ClientConfig>> = Lazy::new(|| {
    let mut root_cert_store = rustls::RootCertStore::empty();
    root_cert_store.add_trust_anchors(TLS_SERVER_ROOTS.iter().map(|ta| {
        rustls::OwnedTrustAnchor::from_subject_spki_name_constraints(
            ta.subject,
            ta.spki,
            ta.name_constraints,
        )
    }));

    Arc::new(
        ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(root_cert_store)
            .with_no_client_auth(),
    )
});

/// Tag of the `CAPABILITY` command sent before login.
const CAPABILITY_TAG: &str = "mg0";

/// Tag of the `STARTTLS` command.
const STARTTLS_TAG: &str = "mg1";

/// Longest line accepted while negotiating in plaintext.
const MAX_LINE: usize = 8192;

/// Opens a stream to the endpoint.
///
/// Secure endpoints get implicit TLS. Plain endpoints read the greeting and
/// upgrade with `STARTTLS` when the server advertises it; otherwise the
/// stream stays plaintext. Either way no credentials have been sent yet.
#[instrument(
    name = "connection::establish",
    skip_all,
    fields(host = %endpoint.host, port = endpoint.port, secure = endpoint.secure)
)]
pub(crate) async fn establish(endpoint: &ServerEndpoint) -> Result<BoxedStream> {
    let target_addr = endpoint.address();

    if !endpoint.secure {
        let tcp_stream = connect_tcp(&target_addr).await?;
        return negotiate_starttls(tcp_stream, endpoint).await;
    }

    let server_name = parse_server_name(&endpoint.host)?;
    let tcp_stream = connect_tcp(&target_addr).await?;
    tls_handshake(server_name, tcp_stream, &target_addr).await
}

async fn tls_handshake(
    server_name: rustls::ServerName,
    tcp_stream: TcpStream,
    target_addr: &str,
) -> Result<BoxedStream> {
    debug!("Performing TLS handshake");

    let tls_stream = TlsConnector::from(Arc::clone(&TLS_CONFIG))
        .connect(server_name, tcp_stream)
        .await
        .map_err(|source| Error::TlsConnect {
            target: target_addr.to_string(),
            source,
        })?;

    Ok(Box::new(tls_stream))
}

/// Consumes the greeting and upgrades to TLS if `STARTTLS` is offered.
async fn negotiate_starttls(
    mut tcp_stream: TcpStream,
    endpoint: &ServerEndpoint,
) -> Result<BoxedStream> {
    let target_addr = endpoint.address();

    let greeting = read_line(&mut tcp_stream, &target_addr).await?;
    if !greeting.starts_with("* OK") && !greeting.starts_with("* PREAUTH") {
        return Err(Error::StartTls {
            target: target_addr,
            response: greeting,
        });
    }

    let offered = if has_capability_code(&greeting) {
        advertises_starttls(&greeting)
    } else {
        let lines = run_command(&mut tcp_stream, CAPABILITY_TAG, "CAPABILITY", &target_addr).await?;
        lines.iter().any(|line| advertises_starttls(line))
    };

    if !offered {
        warn!("Server does not offer STARTTLS, continuing in plaintext");
        return Ok(Box::new(tcp_stream));
    }

    let lines = run_command(&mut tcp_stream, STARTTLS_TAG, "STARTTLS", &target_addr).await?;
    let status = lines.last().map(String::as_str).unwrap_or_default();
    if !is_tagged_ok(status, STARTTLS_TAG) {
        return Err(Error::StartTls {
            target: target_addr,
            response: status.to_string(),
        });
    }

    let server_name = parse_server_name(&endpoint.host)?;
    tls_handshake(server_name, tcp_stream, &target_addr).await
}

/// Sends a tagged command and returns every line up to and including the
/// tagged completion.
async fn run_command(
    stream: &mut TcpStream,
    tag: &str,
    command: &str,
    target_addr: &str,
) -> Result<Vec<String>> {
    debug!(command, "Sending pre-login command");

    stream
        .write_all(format!("{tag} {command}\r\n").as_bytes())
        .await
        .map_err(|source| Error::ImapHandshake {
            target: target_addr.to_string(),
            source,
        })?;

    let prefix = format!("{tag} ");
    let mut lines = Vec::new();
    loop {
        let line = read_line(stream, target_addr).await?;
        let done = line.starts_with(&prefix);
        lines.push(line);
        if done {
            return Ok(lines);
        }
    }
}

/// Reads one CRLF-terminated line byte by byte so nothing past it is buffered.
async fn read_line(stream: &mut TcpStream, target_addr: &str) -> Result<String> {
    let handshake_error = |source: std::io::Error| Error::ImapHandshake {
        target: target_addr.to_string(),
        source,
    };

    let mut line = Vec::new();
    loop {
        let byte = stream.read_u8().await.map_err(handshake_error)?;
        if byte == b'\n' {
            break;
        }
        if line.len() >= MAX_LINE {
            return Err(handshake_error(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "server line too long",
            )));
        }
        line.push(byte);
    }

    if line.last() == Some(&b'\r') {
        line.pop();
    }

    Ok(String::from_utf8_lossy(&line).into_owned())
}

fn has_capability_code(line: &str) -> bool {
    line.to_ascii_uppercase().contains("[CAPABILITY ")
}

fn advertises_starttls(line: &str) -> bool {
    line.split(|c: char| c.is_whitespace() || c == '[' || c == ']')
        .any(|token| token.eq_ignore_ascii_case("STARTTLS"))
}

fn is_tagged_ok(line: &str, tag: &str) -> bool {
    line.strip_prefix(tag)
        .and_then(|rest| rest.strip_prefix(' '))
        .and_then(|rest| rest.get(..2))
        .is_some_and(|status| status.eq_ignore_ascii_case("OK"))
}

/// Parses server name for TLS SNI.
fn parse_server_name(host: &str) -> Result<rustls::ServerName> {
    rustls::ServerName::try_from(host).map_err(|source| Error::InvalidDnsName {
        host: host.to_string(),
        source,
    })
}

async fn connect_tcp(target_addr: &str) -> Result<TcpStream> {
    debug!(target = %target_addr, "Establishing TCP connection");

    TcpStream::connect(target_addr)
        .await
        .map_err(|source| Error::TcpConnect {
            target: target_addr.to_string(),
            source,
        })
}
