//! IMAP mail source — fetches unseen messages over rustls, read-only.
//!
//! Speaks just enough IMAP for the triage flow: LOGIN, EXAMINE,
//! SEARCH UNSEEN, FETCH BODY.PEEK[]. EXAMINE plus PEEK keeps the
//! mailbox untouched — no message is ever marked `\Seen` here, so the
//! unseen set is stable across repeated scans.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::TriageConfig;
use crate::error::MailError;
use crate::mail::{MailSource, RawMail, UnseenBatch};

/// Socket read timeout; a stalled server fails the scan instead of hanging.
const READ_TIMEOUT: Duration = Duration::from_secs(30);

type TlsStream = rustls::StreamOwned<rustls::ClientConnection, TcpStream>;

/// IMAP-over-TLS mail source.
#[derive(Debug, Clone)]
pub struct ImapSource {
    host: String,
    port: u16,
    user: String,
    pass: String,
}

impl ImapSource {
    pub fn new(host: String, port: u16, user: String, pass: String) -> Self {
        Self {
            host,
            port,
            user,
            pass,
        }
    }

    pub fn from_config(config: &TriageConfig) -> Self {
        Self::new(
            config.imap_host.clone(),
            config.imap_port,
            config.imap_user.clone(),
            config.imap_pass.clone(),
        )
    }

    /// Blocking fetch — run under `spawn_blocking`.
    fn fetch_blocking(&self, limit: usize) -> Result<UnseenBatch, MailError> {
        let mut session = ImapSession::connect(&self.host, self.port)?;

        session.login(&self.user, &self.pass)?;
        session.examine("INBOX")?;

        let mut ids = session.search_unseen()?;
        let total_unseen = ids.len();

        // Newest first, capped at the batch limit.
        ids.reverse();
        ids.truncate(limit);

        let mut messages = Vec::with_capacity(ids.len());
        for id in &ids {
            match session.fetch_peek(*id) {
                Ok(bytes) => messages.push(RawMail { bytes }),
                Err(e) => {
                    debug!(id, error = %e, "Skipping message that failed to fetch");
                }
            }
        }

        session.logout();
        debug!(
            fetched = messages.len(),
            total_unseen, "Fetched unseen messages"
        );

        Ok(UnseenBatch {
            messages,
            total_unseen,
        })
    }
}

#[async_trait]
impl MailSource for ImapSource {
    async fn fetch_unseen(&self, limit: usize) -> Result<UnseenBatch, MailError> {
        let source = self.clone();
        tokio::task::spawn_blocking(move || source.fetch_blocking(limit))
            .await
            .map_err(|e| MailError::Protocol(format!("fetch task panicked: {e}")))?
    }
}

/// A logged-in IMAP session over TLS with tagged command plumbing.
struct ImapSession {
    stream: TlsStream,
    tag_counter: u32,
}

impl ImapSession {
    fn connect(host: &str, port: u16) -> Result<Self, MailError> {
        let tcp = TcpStream::connect((host, port)).map_err(|e| MailError::ConnectFailed {
            host: host.to_string(),
            port,
            reason: e.to_string(),
        })?;
        tcp.set_read_timeout(Some(READ_TIMEOUT))?;

        let mut roots = rustls::RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls_config = Arc::new(
            rustls::ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth(),
        );
        let server_name = rustls_pki_types::ServerName::try_from(host.to_string())
            .map_err(|e| MailError::Tls(e.to_string()))?;
        let conn = rustls::ClientConnection::new(tls_config, server_name)
            .map_err(|e| MailError::Tls(e.to_string()))?;

        let mut session = Self {
            stream: rustls::StreamOwned::new(conn, tcp),
            tag_counter: 0,
        };

        // Server greeting
        session.read_line()?;
        Ok(session)
    }

    fn read_line(&mut self) -> Result<String, MailError> {
        let mut buf = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            match self.stream.read(&mut byte) {
                Ok(0) => return Err(MailError::Protocol("connection closed".into())),
                Ok(_) => {
                    buf.push(byte[0]);
                    if buf.ends_with(b"\r\n") {
                        return Ok(String::from_utf8_lossy(&buf).to_string());
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Send a tagged command, collecting response lines through the
    /// tagged completion line.
    fn command(&mut self, cmd: &str) -> Result<Vec<String>, MailError> {
        self.tag_counter += 1;
        let tag = format!("A{}", self.tag_counter);
        let full = format!("{tag} {cmd}\r\n");
        self.stream.write_all(full.as_bytes())?;
        self.stream.flush()?;

        let mut lines = Vec::new();
        loop {
            let line = self.read_line()?;
            let done = line.starts_with(&tag);
            lines.push(line);
            if done {
                return Ok(lines);
            }
        }
    }

    fn login(&mut self, user: &str, pass: &str) -> Result<(), MailError> {
        let resp = self.command(&format!("LOGIN \"{user}\" \"{pass}\""))?;
        if completed_ok(&resp) {
            Ok(())
        } else {
            Err(MailError::LoginFailed {
                user: user.to_string(),
            })
        }
    }

    /// Read-only mailbox select.
    fn examine(&mut self, mailbox: &str) -> Result<(), MailError> {
        let resp = self.command(&format!("EXAMINE \"{mailbox}\""))?;
        if completed_ok(&resp) {
            Ok(())
        } else {
            Err(MailError::Protocol(format!(
                "EXAMINE {mailbox} failed: {}",
                resp.last().map(String::as_str).unwrap_or("")
            )))
        }
    }

    /// Sequence numbers of unseen messages, in mailbox (ascending) order.
    fn search_unseen(&mut self) -> Result<Vec<u32>, MailError> {
        let resp = self.command("SEARCH UNSEEN")?;
        if !completed_ok(&resp) {
            return Err(MailError::Protocol("SEARCH UNSEEN failed".into()));
        }
        let mut ids = Vec::new();
        for line in &resp {
            if let Some(rest) = line.strip_prefix("* SEARCH") {
                ids.extend(
                    rest.split_whitespace()
                        .filter_map(|tok| tok.parse::<u32>().ok()),
                );
            }
        }
        Ok(ids)
    }

    /// Fetch one message body without setting `\Seen`.
    fn fetch_peek(&mut self, id: u32) -> Result<Vec<u8>, MailError> {
        let resp = self.command(&format!("FETCH {id} (BODY.PEEK[])"))?;
        if !completed_ok(&resp) {
            return Err(MailError::Protocol(format!("FETCH {id} failed")));
        }
        // Lines between the untagged FETCH line and the closing ")" +
        // tagged completion hold the literal.
        let body: String = resp
            .iter()
            .skip(1)
            .take(resp.len().saturating_sub(3))
            .cloned()
            .collect();
        Ok(body.into_bytes())
    }

    fn logout(&mut self) {
        let _ = self.command("LOGOUT");
    }
}

fn completed_ok(lines: &[String]) -> bool {
    lines
        .last()
        .is_some_and(|l| l.split_whitespace().nth(1) == Some("OK"))
}
