//! Critical escalation appender
//!
//! Hands rendered records to a background worker that delivers them through
//! a [`NotificationTransport`]. The logging thread only ever does a
//! non-blocking channel send.

use crate::core::{Appender, LogEntry, LogLevel, LoggerError, Result};
use base64::{prelude::BASE64_STANDARD, Engine};
use crossbeam_channel::{bounded, Sender, TrySendError};
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const DEFAULT_QUEUE_SIZE: usize = 64;

/// One message for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: LogLevel,
    pub subject: String,
    pub body: String,
}

/// Delivery mechanism used by the notification worker.
pub trait NotificationTransport: Send + 'static {
    fn deliver(&mut self, notification: &Notification) -> Result<()>;

    /// Where deliveries go, for diagnostics.
    fn endpoint(&self) -> String;
}

/// Delivery counters shared between the appender and its worker.
#[derive(Debug, Default)]
pub struct NotificationStats {
    queued: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl NotificationStats {
    pub fn queued(&self) -> u64 {
        self.queued.load(Ordering::Relaxed)
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Notifications discarded because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Delivery attempts made so far, successful or not
    pub fn attempts(&self) -> u64 {
        self.delivered() + self.failed()
    }
}

/// Escalation appender backed by a single worker thread.
///
/// # Example
///
/// ```no_run
/// use session_logger::appenders::{NotificationAppender, SmtpSettings, SmtpTransport};
///
/// let transport = SmtpTransport::new(SmtpSettings::default());
/// let appender = NotificationAppender::new(transport, "Critical Error", 64).unwrap();
/// ```
pub struct NotificationAppender {
    sender: Option<Sender<Notification>>,
    worker: Option<JoinHandle<()>>,
    subject: String,
    name: String,
    stats: Arc<NotificationStats>,
}

impl NotificationAppender {
    /// Start the worker thread.
    ///
    /// # Errors
    ///
    /// Returns error if the worker thread cannot be spawned
    pub fn new<T: NotificationTransport>(
        transport: T,
        subject: impl Into<String>,
        queue_size: usize,
    ) -> Result<Self> {
        let (sender, receiver) = bounded::<Notification>(queue_size.max(1));
        let stats = Arc::new(NotificationStats::default());
        let worker_stats = Arc::clone(&stats);
        let name = format!("notification:{}", transport.endpoint());

        let worker = thread::Builder::new()
            .name("session-logger-notify".to_string())
            .spawn(move || {
                let mut transport = transport;
                // Channel closes when the appender is dropped
                for notification in receiver {
                    let outcome =
                        catch_unwind(AssertUnwindSafe(|| transport.deliver(&notification)));
                    match outcome {
                        Ok(Ok(())) => {
                            worker_stats.delivered.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(Err(e)) => {
                            worker_stats.failed.fetch_add(1, Ordering::Relaxed);
                            eprintln!(
                                "[LOGGER ERROR] Notification delivery to {} failed: {}",
                                transport.endpoint(),
                                e
                            );
                        }
                        Err(_) => {
                            worker_stats.failed.fetch_add(1, Ordering::Relaxed);
                            eprintln!(
                                "[LOGGER CRITICAL] Notification transport {} panicked",
                                transport.endpoint()
                            );
                        }
                    }
                }
            })
            .map_err(|e| {
                LoggerError::io_operation("spawn notification worker", "thread spawn failed", e)
            })?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
            subject: subject.into(),
            name,
            stats,
        })
    }

    pub fn stats(&self) -> Arc<NotificationStats> {
        Arc::clone(&self.stats)
    }
}

impl Appender for NotificationAppender {
    fn write(&mut self, entry: &LogEntry, rendered: &str) -> Result<()> {
        let Some(ref sender) = self.sender else {
            return Err(LoggerError::writer("Notification worker stopped"));
        };

        let notification = Notification {
            level: entry.level,
            subject: self.subject.clone(),
            body: rendered.to_string(),
        };

        match sender.try_send(notification) {
            Ok(()) => {
                self.stats.queued.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                let dropped = self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                if dropped == 0 || (dropped + 1) % 100 == 0 {
                    eprintln!(
                        "[LOGGER WARNING] Notification queue full, {} notifications dropped",
                        dropped + 1
                    );
                }
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => {
                Err(LoggerError::notification(&self.name, "worker disconnected"))
            }
        }
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for NotificationAppender {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain what is queued and exit
        self.sender.take();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

/// Static SMTP delivery parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub from: String,
    pub to: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Applied to connect, read and write separately
    pub timeout: Duration,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 25,
            from: "logger@localhost".to_string(),
            to: Vec::new(),
            username: None,
            password: None,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Plain SMTP client, one connection per notification.
pub struct SmtpTransport {
    settings: SmtpSettings,
}

impl SmtpTransport {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SmtpSettings {
        &self.settings
    }

    fn connect(&self) -> Result<TcpStream> {
        let endpoint = self.endpoint();
        let addrs = (self.settings.host.as_str(), self.settings.port)
            .to_socket_addrs()
            .map_err(|e| LoggerError::notification(&endpoint, format!("resolve failed: {}", e)))?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.settings.timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.settings.timeout))?;
                    stream.set_write_timeout(Some(self.settings.timeout))?;
                    return Ok(stream);
                }
                Err(e) => last_error = Some(e),
            }
        }
        Err(LoggerError::notification(
            endpoint,
            match last_error {
                Some(e) => format!("connect failed: {}", e),
                None => "no addresses resolved".to_string(),
            },
        ))
    }

    fn message(&self, notification: &Notification) -> String {
        let mut message = format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nDate: {}\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\r\n",
            self.settings.from,
            self.settings.to.join(", "),
            notification.subject,
            chrono::Utc::now().to_rfc2822(),
        );
        for line in notification.body.lines() {
            // Dot-stuffing so a body line cannot end the DATA section
            if line.starts_with('.') {
                message.push('.');
            }
            message.push_str(line);
            message.push_str("\r\n");
        }
        message.push_str(".\r\n");
        message
    }
}

impl NotificationTransport for SmtpTransport {
    fn deliver(&mut self, notification: &Notification) -> Result<()> {
        if self.settings.to.is_empty() {
            return Err(LoggerError::notification(self.endpoint(), "no recipients configured"));
        }

        let stream = self.connect()?;
        let mut session = SmtpSession {
            reader: BufReader::new(stream.try_clone()?),
            writer: stream,
            endpoint: self.endpoint(),
        };

        session.expect(&[220])?;
        session.command("EHLO localhost", &[250])?;

        if let (Some(user), Some(pass)) = (&self.settings.username, &self.settings.password) {
            session.command("AUTH LOGIN", &[334])?;
            session.command(&BASE64_STANDARD.encode(user), &[334])?;
            session.command(&BASE64_STANDARD.encode(pass), &[235])?;
        }

        session.command(&format!("MAIL FROM:<{}>", self.settings.from), &[250])?;
        for recipient in &self.settings.to {
            session.command(&format!("RCPT TO:<{}>", recipient), &[250, 251])?;
        }
        session.command("DATA", &[354])?;
        session.send(&self.message(notification))?;
        session.expect(&[250])?;

        // The message is accepted at this point
        let _ = session.command("QUIT", &[221]);
        Ok(())
    }

    fn endpoint(&self) -> String {
        format!("smtp://{}:{}", self.settings.host, self.settings.port)
    }
}

struct SmtpSession<R: BufRead, W: Write> {
    reader: R,
    writer: W,
    endpoint: String,
}

impl<R: BufRead, W: Write> SmtpSession<R, W> {
    fn send(&mut self, data: &str) -> Result<()> {
        self.writer.write_all(data.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }

    fn command(&mut self, line: &str, accepted: &[u16]) -> Result<u16> {
        self.send(&format!("{}\r\n", line))?;
        self.expect(accepted)
    }

    /// Read a possibly multi-line reply and check its code.
    fn expect(&mut self, accepted: &[u16]) -> Result<u16> {
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Err(LoggerError::notification(&self.endpoint, "connection closed"));
            }
            let code: u16 = line
                .get(..3)
                .and_then(|c| c.parse().ok())
                .ok_or_else(|| {
                    LoggerError::notification(&self.endpoint, format!("malformed reply '{}'", line.trim_end()))
                })?;

            // "250-" continues, "250 " ends the reply
            if line.as_bytes().get(3) == Some(&b'-') {
                continue;
            }
            if accepted.contains(&code) {
                return Ok(code);
            }
            return Err(LoggerError::notification(
                &self.endpoint,
                format!("unexpected reply '{}'", line.trim_end()),
            ));
        }
    }
}
