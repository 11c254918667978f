// SPDX-License-Identifier: Apache-2.0

//! Outgoing account e-mail (confirmation and password-reset links).

use async_trait::async_trait;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailKind {
    ConfirmEmail,
    PasswordReset,
}

impl MailKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfirmEmail => "confirm_email",
            Self::PasswordReset => "password_reset",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub kind: MailKind,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailError(pub String);

impl Display for MailError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for MailError {}

#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    fn backend_tag(&self) -> &'static str {
        "unknown"
    }

    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Writes mail to the log instead of delivering it.
#[derive(Debug, Default)]
pub struct LoggingMailer;

#[async_trait]
impl Mailer for LoggingMailer {
    fn backend_tag(&self) -> &'static str {
        "log"
    }

    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        tracing::info!(to = %mail.to, kind = mail.kind.as_str(), "mail queued");
        tracing::debug!(to = %mail.to, link = %mail.link, "mail link");
        Ok(())
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl RecordingMailer {
    #[must_use]
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Token carried by the newest link of `kind` sent to `to`.
    #[must_use]
    pub fn last_token(&self, to: &str, kind: MailKind) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|m| m.to == to && m.kind == kind)
            .and_then(|m| {
                m.link
                    .split_once("token=")
                    .map(|(_, token)| token.to_string())
            })
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        self.sent
            .lock()
            .map_err(|_| MailError("mail outbox poisoned".to_string()))?
            .push(mail);
        Ok(())
    }
}
