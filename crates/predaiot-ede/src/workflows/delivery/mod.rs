mod outbox;
mod smtp;

pub use outbox::OutboxDispatcher;
pub use smtp::{SmtpConfig, SmtpDispatcher};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// Addressing and subject line for outgoing impact reports.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryConfig {
    pub sender: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub outbox_dir: PathBuf,
    /// Relay used instead of the outbox when set.
    pub smtp: Option<SmtpConfig>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            sender: "reports@predaiot.local".to_string(),
            recipients: Vec::new(),
            subject: "PredAIoT + EDE impact report".to_string(),
            outbox_dir: PathBuf::from("outbox"),
            smtp: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportAttachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ReportAttachment {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, DispatchError> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| DispatchError::InvalidAttachment(path.display().to_string()))?;
        let bytes = std::fs::read(path)?;
        Ok(Self::new(file_name, bytes))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportEnvelope {
    pub sender: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<ReportAttachment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchReceipt {
    pub location: String,
    pub queued_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("report envelope has no recipients")]
    NoRecipients,
    #[error("invalid attachment path '{0}'")]
    InvalidAttachment(String),
    #[error("failed to stage report: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode report manifest: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid report message: {0}")]
    InvalidMessage(String),
    #[error("report transport failed: {0}")]
    Transport(String),
}

/// Hands a finished report to whatever channel carries it to recipients.
pub trait ReportDispatcher: Debug + Send + Sync {
    fn dispatch(&self, envelope: &ReportEnvelope) -> Result<DispatchReceipt, DispatchError>;
}
