use super::{DispatchError, DispatchReceipt, ReportDispatcher, ReportEnvelope};
use chrono::Utc;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::fmt;
use tracing::info;

/// Relay settings for sending reports over SMTP with STARTTLS.
#[derive(Clone, PartialEq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl SmtpConfig {
    pub const DEFAULT_PORT: u16 = 587;

    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            username: None,
            password: None,
        }
    }

    fn credentials(&self) -> Option<Credentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => {
                Some(Credentials::new(username.clone(), password.clone()))
            }
            _ => None,
        }
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Sends each envelope as one multipart message through the configured relay.
#[derive(Debug, Clone)]
pub struct SmtpDispatcher {
    config: SmtpConfig,
}

impl SmtpDispatcher {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    /// Builds the MIME message: plain-text body first, then every attachment.
    pub fn build_message(&self, envelope: &ReportEnvelope) -> Result<Message, DispatchError> {
        if envelope.recipients.is_empty() {
            return Err(DispatchError::NoRecipients);
        }

        let mut builder = Message::builder()
            .from(parse_mailbox(&envelope.sender)?)
            .subject(envelope.subject.clone());
        for recipient in &envelope.recipients {
            builder = builder.to(parse_mailbox(recipient)?);
        }

        let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(envelope.body.clone()));
        for attachment in &envelope.attachments {
            let content_type = ContentType::parse(&attachment.content_type).map_err(|err| {
                DispatchError::InvalidMessage(format!(
                    "content type '{}' of {}: {err}",
                    attachment.content_type, attachment.file_name
                ))
            })?;
            parts = parts.singlepart(
                Attachment::new(attachment.file_name.clone())
                    .body(attachment.bytes.clone(), content_type),
            );
        }

        builder
            .multipart(parts)
            .map_err(|err| DispatchError::InvalidMessage(err.to_string()))
    }

    fn transport(&self) -> Result<SmtpTransport, DispatchError> {
        let mut builder = SmtpTransport::starttls_relay(&self.config.host)
            .map_err(|err| DispatchError::Transport(err.to_string()))?
            .port(self.config.port);
        if let Some(credentials) = self.config.credentials() {
            builder = builder.credentials(credentials);
        }
        Ok(builder.build())
    }
}

impl ReportDispatcher for SmtpDispatcher {
    fn dispatch(&self, envelope: &ReportEnvelope) -> Result<DispatchReceipt, DispatchError> {
        let message = self.build_message(envelope)?;
        self.transport()?
            .send(&message)
            .map_err(|err| DispatchError::Transport(err.to_string()))?;

        let location = format!("smtp://{}:{}", self.config.host, self.config.port);
        info!(
            relay = %location,
            recipients = envelope.recipients.len(),
            attachments = envelope.attachments.len(),
            "impact report sent"
        );

        Ok(DispatchReceipt {
            location,
            queued_at: Utc::now(),
        })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DispatchError> {
    address
        .parse::<Mailbox>()
        .map_err(|err| DispatchError::InvalidMessage(format!("address '{address}': {err}")))
}
