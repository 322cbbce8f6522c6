use super::{DispatchError, DispatchReceipt, ReportDispatcher, ReportEnvelope};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

const MANIFEST_FILE: &str = "envelope.json";

/// Stages each envelope as a directory a mail relay can pick up: the
/// attachments side by side with an `envelope.json` manifest.
#[derive(Debug, Clone)]
pub struct OutboxDispatcher {
    root: PathBuf,
}

impl OutboxDispatcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn reserve_directory(&self, stem: &str) -> Result<PathBuf, DispatchError> {
        std::fs::create_dir_all(&self.root)?;
        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                stem.to_string()
            } else {
                format!("{stem}-{attempt}")
            };
            let candidate = self.root.join(name);
            match std::fs::create_dir(&candidate) {
                Ok(()) => return Ok(candidate),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(err) => return Err(err.into()),
            }
        }
    }
}

#[derive(Serialize)]
struct Manifest<'a> {
    sender: &'a str,
    recipients: &'a [String],
    subject: &'a str,
    body: &'a str,
    queued_at: String,
    attachments: Vec<ManifestAttachment<'a>>,
}

#[derive(Serialize)]
struct ManifestAttachment<'a> {
    file_name: String,
    content_type: &'a str,
    size_bytes: usize,
}

impl ReportDispatcher for OutboxDispatcher {
    fn dispatch(&self, envelope: &ReportEnvelope) -> Result<DispatchReceipt, DispatchError> {
        if envelope.recipients.is_empty() {
            return Err(DispatchError::NoRecipients);
        }

        let queued_at = Utc::now();
        let stem = format!(
            "{}-{}",
            queued_at.format("%Y%m%dT%H%M%S%3fZ"),
            slugify(&envelope.subject)
        );
        let directory = self.reserve_directory(&stem)?;

        let mut attachments = Vec::with_capacity(envelope.attachments.len());
        let mut taken = HashSet::new();
        for attachment in &envelope.attachments {
            let file_name = unique_file_name(safe_file_name(&attachment.file_name)?, &mut taken);
            std::fs::write(directory.join(&file_name), &attachment.bytes)?;
            attachments.push(ManifestAttachment {
                file_name,
                content_type: &attachment.content_type,
                size_bytes: attachment.bytes.len(),
            });
        }

        let manifest = Manifest {
            sender: &envelope.sender,
            recipients: &envelope.recipients,
            subject: &envelope.subject,
            body: &envelope.body,
            queued_at: queued_at.to_rfc3339(),
            attachments,
        };
        let encoded = serde_json::to_vec_pretty(&manifest)?;
        std::fs::write(directory.join(MANIFEST_FILE), encoded)?;

        info!(
            location = %directory.display(),
            recipients = envelope.recipients.len(),
            "impact report staged in outbox"
        );

        Ok(DispatchReceipt {
            location: directory.display().to_string(),
            queued_at,
        })
    }
}

fn safe_file_name(name: &str) -> Result<String, DispatchError> {
    Path::new(name)
        .file_name()
        .map(|value| value.to_string_lossy().into_owned())
        .filter(|value| value != MANIFEST_FILE)
        .ok_or_else(|| DispatchError::InvalidAttachment(name.to_string()))
}

/// Suffixes repeated names as `name-1.ext`, `name-2.ext`, ... so no
/// attachment overwrites an earlier one. Comparison ignores case.
fn unique_file_name(name: String, taken: &mut HashSet<String>) -> String {
    if taken.insert(name.to_lowercase()) {
        return name;
    }

    let path = Path::new(&name);
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1u32;
    loop {
        let candidate = format!("{stem}-{counter}{extension}");
        if candidate != MANIFEST_FILE && taken.insert(candidate.to_lowercase()) {
            return candidate;
        }
        counter += 1;
    }
}

fn slugify(value: &str) -> String {
    let slug = value
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        "report".to_string()
    } else {
        slug
    }
}
