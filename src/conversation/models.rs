use crate::core::DocumentDescriptor;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub text: String,
    pub author: Author,
    /// Local wall-clock time, `HH:MM`.
    pub timestamp: String,
}

impl ChatMessage {
    pub fn new(id: u64, author: Author, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            author,
            timestamp: Local::now().format("%H:%M").to_string(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.author == Author::User
    }
}

/// A document as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub name: String,
    pub size: String,
    pub uploaded_at: String,
}

impl From<&DocumentDescriptor> for DocumentRecord {
    fn from(descriptor: &DocumentDescriptor) -> Self {
        Self {
            id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            size: format_file_size(descriptor.size),
            uploaded_at: format_upload_date(descriptor.uploaded_at),
        }
    }
}

impl From<DocumentDescriptor> for DocumentRecord {
    fn from(descriptor: DocumentDescriptor) -> Self {
        DocumentRecord::from(&descriptor)
    }
}

/// A file that could not be uploaded, kept until the next clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFailure {
    pub file_name: String,
    pub reason: String,
}

impl std::fmt::Display for UploadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to upload {}: {}", self.file_name, self.reason)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub messages: Vec<ChatMessage>,
    pub documents: Vec<DocumentRecord>,
    pub notices: Vec<UploadFailure>,
    pub awaiting_response: bool,
    pub sidebar_visible: bool,
}

impl ConversationState {
    /// Nothing said yet: the landing view with suggestions is shown.
    pub fn is_landing(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn document_summary(&self) -> String {
        match self.documents.len() {
            0 => "No documents loaded".to_string(),
            1 => "1 document loaded".to_string(),
            n => format!("{} documents loaded", n),
        }
    }
}

/// Human-readable byte count: `0 Bytes`, `1.5 KB`, `2 MB`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rendered = format!("{:.2}", value);
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", rendered, SIZE_UNITS[unit])
}

/// Epoch seconds to a local `YYYY-MM-DD`.
pub fn format_upload_date(epoch_seconds: i64) -> String {
    match DateTime::from_timestamp(epoch_seconds, 0) {
        Some(utc) => utc.with_timezone(&Local).format("%Y-%m-%d").to_string(),
        None => "unknown".to_string(),
    }
}
