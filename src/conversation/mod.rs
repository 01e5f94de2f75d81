//! Conversation View Model
//!
//! `ConversationHandle` is the only way in: it talks to an actor task
//! that owns the messages, documents and UI flags, so every state change
//! happens in one place and in arrival order.

pub mod actor;
pub mod messages;
pub mod models;

pub use actor::{ConversationHandle, ConversationOptions};
pub use messages::{ClearReceipt, RejectReason, SubmitOutcome, UploadReport};
pub use models::{
    format_file_size, format_upload_date, Author, ChatMessage, ConversationState, DocumentRecord,
    UploadFailure,
};

/// Shown on the landing view when nothing has been said yet.
pub const SUGGESTED_QUESTIONS: [&str; 4] = [
    "What is this document mainly about?",
    "Can you summarize the key points?",
    "What are the main topics covered?",
    "Are there any recommendations?",
];
