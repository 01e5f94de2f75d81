use super::models::{ChatMessage, ConversationState, DocumentRecord, UploadFailure};
use crate::core::{ChatReply, ClientError, DocumentDescriptor, UploadFile};
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum ConversationMessage {
    Submit(SubmitRequest),
    UploadFiles(UploadRequest),
    RefreshDocuments(oneshot::Sender<Result<usize, ClientError>>),
    ClearConversation(oneshot::Sender<ClearReceipt>),
    ClearDocuments(oneshot::Sender<ClearReceipt>),
    ToggleSidebar(oneshot::Sender<bool>),
    GetState(oneshot::Sender<ConversationState>),
    Shutdown,

    // Posted back by the actor's own request tasks.
    ChatResolved {
        ticket: u64,
        outcome: Result<ChatReply, ClientError>,
    },
    UploadResolved {
        batch: u64,
        generation: u64,
        file_name: String,
        outcome: Result<DocumentDescriptor, ClientError>,
    },
    DocumentsLoaded {
        generation: u64,
        outcome: Result<Vec<DocumentDescriptor>, ClientError>,
        response: oneshot::Sender<Result<usize, ClientError>>,
    },
}

#[derive(Debug)]
pub struct SubmitRequest {
    pub text: String,
    pub response: oneshot::Sender<SubmitOutcome>,
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// The user message was appended; the assistant message arrives on the receiver.
    Accepted {
        user_message: ChatMessage,
        reply: oneshot::Receiver<ChatMessage>,
    },
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    EmptyMessage,
    AwaitingResponse,
}

#[derive(Debug)]
pub struct UploadRequest {
    pub files: Vec<UploadFile>,
    pub response: oneshot::Sender<UploadReport>,
}

/// Outcome of one upload batch, in completion order. Only results that
/// reached the document list (or the notices) are listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub uploaded: Vec<DocumentRecord>,
    pub failed: Vec<UploadFailure>,
}

/// Returned once local state is already cleared. The backend's answer
/// arrives on `backend` and may be ignored.
#[derive(Debug)]
pub struct ClearReceipt {
    pub backend: oneshot::Receiver<Result<(), ClientError>>,
}
