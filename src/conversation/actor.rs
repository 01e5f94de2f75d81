//! Conversation Actor - owns ConversationState
//!
//! Information Hiding:
//! - State is only touched by the actor task; the handle sends messages
//! - Backend calls run in spawned tasks that post results back to the inbox
//! - Request tasks only hold a weak sender, so dropping every handle closes
//!   the inbox
//! - Teardown cancels outstanding calls so nothing lands after shutdown

use super::messages::*;
use super::models::{Author, ChatMessage, ConversationState, DocumentRecord, UploadFailure};
use crate::config::{Settings, DEFAULT_FALLBACK_REPLY};
use crate::core::{BackendApi, ClientError, UploadFile};
use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{channel, Receiver, Sender, WeakSender};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct ConversationOptions {
    pub channel_buffer_size: usize,
    /// Assistant text used when a chat request fails.
    pub fallback_reply: String,
}

impl ConversationOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            channel_buffer_size: settings.conversation.channel_buffer_size,
            fallback_reply: settings.conversation.fallback_reply.clone(),
        }
    }
}

impl Default for ConversationOptions {
    fn default() -> Self {
        Self {
            channel_buffer_size: 32,
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ConversationHandle {
    sender: Sender<ConversationMessage>,
}

impl ConversationHandle {
    pub fn new(api: Arc<dyn BackendApi>, options: ConversationOptions) -> Self {
        let (sender, receiver) = channel(options.channel_buffer_size.max(1));
        let actor = ConversationActor::new(api, options.fallback_reply, sender.downgrade());
        tokio::spawn(actor.run(receiver));
        Self { sender }
    }

    async fn send_message(&self, message: ConversationMessage) -> Result<()> {
        self.sender
            .send(message)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send message to Conversation actor: {}", e))
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ConversationMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.send_message(build(tx)).await?;
        rx.await
            .map_err(|e| anyhow::anyhow!("Conversation actor dropped the request: {}", e))
    }

    /// Append a user message and ask the backend for a reply.
    ///
    /// Rejected without any effect when the text is blank or a reply is
    /// still outstanding.
    pub async fn submit_message(&self, text: impl Into<String>) -> Result<SubmitOutcome> {
        let text = text.into();
        self.request(|response| ConversationMessage::Submit(SubmitRequest { text, response }))
            .await
    }

    /// Upload every file concurrently. One failure never stops the others.
    pub async fn upload_files(&self, files: Vec<UploadFile>) -> Result<UploadReport> {
        self.request(|response| ConversationMessage::UploadFiles(UploadRequest { files, response }))
            .await
    }

    /// Replace the document list with the backend's. On failure the
    /// current list is kept and the error returned.
    pub async fn refresh_documents(&self) -> Result<usize> {
        let outcome = self.request(ConversationMessage::RefreshDocuments).await?;
        Ok(outcome?)
    }

    pub async fn clear_conversation(&self) -> Result<ClearReceipt> {
        self.request(ConversationMessage::ClearConversation).await
    }

    pub async fn clear_documents(&self) -> Result<ClearReceipt> {
        self.request(ConversationMessage::ClearDocuments).await
    }

    /// Returns the new visibility.
    pub async fn toggle_sidebar(&self) -> Result<bool> {
        self.request(ConversationMessage::ToggleSidebar).await
    }

    pub async fn snapshot(&self) -> Result<ConversationState> {
        self.request(ConversationMessage::GetState).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send_message(ConversationMessage::Shutdown).await
    }
}

struct InFlightChat {
    ticket: u64,
    cancel: CancellationToken,
    reply: oneshot::Sender<ChatMessage>,
}

struct PendingUpload {
    remaining: usize,
    report: UploadReport,
    response: oneshot::Sender<UploadReport>,
}

/// Post a request result back to the actor. Fails once every handle is gone.
async fn post(inbox: &WeakSender<ConversationMessage>, message: ConversationMessage) -> bool {
    match inbox.upgrade() {
        Some(sender) => sender.send(message).await.is_ok(),
        None => false,
    }
}

struct ConversationActor {
    state: ConversationState,
    api: Arc<dyn BackendApi>,
    inbox: WeakSender<ConversationMessage>,
    shutdown: CancellationToken,
    fallback_reply: String,
    in_flight: Option<InFlightChat>,
    next_message_id: u64,
    next_ticket: u64,
    // Bumped whenever documents are cleared; older upload and list results are dropped.
    generation: u64,
    uploads: HashMap<u64, PendingUpload>,
    next_batch: u64,
}

impl ConversationActor {
    fn new(
        api: Arc<dyn BackendApi>,
        fallback_reply: String,
        inbox: WeakSender<ConversationMessage>,
    ) -> Self {
        Self {
            state: ConversationState::default(),
            api,
            inbox,
            shutdown: CancellationToken::new(),
            fallback_reply,
            in_flight: None,
            next_message_id: 1,
            next_ticket: 1,
            generation: 0,
            uploads: HashMap::new(),
            next_batch: 1,
        }
    }

    async fn run(mut self, mut receiver: Receiver<ConversationMessage>) {
        tracing::info!("Conversation actor started");

        while let Some(message) = receiver.recv().await {
            if let ConversationMessage::Shutdown = message {
                tracing::info!("Conversation actor received shutdown signal");
                break;
            }
            self.handle(message);
        }

        self.shutdown.cancel();
        tracing::info!("Conversation actor stopped");
    }

    fn handle(&mut self, message: ConversationMessage) {
        match message {
            ConversationMessage::Submit(request) => self.submit(request),
            ConversationMessage::UploadFiles(request) => self.upload(request),
            ConversationMessage::RefreshDocuments(response) => self.refresh_documents(response),
            ConversationMessage::ClearConversation(response) => {
                self.cancel_in_flight_chat();
                self.state.messages.clear();
                self.state.notices.clear();
                for pending in self.uploads.values_mut() {
                    pending.report.failed.clear();
                }
                self.clear_documents(response, "conversation");
            }
            ConversationMessage::ClearDocuments(response) => {
                self.clear_documents(response, "documents");
            }
            ConversationMessage::ToggleSidebar(response) => {
                self.state.sidebar_visible = !self.state.sidebar_visible;
                let _ = response.send(self.state.sidebar_visible);
            }
            ConversationMessage::GetState(response) => {
                let _ = response.send(self.state.clone());
            }
            ConversationMessage::ChatResolved { ticket, outcome } => {
                self.chat_resolved(ticket, outcome)
            }
            ConversationMessage::UploadResolved {
                batch,
                generation,
                file_name,
                outcome,
            } => self.upload_resolved(batch, generation, file_name, outcome),
            ConversationMessage::DocumentsLoaded {
                generation,
                outcome,
                response,
            } => self.documents_loaded(generation, outcome, response),
            ConversationMessage::Shutdown => {}
        }
    }

    fn push_message(&mut self, author: Author, text: String) -> ChatMessage {
        let message = ChatMessage::new(self.next_message_id, author, text);
        self.next_message_id += 1;
        self.state.messages.push(message.clone());
        message
    }

    fn submit(&mut self, request: SubmitRequest) {
        if request.text.trim().is_empty() {
            let _ = request
                .response
                .send(SubmitOutcome::Rejected(RejectReason::EmptyMessage));
            return;
        }

        if self.state.awaiting_response {
            tracing::debug!("[ConversationActor] Ignoring submit while a reply is outstanding");
            let _ = request
                .response
                .send(SubmitOutcome::Rejected(RejectReason::AwaitingResponse));
            return;
        }

        let user_message = self.push_message(Author::User, request.text.clone());
        self.state.awaiting_response = true;

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        let cancel = self.shutdown.child_token();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.in_flight = Some(InFlightChat {
            ticket,
            cancel: cancel.clone(),
            reply: reply_tx,
        });

        let api = self.api.clone();
        let inbox = self.inbox.clone();
        let text = request.text;
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("[ConversationActor] Chat request {} cancelled", ticket);
                }
                outcome = api.send_message(&text) => {
                    post(&inbox, ConversationMessage::ChatResolved { ticket, outcome }).await;
                }
            }
        });

        let _ = request.response.send(SubmitOutcome::Accepted {
            user_message,
            reply: reply_rx,
        });
    }

    fn chat_resolved(&mut self, ticket: u64, outcome: Result<crate::core::ChatReply, ClientError>) {
        let in_flight = match self.in_flight.take() {
            Some(in_flight) if in_flight.ticket == ticket => in_flight,
            other => {
                self.in_flight = other;
                tracing::debug!("[ConversationActor] Dropping stale chat result {}", ticket);
                return;
            }
        };

        let text = match outcome {
            Ok(reply) => {
                tracing::debug!(
                    "[ConversationActor] Reply received (rag_used: {}, documents: {})",
                    reply.rag_used,
                    reply.documents_retrieved
                );
                reply.message
            }
            Err(e) => {
                tracing::warn!("[ConversationActor] Chat request failed: {}", e);
                self.fallback_reply.clone()
            }
        };

        let assistant_message = self.push_message(Author::Assistant, text);
        self.state.awaiting_response = false;
        let _ = in_flight.reply.send(assistant_message);
    }

    fn cancel_in_flight_chat(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            tracing::debug!(
                "[ConversationActor] Cancelling outstanding chat request {}",
                in_flight.ticket
            );
            in_flight.cancel.cancel();
        }
        self.state.awaiting_response = false;
    }

    fn upload(&mut self, request: UploadRequest) {
        if request.files.is_empty() {
            let _ = request.response.send(UploadReport::default());
            return;
        }

        tracing::info!(
            "[ConversationActor] Uploading {} file(s)",
            request.files.len()
        );

        let batch = self.next_batch;
        self.next_batch += 1;
        self.uploads.insert(
            batch,
            PendingUpload {
                remaining: request.files.len(),
                report: UploadReport::default(),
                response: request.response,
            },
        );

        let generation = self.generation;
        let cancel = self.shutdown.child_token();
        let api = self.api.clone();
        let inbox = self.inbox.clone();

        tokio::spawn(async move {
            let mut pending: FuturesUnordered<_> = request
                .files
                .into_iter()
                .map(|file| {
                    let api = api.clone();
                    async move {
                        let file_name = file.name.clone();
                        (file_name, api.upload_document(file).await)
                    }
                })
                .collect();

            loop {
                let next = tokio::select! {
                    _ = cancel.cancelled() => return,
                    next = pending.next() => next,
                };
                let Some((file_name, outcome)) = next else {
                    break;
                };

                let resolved = ConversationMessage::UploadResolved {
                    batch,
                    generation,
                    file_name,
                    outcome,
                };
                if !post(&inbox, resolved).await {
                    return;
                }
            }
        });
    }

    fn upload_resolved(
        &mut self,
        batch: u64,
        generation: u64,
        file_name: String,
        outcome: Result<crate::core::DocumentDescriptor, ClientError>,
    ) {
        let Some(pending) = self.uploads.get_mut(&batch) else {
            return;
        };
        pending.remaining -= 1;

        if generation != self.generation {
            tracing::debug!(
                "[ConversationActor] Dropping upload result for '{}' from before a clear",
                file_name
            );
        } else {
            match outcome {
                Ok(descriptor) => {
                    tracing::info!("[ConversationActor] Uploaded '{}'", descriptor.name);
                    let record = DocumentRecord::from(descriptor);
                    pending.report.uploaded.push(record.clone());
                    self.state.documents.push(record);
                }
                Err(e) => {
                    tracing::warn!("[ConversationActor] Upload of '{}' failed: {}", file_name, e);
                    let failure = UploadFailure {
                        file_name,
                        reason: e.to_string(),
                    };
                    pending.report.failed.push(failure.clone());
                    self.state.notices.push(failure);
                }
            }
        }

        if pending.remaining == 0 {
            if let Some(finished) = self.uploads.remove(&batch) {
                let _ = finished.response.send(finished.report);
            }
        }
    }

    fn refresh_documents(&mut self, response: oneshot::Sender<Result<usize, ClientError>>) {
        let generation = self.generation;
        let cancel = self.shutdown.child_token();
        let api = self.api.clone();
        let inbox = self.inbox.clone();

        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return,
                outcome = api.list_documents() => outcome,
            };
            post(
                &inbox,
                ConversationMessage::DocumentsLoaded {
                    generation,
                    outcome,
                    response,
                },
            )
            .await;
        });
    }

    fn documents_loaded(
        &mut self,
        generation: u64,
        outcome: Result<Vec<crate::core::DocumentDescriptor>, ClientError>,
        response: oneshot::Sender<Result<usize, ClientError>>,
    ) {
        if generation != self.generation {
            tracing::debug!("[ConversationActor] Dropping document list from before a clear");
            let _ = response.send(Ok(self.state.documents.len()));
            return;
        }

        match outcome {
            Ok(descriptors) => {
                self.state.documents = descriptors.iter().map(DocumentRecord::from).collect();
                tracing::debug!(
                    "[ConversationActor] Loaded {} documents",
                    self.state.documents.len()
                );
                let _ = response.send(Ok(self.state.documents.len()));
            }
            Err(e) => {
                tracing::warn!("[ConversationActor] Failed to load documents: {}", e);
                let _ = response.send(Err(e));
            }
        }
    }

    /// Clears locally first, then tells the backend. A backend failure is
    /// logged and reported on the receipt; local state stays cleared.
    fn clear_documents(&mut self, response: oneshot::Sender<ClearReceipt>, scope: &'static str) {
        self.state.documents.clear();
        self.generation += 1;
        for pending in self.uploads.values_mut() {
            pending.report.uploaded.clear();
        }

        let (backend_tx, backend_rx) = oneshot::channel();
        let cancel = self.shutdown.child_token();
        let api = self.api.clone();

        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return,
                outcome = api.clear_session() => outcome,
            };
            if let Err(e) = &outcome {
                tracing::warn!(
                    "[ConversationActor] Backend clear after {} reset failed, local state stays cleared: {}",
                    scope,
                    e
                );
            }
            let _ = backend_tx.send(outcome);
        });

        let _ = response.send(ClearReceipt {
            backend: backend_rx,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChatReply, DocumentDescriptor, HealthStatus};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    struct MockBackend {
        chat_reply: Option<String>,
        chat_gate: Semaphore,
        chat_calls: AtomicUsize,
        sent: Mutex<Vec<String>>,
        failing_uploads: Vec<String>,
        upload_gate: Semaphore,
        upload_calls: AtomicUsize,
        documents: Mutex<Vec<DocumentDescriptor>>,
        list_fails: bool,
        list_gate: Semaphore,
        list_calls: AtomicUsize,
        clear_fails: bool,
        clear_gate: Semaphore,
        clear_calls: AtomicUsize,
    }

    impl MockBackend {
        fn new() -> Self {
            Self {
                chat_reply: Some("Here is what the documents say.".to_string()),
                chat_gate: Semaphore::new(Semaphore::MAX_PERMITS),
                chat_calls: AtomicUsize::new(0),
                sent: Mutex::new(Vec::new()),
                failing_uploads: Vec::new(),
                upload_gate: Semaphore::new(Semaphore::MAX_PERMITS),
                upload_calls: AtomicUsize::new(0),
                documents: Mutex::new(Vec::new()),
                list_fails: false,
                list_gate: Semaphore::new(Semaphore::MAX_PERMITS),
                list_calls: AtomicUsize::new(0),
                clear_fails: false,
                clear_gate: Semaphore::new(Semaphore::MAX_PERMITS),
                clear_calls: AtomicUsize::new(0),
            }
        }

        fn with_gated_chat(mut self) -> Self {
            self.chat_gate = Semaphore::new(0);
            self
        }

        fn with_failing_chat(mut self) -> Self {
            self.chat_reply = None;
            self
        }

        fn with_failing_upload(mut self, name: &str) -> Self {
            self.failing_uploads.push(name.to_string());
            self
        }

        /// Successful uploads wait for a permit; failing ones answer at once.
        fn with_gated_uploads(mut self) -> Self {
            self.upload_gate = Semaphore::new(0);
            self
        }

        fn with_gated_list(mut self) -> Self {
            self.list_gate = Semaphore::new(0);
            self
        }

        fn with_stored_document(self, name: &str) -> Self {
            self.documents.lock().unwrap().push(DocumentDescriptor {
                id: format!("doc-{}", name),
                name: name.to_string(),
                size: 2048,
                uploaded_at: 1_700_000_000,
                chunks: Some(2),
            });
            self
        }

        fn with_failing_list(mut self) -> Self {
            self.list_fails = true;
            self
        }

        fn with_failing_clear(mut self) -> Self {
            self.clear_fails = true;
            self
        }

        fn with_gated_clear(mut self) -> Self {
            self.clear_gate = Semaphore::new(0);
            self
        }
    }

    #[async_trait]
    impl BackendApi for MockBackend {
        async fn send_message(&self, text: &str) -> Result<ChatReply, ClientError> {
            self.chat_calls.fetch_add(1, Ordering::SeqCst);
            self.sent.lock().unwrap().push(text.to_string());
            self.chat_gate.acquire().await.unwrap().forget();

            match &self.chat_reply {
                Some(message) => Ok(ChatReply {
                    message: message.clone(),
                    rag_used: false,
                    documents_retrieved: 0,
                }),
                None => Err(ClientError::Application("model unavailable".to_string())),
            }
        }

        async fn upload_document(
            &self,
            file: UploadFile,
        ) -> Result<DocumentDescriptor, ClientError> {
            self.upload_calls.fetch_add(1, Ordering::SeqCst);
            if self.failing_uploads.contains(&file.name) {
                return Err(ClientError::Application(
                    "No text extracted from file".to_string(),
                ));
            }
            self.upload_gate.acquire().await.unwrap().forget();

            let descriptor = DocumentDescriptor {
                id: format!("doc-{}", file.name),
                name: file.name,
                size: file.bytes.len() as u64,
                uploaded_at: 1_700_000_000,
                chunks: Some(1),
            };
            self.documents.lock().unwrap().push(descriptor.clone());
            Ok(descriptor)
        }

        async fn list_documents(&self) -> Result<Vec<DocumentDescriptor>, ClientError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.list_gate.acquire().await.unwrap().forget();
            if self.list_fails {
                return Err(ClientError::Application("collection missing".to_string()));
            }
            Ok(self.documents.lock().unwrap().clone())
        }

        async fn clear_session(&self) -> Result<(), ClientError> {
            self.clear_calls.fetch_add(1, Ordering::SeqCst);
            self.clear_gate.acquire().await.unwrap().forget();

            if self.clear_fails {
                return Err(ClientError::Application("vector store locked".to_string()));
            }
            self.documents.lock().unwrap().clear();
            Ok(())
        }

        async fn health_check(&self) -> Result<HealthStatus, ClientError> {
            Ok(HealthStatus::default())
        }
    }

    fn spawn(backend: MockBackend) -> (ConversationHandle, Arc<MockBackend>) {
        let backend = Arc::new(backend);
        let handle = ConversationHandle::new(backend.clone(), ConversationOptions::default());
        (handle, backend)
    }

    async fn wait_for_calls(calls: &AtomicUsize, expected: usize) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while calls.load(Ordering::SeqCst) < expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("backend call was never made");
    }

    async fn accepted(handle: &ConversationHandle, text: &str) -> oneshot::Receiver<ChatMessage> {
        match handle.submit_message(text).await.unwrap() {
            SubmitOutcome::Accepted { reply, .. } => reply,
            SubmitOutcome::Rejected(reason) => panic!("submit rejected: {:?}", reason),
        }
    }

    #[tokio::test]
    async fn test_hello_round_trip() {
        let (handle, _) = spawn(MockBackend::new());

        let reply = accepted(&handle, "hello").await;
        let assistant = reply.await.unwrap();
        assert_eq!(assistant.text, "Here is what the documents say.");

        let state = handle.snapshot().await.unwrap();
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].author, Author::User);
        assert_eq!(state.messages[0].text, "hello");
        assert_eq!(state.messages[1].author, Author::Assistant);
        assert!(state.messages[0].id < state.messages[1].id);
        assert!(!state.awaiting_response);
    }

    #[tokio::test]
    async fn test_failed_chat_uses_fallback_reply() {
        let (handle, _) = spawn(MockBackend::new().with_failing_chat());

        let assistant = accepted(&handle, "hello").await.await.unwrap();
        assert_eq!(assistant.text, DEFAULT_FALLBACK_REPLY);

        let state = handle.snapshot().await.unwrap();
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[1].text, DEFAULT_FALLBACK_REPLY);
        assert!(!state.awaiting_response);
    }

    #[tokio::test]
    async fn test_blank_message_rejected() {
        let (handle, backend) = spawn(MockBackend::new());

        let outcome = handle.submit_message("  \n\t ").await.unwrap();
        assert!(matches!(
            outcome,
            SubmitOutcome::Rejected(RejectReason::EmptyMessage)
        ));

        let state = handle.snapshot().await.unwrap();
        assert!(state.messages.is_empty());
        assert_eq!(backend.chat_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_submit_ignored_while_awaiting() {
        let (handle, backend) = spawn(MockBackend::new().with_gated_chat());

        let reply = accepted(&handle, "first").await;

        let state = handle.snapshot().await.unwrap();
        assert!(state.awaiting_response);
        assert_eq!(state.messages.len(), 1);

        let outcome = handle.submit_message("second").await.unwrap();
        assert!(matches!(
            outcome,
            SubmitOutcome::Rejected(RejectReason::AwaitingResponse)
        ));
        assert_eq!(handle.snapshot().await.unwrap().messages.len(), 1);

        backend.chat_gate.add_permits(1);
        reply.await.unwrap();

        let state = handle.snapshot().await.unwrap();
        assert_eq!(state.messages.len(), 2);
        assert!(!state.awaiting_response);
        assert_eq!(backend.chat_calls.load(Ordering::SeqCst), 1);
        assert_eq!(*backend.sent.lock().unwrap(), vec!["first".to_string()]);

        // Idle again: the next submit goes through.
        backend.chat_gate.add_permits(1);
        accepted(&handle, "second").await.await.unwrap();
        assert_eq!(backend.chat_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_upload_failure_does_not_block_siblings() {
        let (handle, backend) = spawn(
            MockBackend::new()
                .with_failing_upload("a.txt")
                .with_gated_uploads(),
        );

        let uploader = handle.clone();
        let batch = tokio::spawn(async move {
            uploader
                .upload_files(vec![
                    UploadFile::new("b.txt", vec![0; 1536]),
                    UploadFile::new("a.txt", b"alpha".to_vec()),
                ])
                .await
        });

        // The failure lands while b.txt is still in flight.
        tokio::time::timeout(Duration::from_secs(1), async {
            while handle.snapshot().await.unwrap().notices.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert!(handle.snapshot().await.unwrap().documents.is_empty());

        backend.upload_gate.add_permits(1);
        let report = batch.await.unwrap().unwrap();

        assert_eq!(report.uploaded.len(), 1);
        assert_eq!(report.uploaded[0].name, "b.txt");
        assert_eq!(report.uploaded[0].size, "1.5 KB");
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].file_name, "a.txt");

        let state = handle.snapshot().await.unwrap();
        assert_eq!(state.documents, report.uploaded);
        assert_eq!(state.notices, report.failed);
    }

    #[tokio::test]
    async fn test_empty_file_size_label() {
        let (handle, _) = spawn(MockBackend::new());

        let report = handle
            .upload_files(vec![UploadFile::new("empty.txt", Vec::new())])
            .await
            .unwrap();

        assert_eq!(report.uploaded[0].size, "0 Bytes");
    }

    #[tokio::test]
    async fn test_uploaded_record_matches_listed_record() {
        let (handle, _) = spawn(MockBackend::new());

        let report = handle
            .upload_files(vec![UploadFile::new("guide.pdf", vec![7; 4096])])
            .await
            .unwrap();

        let count = handle.refresh_documents().await.unwrap();
        assert_eq!(count, 1);

        let state = handle.snapshot().await.unwrap();
        assert_eq!(state.documents, report.uploaded);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_documents() {
        let (handle, _) = spawn(MockBackend::new().with_failing_list());

        handle
            .upload_files(vec![UploadFile::new("kept.txt", b"text".to_vec())])
            .await
            .unwrap();

        assert!(handle.refresh_documents().await.is_err());
        assert_eq!(handle.snapshot().await.unwrap().documents.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_is_immediate_and_survives_backend_failure() {
        let (handle, backend) = spawn(
            MockBackend::new()
                .with_failing_clear()
                .with_gated_clear()
                .with_failing_upload("bad.txt"),
        );

        accepted(&handle, "hello").await.await.unwrap();
        handle
            .upload_files(vec![
                UploadFile::new("doc.txt", b"content".to_vec()),
                UploadFile::new("bad.txt", b"content".to_vec()),
            ])
            .await
            .unwrap();

        let receipt = handle.clear_conversation().await.unwrap();

        // Backend has not answered yet.
        let state = handle.snapshot().await.unwrap();
        assert!(state.messages.is_empty());
        assert!(state.documents.is_empty());
        assert!(state.notices.is_empty());
        assert!(state.is_landing());

        backend.clear_gate.add_permits(1);
        assert!(receipt.backend.await.unwrap().is_err());
        assert_eq!(backend.clear_calls.load(Ordering::SeqCst), 1);

        let state = handle.snapshot().await.unwrap();
        assert!(state.messages.is_empty());
        assert!(state.documents.is_empty());
    }

    #[tokio::test]
    async fn test_clear_cancels_outstanding_chat() {
        let (handle, backend) = spawn(MockBackend::new().with_gated_chat());

        let reply = accepted(&handle, "slow question").await;
        let receipt = handle.clear_conversation().await.unwrap();
        receipt.backend.await.unwrap().unwrap();

        assert!(reply.await.is_err());
        let state = handle.snapshot().await.unwrap();
        assert!(state.messages.is_empty());
        assert!(!state.awaiting_response);

        backend.chat_gate.add_permits(1);
        accepted(&handle, "next question").await.await.unwrap();
        assert_eq!(handle.snapshot().await.unwrap().messages.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_documents_keeps_messages() {
        let (handle, backend) = spawn(MockBackend::new());

        accepted(&handle, "hello").await.await.unwrap();
        handle
            .upload_files(vec![UploadFile::new("doc.txt", b"content".to_vec())])
            .await
            .unwrap();

        let receipt = handle.clear_documents().await.unwrap();
        let state = handle.snapshot().await.unwrap();
        assert!(state.documents.is_empty());
        assert_eq!(state.messages.len(), 2);

        receipt.backend.await.unwrap().unwrap();
        assert_eq!(backend.clear_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_upload_finishing_after_clear_is_discarded() {
        let (handle, backend) = spawn(MockBackend::new().with_gated_uploads());

        let uploader = handle.clone();
        let batch = tokio::spawn(async move {
            uploader
                .upload_files(vec![UploadFile::new("late.txt", b"content".to_vec())])
                .await
        });
        wait_for_calls(&backend.upload_calls, 1).await;

        handle.clear_conversation().await.unwrap();
        backend.upload_gate.add_permits(1);
        let report = batch.await.unwrap().unwrap();

        let state = handle.snapshot().await.unwrap();
        assert!(report.uploaded.is_empty());
        assert!(state.documents.is_empty());
        assert_eq!(state.documents, report.uploaded);
    }

    #[tokio::test]
    async fn test_upload_report_drops_records_cleared_mid_batch() {
        let (handle, backend) = spawn(
            MockBackend::new()
                .with_failing_upload("bad.txt")
                .with_gated_uploads(),
        );

        let uploader = handle.clone();
        let batch = tokio::spawn(async move {
            uploader
                .upload_files(vec![
                    UploadFile::new("first.txt", b"one".to_vec()),
                    UploadFile::new("bad.txt", b"two".to_vec()),
                    UploadFile::new("second.txt", b"three".to_vec()),
                ])
                .await
        });
        wait_for_calls(&backend.upload_calls, 3).await;

        // first.txt lands, then documents are cleared, then second.txt lands.
        backend.upload_gate.add_permits(1);
        tokio::time::timeout(Duration::from_secs(1), async {
            while handle.snapshot().await.unwrap().documents.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        handle.clear_documents().await.unwrap();
        backend.upload_gate.add_permits(1);

        let report = batch.await.unwrap().unwrap();
        let state = handle.snapshot().await.unwrap();

        assert!(state.documents.is_empty());
        assert_eq!(state.documents, report.uploaded);
        // clear_documents keeps notices, so the failure is still reported.
        assert_eq!(state.notices, report.failed);
        assert_eq!(report.failed.len(), 1);
    }

    #[tokio::test]
    async fn test_document_list_from_before_clear_is_discarded() {
        let (handle, backend) = spawn(
            MockBackend::new()
                .with_stored_document("old.pdf")
                .with_gated_list()
                .with_gated_clear(),
        );

        let refresher = handle.clone();
        let refresh = tokio::spawn(async move { refresher.refresh_documents().await });
        wait_for_calls(&backend.list_calls, 1).await;

        handle.clear_documents().await.unwrap();
        backend.list_gate.add_permits(1);

        assert_eq!(refresh.await.unwrap().unwrap(), 0);
        assert!(handle.snapshot().await.unwrap().documents.is_empty());

        backend.clear_gate.add_permits(1);
    }

    #[tokio::test]
    async fn test_toggle_sidebar() {
        let (handle, _) = spawn(MockBackend::new());

        assert!(!handle.snapshot().await.unwrap().sidebar_visible);
        assert!(handle.toggle_sidebar().await.unwrap());
        assert!(!handle.toggle_sidebar().await.unwrap());
    }

    #[tokio::test]
    async fn test_shutdown_cancels_outstanding_chat() {
        let (handle, backend) = spawn(MockBackend::new().with_gated_chat());

        let reply = accepted(&handle, "hello").await;
        handle.shutdown().await.unwrap();

        assert!(reply.await.is_err());
        assert!(handle.snapshot().await.is_err());

        backend.chat_gate.add_permits(1);
    }

    #[tokio::test]
    async fn test_dropping_every_handle_cancels_outstanding_chat() {
        let (handle, backend) = spawn(MockBackend::new().with_gated_chat());

        let reply = accepted(&handle, "hello").await;
        wait_for_calls(&backend.chat_calls, 1).await;
        drop(handle);

        // Actor and request task both release their backend once torn down.
        tokio::time::timeout(Duration::from_secs(1), async {
            while Arc::strong_count(&backend) > 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("request still running after every handle was dropped");

        assert!(reply.await.is_err());
    }
}
