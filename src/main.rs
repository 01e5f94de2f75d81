use anyhow::{Context, Result};
use clap::Parser;
use ragchat::cli::{Cli, Commands};
use ragchat::conversation::{
    ConversationHandle, ConversationOptions, DocumentRecord, RejectReason, SubmitOutcome,
    SUGGESTED_QUESTIONS,
};
use ragchat::core::{BackendApi, SessionClient, UploadFile};
use ragchat::storage::{FileSystemStorage, InMemoryStorage, LocalStorage, SessionIdentity};
use ragchat::{utils, Settings};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut settings = Settings::new().context("Failed to load configuration")?;
    if let Some(api_url) = cli.api_url.clone() {
        settings.backend.api_url = api_url;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let storage: Arc<dyn LocalStorage> = if cli.ephemeral {
        Arc::new(InMemoryStorage::new())
    } else {
        Arc::new(FileSystemStorage::new(settings.storage_dir()).await?)
    };

    if let Commands::Session { reset } = cli.command {
        return handle_session(storage, reset).await;
    }

    let client = Arc::new(ragchat::connect(&settings, storage).await?);

    match cli.command {
        Commands::Chat { message } => handle_chat(client, &settings, message).await,
        Commands::Interactive => handle_interactive(client, &settings).await,
        Commands::Upload { files } => handle_upload(client, &settings, files).await,
        Commands::Documents => handle_documents(client).await,
        Commands::Clear => handle_clear(client).await,
        Commands::Health { watch } => handle_health(client, watch).await,
        Commands::Session { .. } => Ok(()),
    }
}

fn open_conversation(client: Arc<SessionClient>, settings: &Settings) -> ConversationHandle {
    ConversationHandle::new(client, ConversationOptions::from_settings(settings))
}

async fn handle_session(storage: Arc<dyn LocalStorage>, reset: bool) -> Result<()> {
    let identity = SessionIdentity::new(storage);
    if reset {
        identity.reset().await?;
        utils::print_info("Started a new session");
    }

    let session_id = identity.get_or_create().await?;
    println!("{}", session_id);
    Ok(())
}

async fn handle_chat(
    client: Arc<SessionClient>,
    settings: &Settings,
    message: String,
) -> Result<()> {
    let conversation = open_conversation(client, settings);
    utils::print_info("Sending request...");

    match conversation.submit_message(message).await? {
        SubmitOutcome::Accepted { reply, .. } => {
            let assistant = reply.await.context("Chat request was cancelled")?;
            println!("\n{}", assistant.text);
        }
        SubmitOutcome::Rejected(_) => {
            utils::print_error("Message is empty, nothing to send");
        }
    }

    conversation.shutdown().await
}

/// Read each path; unreadable files become notices instead of aborting the batch.
async fn read_upload_files(paths: &[PathBuf]) -> Vec<UploadFile> {
    let mut files = Vec::with_capacity(paths.len());

    for path in paths {
        let name = upload_name(path);
        match tokio::fs::read(path).await {
            Ok(bytes) => files.push(UploadFile::new(name, bytes)),
            Err(e) => {
                tracing::warn!("Failed to read {:?}: {}", path, e);
                utils::print_error(&format!("Failed to upload {}: {}", name, e));
            }
        }
    }

    files
}

fn upload_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

async fn upload_and_report(conversation: &ConversationHandle, paths: &[PathBuf]) -> Result<()> {
    let files = read_upload_files(paths).await;
    if files.is_empty() {
        return Ok(());
    }

    let report = conversation.upload_files(files).await?;
    for document in &report.uploaded {
        utils::print_success(&format!("Uploaded {}", utils::document_line(document)));
    }
    for failure in &report.failed {
        utils::print_notice(failure);
    }

    Ok(())
}

async fn handle_upload(
    client: Arc<SessionClient>,
    settings: &Settings,
    paths: Vec<PathBuf>,
) -> Result<()> {
    let conversation = open_conversation(client, settings);
    upload_and_report(&conversation, &paths).await?;
    conversation.shutdown().await
}

async fn handle_documents(client: Arc<SessionClient>) -> Result<()> {
    match client.list_documents().await {
        Ok(descriptors) => {
            let records: Vec<DocumentRecord> =
                descriptors.iter().map(DocumentRecord::from).collect();
            utils::print_documents(&records);
        }
        Err(e) => utils::print_error(&format!("Failed to load documents: {}", e)),
    }
    Ok(())
}

async fn handle_clear(client: Arc<SessionClient>) -> Result<()> {
    match client.clear_session().await {
        Ok(()) => utils::print_success("Session documents cleared"),
        Err(e) => utils::print_error(&format!("Failed to clear documents: {}", e)),
    }
    Ok(())
}

async fn handle_health(client: Arc<SessionClient>, watch: Option<u64>) -> Result<()> {
    loop {
        match client.health_check().await {
            Ok(status) => {
                println!("\nBackend Health:");
                utils::print_health(&status);
                println!();
            }
            Err(e) => {
                utils::print_error(&format!("Backend unreachable: {}", e));
            }
        }

        // If watch mode enabled, wait and refresh
        if let Some(interval) = watch {
            tokio::time::sleep(tokio::time::Duration::from_secs(interval)).await;
            print!("\x1B[2J\x1B[1;1H");
        } else {
            break;
        }
    }

    Ok(())
}

/// Paths given to `/upload`, or `None` when the input is some other command.
fn upload_command(input: &str) -> Option<Vec<PathBuf>> {
    let rest = input.strip_prefix("/upload")?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.split_whitespace().map(PathBuf::from).collect())
}

async fn handle_interactive(client: Arc<SessionClient>, settings: &Settings) -> Result<()> {
    utils::print_header("RAG Assistant");
    if let Some(session_id) = client.session_id() {
        utils::print_info(&format!("Session ID: {}", session_id));
    }
    utils::print_info("Type your messages (/help for commands, Ctrl+C to exit)");

    if let Err(e) = client.health_check().await {
        utils::print_error(&format!(
            "The backend at {} is not answering; messages will fail until it is up.\nError: {}",
            client.config().api_url,
            e
        ));
    }

    let conversation = open_conversation(client, settings);
    if let Err(e) = conversation.refresh_documents().await {
        tracing::error!("Failed to load documents: {}", e);
    }
    utils::print_conversation(&conversation.snapshot().await?);

    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin);

    loop {
        utils::print_prompt("You: ");
        let mut input = String::new();
        if reader.read_line(&mut input).await? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(paths) = upload_command(input) {
            if paths.is_empty() {
                utils::print_error("Usage: /upload <path> [path...]");
            } else {
                upload_and_report(&conversation, &paths).await?;
            }
            continue;
        }

        match input {
            "/quit" | "/exit" => break,
            "/help" => {
                utils::print_slash_help();
                continue;
            }
            "/docs" => {
                if let Err(e) = conversation.refresh_documents().await {
                    utils::print_error(&format!("Failed to load documents: {}", e));
                }
                utils::print_documents(&conversation.snapshot().await?.documents);
                println!();
                continue;
            }
            "/sidebar" => {
                let visible = conversation.toggle_sidebar().await?;
                utils::print_info(if visible { "Sidebar shown" } else { "Sidebar hidden" });
                utils::print_conversation(&conversation.snapshot().await?);
                continue;
            }
            "/clear" => {
                // Receipt dropped: a backend failure is already logged by the actor.
                conversation.clear_conversation().await?;
                utils::print_conversation(&conversation.snapshot().await?);
                continue;
            }
            "/clear-docs" => {
                conversation.clear_documents().await?;
                utils::print_success("Documents cleared");
                continue;
            }
            _ => {}
        }

        let text = match input.strip_prefix('#').and_then(|n| n.parse::<usize>().ok()) {
            Some(n) if (1..=SUGGESTED_QUESTIONS.len()).contains(&n) => {
                SUGGESTED_QUESTIONS[n - 1].to_string()
            }
            _ => input.to_string(),
        };

        match conversation.submit_message(text).await? {
            SubmitOutcome::Accepted { reply, .. } => {
                utils::print_info("Assistant is thinking...");
                match reply.await {
                    Ok(message) => utils::print_message(&message),
                    Err(_) => utils::print_error("Request cancelled"),
                }
            }
            SubmitOutcome::Rejected(RejectReason::AwaitingResponse) => {
                utils::print_error("Still waiting for the previous answer");
            }
            SubmitOutcome::Rejected(RejectReason::EmptyMessage) => {}
        }
    }

    conversation.shutdown().await
}
