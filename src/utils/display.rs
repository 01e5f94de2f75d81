use crate::conversation::{
    ChatMessage, ConversationState, DocumentRecord, UploadFailure, SUGGESTED_QUESTIONS,
};
use crate::core::HealthStatus;
use colored::*;
use std::io::{self, Write};

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.len()).bright_cyan());
}

pub fn print_success(text: &str) {
    println!("{}", text.green());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

pub fn print_prompt(text: &str) {
    print!("{}", text.yellow().bold());
    let _ = io::stdout().flush();
}

pub fn print_message(message: &ChatMessage) {
    let label = if message.is_user() {
        "You".yellow().bold()
    } else {
        "Assistant".bright_cyan().bold()
    };
    println!("{} {}", label, format!("[{}]", message.timestamp).dimmed());
    println!("{}\n", message.text);
}

pub fn document_line(document: &DocumentRecord) -> String {
    format!(
        "{}  {} • {}",
        document.name, document.size, document.uploaded_at
    )
}

pub fn print_documents(documents: &[DocumentRecord]) {
    println!(
        "{}",
        format!("Documents ({})", documents.len()).bright_cyan().bold()
    );

    if documents.is_empty() {
        println!("  {}", "No documents uploaded".dimmed());
        println!("  {}", "Upload files to start chatting".dimmed());
        return;
    }

    for document in documents {
        println!("  {}", document_line(document));
    }
}

pub fn print_notice(failure: &UploadFailure) {
    print_error(&failure.to_string());
}

/// Sidebar (when visible), then either the landing view or the transcript.
pub fn print_conversation(state: &ConversationState) {
    if state.sidebar_visible {
        print_documents(&state.documents);
        println!();
    }

    println!("{}", state.document_summary().dimmed());

    if state.is_landing() {
        print_landing();
        return;
    }

    for message in &state.messages {
        print_message(message);
    }
}

pub fn print_landing() {
    print_header("Welcome to RAG Assistant");
    println!("Upload documents and start asking questions.\n");
    println!("{}", "Try asking (type #N to send):".blue());
    for (index, question) in SUGGESTED_QUESTIONS.iter().enumerate() {
        println!("  #{} {}", index + 1, question);
    }
    println!();
}

pub fn print_health(status: &HealthStatus) {
    println!(
        "  Status:   {}",
        status.status.as_deref().unwrap_or("ok").green()
    );
    if let Some(service) = &status.service {
        println!("  Service:  {}", service);
    }
    if let Some(provider) = &status.provider {
        println!("  Provider: {}", provider);
    }
    if let Some(stored) = &status.documents_stored {
        println!("  Stored:   {}", stored);
    }
}

pub fn print_slash_help() {
    println!("Special commands:");
    println!("  /upload <paths>  - Upload one or more documents");
    println!("  /docs            - Reload and show documents");
    println!("  /sidebar         - Toggle the document list above the transcript");
    println!("  /clear           - Start a new chat (drops documents too)");
    println!("  /clear-docs      - Drop documents, keep the transcript");
    println!("  /help            - Show this help");
    println!("  /quit            - Exit\n");
}
