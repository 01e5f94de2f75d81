//! Backend wire types
//!
//! Every backend response is a JSON object with an optional `success`
//! flag, an optional `error` string and an operation-specific payload
//! next to them. `decode_envelope` turns that into either the payload or
//! a `ClientError`.

use super::error::ClientError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatReply {
    pub message: String,
    #[serde(default)]
    pub rag_used: bool,
    #[serde(default)]
    pub documents_retrieved: usize,
}

/// A document as the backend describes it: raw byte size and epoch seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "uploadedAt")]
    pub uploaded_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadReply {
    pub document: DocumentDescriptor,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocumentList {
    #[serde(default)]
    pub documents: Vec<DocumentDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct HealthStatus {
    pub status: Option<String>,
    pub service: Option<String>,
    pub documents_stored: Option<Value>,
    pub provider: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Acknowledgement {}

#[derive(Debug, Deserialize)]
struct Envelope {
    success: Option<bool>,
    error: Option<String>,
}

/// Decode a response body.
///
/// A body without `success` counts as successful when the HTTP status
/// is 2xx and no `error` is present.
pub(crate) fn decode_envelope<T: DeserializeOwned>(
    status: u16,
    body: &str,
) -> Result<T, ClientError> {
    let http_ok = (200..300).contains(&status);

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) if http_ok => return Err(ClientError::Decode(e)),
        Err(_) => {
            return Err(ClientError::UnexpectedStatus {
                status,
                body: body.trim().to_string(),
            })
        }
    };

    let envelope: Envelope = serde_json::from_value(value.clone()).map_err(ClientError::Decode)?;
    let succeeded = envelope
        .success
        .unwrap_or(http_ok && envelope.error.is_none());

    if !succeeded {
        let message = envelope
            .error
            .unwrap_or_else(|| format!("backend reported failure (HTTP {})", status));
        return Err(ClientError::Application(message));
    }

    serde_json::from_value(value).map_err(ClientError::Decode)
}
