//! Backend contract: wire types, the failure type and the HTTP client.

pub mod api;
pub mod client;
pub mod error;

pub use api::{ChatReply, DocumentDescriptor, HealthStatus};
pub use client::{BackendApi, ClientConfig, SessionClient, UploadFile};
pub use error::{ClientError, FailureKind};
