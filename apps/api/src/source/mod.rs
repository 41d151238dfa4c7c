//! Data source adapter. The only way records enter the service.
//!
//! The backend REST API is authoritative; this layer lists collections and
//! forwards mutations. Retries live here and nowhere else.

pub mod http;
pub mod snapshot;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::models::Collection;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("backend response could not be decoded: {0}")]
    Decode(String),

    #[error("backend unavailable after {attempts} attempts")]
    Unavailable { attempts: u32 },
}

impl SourceError {
    /// Status the backend answered with, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            SourceError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Contract of the external REST collaborator. Payloads are plain JSON; typed
/// decoding happens at the view layer.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn list(&self, collection: Collection) -> Result<Vec<Value>, SourceError>;

    async fn create(&self, collection: Collection, payload: Value) -> Result<Value, SourceError>;

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        payload: Value,
    ) -> Result<Value, SourceError>;

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), SourceError>;
}
