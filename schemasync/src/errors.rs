use std::path::PathBuf;

use thiserror::Error;

use crate::types::SchemaCollection;

/// Top-level error type returned by the schemasync library.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Reading or writing a snapshot file failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A snapshot file is not valid JSON or is missing a collection key.
    #[error("malformed snapshot {path}: {source}")]
    MalformedSnapshot {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A record lacks the property its collection key is built from.
    #[error("{collection} record is missing key property '{property}'")]
    MissingKey {
        collection: SchemaCollection,
        property: &'static str,
    },

    /// Two records in the same list share a primary key.
    #[error("duplicate primary key '{pk}' in {collection}")]
    DuplicateKey { collection: SchemaCollection, pk: String },

    /// A record reached the differ without a synthesized `pk`.
    #[error("{collection} record has no pk")]
    Unkeyed { collection: SchemaCollection },

    /// The CMS rejected the credentials.
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// The CMS answered with a non-success status.
    #[error("api error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The request never produced a response.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The CMS response did not have the expected shape.
    #[error("unexpected response: {message}")]
    UnexpectedResponse { message: String },
}

impl SyncError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error came back from the remote API rather than local state.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            SyncError::Api { .. } | SyncError::Http(_) | SyncError::UnexpectedResponse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
