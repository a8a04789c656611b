use thiserror::Error;

use nagarsur_types::{PathError, StoreError};

/// Why a reaction stopped early. Never leaves the reaction: the invoke
/// wrapper logs it and reports a normal completion.
#[derive(Debug, Error)]
pub enum ReactionError {
    #[error("no {field} found at {path}")]
    MissingField { path: String, field: &'static str },

    #[error("no record found at {0}")]
    MissingRecord(String),

    #[error("malformed record at {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReactionError {
    pub fn missing_field(path: impl ToString, field: &'static str) -> Self {
        Self::MissingField {
            path: path.to_string(),
            field,
        }
    }
}
