//! Narrow interfaces to the three platform collaborators: the directory store,
//! the push gateway and the identity provider. Reactions only ever see these.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::events::IdentityRecord;
use crate::path::{DbPath, PathError};
use crate::push::{PushPayload, PushResponse};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),
    #[error("cannot write {path}: {reason}")]
    Rejected { path: String, reason: &'static str },
    #[error("store backend failure: {0}")]
    Backend(String),
    #[error("stored value is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PushError {
    #[error("push delivery is not configured")]
    NotConfigured,
    #[error("push transport error: {0}")]
    Transport(String),
    #[error("push gateway returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("cannot decode push gateway response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("no account with uid {0}")]
    NotFound(String),
    #[error("identity backend failure: {0}")]
    Backend(String),
}

/// Point-in-time reads and single writes against the hierarchical store.
/// No call is transactional with any other call.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Value at `path`, or `None` when nothing is stored there.
    async fn get(&self, path: &DbPath) -> Result<Option<Value>, StoreError>;

    async fn exists(&self, path: &DbPath) -> Result<bool, StoreError> {
        Ok(self.get(path).await?.is_some())
    }

    /// Replace the value at `path`. Writing `null` deletes.
    async fn set(&self, path: &DbPath, value: Value) -> Result<(), StoreError>;

    /// Merge `fields` into the children of `path`, leaving other children alone.
    async fn update(&self, path: &DbPath, fields: Map<String, Value>) -> Result<(), StoreError>;

    /// Like [`update`](Self::update), but only when a value already exists at
    /// `path`. Returns whether the update was applied.
    async fn update_existing(
        &self,
        path: &DbPath,
        fields: Map<String, Value>,
    ) -> Result<bool, StoreError>;

    /// Delete the value at `path`. Returns whether anything was there.
    async fn remove(&self, path: &DbPath) -> Result<bool, StoreError>;

    /// Append `value` under a fresh, time-ordered key. Returns the key.
    async fn push(&self, path: &DbPath, value: Value) -> Result<String, StoreError>;
}

#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send_to_device(
        &self,
        token: &str,
        payload: &PushPayload,
    ) -> Result<PushResponse, PushError>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn get_user(&self, uid: &str) -> Result<IdentityRecord, IdentityError>;
}
