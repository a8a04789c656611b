use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::DbPath;

/// A committed change to one record (`/collection/key`) of the directory store.
/// `before` and `after` are whole-record snapshots; `None` means absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub path: DbPath,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

/// Profile attributes the identity provider holds for an account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Everything the platform can fire a reaction for.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    /// A record under the directory store changed
    Data(ChangeEvent),

    /// The identity provider created a new account
    AccountCreated(IdentityRecord),
}
