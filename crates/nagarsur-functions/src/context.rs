use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use nagarsur_types::push::{DEFAULT_CLICK_ACTION, DEFAULT_ICON, DEFAULT_SOUND};
use nagarsur_types::{DbPath, DirectoryStore, IdentityProvider, PushGateway};

use crate::error::ReactionError;

/// Fixed parts of every push payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationSettings {
    pub icon: String,
    pub sound: String,
    pub click_action: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            icon: DEFAULT_ICON.into(),
            sound: DEFAULT_SOUND.into(),
            click_action: DEFAULT_CLICK_ACTION.into(),
        }
    }
}

/// Handles to the platform collaborators, shared by every reaction invocation.
#[derive(Clone)]
pub struct ReactionContext {
    pub store: Arc<dyn DirectoryStore>,
    pub push: Arc<dyn PushGateway>,
    pub identity: Arc<dyn IdentityProvider>,
    pub settings: NotificationSettings,
}

impl ReactionContext {
    pub fn new(
        store: Arc<dyn DirectoryStore>,
        push: Arc<dyn PushGateway>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            store,
            push,
            identity,
            settings: NotificationSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: NotificationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Snapshot read of a typed record.
    pub async fn read<T: DeserializeOwned>(&self, path: &DbPath) -> Result<Option<T>, ReactionError> {
        match self.store.get(path).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| ReactionError::Malformed {
                    path: path.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    pub fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Serialize a record into the field map `update` expects.
pub fn to_fields<T: Serialize>(record: &T) -> Result<Map<String, Value>, ReactionError> {
    Ok(serde_json::from_value(serde_json::to_value(record)?)?)
}
