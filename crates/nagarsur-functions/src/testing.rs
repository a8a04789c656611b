//! Fakes for the push gateway and identity provider, and a context over a
//! fresh in-memory store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use nagarsur_db::{Database, SqliteStore};
use nagarsur_types::push::PushResult;
use nagarsur_types::{
    DbPath, DirectoryStore, IdentityError, IdentityProvider, IdentityRecord, PushError,
    PushGateway, PushPayload, PushResponse,
};

use crate::context::ReactionContext;

#[derive(Default)]
pub struct RecordingPush {
    pub sent: Mutex<Vec<(String, PushPayload)>>,
    pub fail: bool,
}

impl RecordingPush {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, PushPayload)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushGateway for RecordingPush {
    async fn send_to_device(&self, token: &str, payload: &PushPayload) -> Result<PushResponse, PushError> {
        self.sent.lock().unwrap().push((token.to_string(), payload.clone()));
        if self.fail {
            return Err(PushError::Transport("gateway unavailable".into()));
        }
        Ok(PushResponse {
            multicast_id: Some(1),
            success_count: 1,
            failure_count: 0,
            results: vec![PushResult {
                message_id: Some("msg-1".into()),
                error: None,
            }],
        })
    }
}

#[derive(Default)]
pub struct StaticIdentity {
    pub records: HashMap<String, IdentityRecord>,
    pub broken: bool,
}

impl StaticIdentity {
    pub fn with(record: IdentityRecord) -> Self {
        let mut records = HashMap::new();
        records.insert(record.uid.clone(), record);
        Self {
            records,
            broken: false,
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn get_user(&self, uid: &str) -> Result<IdentityRecord, IdentityError> {
        if self.broken {
            return Err(IdentityError::Backend("identity service unreachable".into()));
        }
        self.records
            .get(uid)
            .cloned()
            .ok_or_else(|| IdentityError::NotFound(uid.to_string()))
    }
}

pub struct Harness {
    pub ctx: ReactionContext,
    pub store: SqliteStore,
    pub push: Arc<RecordingPush>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(RecordingPush::default(), StaticIdentity::default())
    }

    pub fn with(push: RecordingPush, identity: StaticIdentity) -> Self {
        let store = SqliteStore::new(Arc::new(Database::open_in_memory().unwrap()));
        let push = Arc::new(push);
        let ctx = ReactionContext::new(Arc::new(store.clone()), push.clone(), Arc::new(identity));
        Self { ctx, store, push }
    }

    pub async fn put(&self, path: &str, value: Value) {
        self.store.set(&DbPath::parse(path).unwrap(), value).await.unwrap();
    }

    pub async fn get(&self, path: &str) -> Option<Value> {
        self.store.get(&DbPath::parse(path).unwrap()).await.unwrap()
    }

    /// Children of `path` in key order.
    pub async fn children(&self, path: &str) -> Vec<Value> {
        match self.get(path).await {
            Some(Value::Object(map)) => map.into_iter().map(|(_, v)| v).collect(),
            _ => Vec::new(),
        }
    }
}
