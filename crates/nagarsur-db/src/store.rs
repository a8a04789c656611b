use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use nagarsur_types::{
    DbPath, DirectoryStore, IdentityError, IdentityProvider, IdentityRecord, StoreError,
};

use crate::Database;

/// Async face of [`Database`]: every call runs on the blocking pool so SQLite
/// never stalls the runtime.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Database>,
}

impl SqliteStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    async fn blocking<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| StoreError::Backend(format!("spawn_blocking join error: {}", e)))?
    }
}

#[async_trait]
impl DirectoryStore for SqliteStore {
    async fn get(&self, path: &DbPath) -> Result<Option<Value>, StoreError> {
        let path = path.clone();
        self.blocking(move |db| db.get_node(&path)).await
    }

    async fn set(&self, path: &DbPath, value: Value) -> Result<(), StoreError> {
        let path = path.clone();
        self.blocking(move |db| db.set_node(&path, value)).await
    }

    async fn update(&self, path: &DbPath, fields: Map<String, Value>) -> Result<(), StoreError> {
        let path = path.clone();
        self.blocking(move |db| db.update_node(&path, fields, false).map(|_| ()))
            .await
    }

    async fn update_existing(
        &self,
        path: &DbPath,
        fields: Map<String, Value>,
    ) -> Result<bool, StoreError> {
        let path = path.clone();
        self.blocking(move |db| db.update_node(&path, fields, true)).await
    }

    async fn remove(&self, path: &DbPath) -> Result<bool, StoreError> {
        let path = path.clone();
        self.blocking(move |db| db.remove_node(&path)).await
    }

    async fn push(&self, path: &DbPath, value: Value) -> Result<String, StoreError> {
        let path = path.clone();
        self.blocking(move |db| db.push_node(&path, value)).await
    }
}

/// Accounts double as the identity provider's user directory.
#[async_trait]
impl IdentityProvider for SqliteStore {
    async fn get_user(&self, uid: &str) -> Result<IdentityRecord, IdentityError> {
        let db = self.db.clone();
        let id = uid.to_string();
        let row = tokio::task::spawn_blocking(move || db.get_account_by_id(&id))
            .await
            .map_err(|e| IdentityError::Backend(format!("spawn_blocking join error: {}", e)))?
            .map_err(|e| IdentityError::Backend(e.to_string()))?;

        match row {
            Some(row) => Ok(IdentityRecord {
                uid: row.id,
                display_name: row.display_name,
                email: row.email,
            }),
            None => Err(IdentityError::NotFound(uid.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::NewAccount;
    use serde_json::json;

    fn store() -> SqliteStore {
        SqliteStore::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    #[tokio::test]
    async fn store_round_trip_through_trait() {
        let store = store();
        let dyn_store: &dyn DirectoryStore = &store;
        let msg = DbPath::parse("/discussion/m1").unwrap();

        dyn_store.set(&msg, json!({"senderId": "s1"})).await.unwrap();
        assert!(dyn_store.exists(&msg).await.unwrap());

        let mut fields = Map::new();
        fields.insert("senderName".into(), json!("Alice"));
        assert!(dyn_store.update_existing(&msg, fields).await.unwrap());
        assert_eq!(
            dyn_store.get(&msg).await.unwrap(),
            Some(json!({"senderId": "s1", "senderName": "Alice"}))
        );

        assert!(dyn_store.remove(&msg).await.unwrap());
        assert!(!dyn_store.exists(&msg).await.unwrap());
    }

    #[tokio::test]
    async fn identity_lookup() {
        let store = store();
        store
            .database()
            .create_account(&NewAccount {
                id: "uid-1",
                username: "asha",
                password_hash: "h",
                display_name: None,
                email: Some("asha@example.com"),
                is_admin: false,
            })
            .unwrap();

        let rec = store.get_user("uid-1").await.unwrap();
        assert_eq!(rec.email.as_deref(), Some("asha@example.com"));
        assert!(rec.display_name.is_none());

        assert!(matches!(
            store.get_user("missing").await,
            Err(IdentityError::NotFound(_))
        ));
    }
}
