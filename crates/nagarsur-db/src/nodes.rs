//! Hierarchical reads and writes over the `nodes` table.
//!
//! Each row holds one record, the node at depth two (`/users/u1`,
//! `/discussion/m1`). Deeper paths are resolved inside the row's JSON; the
//! collection level is the set of rows sharing a `collection`. Every write runs
//! in one SQLite transaction under the connection lock, and a `ChangeEvent` is
//! published per record whose value actually changed.

use std::sync::MutexGuard;

use rusqlite::{Connection, OptionalExtension, Transaction};
use serde_json::{Map, Value};

use nagarsur_types::{ChangeEvent, DbPath, PlatformEvent, StoreError};

use crate::Database;
use crate::tree;

enum Op {
    Set(Value),
    Merge(Map<String, Value>),
}

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn rejected(path: &DbPath, reason: &'static str) -> StoreError {
    StoreError::Rejected {
        path: path.to_string(),
        reason,
    }
}

impl Database {
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| backend(format!("DB lock poisoned: {}", e)))
    }

    pub fn get_node(&self, path: &DbPath) -> Result<Option<Value>, StoreError> {
        let conn = self.lock()?;
        let segs = path.segments();

        match segs {
            [] => {
                let mut stmt = conn
                    .prepare("SELECT collection, key, value FROM nodes ORDER BY collection, key")
                    .map_err(backend)?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
                    })
                    .map_err(backend)?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(backend)?;

                let mut root = Map::new();
                for (collection, key, raw) in rows {
                    let entry = root
                        .entry(collection)
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Value::Object(records) = entry {
                        records.insert(key, serde_json::from_str(&raw)?);
                    }
                }
                Ok(tree::normalize(Value::Object(root)))
            }
            [collection] => {
                let records = read_collection(&conn, collection)?;
                Ok(tree::normalize(Value::Object(records)))
            }
            [collection, key, rest @ ..] => {
                let record = read_record(&conn, collection, key)?;
                Ok(record.and_then(|r| tree::get_at(&r, rest).cloned()))
            }
        }
    }

    pub fn set_node(&self, path: &DbPath, value: Value) -> Result<(), StoreError> {
        self.apply(path, Op::Set(value), false).map(|_| ())
    }

    /// Merge `fields` as children of `path`. With `only_existing`, nothing is
    /// written unless a value is already present at `path`.
    pub fn update_node(
        &self,
        path: &DbPath,
        fields: Map<String, Value>,
        only_existing: bool,
    ) -> Result<bool, StoreError> {
        self.apply(path, Op::Merge(fields), only_existing)
    }

    pub fn remove_node(&self, path: &DbPath) -> Result<bool, StoreError> {
        if path.is_root() {
            return Err(rejected(path, "the root cannot be removed"));
        }
        self.apply(path, Op::Set(Value::Null), true)
    }

    pub fn push_node(&self, path: &DbPath, value: Value) -> Result<String, StoreError> {
        let key = self.push_ids.next(now_ms());
        let child = path.child(&key)?;
        self.apply(&child, Op::Set(value), false)?;
        Ok(key)
    }

    fn apply(&self, path: &DbPath, op: Op, only_existing: bool) -> Result<bool, StoreError> {
        let now = now_ms();
        let op = match op {
            Op::Set(mut value) => {
                tree::resolve_server_values(&mut value, now);
                tree::validate_keys(&value)?;
                Op::Set(value)
            }
            Op::Merge(mut fields) => {
                for (field, value) in fields.iter_mut() {
                    DbPath::root().child(field)?;
                    tree::resolve_server_values(value, now);
                    tree::validate_keys(value)?;
                }
                Op::Merge(fields)
            }
        };

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(backend)?;

        let (applied, events) = match path.segments() {
            [] => return Err(rejected(path, "writes to the root are not allowed")),
            [collection] => write_collection(&tx, path, collection, op, only_existing)?,
            [collection, key, rest @ ..] => {
                write_record(&tx, collection, key, rest, op, only_existing)?
            }
        };

        tx.commit().map_err(backend)?;

        // Published under the lock so subscribers see changes in commit order.
        for event in events {
            self.publish(PlatformEvent::Data(event));
        }
        Ok(applied)
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn read_record(conn: &Connection, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM nodes WHERE collection = ?1 AND key = ?2",
            [collection, key],
            |row| row.get(0),
        )
        .optional()
        .map_err(backend)?;

    match raw {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

fn read_collection(conn: &Connection, collection: &str) -> Result<Map<String, Value>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT key, value FROM nodes WHERE collection = ?1 ORDER BY key")
        .map_err(backend)?;
    let rows = stmt
        .query_map([collection], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(backend)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(backend)?;

    let mut records = Map::new();
    for (key, raw) in rows {
        records.insert(key, serde_json::from_str(&raw)?);
    }
    Ok(records)
}

/// Persist `after` for one record and describe the change, if any.
fn store_record(
    tx: &Transaction<'_>,
    collection: &str,
    key: &str,
    before: Option<Value>,
    after: Option<Value>,
) -> Result<Option<ChangeEvent>, StoreError> {
    if before == after {
        return Ok(None);
    }

    match &after {
        Some(value) => {
            tx.execute(
                "INSERT INTO nodes (collection, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT (collection, key)
                 DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
                rusqlite::params![collection, key, serde_json::to_string(value)?],
            )
            .map_err(backend)?;
        }
        None => {
            tx.execute(
                "DELETE FROM nodes WHERE collection = ?1 AND key = ?2",
                [collection, key],
            )
            .map_err(backend)?;
        }
    }

    Ok(Some(ChangeEvent {
        path: DbPath::root().child(collection)?.child(key)?,
        before,
        after,
    }))
}

fn write_record(
    tx: &Transaction<'_>,
    collection: &str,
    key: &str,
    rest: &[String],
    op: Op,
    only_existing: bool,
) -> Result<(bool, Vec<ChangeEvent>), StoreError> {
    let before = read_record(tx, collection, key)?;

    if only_existing && before.as_ref().and_then(|r| tree::get_at(r, rest)).is_none() {
        return Ok((false, Vec::new()));
    }

    let after = match op {
        Op::Set(value) => tree::set_at(before.clone(), rest, value),
        Op::Merge(fields) => {
            let mut current = before.clone();
            for (field, value) in fields {
                let mut target = rest.to_vec();
                target.push(field);
                current = tree::set_at(current, &target, value);
            }
            current
        }
    };

    let event = store_record(tx, collection, key, before, after)?;
    Ok((true, event.into_iter().collect()))
}

fn write_collection(
    tx: &Transaction<'_>,
    path: &DbPath,
    collection: &str,
    op: Op,
    only_existing: bool,
) -> Result<(bool, Vec<ChangeEvent>), StoreError> {
    let existing = read_collection(tx, collection)?;
    if only_existing && existing.is_empty() {
        return Ok((false, Vec::new()));
    }

    // Target value for every record key the write touches.
    let targets: Vec<(String, Option<Value>)> = match op {
        Op::Set(value) => {
            let incoming = match tree::normalize(value) {
                None => Map::new(),
                Some(Value::Object(map)) => map,
                Some(_) => return Err(rejected(path, "a collection can only hold records")),
            };
            let mut keys: Vec<String> = existing.keys().cloned().collect();
            keys.extend(incoming.keys().filter(|k| !existing.contains_key(*k)).cloned());
            keys.into_iter()
                .map(|k| {
                    let v = incoming.get(&k).cloned();
                    (k, v)
                })
                .collect()
        }
        Op::Merge(fields) => fields
            .into_iter()
            .map(|(k, v)| (k, tree::normalize(v)))
            .collect(),
    };

    let mut events = Vec::new();
    for (key, after) in targets {
        let before = existing.get(&key).cloned();
        if let Some(event) = store_record(tx, collection, &key, before, after)? {
            events.push(event);
        }
    }
    Ok((true, events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::broadcast::error::TryRecvError;

    fn path(raw: &str) -> DbPath {
        DbPath::parse(raw).unwrap()
    }

    fn next_change(rx: &mut tokio::sync::broadcast::Receiver<PlatformEvent>) -> ChangeEvent {
        match rx.try_recv().unwrap() {
            PlatformEvent::Data(change) => change,
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn set_and_get_nested() {
        let db = Database::open_in_memory().unwrap();
        db.set_node(&path("/users/u1"), json!({"name": "Asha", "fcmToken": "tok1"}))
            .unwrap();

        assert_eq!(db.get_node(&path("/users/u1/name")).unwrap(), Some(json!("Asha")));
        assert_eq!(
            db.get_node(&path("/users")).unwrap(),
            Some(json!({"u1": {"name": "Asha", "fcmToken": "tok1"}}))
        );
        assert_eq!(db.get_node(&path("/users/u2")).unwrap(), None);
        assert_eq!(db.get_node(&path("/users/u1/missing/deeper")).unwrap(), None);
    }

    #[test]
    fn deep_set_creates_record() {
        let db = Database::open_in_memory().unwrap();
        db.set_node(&path("/users/u1/fcmToken"), json!("tok")).unwrap();
        assert_eq!(db.get_node(&path("/users/u1")).unwrap(), Some(json!({"fcmToken": "tok"})));
    }

    #[test]
    fn update_merges_children() {
        let db = Database::open_in_memory().unwrap();
        db.set_node(&path("/discussion/m1"), json!({"senderId": "s1", "message": "hi"}))
            .unwrap();

        let mut fields = Map::new();
        fields.insert("senderName".into(), json!("Alice"));
        fields.insert("message".into(), Value::Null);
        assert!(db.update_node(&path("/discussion/m1"), fields, false).unwrap());

        assert_eq!(
            db.get_node(&path("/discussion/m1")).unwrap(),
            Some(json!({"senderId": "s1", "senderName": "Alice"}))
        );
    }

    #[test]
    fn conditional_update_skips_missing_node() {
        let db = Database::open_in_memory().unwrap();
        let mut rx = db.subscribe();

        let mut fields = Map::new();
        fields.insert("senderName".into(), json!("Alice"));
        assert!(!db.update_node(&path("/discussion/gone"), fields, true).unwrap());

        assert_eq!(db.get_node(&path("/discussion/gone")).unwrap(), None);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn remove_reports_presence() {
        let db = Database::open_in_memory().unwrap();
        db.set_node(&path("/banned_users/s1"), json!(true)).unwrap();

        assert!(db.remove_node(&path("/banned_users/s1")).unwrap());
        assert!(!db.remove_node(&path("/banned_users/s1")).unwrap());
        assert_eq!(db.get_node(&path("/banned_users")).unwrap(), None);
    }

    #[test]
    fn writes_emit_whole_record_snapshots() {
        let db = Database::open_in_memory().unwrap();
        let mut rx = db.subscribe();

        db.set_node(&path("/complaints/c1"), json!({"user_id": "u1", "status": "open"}))
            .unwrap();
        let created = next_change(&mut rx);
        assert_eq!(created.path.to_string(), "/complaints/c1");
        assert_eq!(created.before, None);

        db.set_node(&path("/complaints/c1/status"), json!("resolved")).unwrap();
        let updated = next_change(&mut rx);
        assert_eq!(updated.before, Some(json!({"user_id": "u1", "status": "open"})));
        assert_eq!(updated.after, Some(json!({"user_id": "u1", "status": "resolved"})));

        // Identical write: no event.
        db.set_node(&path("/complaints/c1/status"), json!("resolved")).unwrap();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn push_keys_keep_insertion_order() {
        let db = Database::open_in_memory().unwrap();
        let notifications = path("/users/u1/notifications");

        let keys: Vec<String> = (0..5)
            .map(|i| db.push_node(&notifications, json!({"n": i})).unwrap())
            .collect();

        let stored = db.get_node(&notifications).unwrap().unwrap();
        let order: Vec<&String> = stored.as_object().unwrap().keys().collect();
        assert_eq!(order, keys.iter().collect::<Vec<_>>());
    }

    #[test]
    fn push_on_collection_creates_record() {
        let db = Database::open_in_memory().unwrap();
        let mut rx = db.subscribe();
        let key = db.push_node(&path("/admin_notifications"), json!({"status": "pending"})).unwrap();

        let change = next_change(&mut rx);
        assert_eq!(change.path.to_string(), format!("/admin_notifications/{}", key));
        assert_eq!(change.after, Some(json!({"status": "pending"})));
    }

    #[test]
    fn server_timestamp_is_stamped() {
        let db = Database::open_in_memory().unwrap();
        db.set_node(&path("/users/u1"), json!({"createdAt": {".sv": "timestamp"}})).unwrap();
        let at = db.get_node(&path("/users/u1/createdAt")).unwrap().unwrap();
        assert!(at.as_i64().unwrap() > 1_600_000_000_000);
    }

    #[test]
    fn collection_set_replaces_records() {
        let db = Database::open_in_memory().unwrap();
        db.set_node(&path("/banned_users/a"), json!(true)).unwrap();
        let mut rx = db.subscribe();

        db.set_node(&path("/banned_users"), json!({"b": true})).unwrap();

        let mut paths = vec![next_change(&mut rx).path.to_string(), next_change(&mut rx).path.to_string()];
        paths.sort();
        assert_eq!(paths, vec!["/banned_users/a", "/banned_users/b"]);
        assert_eq!(db.get_node(&path("/banned_users")).unwrap(), Some(json!({"b": true})));
    }

    #[test]
    fn invalid_writes_rejected() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.set_node(&DbPath::root(), json!({"x": 1})),
            Err(StoreError::Rejected { .. })
        ));
        assert!(matches!(
            db.set_node(&path("/banned_users"), json!(true)),
            Err(StoreError::Rejected { .. })
        ));
        assert!(matches!(
            db.set_node(&path("/users/u1"), json!({"a.b": 1})),
            Err(StoreError::InvalidPath(_))
        ));
    }

    #[test]
    fn feed_keeps_events_observers_lose() {
        let db = Database::open_in_memory().unwrap();
        let mut observer = db.subscribe();
        let mut feed = db.feed();

        db.set_node(&path("/discussion/m1"), json!({"senderId": "bad"})).unwrap();
        for i in 0..1100 {
            db.set_node(&path(&format!("/users/u{}", i)), json!({"name": "x"})).unwrap();
        }

        assert!(matches!(observer.try_recv(), Err(TryRecvError::Lagged(_))));

        let mut received = Vec::new();
        while let Ok(event) = feed.try_recv() {
            received.push(event);
        }
        assert_eq!(received.len(), 1101);
        match &received[0] {
            PlatformEvent::Data(change) => assert_eq!(change.path.to_string(), "/discussion/m1"),
            other => panic!("unexpected event {:?}", other),
        }
    }
}
