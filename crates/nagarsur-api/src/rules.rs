//! Who may read and write which part of the directory store over HTTP.
//! Admins may do anything; everything below describes ordinary users.

use serde_json::Value;

use nagarsur_types::DbPath;
use nagarsur_types::api::Claims;

/// Complaint fields only moderators set.
const MODERATED_FIELDS: &[&str] = &["status", "admin_note"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Set,
    Merge,
    Push,
    Remove,
}

pub fn can_read(claims: &Claims, path: &DbPath) -> bool {
    if claims.admin {
        return true;
    }
    matches!(
        path.segments().first().map(String::as_str),
        Some("discussion" | "reports" | "complaints" | "users")
    )
}

/// `body` is the value being written (ignored for removals). `exists` says
/// whether something is currently stored at `path`.
pub fn can_write(claims: &Claims, path: &DbPath, op: WriteOp, body: &Value, exists: bool) -> bool {
    if claims.admin {
        return true;
    }

    let Some((collection, rest)) = path.segments().split_first() else {
        return false;
    };
    // Whole collections are only ever appended to.
    if rest.is_empty() && op != WriteOp::Push {
        return false;
    }

    match collection.as_str() {
        "discussion" | "reports" => true,
        "users" => rest.first().is_some_and(|uid| *uid == claims.sub.to_string()),
        "complaints" => complaint_write(rest, op, body, exists),
        _ => false,
    }
}

fn complaint_write(rest: &[String], op: WriteOp, body: &Value, exists: bool) -> bool {
    match rest {
        // New complaint: may carry its initial status, never a note.
        [] => !touches(body, &["admin_note"]),
        [_record] => match op {
            WriteOp::Set | WriteOp::Remove if exists => false,
            WriteOp::Set => !touches(body, &["admin_note"]),
            WriteOp::Merge if exists => !touches(body, MODERATED_FIELDS),
            WriteOp::Merge => !touches(body, &["admin_note"]),
            WriteOp::Remove => true,
            WriteOp::Push => !touches(body, MODERATED_FIELDS),
        },
        [_record, field, ..] => !MODERATED_FIELDS.contains(&field.as_str()),
    }
}

fn touches(body: &Value, fields: &[&str]) -> bool {
    body.as_object()
        .is_some_and(|map| fields.iter().any(|f| map.contains_key(*f)))
}
