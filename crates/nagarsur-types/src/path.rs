use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Characters the hosted database refuses in a key.
const FORBIDDEN: &[char] = &['.', '#', '$', '[', ']'];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty segment in path '{0}'")]
    EmptySegment(String),
    #[error("forbidden character in segment '{0}'")]
    ForbiddenChar(String),
}

/// A slash-separated location in the directory store, e.g. `/users/u1/fcmToken`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DbPath {
    segments: Vec<String>,
}

impl DbPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a path. Leading and trailing slashes are ignored; `/` and `` are the root.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        for seg in trimmed.split('/') {
            validate_segment(seg, raw)?;
            segments.push(seg.to_string());
        }
        Ok(Self { segments })
    }

    /// Append one key. The key must itself be a valid single segment.
    pub fn child(&self, key: &str) -> Result<Self, PathError> {
        validate_segment(key, key)?;
        let mut segments = self.segments.clone();
        segments.push(key.to_string());
        Ok(Self { segments })
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, if any.
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }
}

fn validate_segment(seg: &str, context: &str) -> Result<(), PathError> {
    if seg.is_empty() {
        return Err(PathError::EmptySegment(context.to_string()));
    }
    if seg.contains(FORBIDDEN) {
        return Err(PathError::ForbiddenChar(seg.to_string()));
    }
    Ok(())
}

impl fmt::Display for DbPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for seg in &self.segments {
            write!(f, "/{}", seg)?;
        }
        Ok(())
    }
}

impl FromStr for DbPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// -- Contract paths --

fn collection_child(collection: &str, id: &str) -> Result<DbPath, PathError> {
    DbPath {
        segments: vec![collection.to_string()],
    }
    .child(id)
}

pub fn users() -> DbPath {
    DbPath { segments: vec!["users".into()] }
}

pub fn user(user_id: &str) -> Result<DbPath, PathError> {
    collection_child("users", user_id)
}

pub fn user_token(user_id: &str) -> Result<DbPath, PathError> {
    user(user_id)?.child("fcmToken")
}

pub fn user_notifications(user_id: &str) -> Result<DbPath, PathError> {
    user(user_id)?.child("notifications")
}

pub fn discussion() -> DbPath {
    DbPath { segments: vec!["discussion".into()] }
}

pub fn message(message_id: &str) -> Result<DbPath, PathError> {
    collection_child("discussion", message_id)
}

pub fn complaint(complaint_id: &str) -> Result<DbPath, PathError> {
    collection_child("complaints", complaint_id)
}

pub fn complaint_admin_note(complaint_id: &str) -> Result<DbPath, PathError> {
    complaint(complaint_id)?.child("admin_note")
}

pub fn banned_user(user_id: &str) -> Result<DbPath, PathError> {
    collection_child("banned_users", user_id)
}

pub fn report(report_id: &str) -> Result<DbPath, PathError> {
    collection_child("reports", report_id)
}

pub fn message_report(report_id: &str) -> Result<DbPath, PathError> {
    collection_child("message_reports", report_id)
}

pub fn message_report_status(report_id: &str) -> Result<DbPath, PathError> {
    message_report(report_id)?.child("status")
}

pub fn admin_notifications() -> DbPath {
    DbPath { segments: vec!["admin_notifications".into()] }
}
