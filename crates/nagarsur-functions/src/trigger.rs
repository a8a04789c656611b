//! Path patterns that bind reactions to store changes.
//!
//! A pattern such as `/complaints/{complaintId}/admin_note` names a collection,
//! a record and optionally a location inside the record. Matching a
//! [`ChangeEvent`] yields the before/after snapshots at that location, so a
//! child-path trigger only fires when the child itself changed.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use nagarsur_types::ChangeEvent;

use crate::error::ReactionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Create,
    Update,
    Delete,
    /// Any of the three above
    Write,
}

impl EventKind {
    fn accepts(self, existed: bool, exists: bool) -> bool {
        match self {
            Self::Create => !existed && exists,
            Self::Update => existed && exists,
            Self::Delete => existed && !exists,
            Self::Write => existed || exists,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern '{0}' must name a collection and a record")]
    TooShort(String),
    #[error("pattern '{0}' has an empty or malformed segment")]
    Malformed(String),
    #[error("pattern '{0}' cannot start with a wildcard")]
    WildcardCollection(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Wildcard(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let trimmed = raw.trim_matches('/');
        let mut segments = Vec::new();

        for part in trimmed.split('/') {
            if part.is_empty() {
                return Err(PatternError::Malformed(raw.to_string()));
            }
            let segment = match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                Some(name) if !name.is_empty() => Segment::Wildcard(name.to_string()),
                Some(_) => return Err(PatternError::Malformed(raw.to_string())),
                None if part.contains(['{', '}']) => {
                    return Err(PatternError::Malformed(raw.to_string()));
                }
                None => Segment::Literal(part.to_string()),
            };
            segments.push(segment);
        }

        if segments.len() < 2 {
            return Err(PatternError::TooShort(raw.to_string()));
        }
        if matches!(segments[0], Segment::Wildcard(_)) {
            return Err(PatternError::WildcardCollection(raw.to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Every location under this pattern that the event changed.
    pub fn matches(&self, event: &ChangeEvent) -> Vec<Change> {
        let [collection, key] = event.path.segments() else {
            return Vec::new();
        };

        let mut params = BTreeMap::new();
        let (first, second, rest) = match self.segments.as_slice() {
            [first, second, rest @ ..] => (first, second, rest),
            _ => return Vec::new(),
        };
        if !bind(first, collection, &mut params) || !bind(second, key, &mut params) {
            return Vec::new();
        }

        let mut out = Vec::new();
        descend(rest, params, event.before.as_ref(), event.after.as_ref(), &mut out);
        out
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn bind(segment: &Segment, actual: &str, params: &mut BTreeMap<String, String>) -> bool {
    match segment {
        Segment::Literal(lit) => lit == actual,
        Segment::Wildcard(name) => {
            params.insert(name.clone(), actual.to_string());
            true
        }
    }
}

fn child<'a>(value: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    value.and_then(|v| v.as_object()).and_then(|m| m.get(key))
}

fn descend(
    segments: &[Segment],
    params: BTreeMap<String, String>,
    before: Option<&Value>,
    after: Option<&Value>,
    out: &mut Vec<Change>,
) {
    let Some((head, rest)) = segments.split_first() else {
        if before != after {
            out.push(Change {
                params,
                before: before.cloned(),
                after: after.cloned(),
            });
        }
        return;
    };

    match head {
        Segment::Literal(name) => descend(rest, params, child(before, name), child(after, name), out),
        Segment::Wildcard(var) => {
            let keys: BTreeSet<&String> = [before, after]
                .into_iter()
                .flatten()
                .filter_map(Value::as_object)
                .flat_map(|m| m.keys())
                .collect();
            for key in keys {
                let mut bound = params.clone();
                bound.insert(var.clone(), key.clone());
                descend(rest, bound, child(before, key), child(after, key), out);
            }
        }
    }
}

/// A pattern bound to the kind of change it reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub pattern: Pattern,
    pub kind: EventKind,
}

impl Trigger {
    pub fn new(pattern: &str, kind: EventKind) -> Result<Self, PatternError> {
        Ok(Self {
            pattern: Pattern::parse(pattern)?,
            kind,
        })
    }

    pub fn fire(&self, event: &ChangeEvent) -> Vec<Change> {
        self.pattern
            .matches(event)
            .into_iter()
            .filter(|c| self.kind.accepts(c.before.is_some(), c.after.is_some()))
            .collect()
    }
}

/// The before/after snapshots a reaction receives, plus the wildcard values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Change {
    pub params: BTreeMap<String, String>,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

impl Change {
    pub fn new(params: &[(&str, &str)], before: Option<Value>, after: Option<Value>) -> Self {
        Self {
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            before,
            after,
        }
    }

    pub fn param(&self, name: &'static str) -> Result<&str, ReactionError> {
        self.params
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ReactionError::missing_field("trigger parameters", name))
    }

    pub fn before_as<T: DeserializeOwned>(&self) -> Result<Option<T>, ReactionError> {
        decode(self.before.as_ref(), "before")
    }

    pub fn after_as<T: DeserializeOwned>(&self) -> Result<Option<T>, ReactionError> {
        decode(self.after.as_ref(), "after")
    }

    pub fn before_text(&self) -> Option<String> {
        text(self.before.as_ref())
    }

    pub fn after_text(&self) -> Option<String> {
        text(self.after.as_ref())
    }
}

fn decode<T: DeserializeOwned>(value: Option<&Value>, which: &str) -> Result<Option<T>, ReactionError> {
    value
        .map(|v| {
            serde_json::from_value(v.clone()).map_err(|source| ReactionError::Malformed {
                path: format!("{} snapshot", which),
                source,
            })
        })
        .transpose()
}

/// Scalar snapshot as text; objects and arrays have none.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
