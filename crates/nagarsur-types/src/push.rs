use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_ICON: &str = "@mipmap/ic_launcher";
pub const DEFAULT_SOUND: &str = "default";
pub const DEFAULT_CLICK_ACTION: &str = "FLUTTER_NOTIFICATION_CLICK";

/// Visible part of a push message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub sound: String,
}

/// `{ notification: {...}, data: {...} }` addressed to a single device token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushPayload {
    pub notification: Notification,
    pub data: BTreeMap<String, String>,
}

/// Per-token outcome. Exactly one of the two fields is set by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multicast_id: Option<i64>,
    pub success_count: u32,
    pub failure_count: u32,
    #[serde(default)]
    pub results: Vec<PushResult>,
}

impl PushResponse {
    pub fn failed_results(&self) -> impl Iterator<Item = &PushResult> {
        self.results.iter().filter(|r| r.error.is_some())
    }
}
