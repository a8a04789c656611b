//! Records as they are stored in the directory store. Field names match the
//! stored JSON: users, messages and reports are camelCase, complaints snake_case.
//! Every field is optional on read since clients write partial records.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Clients write these records directly, so a field holding the wrong JSON
/// type reads as absent instead of failing the whole record.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub fcm_token: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

/// A discussion message. `message` is absent for media and poll posts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub reply_to_message: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub reply_to_sender: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl Message {
    /// The announcement left behind when a banned user's message is removed.
    pub fn banned_removal_notice(now_ms: i64) -> Self {
        Self {
            sender_id: Some("system".into()),
            sender_name: Some("System".into()),
            message: Some("A message from a banned user was automatically removed".into()),
            message_type: Some("system".into()),
            timestamp: Some(now_ms),
            created_at: Some(now_ms),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Complaint {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub admin_note: Option<String>,
}

/// A user report against a discussion message. Both `/reports` and
/// `/message_reports` hold this shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub reporter_id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

pub type MessageReport = Report;

/// Entry in `/users/{id}/notifications`. Written once; only `read` changes later,
/// and never by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub title: String,
    pub body: String,
    pub timestamp: i64,
    pub complaint_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub read: bool,
}

pub const ADMIN_NOTIFICATION_MESSAGE_REPORT: &str = "message_report";
pub const ADMIN_STATUS_PENDING: &str = "pending";

/// Entry in `/admin_notifications`, queued for moderators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminNotification {
    #[serde(rename = "type")]
    pub kind: String,
    pub report_id: String,
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_user_name: Option<String>,
    pub reporter_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub message_content: String,
    pub timestamp: i64,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_reads_partial_record() {
        let user: User = serde_json::from_value(json!({
            "displayName": "Asha",
            "fcmToken": "tok1",
            "notifications": { "a": { "title": "x" } }
        }))
        .unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Asha"));
        assert_eq!(user.fcm_token.as_deref(), Some("tok1"));
        assert!(user.name.is_none());
    }

    #[test]
    fn mistyped_fields_read_as_absent() {
        let msg: Message = serde_json::from_value(json!({
            "senderId": "bad",
            "message": "spam",
            "timestamp": 1700000000000.5,
            "replyTo": 17
        }))
        .unwrap();
        assert_eq!(msg.sender_id.as_deref(), Some("bad"));
        assert_eq!(msg.message.as_deref(), Some("spam"));
        assert!(msg.timestamp.is_none());
        assert!(msg.reply_to.is_none());

        let user: User = serde_json::from_value(json!({
            "name": null, "createdAt": "yesterday", "fcmToken": "tok1"
        }))
        .unwrap();
        assert!(user.name.is_none());
        assert!(user.created_at.is_none());
        assert_eq!(user.fcm_token.as_deref(), Some("tok1"));
    }

    #[test]
    fn complaint_uses_snake_case() {
        let c: Complaint = serde_json::from_value(json!({
            "user_id": "u1", "issue_type": "Pothole", "status": "open"
        }))
        .unwrap();
        assert_eq!(c.user_id.as_deref(), Some("u1"));
        assert_eq!(c.issue_type.as_deref(), Some("Pothole"));
        assert!(c.admin_note.is_none());
    }

    #[test]
    fn system_notice_shape() {
        let v = serde_json::to_value(Message::banned_removal_notice(42)).unwrap();
        assert_eq!(
            v,
            json!({
                "senderId": "system",
                "senderName": "System",
                "message": "A message from a banned user was automatically removed",
                "messageType": "system",
                "timestamp": 42,
                "createdAt": 42
            })
        );
    }

    #[test]
    fn admin_notification_field_names() {
        let n = AdminNotification {
            kind: ADMIN_NOTIFICATION_MESSAGE_REPORT.into(),
            report_id: "rep1".into(),
            message_id: "m1".into(),
            reported_user_id: Some("s1".into()),
            reported_user_name: Some("Alice".into()),
            reporter_name: "Bob".into(),
            reason: Some("spam".into()),
            message_content: "hi".into(),
            timestamp: 7,
            status: ADMIN_STATUS_PENDING.into(),
        };
        let v = serde_json::to_value(&n).unwrap();
        assert_eq!(v["type"], "message_report");
        assert_eq!(v["reportedUserId"], "s1");
        assert_eq!(v["messageContent"], "hi");
        assert_eq!(v["status"], "pending");
    }
}
