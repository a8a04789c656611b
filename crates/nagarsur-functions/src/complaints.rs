use std::collections::BTreeMap;

use tracing::info;

use nagarsur_types::PushResponse;
use nagarsur_types::models::{Complaint, NotificationRecord};
use nagarsur_types::path as paths;

use crate::context::ReactionContext;
use crate::error::ReactionError;
use crate::names::non_empty;
use crate::notify;
use crate::trigger::Change;

const DEFAULT_ISSUE_TITLE: &str = "Your complaint";

pub fn status_title(issue_type: Option<&str>) -> String {
    format!("Status Update: {}", non_empty(issue_type).unwrap_or(DEFAULT_ISSUE_TITLE))
}

pub fn status_body(status: &str, admin_note: Option<&str>) -> String {
    match non_empty(admin_note) {
        Some(note) => format!("Your issue has been marked as {}. {}", status, note),
        None => format!("Your issue has been marked as {}.", status),
    }
}

/// Notify the complaint's owner that its status changed, and log the
/// notification in their history whether or not delivery worked.
pub async fn send_status_update_notification(
    ctx: &ReactionContext,
    change: &Change,
) -> Result<Option<PushResponse>, ReactionError> {
    let complaint_id = change.param("complaintId")?;
    let before: Complaint = change.before_as()?.unwrap_or_default();
    let after: Complaint = change.after_as()?.unwrap_or_default();

    if before.status == after.status {
        info!("Status unchanged, no notification needed");
        return Ok(None);
    }
    let Some(new_status) = non_empty(after.status.as_deref()) else {
        info!("Status cleared on complaint {}, no notification needed", complaint_id);
        return Ok(None);
    };

    let complaint_path = paths::complaint(complaint_id)?;
    let user_id = non_empty(after.user_id.as_deref())
        .ok_or_else(|| ReactionError::missing_field(&complaint_path, "user_id"))?;

    let Some(token) = notify::resolve_token(ctx, user_id).await? else {
        return Ok(None);
    };

    let issue_title = non_empty(after.issue_type.as_deref()).unwrap_or(DEFAULT_ISSUE_TITLE);
    let mut data = BTreeMap::new();
    data.insert("complaintId".to_string(), complaint_id.to_string());
    data.insert("newStatus".to_string(), new_status.to_string());
    data.insert("issueTitle".to_string(), issue_title.to_string());

    let payload = notify::payload(
        &ctx.settings,
        status_title(after.issue_type.as_deref()),
        status_body(new_status, after.admin_note.as_deref()),
        data,
    );

    let response = notify::deliver(ctx, &token, &payload, "status update").await;

    let record = NotificationRecord {
        title: payload.notification.title.clone(),
        body: payload.notification.body.clone(),
        timestamp: ctx.now_ms(),
        complaint_id: complaint_id.to_string(),
        status: Some(new_status.to_string()),
        read: false,
    };
    notify::record_history(ctx, user_id, &record).await;

    Ok(response)
}

/// Forward a new admin note on a complaint to its owner.
pub async fn send_admin_note_notification(
    ctx: &ReactionContext,
    change: &Change,
) -> Result<Option<PushResponse>, ReactionError> {
    let complaint_id = change.param("complaintId")?;
    let new_note = change.after_text().unwrap_or_default();

    if new_note.is_empty() || change.before_text().as_deref() == Some(new_note.as_str()) {
        info!("Admin note unchanged or empty, no notification needed");
        return Ok(None);
    }

    // The trigger fires on the child path; owner and issue live on the parent.
    let complaint_path = paths::complaint(complaint_id)?;
    let complaint: Complaint = ctx
        .read(&complaint_path)
        .await?
        .ok_or_else(|| ReactionError::MissingRecord(complaint_path.to_string()))?;

    let user_id = non_empty(complaint.user_id.as_deref())
        .ok_or_else(|| ReactionError::missing_field(&complaint_path, "user_id"))?;

    let Some(token) = notify::resolve_token(ctx, user_id).await? else {
        return Ok(None);
    };

    let issue_title = non_empty(complaint.issue_type.as_deref()).unwrap_or(DEFAULT_ISSUE_TITLE);
    let mut data = BTreeMap::new();
    data.insert("complaintId".to_string(), complaint_id.to_string());

    let payload = notify::payload(
        &ctx.settings,
        format!("Update on: {}", issue_title),
        new_note,
        data,
    );

    let response = notify::deliver(ctx, &token, &payload, "admin note").await;

    let record = NotificationRecord {
        title: payload.notification.title.clone(),
        body: payload.notification.body.clone(),
        timestamp: ctx.now_ms(),
        complaint_id: complaint_id.to_string(),
        status: non_empty(complaint.status.as_deref()).map(str::to_string),
        read: false,
    };
    notify::record_history(ctx, user_id, &record).await;

    Ok(response)
}
