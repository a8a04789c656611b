use std::collections::BTreeMap;

use tracing::{info, warn};

use nagarsur_types::PushResponse;
use nagarsur_types::models::{
    ADMIN_NOTIFICATION_MESSAGE_REPORT, ADMIN_STATUS_PENDING, AdminNotification, Message, Report, User,
};
use nagarsur_types::path as paths;

use crate::context::ReactionContext;
use crate::error::ReactionError;
use crate::names::{UNKNOWN_USER, non_empty};
use crate::notify;
use crate::trigger::Change;

const NON_TEXT_CONTENT: &str = "Media/Poll content";

/// Queue a moderator notification for a newly reported message. No push.
pub async fn handle_message_report(ctx: &ReactionContext, change: &Change) -> Result<(), ReactionError> {
    let report_id = change.param("reportId")?;
    let report_path = paths::report(report_id)?;
    let report: Report = change.after_as()?.unwrap_or_default();

    let message_id = non_empty(report.message_id.as_deref())
        .ok_or_else(|| ReactionError::missing_field(&report_path, "messageId"))?;

    let Some(message) = ctx.read::<Message>(&paths::message(message_id)?).await? else {
        warn!("Reported message {} not found", message_id);
        return Ok(());
    };

    let reporter_name = match non_empty(report.reporter_id.as_deref()) {
        Some(reporter_id) => ctx
            .read::<User>(&paths::user(reporter_id)?)
            .await?
            .and_then(|u| u.name)
            .filter(|n| !n.is_empty()),
        None => None,
    };

    let notification = AdminNotification {
        kind: ADMIN_NOTIFICATION_MESSAGE_REPORT.into(),
        report_id: report_id.to_string(),
        message_id: message_id.to_string(),
        reported_user_id: message.sender_id,
        reported_user_name: message.sender_name,
        reporter_name: reporter_name.unwrap_or_else(|| UNKNOWN_USER.to_string()),
        reason: report.reason,
        message_content: message
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| NON_TEXT_CONTENT.to_string()),
        timestamp: ctx.now_ms(),
        status: ADMIN_STATUS_PENDING.into(),
    };

    ctx.store
        .push(&paths::admin_notifications(), serde_json::to_value(&notification)?)
        .await?;
    info!("Message report created: {}", report_id);
    Ok(())
}

/// Tell the reporter that moderators changed their report's status.
/// Nothing is added to the reporter's notification history.
pub async fn handle_report_status_update(
    ctx: &ReactionContext,
    change: &Change,
) -> Result<Option<PushResponse>, ReactionError> {
    let report_id = change.param("reportId")?;
    let Some(new_status) = change.after_text().filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    let report_path = paths::message_report(report_id)?;
    let report: Report = ctx
        .read(&report_path)
        .await?
        .ok_or_else(|| ReactionError::MissingRecord(report_path.to_string()))?;

    let reporter_id = non_empty(report.reporter_id.as_deref())
        .ok_or_else(|| ReactionError::missing_field(&report_path, "reporterId"))?;

    let Some(token) = notify::resolve_token(ctx, reporter_id).await? else {
        return Ok(None);
    };

    let mut data = BTreeMap::new();
    data.insert("reportId".to_string(), report_id.to_string());
    data.insert("newStatus".to_string(), new_status.clone());

    let payload = notify::payload(
        &ctx.settings,
        "Report Status Update".to_string(),
        format!(
            "Your report has been marked as {}. Thank you for helping keep our community safe.",
            new_status
        ),
        data,
    );

    let response = notify::deliver(ctx, &token, &payload, "report status").await;
    if response.is_some() {
        info!("Report status notification sent to reporter: {}", reporter_id);
    }
    Ok(response)
}
