//! Steps shared by the push-sending reactions: token lookup, payload
//! assembly, fail-open delivery and the history append.

use std::collections::BTreeMap;

use tracing::{error, info, warn};

use nagarsur_types::models::{NotificationRecord, User};
use nagarsur_types::path as paths;
use nagarsur_types::push::{Notification, PushPayload};
use nagarsur_types::PushResponse;

use crate::context::{NotificationSettings, ReactionContext};
use crate::error::ReactionError;
use crate::names::non_empty;

/// Push token of `user_id`. A missing user is an error; a user without a
/// token is a normal early exit.
pub async fn resolve_token(ctx: &ReactionContext, user_id: &str) -> Result<Option<String>, ReactionError> {
    let path = paths::user(user_id)?;
    let user: User = ctx
        .read(&path)
        .await?
        .ok_or_else(|| ReactionError::MissingRecord(path.to_string()))?;

    match non_empty(user.fcm_token.as_deref()) {
        Some(token) => Ok(Some(token.to_string())),
        None => {
            warn!("No FCM token found for user: {}", user_id);
            Ok(None)
        }
    }
}

/// Build a payload; `click_action` is always added to `data`.
pub fn payload(
    settings: &NotificationSettings,
    title: String,
    body: String,
    mut data: BTreeMap<String, String>,
) -> PushPayload {
    data.insert("click_action".into(), settings.click_action.clone());
    PushPayload {
        notification: Notification {
            title,
            body,
            icon: settings.icon.clone(),
            sound: settings.sound.clone(),
        },
        data,
    }
}

/// Attempt delivery. Failures are logged and reported as `None`; they never
/// abort the calling reaction.
pub async fn deliver(ctx: &ReactionContext, token: &str, payload: &PushPayload, what: &str) -> Option<PushResponse> {
    match ctx.push.send_to_device(token, payload).await {
        Ok(response) => {
            info!(
                "Sent {} notification: {} succeeded, {} failed",
                what, response.success_count, response.failure_count
            );
            if response.failure_count > 0 {
                let failed: Vec<_> = response.failed_results().collect();
                warn!("Some {} notification sends failed: {:?}", what, failed);
            }
            Some(response)
        }
        Err(e) => {
            error!("Error sending {} notification: {}", what, e);
            None
        }
    }
}

/// Append to `/users/{id}/notifications`. Failure is logged, not returned.
pub async fn record_history(ctx: &ReactionContext, user_id: &str, record: &NotificationRecord) {
    let result = async {
        let path = paths::user_notifications(user_id)?;
        let key = ctx.store.push(&path, serde_json::to_value(record)?).await?;
        Ok::<_, ReactionError>(key)
    }
    .await;

    match result {
        Ok(key) => info!("Notification {} saved to history of {}", key, user_id),
        Err(e) => error!("Failed to save notification to history of {}: {}", user_id, e),
    }
}
