use tracing::info;

use crate::error::ReactionError;
use crate::trigger::Change;

/// Observe push-token writes. Removal is acknowledged; creation and rotation
/// are logged. Topic re-subscription would hook in here.
pub fn handle_token_refresh(change: &Change) -> Result<(), ReactionError> {
    let user_id = change.param("userId")?;

    let Some(_token) = change.after_text().filter(|t| !t.is_empty()) else {
        info!("FCM token removed for user: {}", user_id);
        return Ok(());
    };

    let transition = if change.before.is_some() { "updated" } else { "created" };
    info!("FCM token {} for user: {}", transition, user_id);
    Ok(())
}
