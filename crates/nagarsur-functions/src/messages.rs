use serde_json::{Map, Value, json};
use tracing::{error, info, warn};

use nagarsur_types::models::{Message, User};
use nagarsur_types::path as paths;

use crate::context::ReactionContext;
use crate::error::ReactionError;
use crate::names::{self, UNKNOWN_USER, non_empty};
use crate::profiles::write_profile;
use crate::trigger::Change;

/// Back-fill `senderName` (and the reply preview) on a message created
/// without one.
pub async fn add_sender_name(ctx: &ReactionContext, change: &Change) -> Result<(), ReactionError> {
    let message_id = change.param("messageId")?;
    let Some(message) = change.after_as::<Message>()? else {
        return Ok(());
    };

    if non_empty(message.sender_name.as_deref()).is_some() {
        return Ok(());
    }
    let Some(sender_id) = non_empty(message.sender_id.as_deref()) else {
        return Ok(());
    };

    let sender_name = resolve_sender_name(ctx, sender_id).await?;

    let mut fields = Map::new();
    fields.insert("senderName".into(), Value::from(sender_name.clone()));
    fields.insert("createdAt".into(), Value::from(ctx.now_ms()));

    if let Some(reply_to) = non_empty(message.reply_to.as_deref()) {
        match ctx.read::<Message>(&paths::message(reply_to)?).await {
            Ok(Some(replied)) => {
                fields.insert("replyToMessage".into(), json!(replied.message.unwrap_or_default()));
                let replied_sender = non_empty(replied.sender_name.as_deref()).unwrap_or(UNKNOWN_USER);
                fields.insert("replyToSender".into(), json!(replied_sender));
            }
            Ok(None) => warn!("Replied-to message {} not found", reply_to),
            Err(e) => error!("Error getting replied message {}: {}", reply_to, e),
        }
    }

    // Conditional so a message already removed by ban enforcement stays removed.
    if ctx.store.update_existing(&paths::message(message_id)?, fields).await? {
        info!("Added sender name \"{}\" to message {}", sender_name, message_id);
    } else {
        info!("Message {} was removed before its sender name was added", message_id);
    }
    Ok(())
}

/// Stored profile first; otherwise the identity provider, which also seeds a
/// profile. An unreachable identity provider yields the placeholder name.
async fn resolve_sender_name(ctx: &ReactionContext, sender_id: &str) -> Result<String, ReactionError> {
    if let Some(user) = ctx.read::<User>(&paths::user(sender_id)?).await? {
        return Ok(names::stored_user_name(&user, sender_id));
    }

    match ctx.identity.get_user(sender_id).await {
        Ok(record) => {
            let name = names::identity_name(&record);
            if let Err(e) = write_profile(ctx, sender_id, &name, record.email.as_deref()).await {
                error!("Error creating user record for {}: {}", sender_id, e);
            }
            Ok(name)
        }
        Err(e) => {
            error!("Error getting user {} from identity provider: {}", sender_id, e);
            Ok(names::placeholder_name(sender_id))
        }
    }
}

/// Remove a banned sender's message and leave a system notice in its place.
pub async fn check_user_ban_status(ctx: &ReactionContext, change: &Change) -> Result<(), ReactionError> {
    let message_id = change.param("messageId")?;
    let Some(message) = change.after_as::<Message>()? else {
        return Ok(());
    };
    let Some(sender_id) = non_empty(message.sender_id.as_deref()) else {
        info!("No senderId found in message {}", message_id);
        return Ok(());
    };

    if !ctx.store.exists(&paths::banned_user(sender_id)?).await? {
        info!("User {} is not banned, message allowed", sender_id);
        return Ok(());
    }

    warn!("Banned user {} attempted to send message {}, deleting", sender_id, message_id);

    // Only the invocation that actually removed the message posts the notice.
    if !ctx.store.remove(&paths::message(message_id)?).await? {
        info!("Message {} was already removed", message_id);
        return Ok(());
    }

    let notice = Message::banned_removal_notice(ctx.now_ms());
    let key = ctx.store.push(&paths::discussion(), serde_json::to_value(notice)?).await?;
    info!("Posted removal notice {} for message {}", key, message_id);
    Ok(())
}
