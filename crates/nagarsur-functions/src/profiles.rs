use tracing::info;

use nagarsur_types::IdentityRecord;
use nagarsur_types::models::User;
use nagarsur_types::path as paths;

use crate::context::{ReactionContext, to_fields};
use crate::error::ReactionError;
use crate::names;

/// Seed `/users/{uid}` for a newly created account.
pub async fn create_user_profile(ctx: &ReactionContext, account: &IdentityRecord) -> Result<(), ReactionError> {
    let name = names::identity_name(account);
    write_profile(ctx, &account.uid, &name, account.email.as_deref()).await?;
    info!("Created user profile for {} with name \"{}\"", account.uid, name);
    Ok(())
}

/// Merge `{name, displayName, email, createdAt}` into `/users/{uid}`.
pub async fn write_profile(
    ctx: &ReactionContext,
    uid: &str,
    name: &str,
    email: Option<&str>,
) -> Result<(), ReactionError> {
    let profile = User {
        name: Some(name.to_string()),
        display_name: Some(name.to_string()),
        email: Some(email.unwrap_or_default().to_string()),
        created_at: Some(ctx.now_ms()),
        ..Default::default()
    };
    ctx.store.update(&paths::user(uid)?, to_fields(&profile)?).await?;
    Ok(())
}
