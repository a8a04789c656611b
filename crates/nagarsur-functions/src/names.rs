//! Display-name fallbacks: the first non-empty of the stored name, the stored
//! display name, the email local part, then a `User<n>` placeholder.

use sha2::{Digest, Sha256};

use nagarsur_types::IdentityRecord;
use nagarsur_types::models::User;

pub const UNKNOWN_USER: &str = "Unknown User";

pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Text before the first `@`, if that is non-empty.
pub fn email_local_part(email: Option<&str>) -> Option<&str> {
    non_empty(email).and_then(|e| non_empty(e.split('@').next()))
}

/// `User<0-999>`, derived from a SHA-256 of the uid so every run and every
/// build picks the same name.
pub fn placeholder_name(uid: &str) -> String {
    let digest = Sha256::digest(uid.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    format!("User{}", u64::from_be_bytes(head) % 1000)
}

/// Name for a user that already has a `/users` record.
pub fn stored_user_name(user: &User, uid: &str) -> String {
    non_empty(user.name.as_deref())
        .or_else(|| non_empty(user.display_name.as_deref()))
        .or_else(|| email_local_part(user.email.as_deref()))
        .map(str::to_string)
        .unwrap_or_else(|| placeholder_name(uid))
}

/// Name for an account known only to the identity provider.
pub fn identity_name(record: &IdentityRecord) -> String {
    non_empty(record.display_name.as_deref())
        .or_else(|| email_local_part(record.email.as_deref()))
        .map(str::to_string)
        .unwrap_or_else(|| placeholder_name(&record.uid))
}
