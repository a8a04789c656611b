//! Server-side reactions for the complaint and discussion app: sender-name
//! back-fill, ban enforcement, profile seeding, complaint and report
//! notifications, and the runtime that fires them from the change feed.

pub mod complaints;
pub mod context;
pub mod error;
pub mod fcm;
pub mod messages;
pub mod names;
pub mod notify;
pub mod profiles;
pub mod reactions;
pub mod reports;
pub mod runtime;
pub mod tokens;
pub mod trigger;

#[cfg(test)]
mod testing;

pub use context::{NotificationSettings, ReactionContext};
pub use error::ReactionError;
pub use fcm::{DisabledPush, FcmClient};
pub use reactions::{Binding, Outcome, Reaction, TriggerInput};
pub use runtime::Runtime;
pub use trigger::{Change, EventKind, PatternError, Trigger};
