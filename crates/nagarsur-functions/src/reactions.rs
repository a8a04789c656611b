use std::fmt;

use tracing::{Instrument, error, info_span, warn};

use nagarsur_types::{IdentityRecord, PushResponse};

use crate::context::ReactionContext;
use crate::error::ReactionError;
use crate::trigger::{Change, EventKind};
use crate::{complaints, messages, profiles, reports, tokens};

/// What a reaction leaves behind for the caller: the push gateway's response
/// when it delivered something, otherwise nothing.
pub type Outcome = Option<PushResponse>;

/// Every reaction the engine runs, named after its deployed function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reaction {
    AddSenderNameToMessage,
    CheckUserBanStatus,
    CreateUserProfile,
    SendStatusUpdateNotification,
    SendAdminNoteNotification,
    HandleTokenRefresh,
    HandleMessageReport,
    HandleReportStatusUpdate,
}

/// Where a reaction listens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Database { pattern: &'static str, kind: EventKind },
    AccountCreated,
}

/// The payload a reaction is invoked with.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerInput {
    Change(Change),
    Account(IdentityRecord),
}

impl fmt::Display for TriggerInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Change(change) => write!(f, "{:?}", change.params),
            Self::Account(record) => write!(f, "account {}", record.uid),
        }
    }
}

impl Reaction {
    pub const ALL: [Reaction; 8] = [
        Self::AddSenderNameToMessage,
        Self::CheckUserBanStatus,
        Self::CreateUserProfile,
        Self::SendStatusUpdateNotification,
        Self::SendAdminNoteNotification,
        Self::HandleTokenRefresh,
        Self::HandleMessageReport,
        Self::HandleReportStatusUpdate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::AddSenderNameToMessage => "addSenderNameToMessage",
            Self::CheckUserBanStatus => "checkUserBanStatus",
            Self::CreateUserProfile => "createUserProfile",
            Self::SendStatusUpdateNotification => "sendStatusUpdateNotification",
            Self::SendAdminNoteNotification => "sendAdminNoteNotification",
            Self::HandleTokenRefresh => "handleTokenRefresh",
            Self::HandleMessageReport => "handleMessageReport",
            Self::HandleReportStatusUpdate => "handleReportStatusUpdate",
        }
    }

    pub fn binding(self) -> Binding {
        use EventKind::*;
        match self {
            Self::AddSenderNameToMessage | Self::CheckUserBanStatus => Binding::Database {
                pattern: "/discussion/{messageId}",
                kind: Create,
            },
            Self::CreateUserProfile => Binding::AccountCreated,
            Self::SendStatusUpdateNotification => Binding::Database {
                pattern: "/complaints/{complaintId}",
                kind: Update,
            },
            Self::SendAdminNoteNotification => Binding::Database {
                pattern: "/complaints/{complaintId}/admin_note",
                kind: Update,
            },
            Self::HandleTokenRefresh => Binding::Database {
                pattern: "/users/{userId}/fcmToken",
                kind: Write,
            },
            Self::HandleMessageReport => Binding::Database {
                pattern: "/reports/{reportId}",
                kind: Create,
            },
            Self::HandleReportStatusUpdate => Binding::Database {
                pattern: "/message_reports/{reportId}/status",
                kind: Update,
            },
        }
    }

    /// Run the reaction body. Errors surface here; see [`invoke`](Self::invoke).
    pub async fn run(self, ctx: &ReactionContext, input: &TriggerInput) -> Result<Outcome, ReactionError> {
        match (self, input) {
            (Self::AddSenderNameToMessage, TriggerInput::Change(c)) => {
                messages::add_sender_name(ctx, c).await.map(|_| None)
            }
            (Self::CheckUserBanStatus, TriggerInput::Change(c)) => {
                messages::check_user_ban_status(ctx, c).await.map(|_| None)
            }
            (Self::CreateUserProfile, TriggerInput::Account(a)) => {
                profiles::create_user_profile(ctx, a).await.map(|_| None)
            }
            (Self::SendStatusUpdateNotification, TriggerInput::Change(c)) => {
                complaints::send_status_update_notification(ctx, c).await
            }
            (Self::SendAdminNoteNotification, TriggerInput::Change(c)) => {
                complaints::send_admin_note_notification(ctx, c).await
            }
            (Self::HandleTokenRefresh, TriggerInput::Change(c)) => {
                tokens::handle_token_refresh(c).map(|_| None)
            }
            (Self::HandleMessageReport, TriggerInput::Change(c)) => {
                reports::handle_message_report(ctx, c).await.map(|_| None)
            }
            (Self::HandleReportStatusUpdate, TriggerInput::Change(c)) => {
                reports::handle_report_status_update(ctx, c).await
            }
            (reaction, input) => {
                warn!("{} cannot handle trigger input {}", reaction.name(), input);
                Ok(None)
            }
        }
    }

    /// Run the reaction and absorb any failure. The trigger framework must
    /// never see an error, or it would redeliver and duplicate side effects.
    pub async fn invoke(self, ctx: &ReactionContext, input: &TriggerInput) -> Outcome {
        let span = info_span!("reaction", name = self.name(), trigger = %input);
        async {
            match self.run(ctx, input).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Error in {}: {}", self.name(), e);
                    None
                }
            }
        }
        .instrument(span)
        .await
    }
}

impl fmt::Display for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;
    use crate::trigger::Trigger;
    use serde_json::json;

    #[test]
    fn every_binding_parses() {
        for reaction in Reaction::ALL {
            if let Binding::Database { pattern, kind } = reaction.binding() {
                assert!(Trigger::new(pattern, kind).is_ok(), "{}", reaction);
            }
        }
    }

    #[tokio::test]
    async fn invoke_absorbs_errors() {
        let h = Harness::new();
        // No user_id on the complaint: the body fails, the invocation does not.
        let input = TriggerInput::Change(Change::new(
            &[("complaintId", "c1")],
            Some(json!({"status": "open"})),
            Some(json!({"status": "closed"})),
        ));

        assert!(Reaction::SendStatusUpdateNotification.run(&h.ctx, &input).await.is_err());
        assert_eq!(Reaction::SendStatusUpdateNotification.invoke(&h.ctx, &input).await, None);
    }

    #[tokio::test]
    async fn mismatched_input_is_ignored() {
        let h = Harness::new();
        let input = TriggerInput::Account(IdentityRecord {
            uid: "u1".into(),
            ..Default::default()
        });
        assert_eq!(Reaction::HandleMessageReport.invoke(&h.ctx, &input).await, None);
        assert!(h.get("/admin_notifications").await.is_none());
    }
}
