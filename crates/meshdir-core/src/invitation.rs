//! Pairing invitations and their lifecycle.
//!
//! An invitation starts as [`InvitationState::Sent`] and ends in exactly one of
//! `Accepted`, `Rejected` or `Revoked`. Nothing leaves a terminal state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MeshError, Result};

/// Unique identifier of an invitation.
pub type InvitationId = Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationState {
    #[default]
    Sent,
    Accepted,
    Rejected,
    Revoked,
}

/// What one side of an invitation can do to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationAction {
    /// Receiver approves the pairing.
    Accept,
    /// Receiver declines.
    Reject,
    /// Sender withdraws.
    Revoke,
}

impl InvitationState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, InvitationState::Sent)
    }

    /// Next state after `action`, or `InvalidTransition` from a terminal state.
    pub fn transition(self, action: InvitationAction) -> Result<InvitationState> {
        match (self, action) {
            (InvitationState::Sent, InvitationAction::Accept) => Ok(InvitationState::Accepted),
            (InvitationState::Sent, InvitationAction::Reject) => Ok(InvitationState::Rejected),
            (InvitationState::Sent, InvitationAction::Revoke) => Ok(InvitationState::Revoked),
            (from, action) => Err(MeshError::InvalidTransition { from, action }),
        }
    }
}

impl fmt::Display for InvitationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InvitationState::Sent => "sent",
            InvitationState::Accepted => "accepted",
            InvitationState::Rejected => "rejected",
            InvitationState::Revoked => "revoked",
        })
    }
}

impl fmt::Display for InvitationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InvitationAction::Accept => "accepted",
            InvitationAction::Reject => "rejected",
            InvitationAction::Revoke => "revoked",
        })
    }
}

/// Permissions one user offers (on invite) or grants (on accept) to the other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteGrants {
    pub allow_routing: bool,
    pub allow_inbound: bool,
    pub allow_local_network: bool,
    pub allow_fileshare: bool,
}

/// An offer to pair two users' meshnet identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: InvitationId,
    /// Email of the inviting user.
    pub sender: String,
    /// Email of the invited user.
    pub receiver: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub state: InvitationState,
    /// Grants attached by the receiver when the invitation was accepted.
    pub grants: Option<InviteGrants>,
}

impl Invitation {
    pub fn is_pending(&self) -> bool {
        self.state == InvitationState::Sent
    }

    /// Move this invitation through `action`, leaving it untouched on error.
    pub fn apply(&mut self, action: InvitationAction) -> Result<()> {
        self.state = self.state.transition(action)?;
        Ok(())
    }

    /// Accept with the receiver's grants attached.
    pub fn accept(&mut self, grants: InviteGrants) -> Result<()> {
        self.apply(InvitationAction::Accept)?;
        self.grants = Some(grants);
        Ok(())
    }
}
