//! # meshdir-core
//!
//! Core types for the meshnet directory client: machines, peers with their
//! bidirectional permission grants, topology maps, and pairing invitations.
//! The config and client crates build on these types.

pub mod error;
pub mod invitation;
pub mod types;

pub use error::{DirectoryError, DirectoryErrorKind, MeshError, Result};
pub use invitation::{Invitation, InvitationAction, InvitationId, InvitationState, InviteGrants};
pub use types::*;
