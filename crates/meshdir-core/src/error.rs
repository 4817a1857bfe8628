use std::fmt;

use thiserror::Error;

use crate::invitation::{InvitationAction, InvitationState};

/// Unified error type for the directory client.
#[derive(Error, Debug)]
pub enum MeshError {
    // ── Precondition errors ────────────────────────────────────
    #[error("public key not provided")]
    MissingPublicKey,

    #[error("os name or distribution not provided")]
    MissingOsInfo,

    #[error("endpoints not provided")]
    MissingEndpoints,

    // ── Transport errors ───────────────────────────────────────
    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Directory errors ───────────────────────────────────────
    #[error("directory error: {0}")]
    Directory(DirectoryError),

    #[error("invalid directory response: {0}")]
    InvalidDirectoryResponse(String),

    // ── Invitation state machine ───────────────────────────────
    #[error("invitation cannot be {action} while {from}")]
    InvalidTransition {
        from: InvitationState,
        action: InvitationAction,
    },

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, MeshError>;

impl MeshError {
    /// Kind of the directory-reported error, if this is one.
    pub fn directory_kind(&self) -> Option<DirectoryErrorKind> {
        match self {
            MeshError::Directory(e) => Some(e.kind),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.directory_kind() == Some(DirectoryErrorKind::NotFound)
    }

    pub fn is_invalid_state(&self) -> bool {
        self.directory_kind() == Some(DirectoryErrorKind::InvalidState)
    }
}

impl From<DirectoryError> for MeshError {
    fn from(e: DirectoryError) -> Self {
        MeshError::Directory(e)
    }
}

/// Classification of a non-success directory response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    /// The record exists but is not in a state that permits the operation,
    /// e.g. accepting an invitation that was already revoked.
    InvalidState,
    RateLimited,
    Server,
    Other,
}

impl DirectoryErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 | 422 => Self::InvalidState,
            429 => Self::RateLimited,
            500..=599 => Self::Server,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for DirectoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BadRequest => "bad request",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not found",
            Self::InvalidState => "invalid state",
            Self::RateLimited => "rate limited",
            Self::Server => "server error",
            Self::Other => "unexpected status",
        };
        f.write_str(s)
    }
}

/// Structured error decoded from the directory's error envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryError {
    pub kind: DirectoryErrorKind,
    /// HTTP status of the response.
    pub status: u16,
    /// Directory-specific error code, when the envelope carried one.
    pub code: Option<i64>,
    pub message: String,
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (HTTP {}", self.kind, self.status)?;
        if let Some(code) = self.code {
            write!(f, ", code {code}")?;
        }
        write!(f, ")")?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}
