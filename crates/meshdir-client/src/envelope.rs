//! The directory's shared error envelope.
//!
//! Every non-success response is checked here before any success-path decoding:
//!
//! ```json
//! { "errors": { "code": 101301, "message": "Invitation is no longer valid" } }
//! ```

use meshdir_core::{DirectoryError, DirectoryErrorKind, MeshError, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::warn;

use crate::transport::ApiResponse;

#[derive(Deserialize)]
struct ErrorEnvelope {
    errors: EnvelopeBody,
}

#[derive(Deserialize)]
struct EnvelopeBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

/// `Ok(())` for a success status, otherwise the directory error it carries.
pub fn extract_error(resp: &ApiResponse) -> Result<()> {
    if resp.is_success() {
        return Ok(());
    }

    let kind = DirectoryErrorKind::from_status(resp.status);
    let error = match serde_json::from_slice::<ErrorEnvelope>(&resp.body) {
        Ok(envelope) => DirectoryError {
            kind,
            status: resp.status,
            code: envelope.errors.code,
            message: envelope.errors.message,
        },
        // No envelope: fall back to the status line rather than echoing an
        // arbitrary body.
        Err(_) => DirectoryError {
            kind,
            status: resp.status,
            code: None,
            message: StatusCode::from_u16(resp.status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or_default()
                .to_string(),
        },
    };

    warn!(status = error.status, code = ?error.code, kind = %error.kind, "directory returned an error");
    Err(MeshError::Directory(error))
}
