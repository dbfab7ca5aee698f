//! Share links
//!
//! A results page can be shared without a session: the full participant id
//! list is packed into an opaque URL-safe token. The token is plain
//! base64-encoded JSON — it carries no secrets, it just has to survive a URL
//! and decode deterministically.

use crate::error::{AppError, AppResult};
use crate::models::SteamId;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Encodes a participant list into a URL-embeddable token.
pub fn encode_share_token(participants: &[SteamId]) -> AppResult<String> {
    let json = serde_json::to_vec(participants)
        .map_err(|e| AppError::Internal(format!("Share token serialization error: {}", e)))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decodes a share token back into its participant list.
///
/// Any malformed input — bad base64, bad JSON, an empty list — is an
/// `InvalidShareToken`, which the boundary renders as an "invalid link"
/// notice rather than a server error.
pub fn decode_share_token(token: &str) -> AppResult<Vec<SteamId>> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|e| AppError::InvalidShareToken(format!("bad base64: {}", e)))?;

    let participants: Vec<SteamId> = serde_json::from_slice(&bytes)
        .map_err(|e| AppError::InvalidShareToken(format!("bad payload: {}", e)))?;

    if participants.is_empty() {
        return Err(AppError::InvalidShareToken("empty participant list".to_string()));
    }

    Ok(participants)
}
