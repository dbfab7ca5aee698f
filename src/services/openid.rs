//! Steam OpenID 2.0 handshake
//!
//! Steam only supports the legacy OpenID flow: redirect the browser to the
//! provider with `checkid_setup`, then confirm the returning assertion
//! server-side with `check_authentication` before trusting the claimed id.

use crate::error::{AppError, AppResult};
use crate::models::SteamId;
use regex::Regex;
use reqwest::{Client as HttpClient, Url};
use std::collections::HashMap;
use std::sync::OnceLock;

const OPENID_NS: &str = "http://specs.openid.net/auth/2.0";
const IDENTIFIER_SELECT: &str = "http://specs.openid.net/auth/2.0/identifier_select";

/// Outcome of the server-side assertion check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Verified(SteamId),
    Rejected,
}

/// Builds the provider URL the browser is redirected to for sign-in.
pub fn login_url(openid_url: &str, public_url: &str) -> AppResult<String> {
    let return_to = format!("{}/authorize", public_url.trim_end_matches('/'));
    let params = [
        ("openid.ns", OPENID_NS),
        ("openid.mode", "checkid_setup"),
        ("openid.return_to", return_to.as_str()),
        ("openid.realm", public_url),
        ("openid.identity", IDENTIFIER_SELECT),
        ("openid.claimed_id", IDENTIFIER_SELECT),
    ];

    let url = Url::parse_with_params(openid_url, params)
        .map_err(|e| AppError::Internal(format!("Invalid OpenID URL: {}", e)))?;

    Ok(url.to_string())
}

/// Echoes the provider's own `openid.*` fields back with the mode switched to
/// `check_authentication`, per the stateless verification flow.
fn check_auth_params(query: &HashMap<String, String>) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = query
        .iter()
        .filter(|(key, _)| key.starts_with("openid.") && key.as_str() != "openid.mode")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    params.push(("openid.mode".to_string(), "check_authentication".to_string()));
    params
}

fn claimed_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"steamcommunity\.com/openid/id/(\d+)").expect("claimed-id pattern is valid")
    })
}

/// Pulls the numeric steam id out of a claimed-id URL like
/// `https://steamcommunity.com/openid/id/7656119...`.
fn extract_steam_id(claimed_id: &str) -> Option<SteamId> {
    claimed_id_pattern()
        .captures(claimed_id)
        .map(|captures| SteamId::from(&captures[1]))
}

/// Confirms the OpenID assertion with the provider.
///
/// The claimed identifier in the query string is attacker-controlled until
/// the provider answers `is_valid:true`, so nothing is trusted before that.
pub async fn verify_login(
    http_client: &HttpClient,
    openid_url: &str,
    query: &HashMap<String, String>,
) -> AppResult<Verification> {
    let params = check_auth_params(query);

    let response = http_client
        .post(openid_url)
        .form(&params)
        .send()
        .await
        .map_err(|e| AppError::ServiceUnavailable(e.to_string()))?;

    let body = response
        .text()
        .await
        .map_err(|e| AppError::ServiceUnavailable(e.to_string()))?;

    if !body.contains("is_valid:true") {
        tracing::warn!("OpenID assertion rejected by provider");
        return Ok(Verification::Rejected);
    }

    let claimed_id = query
        .get("openid.claimed_id")
        .map(String::as_str)
        .unwrap_or_default();

    match extract_steam_id(claimed_id) {
        Some(steam_id) => {
            tracing::info!(steam_id = %steam_id, "Steam sign-in verified");
            Ok(Verification::Verified(steam_id))
        }
        None => {
            tracing::warn!(claimed_id = %claimed_id, "Verified assertion with unparseable claimed id");
            Ok(Verification::Rejected)
        }
    }
}
