use subtle::ConstantTimeEq;
use worker::{Env, Request, Result};

use crate::worker_wasm::env::env_string;
use crate::worker_wasm::http::error_response;

pub fn extract_bearer_token(req: &Request) -> Result<Option<String>> {
    let Some(raw) = req.headers().get("Authorization")? else {
        return Ok(None);
    };

    let raw = raw.trim();
    let Some((scheme, rest)) = raw.split_once(' ') else {
        return Ok(None);
    };
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Ok(None);
    }

    let token = rest.trim();
    if token.is_empty() {
        return Ok(None);
    }

    Ok(Some(token.to_string()))
}

/// Gate for operator endpoints: the bearer token must equal `MIGRATIONS_TOKEN`.
///
/// Returns `Ok(None)` when authorized; otherwise the error response to send.
pub async fn ensure_admin_authorized(req: &Request, env: &Env) -> Result<Option<worker::Response>> {
    let Some(required) = env_string(env, "MIGRATIONS_TOKEN") else {
        tracing::warn!("MIGRATIONS_TOKEN is not configured; admin endpoints are disabled");
        return Ok(Some(error_response(
            req,
            503,
            "admin_disabled",
            "Admin endpoints are not configured",
        )?));
    };

    let Some(token) = extract_bearer_token(req)? else {
        return Ok(Some(error_response(
            req,
            401,
            "missing_token",
            "Missing Authorization Bearer token",
        )?));
    };

    if !bool::from(token.as_bytes().ct_eq(required.as_bytes())) {
        return Ok(Some(error_response(
            req,
            401,
            "unauthorized",
            "Invalid migrations token",
        )?));
    }

    Ok(None)
}
