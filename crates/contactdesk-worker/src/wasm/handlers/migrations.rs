use worker::{Env, Request, Response, Result};

use migration::MigratorTrait;

use crate::worker_wasm::db::db_connect;
use crate::worker_wasm::http::{internal_error_response, json_with_cors};

use super::admin_auth::ensure_admin_authorized;

fn requested_steps(req: &Request) -> u32 {
    req.url()
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(k, _)| k == "steps")
                .and_then(|(_, v)| v.parse::<u32>().ok())
        })
        .filter(|n| *n > 0)
        .unwrap_or(1)
}

/// Apply pending migrations a few at a time.
///
/// libSQL over HTTP turns every statement into a subrequest, so one call applies
/// `?steps=N` migrations (default 1) and reports what is left.
pub async fn handle_migrations_up(req: &Request, env: &Env) -> Result<Response> {
    if let Some(resp) = ensure_admin_authorized(req, env).await? {
        return Ok(resp);
    }

    let db = match db_connect(env).await {
        Ok(db) => db,
        Err(e) => return internal_error_response(req, "Failed to open database connection", &e),
    };

    let steps = requested_steps(req);
    let pending_before = match migration::Migrator::get_pending_migrations(&db).await {
        Ok(p) => p,
        Err(e) => return internal_error_response(req, "Failed to read pending migrations", &e),
    };

    let to_apply = steps.min(u32::try_from(pending_before.len()).unwrap_or(u32::MAX));
    if to_apply > 0 {
        if let Err(e) = migration::Migrator::up(&db, Some(to_apply)).await {
            return internal_error_response(req, "Failed to apply migrations", &e);
        }
    }

    let pending_after = match migration::Migrator::get_pending_migrations(&db).await {
        Ok(p) => p,
        Err(e) => return internal_error_response(req, "Failed to read pending migrations", &e),
    };

    let applied = pending_before.len().saturating_sub(pending_after.len());
    tracing::info!(applied, pending = pending_after.len(), "migrations applied");

    let resp = Response::from_json(&serde_json::json!({
        "success": true,
        "migrations": {
            "requestedSteps": steps,
            "applied": applied,
            "pending": pending_after.len(),
            "done": pending_after.is_empty(),
            "next": pending_after.first().map(|m| m.name()),
        }
    }))?;

    json_with_cors(req, resp)
}
