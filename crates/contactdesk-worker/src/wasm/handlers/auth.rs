use worker::{Env, Request, Response, Result};

use crate::actions::auth::{create_user_with_organisation, join, sign_in};
use crate::context::AppContext;
use crate::data::members::get_invitation_by_token;
use crate::session::{authenticate_token, Session};
use crate::worker_wasm::http::{error_response, error_to_response, internal_error_response, respond};

use super::admin_auth::extract_bearer_token;
use super::{app_context, read_json};

pub enum AuthResult {
    Authorized(Session),
    Unauthorized(Response),
}

/// Resolve the bearer session token into the caller's session.
pub async fn authenticate(req: &Request, ctx: &AppContext) -> Result<AuthResult> {
    let Some(token) = extract_bearer_token(req)? else {
        return Ok(AuthResult::Unauthorized(error_response(
            req,
            401,
            "unauthorized",
            "Missing bearer token",
        )?));
    };

    match authenticate_token(&ctx.db, &token).await {
        Ok(session) => Ok(AuthResult::Authorized(session)),
        Err(e) => Ok(AuthResult::Unauthorized(error_to_response(req, &e)?)),
    }
}

/// Open the request context and authenticate, or produce the response to return.
pub async fn authenticated_context(
    req: &Request,
    env: &Env,
) -> Result<std::result::Result<(AppContext, Session), Response>> {
    let ctx = match app_context(env).await {
        Ok(ctx) => ctx,
        Err(e) => return internal_error_response(req, "Failed to build request context", &e).map(Err),
    };
    match authenticate(req, &ctx).await? {
        AuthResult::Authorized(session) => Ok(Ok((ctx, session))),
        AuthResult::Unauthorized(resp) => Ok(Err(resp)),
    }
}

pub async fn handle_sign_up(mut req: Request, env: &Env) -> Result<Response> {
    let ctx = match app_context(env).await {
        Ok(ctx) => ctx,
        Err(e) => return internal_error_response(&req, "Failed to build request context", &e),
    };
    let result = match read_json(&mut req).await {
        Ok(input) => create_user_with_organisation(&ctx, input).await,
        Err(e) => Err(e),
    };
    respond(&req, result)
}

pub async fn handle_join(mut req: Request, env: &Env) -> Result<Response> {
    let ctx = match app_context(env).await {
        Ok(ctx) => ctx,
        Err(e) => return internal_error_response(&req, "Failed to build request context", &e),
    };
    let result = match read_json(&mut req).await {
        Ok(input) => join(&ctx, input).await,
        Err(e) => Err(e),
    };
    respond(&req, result)
}

pub async fn handle_sign_in(mut req: Request, env: &Env) -> Result<Response> {
    let ctx = match app_context(env).await {
        Ok(ctx) => ctx,
        Err(e) => return internal_error_response(&req, "Failed to build request context", &e),
    };
    let result = match read_json(&mut req).await {
        Ok(input) => sign_in(&ctx, input).await,
        Err(e) => Err(e),
    };
    respond(&req, result)
}

/// Public lookup backing the invitation acceptance page.
pub async fn handle_invitation(req: Request, env: &Env, token: &str) -> Result<Response> {
    let ctx = match app_context(env).await {
        Ok(ctx) => ctx,
        Err(e) => return internal_error_response(&req, "Failed to build request context", &e),
    };
    respond(&req, get_invitation_by_token(&ctx, token).await)
}
