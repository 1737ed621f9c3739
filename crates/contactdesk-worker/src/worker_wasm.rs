use tracing_subscriber::prelude::*;
use tracing_web::MakeConsoleWriter;
use worker::*;

#[path = "wasm/db/mod.rs"]
pub mod db;
#[path = "wasm/brevo.rs"]
pub mod brevo;
#[path = "wasm/env.rs"]
pub mod env;
#[path = "wasm/handlers/mod.rs"]
pub mod handlers;
#[path = "wasm/http.rs"]
pub mod http;
#[path = "wasm/r2.rs"]
pub mod r2;

use handlers::transfer::ExportFormat;
use http::{json_with_cors, not_found};

#[event(start)]
fn start() {
    console_error_panic_hook::set_once();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .without_time()
        .with_writer(MakeConsoleWriter);
    tracing_subscriber::registry().with(fmt_layer).init();
}

#[event(fetch)]
pub async fn fetch(req: Request, env: Env, _ctx: Context) -> Result<Response> {
    if req.method() == Method::Options {
        let resp = Response::empty()?.with_status(204);
        return json_with_cors(&req, resp);
    }

    let url = req.url()?;
    let path = url.path().to_string();
    let method = req.method();

    if method == Method::Get && path == "/health" {
        let body = serde_json::json!({
            "ok": true,
            "service": "contactdesk",
        });
        let resp = Response::from_json(&body)?;
        return json_with_cors(&req, resp);
    }

    if method == Method::Post && path == "/v1/admin/migrations/up" {
        return handlers::migrations::handle_migrations_up(&req, &env).await;
    }

    if method == Method::Post && path == "/api/auth/sign-up" {
        return handlers::auth::handle_sign_up(req, &env).await;
    }
    if method == Method::Post && path == "/api/auth/join" {
        return handlers::auth::handle_join(req, &env).await;
    }
    if method == Method::Post && path == "/api/auth/sign-in" {
        return handlers::auth::handle_sign_in(req, &env).await;
    }
    if method == Method::Get {
        if let Some(token) = path.strip_prefix("/api/invitations/") {
            return handlers::auth::handle_invitation(req, &env, token).await;
        }
    }

    if method == Method::Post {
        if let Some(name) = path.strip_prefix("/api/actions/") {
            return handlers::actions::handle_action(req, &env, name).await;
        }
    }
    if method == Method::Get {
        if let Some(name) = path.strip_prefix("/api/data/") {
            return handlers::data::handle_read(req, &env, name).await;
        }
    }

    if let Some(contact_id) = path
        .strip_prefix("/api/contacts/")
        .and_then(|rest| rest.strip_suffix("/media"))
    {
        match method {
            Method::Post => return handlers::media::handle_upload(req, &env, contact_id).await,
            Method::Get => return handlers::media::handle_list(req, &env, contact_id).await,
            _ => {}
        }
    }
    if method == Method::Get {
        if let Some(key) = path.strip_prefix("/media/") {
            return handlers::media::handle_object(req, &env, key).await;
        }
    }

    if method == Method::Post && path == "/api/export/excel/contact-list" {
        return handlers::transfer::handle_export(req, &env, ExportFormat::Excel).await;
    }
    if method == Method::Post && path == "/api/export/csv/contact-list" {
        return handlers::transfer::handle_export(req, &env, ExportFormat::Csv).await;
    }
    if method == Method::Post && path == "/api/import/csv/contact-list" {
        return handlers::transfer::handle_import(req, &env).await;
    }
    if method == Method::Get && path == "/api/import/csv/sample-contacts" {
        return handlers::transfer::handle_sample(&req);
    }

    not_found(&req)
}
