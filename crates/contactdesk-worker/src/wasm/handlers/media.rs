use worker::{Env, FormEntry, Request, Response, Result};

use crate::error::Error;
use crate::media::{list_contact_media, upload_contact_media, MediaUpload};
use crate::worker_wasm::http::{error_response, json_with_cors, not_found, respond};
use crate::worker_wasm::r2::fetch_object;

use super::auth::authenticated_context;

async fn read_upload(req: &mut Request) -> crate::error::Result<MediaUpload> {
    let form = req
        .form_data()
        .await
        .map_err(|_| Error::invalid("Expected a multipart form body"))?;
    let Some(FormEntry::File(file)) = form.get("file") else {
        return Err(Error::invalid("A non-empty file is required"));
    };
    let bytes = file
        .bytes()
        .await
        .map_err(|e| Error::Storage(format!("failed to read upload: {e}")))?;
    Ok(MediaUpload {
        file_name: file.name(),
        content_type: file.type_(),
        bytes,
    })
}

/// `POST /api/contacts/<id>/media` (multipart `file`).
pub async fn handle_upload(mut req: Request, env: &Env, contact_id: &str) -> Result<Response> {
    let (ctx, session) = match authenticated_context(&req, env).await? {
        Ok(pair) => pair,
        Err(resp) => return Ok(resp),
    };

    let result = match read_upload(&mut req).await {
        Ok(upload) => upload_contact_media(&ctx, &session, contact_id, upload).await,
        Err(e) => Err(e),
    };
    respond(&req, result)
}

/// `GET /api/contacts/<id>/media`.
pub async fn handle_list(req: Request, env: &Env, contact_id: &str) -> Result<Response> {
    let (ctx, session) = match authenticated_context(&req, env).await? {
        Ok(pair) => pair,
        Err(resp) => return Ok(resp),
    };
    respond(&req, list_contact_media(&ctx, &session, contact_id).await)
}

/// `GET /media/<key>`: stored objects when no public bucket domain is configured.
pub async fn handle_object(req: Request, env: &Env, key: &str) -> Result<Response> {
    if key.is_empty() || key.contains('/') {
        return not_found(&req);
    }
    match fetch_object(env, key).await {
        Ok(Some((bytes, content_type))) => {
            let mut resp = Response::from_bytes(bytes)?;
            let headers = resp.headers_mut();
            headers.set(
                "Content-Type",
                content_type.as_deref().unwrap_or("application/octet-stream"),
            )?;
            headers.set("Cache-Control", "private, max-age=3600")?;
            json_with_cors(&req, resp)
        }
        Ok(None) => not_found(&req),
        Err(e) => {
            tracing::error!(error = %e, key, "media fetch failed");
            error_response(&req, 500, "internal_error", "Internal server error")
        }
    }
}
