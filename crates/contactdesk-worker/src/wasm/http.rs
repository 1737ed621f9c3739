use std::fmt::Display;

use serde::Serialize;
use worker::{Headers, Request, Response, Result};

use crate::error::Error;

fn cors_headers(req: &Request) -> Result<Headers> {
    let headers = Headers::new();

    let origin = req.headers().get("Origin")?.unwrap_or_else(|| "*".to_string());

    headers.set("Access-Control-Allow-Origin", &origin)?;
    headers.set("Vary", "Origin")?;
    headers.set("Access-Control-Allow-Credentials", "true")?;
    headers.set("Access-Control-Allow-Methods", "GET,POST,PUT,PATCH,DELETE,OPTIONS")?;
    headers.set(
        "Access-Control-Allow-Headers",
        "Authorization,Content-Type,Accept,X-Requested-With",
    )?;
    headers.set(
        "Access-Control-Expose-Headers",
        "Content-Disposition",
    )?;

    Ok(headers)
}

pub fn json_with_cors(req: &Request, mut resp: Response) -> Result<Response> {
    let headers = cors_headers(req)?;
    let resp_headers = resp.headers_mut();
    for (k, v) in headers.entries() {
        resp_headers.set(&k, &v)?;
    }

    Ok(resp)
}

pub fn error_response(req: &Request, status: u16, code: &str, message: &str) -> Result<Response> {
    let body = serde_json::json!({
        "success": false,
        "error": {
            "code": code,
            "message": message
        }
    });

    let resp = Response::from_json(&body)?.with_status(status);
    json_with_cors(req, resp)
}

pub fn internal_error_response<E: Display>(req: &Request, context: &str, err: &E) -> Result<Response> {
    tracing::error!(error = %err, "{context}");
    error_response(req, 500, "internal_error", "Internal server error")
}

/// Map a domain failure to its status, code and client-safe message.
pub fn error_to_response(req: &Request, err: &Error) -> Result<Response> {
    if err.is_internal() {
        tracing::error!(error = %err, code = err.code(), "request failed");
    } else {
        tracing::debug!(error = %err, code = err.code(), "request rejected");
    }
    error_response(req, err.status(), err.code(), &err.public_message())
}

/// `{"success": true, "data": ...}` on success, the error envelope otherwise.
pub fn respond<T: Serialize>(req: &Request, result: crate::error::Result<T>) -> Result<Response> {
    match result {
        Ok(data) => {
            let resp = Response::from_json(&serde_json::json!({
                "success": true,
                "data": data,
            }))?;
            json_with_cors(req, resp)
        }
        Err(err) => error_to_response(req, &err),
    }
}

/// Binary download that browsers save under `file_name` and never cache.
pub fn attachment_response(
    req: &Request,
    bytes: Vec<u8>,
    file_name: &str,
    content_type: &str,
) -> Result<Response> {
    let mut resp = Response::from_bytes(bytes)?;
    let headers = resp.headers_mut();
    headers.set("Content-Type", content_type)?;
    headers.set(
        "Content-Disposition",
        &format!("attachment; filename={file_name}; filename*=UTF-8''{file_name}"),
    )?;
    headers.set("Cache-Control", "no-store")?;
    json_with_cors(req, resp)
}

pub fn not_found(req: &Request) -> Result<Response> {
    error_response(req, 404, "not_found", "Not found")
}
