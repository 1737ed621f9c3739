use worker::{Env, Request, Response, Result};

use crate::transfer::export::{
    export_contacts_csv, export_contacts_xlsx, ExportContactsInput, CSV_CONTENT_TYPE, CSV_FILE_NAME,
    XLSX_CONTENT_TYPE, XLSX_FILE_NAME,
};
use crate::transfer::import::import_contacts;
use crate::transfer::sample::{sample_contacts_csv, SAMPLE_FILE_NAME};
use crate::worker_wasm::http::{attachment_response, error_to_response, respond};

use super::auth::authenticated_context;
use super::read_json;

#[derive(Debug, Clone, Copy)]
pub enum ExportFormat {
    Excel,
    Csv,
}

/// `POST /api/export/{excel,csv}/contact-list` with an optional `{"ids": [...]}` body.
pub async fn handle_export(mut req: Request, env: &Env, format: ExportFormat) -> Result<Response> {
    let (ctx, session) = match authenticated_context(&req, env).await? {
        Ok(pair) => pair,
        Err(resp) => return Ok(resp),
    };

    let input: ExportContactsInput = match read_json(&mut req).await {
        Ok(input) => input,
        Err(e) => return error_to_response(&req, &e),
    };

    let (result, file_name, content_type) = match format {
        ExportFormat::Excel => (
            export_contacts_xlsx(&ctx, &session, input).await,
            XLSX_FILE_NAME,
            XLSX_CONTENT_TYPE,
        ),
        ExportFormat::Csv => (
            export_contacts_csv(&ctx, &session, input).await,
            CSV_FILE_NAME,
            CSV_CONTENT_TYPE,
        ),
    };

    match result {
        Ok(bytes) => {
            tracing::info!(organisation_id = %session.organisation_id, ?format, size = bytes.len(), "contacts exported");
            attachment_response(&req, bytes, file_name, content_type)
        }
        Err(e) => error_to_response(&req, &e),
    }
}

/// `POST /api/import/csv/contact-list`.
pub async fn handle_import(mut req: Request, env: &Env) -> Result<Response> {
    let (ctx, session) = match authenticated_context(&req, env).await? {
        Ok(pair) => pair,
        Err(resp) => return Ok(resp),
    };

    let result = match read_json(&mut req).await {
        Ok(input) => import_contacts(&ctx, &session, input).await,
        Err(e) => Err(e),
    };
    respond(&req, result)
}

/// `GET /api/import/csv/sample-contacts`: public template download.
pub fn handle_sample(req: &Request) -> Result<Response> {
    attachment_response(
        req,
        sample_contacts_csv().as_bytes().to_vec(),
        SAMPLE_FILE_NAME,
        "text/csv; charset=utf-8",
    )
}
