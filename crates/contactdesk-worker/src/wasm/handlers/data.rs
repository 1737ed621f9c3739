use serde_json::Value;
use worker::{Env, Request, Response, Result};

use crate::context::AppContext;
use crate::data::{contacts, developers, home, members, organisation, pinned};
use crate::error::{Error, Result as AppResult};
use crate::session::Session;
use crate::worker_wasm::http::{not_found, respond};

use super::auth::authenticated_context;
use super::parse_json;

/// Read input travels as JSON in the `input` query parameter.
fn query_input(req: &Request) -> AppResult<Value> {
    let url = req.url().map_err(|_| Error::invalid("Invalid request URL"))?;
    let Some((_, raw)) = url.query_pairs().find(|(k, _)| k == "input") else {
        return Ok(Value::Object(Default::default()));
    };
    serde_json::from_str(&raw).map_err(|e| Error::invalid(format!("Invalid input parameter: {e}")))
}

async fn dispatch(ctx: &AppContext, session: &Session, name: &str, input: Value) -> AppResult<Option<Value>> {
    let value = match name {
        "contacts" => serde_json::to_value(contacts::get_contacts(ctx, session, parse_json(input)?).await?)?,
        "contact" => serde_json::to_value(contacts::get_contact(ctx, session, parse_json(input)?).await?)?,
        "contact-tags" => serde_json::to_value(contacts::get_contact_tags(ctx, session).await?)?,
        "contact-is-in-pinned" => {
            serde_json::to_value(contacts::get_contact_is_in_pinned(ctx, session, parse_json(input)?).await?)?
        }
        "contact-tasks" => serde_json::to_value(contacts::get_contact_tasks(ctx, session, parse_json(input)?).await?)?,
        "contact-notes" => serde_json::to_value(contacts::get_contact_notes(ctx, session, parse_json(input)?).await?)?,
        "contact-timeline" => {
            serde_json::to_value(contacts::get_contact_timeline(ctx, session, parse_json(input)?).await?)?
        }
        "contact-media" => serde_json::to_value(contacts::get_contact_media(ctx, session, parse_json(input)?).await?)?,
        "pinned" => serde_json::to_value(pinned::get_pinned(ctx, session).await?)?,
        "most-visited-contacts" => {
            serde_json::to_value(home::get_most_visited_contacts(ctx, session, parse_json(input)?).await?)?
        }
        "members" => serde_json::to_value(members::get_members(ctx, session).await?)?,
        "invitations" => serde_json::to_value(members::get_invitations(ctx, session).await?)?,
        "api-keys" => serde_json::to_value(developers::get_api_keys(ctx, session).await?)?,
        "webhooks" => serde_json::to_value(developers::get_webhooks(ctx, session).await?)?,
        "business-hours" => serde_json::to_value(organisation::get_business_hours(ctx, session).await?)?,
        "organisation-details" => serde_json::to_value(organisation::get_organisation_details(ctx, session).await?)?,
        "onboarding-data" => serde_json::to_value(organisation::get_onboarding_data(ctx, session).await?)?,
        _ => return Ok(None),
    };
    Ok(Some(value))
}

/// `GET /api/data/<name>?input=<json>`.
pub async fn handle_read(req: Request, env: &Env, name: &str) -> Result<Response> {
    let (ctx, session) = match authenticated_context(&req, env).await? {
        Ok(pair) => pair,
        Err(resp) => return Ok(resp),
    };

    let result = match query_input(&req) {
        Ok(input) => dispatch(&ctx, &session, name, input).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(Some(value)) => respond(&req, Ok(value)),
        Ok(None) => not_found(&req),
        Err(e) => respond::<Value>(&req, Err(e)),
    }
}
