use serde_json::Value;
use worker::{Env, Request, Response, Result};

use crate::actions::{
    account, api_keys, auth, contacts, feedback, invitations, members, onboarding, organisation,
    pinned, webhooks,
};
use crate::context::AppContext;
use crate::error::Result as AppResult;
use crate::session::Session;
use crate::worker_wasm::http::{not_found, respond};

use super::auth::authenticated_context;
use super::{parse_json, read_json};

fn created(id: String) -> Value {
    serde_json::json!({ "id": id })
}

/// Run the named action. `Ok(None)` when no action has that name.
async fn dispatch(ctx: &AppContext, session: &Session, name: &str, body: Value) -> AppResult<Option<Value>> {
    let value = match name {
        "add-contact" => created(contacts::add_contact(ctx, session, parse_json(body)?).await?),
        "update-contact-properties" => {
            contacts::update_contact_properties(ctx, session, parse_json(body)?).await?;
            Value::Null
        }
        "update-contact-stage" => {
            contacts::update_contact_stage(ctx, session, parse_json(body)?).await?;
            Value::Null
        }
        "update-contact-tags" => {
            contacts::update_contact_tags(ctx, session, parse_json(body)?).await?;
            Value::Null
        }
        "archive-contact" => {
            contacts::archive_contact(ctx, session, parse_json(body)?).await?;
            Value::Null
        }
        "archive-contacts" => {
            contacts::archive_contacts(ctx, session, parse_json(body)?).await?;
            Value::Null
        }
        "delete-contact" => {
            contacts::delete_contact(ctx, session, parse_json(body)?).await?;
            Value::Null
        }
        "delete-contacts" => {
            contacts::delete_contacts(ctx, session, parse_json(body)?).await?;
            Value::Null
        }
        "add-contact-page-visit" => {
            contacts::add_contact_page_visit(ctx, session, parse_json(body)?).await?;
            Value::Null
        }
        "add-contact-task" => created(contacts::add_contact_task(ctx, session, parse_json(body)?).await?),
        "update-contact-task" => {
            contacts::update_contact_task(ctx, session, parse_json(body)?).await?;
            Value::Null
        }
        "delete-contact-task" => {
            contacts::delete_contact_task(ctx, session, parse_json(body)?).await?;
            Value::Null
        }
        "add-contact-note" => created(contacts::add_contact_note(ctx, session, parse_json(body)?).await?),
        "update-contact-note" => {
            contacts::update_contact_note(ctx, session, parse_json(body)?).await?;
            Value::Null
        }
        "delete-contact-note" => {
            contacts::delete_contact_note(ctx, session, parse_json(body)?).await?;
            Value::Null
        }
        "add-contact-comment" => created(contacts::add_contact_comment(ctx, session, parse_json(body)?).await?),
        "update-contact-comment" => {
            contacts::update_contact_comment(ctx, session, parse_json(body)?).await?;
            Value::Null
        }
        "delete-contact-comment" => {
            contacts::delete_contact_comment(ctx, session, parse_json(body)?).await?;
            Value::Null
        }

        "add-pinned" => {
            pinned::add_pinned(ctx, session, parse_json(body)?).await?;
            Value::Null
        }
        "remove-pinned" => {
            pinned::remove_pinned(ctx, session, parse_json(body)?).await?;
            Value::Null
        }
        "reorder-pinned" => {
            pinned::reorder_pinned(ctx, session, parse_json(body)?).await?;
            Value::Null
        }

        "send-invitation" => created(invitations::send_invitation(ctx, session, parse_json(body)?).await?),
        "resend-invitation" => {
            invitations::resend_invitation(ctx, session, parse_json(body)?).await?;
            Value::Null
        }
        "revoke-invitation" => {
            invitations::revoke_invitation(ctx, session, parse_json(body)?).await?;
            Value::Null
        }
        "delete-invitation" => {
            invitations::delete_invitation(ctx, session, parse_json(body)?).await?;
            Value::Null
        }

        "change-role" => {
            members::change_role(ctx, session, parse_json(body)?).await?;
            Value::Null
        }
        "remove-member" => {
            members::remove_member(ctx, session, parse_json(body)?).await?;
            Value::Null
        }

        "create-api-key" => {
            let key = api_keys::create_api_key(ctx, session, parse_json(body)?).await?;
            serde_json::to_value(key)?
        }
        "revoke-api-key" => {
            api_keys::revoke_api_key(ctx, session, parse_json(body)?).await?;
            Value::Null
        }

        "create-webhook" => created(webhooks::create_webhook(ctx, session, parse_json(body)?).await?),
        "update-webhook" => {
            webhooks::update_webhook(ctx, session, parse_json(body)?).await?;
            Value::Null
        }
        "delete-webhook" => {
            webhooks::delete_webhook(ctx, session, parse_json(body)?).await?;
            Value::Null
        }

        "complete-onboarding" => {
            let outcome = onboarding::complete_onboarding(ctx, session, parse_json(body)?).await?;
            serde_json::to_value(outcome)?
        }
        "complete-organisation-onboarding" => {
            let outcome =
                onboarding::complete_organisation_only_onboarding(ctx, session, parse_json(body)?).await?;
            serde_json::to_value(outcome)?
        }

        "update-organisation-details" => {
            organisation::update_organisation_details(ctx, session, parse_json(body)?).await?;
            Value::Null
        }
        "update-business-hours" => {
            organisation::update_business_hours(ctx, session, parse_json(body)?).await?;
            Value::Null
        }

        "update-preferences" => {
            account::update_preferences(ctx, session, parse_json(body)?).await?;
            Value::Null
        }
        "send-feedback" => {
            feedback::send_feedback(ctx, session, parse_json(body)?).await?;
            Value::Null
        }

        "create-organisation" => created(auth::create_organisation_and_connect_user(ctx, session).await?),
        "delete-account" => {
            account::delete_account(ctx, session).await?;
            Value::Null
        }

        _ => return Ok(None),
    };
    Ok(Some(value))
}

/// `POST /api/actions/<name>` with the action input as the JSON body.
pub async fn handle_action(mut req: Request, env: &Env, name: &str) -> Result<Response> {
    let (ctx, session) = match authenticated_context(&req, env).await? {
        Ok(pair) => pair,
        Err(resp) => return Ok(resp),
    };

    let body: Value = match read_json(&mut req).await {
        Ok(body) => body,
        Err(e) => return respond::<Value>(&req, Err(e)),
    };

    match dispatch(&ctx, &session, name, body).await {
        Ok(Some(value)) => respond(&req, Ok(value)),
        Ok(None) => not_found(&req),
        Err(e) => {
            tracing::debug!(action = name, user_id = %session.user_id, error = %e, "action failed");
            respond::<Value>(&req, Err(e))
        }
    }
}
