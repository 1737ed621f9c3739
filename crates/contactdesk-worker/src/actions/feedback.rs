use sea_orm::{ActiveEnum, ActiveModelTrait, EntityTrait, Set};
use tracing::{info, warn};
use validator::Validate;

use entity::{feedback, organisation};

use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::mail::feedback_email;
use crate::schemas::organisation::SendFeedbackInput;
use crate::session::Session;
use crate::util::{now_ts, uuid_v4};

/// Store the feedback, then forward it to the configured inbox if there is one.
pub async fn send_feedback(ctx: &AppContext, session: &Session, input: SendFeedbackInput) -> Result<()> {
    input.validate()?;

    let organisation = organisation::Entity::find_by_id(session.organisation_id.clone())
        .one(&ctx.db)
        .await?
        .ok_or(Error::NotFound("Organisation"))?;

    let stored = feedback::ActiveModel {
        id: Set(uuid_v4()?),
        organisation_id: Set(session.organisation_id.clone()),
        user_id: Set(Some(session.user_id.clone())),
        category: Set(input.category),
        message: Set(input.message.clone()),
        created_at: Set(now_ts()),
    }
    .insert(&ctx.db)
    .await?;
    info!(feedback_id = %stored.id, category = ?input.category, "feedback stored");

    let Some(inbox) = ctx.config.feedback_email.as_deref() else {
        return Ok(());
    };
    let category = input.category.to_value();
    let message = feedback_email(
        inbox,
        &organisation.name,
        &session.name,
        &session.email,
        &category,
        &input.message,
    );
    if let Err(err) = ctx.mailer.send(message).await {
        warn!(feedback_id = %stored.id, error = %err, "failed to forward feedback");
    }
    Ok(())
}
