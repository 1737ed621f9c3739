use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set, TransactionTrait};
use serde::Serialize;
use tracing::{error, info};
use validator::Validate;

use entity::sea_orm_active_enums::{ContactRecord, ContactStage};
use entity::{contact_page_visit, organisation, user};

use crate::actions::contacts::create_contact_and_capture;
use crate::caching::{OrganisationCacheKey, UserCacheKey};
use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::schemas::contacts::AddContactInput;
use crate::schemas::organisation::{CompleteOnboardingInput, CompleteOrganisationOnboardingInput};
use crate::session::Session;
use crate::util::{now_ts, uuid_v4};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OnboardingOutcome {
    Completed,
    AlreadyCompleted,
}

struct ExampleContact {
    record: ContactRecord,
    first_name: Option<&'static str>,
    last_name: Option<&'static str>,
    company_name: Option<&'static str>,
    email: &'static str,
    stage: ContactStage,
    tags: &'static [&'static str],
}

const EXAMPLE_CONTACTS: &[ExampleContact] = &[
    ExampleContact {
        record: ContactRecord::Company,
        first_name: None,
        last_name: None,
        company_name: Some("Northwind Traders"),
        email: "hello@northwind.example",
        stage: ContactStage::Opportunity,
        tags: &["customer", "wholesale"],
    },
    ExampleContact {
        record: ContactRecord::Person,
        first_name: Some("Grace"),
        last_name: Some("Hopper"),
        company_name: None,
        email: "grace@example.com",
        stage: ContactStage::Qualified,
        tags: &["partner"],
    },
    ExampleContact {
        record: ContactRecord::Person,
        first_name: Some("Alan"),
        last_name: Some("Turing"),
        company_name: None,
        email: "alan@example.com",
        stage: ContactStage::Lead,
        tags: &[],
    },
];

/// Seed a handful of contacts and a page visit each so a fresh dashboard is not empty.
async fn add_example_data(ctx: &AppContext, session: &Session) -> Result<()> {
    let txn = ctx.db.begin().await?;
    for example in EXAMPLE_CONTACTS {
        let input = AddContactInput {
            record: Some(example.record),
            first_name: example.first_name.map(str::to_string),
            last_name: example.last_name.map(str::to_string),
            company_name: example.company_name.map(str::to_string),
            email: Some(example.email.to_string()),
            stage: Some(example.stage),
            tags: example.tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        };
        let contact = create_contact_and_capture(&txn, session, input).await?;
        contact_page_visit::ActiveModel {
            id: Set(uuid_v4()?),
            contact_id: Set(contact.id),
            user_id: Set(Some(session.user_id.clone())),
            timestamp: Set(now_ts()),
        }
        .insert(&txn)
        .await?;
    }
    txn.commit().await?;
    Ok(())
}

async fn seed_examples_best_effort(ctx: &AppContext, session: &Session) {
    if let Err(err) = add_example_data(ctx, session).await {
        error!(organisation_id = %session.organisation_id, error = %err, "failed to add example data");
    }
}

fn revalidate_organisation_onboarding(ctx: &AppContext, session: &Session) -> Result<()> {
    ctx.revalidate_user(session, UserCacheKey::OnboardingData, &[])?;
    ctx.revalidate_organisation(session, OrganisationCacheKey::OrganisationDetails, &[])?;
    ctx.revalidate_organisation(session, OrganisationCacheKey::LeadGenerationData, &[])?;
    ctx.revalidate_organisation(session, OrganisationCacheKey::ContactPageVisits, &[])?;
    ctx.revalidate_organisation(session, OrganisationCacheKey::Contacts, &[])?;
    ctx.revalidate_organisation(session, OrganisationCacheKey::ContactTags, &[])?;
    Ok(())
}

async fn load(ctx: &AppContext, session: &Session) -> Result<(organisation::Model, user::Model)> {
    let org = organisation::Entity::find_by_id(session.organisation_id.clone())
        .one(&ctx.db)
        .await?
        .ok_or(Error::NotFound("Organisation"))?;
    let me = user::Entity::find_by_id(session.user_id.clone())
        .one(&ctx.db)
        .await?
        .ok_or(Error::NotFound("User"))?;
    Ok((org, me))
}

/// Finish onboarding for both the organisation and the calling user.
pub async fn complete_onboarding(
    ctx: &AppContext,
    session: &Session,
    input: CompleteOnboardingInput,
) -> Result<OnboardingOutcome> {
    input.validate()?;

    let (org, me) = load(ctx, session).await?;
    if org.completed_onboarding || me.completed_onboarding {
        return Ok(OnboardingOutcome::AlreadyCompleted);
    }

    let now = now_ts();
    let txn = ctx.db.begin().await?;
    let mut org = org.into_active_model();
    org.name = Set(input.organisation_name);
    org.completed_onboarding = Set(true);
    org.updated_at = Set(now);
    org.update(&txn).await?;

    let mut me = me.into_active_model();
    me.name = Set(input.name);
    me.phone = Set(input.phone);
    me.image = Set(input.image);
    me.completed_onboarding = Set(true);
    me.updated_at = Set(now);
    me.update(&txn).await?;
    txn.commit().await?;

    seed_examples_best_effort(ctx, session).await;

    revalidate_organisation_onboarding(ctx, session)?;
    ctx.revalidate_user(session, UserCacheKey::PersonalDetails, &[])?;
    ctx.revalidate_user(session, UserCacheKey::Preferences, &[])?;
    ctx.revalidate_organisation(session, OrganisationCacheKey::Members, &[])?;

    info!(organisation_id = %session.organisation_id, user_id = %session.user_id, "onboarding completed");
    Ok(OnboardingOutcome::Completed)
}

/// Finish onboarding for an organisation created by a user who already onboarded.
pub async fn complete_organisation_only_onboarding(
    ctx: &AppContext,
    session: &Session,
    input: CompleteOrganisationOnboardingInput,
) -> Result<OnboardingOutcome> {
    input.validate()?;

    let (org, _) = load(ctx, session).await?;
    if org.completed_onboarding {
        return Ok(OnboardingOutcome::AlreadyCompleted);
    }

    let mut org = org.into_active_model();
    org.name = Set(input.organisation_name);
    org.completed_onboarding = Set(true);
    org.updated_at = Set(now_ts());
    org.update(&ctx.db).await?;

    seed_examples_best_effort(ctx, session).await;

    revalidate_organisation_onboarding(ctx, session)?;
    info!(organisation_id = %session.organisation_id, "organisation onboarding completed");
    Ok(OnboardingOutcome::Completed)
}
