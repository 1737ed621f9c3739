//! Per-user pinned contacts with a dense, zero-based `order`.

use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, PaginatorTrait,
    QueryFilter, Set, Statement, TransactionTrait,
};
use tracing::debug;
use validator::Validate;

use entity::pinned;

use crate::actions::find_contact;
use crate::caching::UserCacheKey;
use crate::context::AppContext;
use crate::error::Result;
use crate::schemas::pinned::ReorderPinnedInput;
use crate::schemas::ContactIdInput;
use crate::session::Session;
use crate::util::{now_ts, uuid_v4};

const RENUMBER_ONE_USER: &str = r#"UPDATE pinned SET "order" = numbered.new_order - 1
FROM (
  SELECT id, ROW_NUMBER() OVER (ORDER BY "order" ASC, created_at ASC, id ASC) AS new_order
  FROM pinned WHERE user_id = {user}
) AS numbered
WHERE pinned.id = numbered.id"#;

const RENUMBER_ALL_USERS: &str = r#"UPDATE pinned SET "order" = numbered.new_order - 1
FROM (
  SELECT id, ROW_NUMBER() OVER (PARTITION BY user_id ORDER BY "order" ASC, created_at ASC, id ASC) AS new_order
  FROM pinned
) AS numbered
WHERE pinned.id = numbered.id"#;

fn placeholder(backend: DbBackend) -> &'static str {
    match backend {
        DbBackend::Postgres => "$1",
        _ => "?",
    }
}

/// Rewrite `order` to `0..N-1` for one user, or for every user when `user_id` is `None`.
///
/// Ties on `order` are broken by `created_at` then `id`, so the result is deterministic.
pub async fn update_pinned_order<C: ConnectionTrait>(conn: &C, user_id: Option<&str>) -> Result<()> {
    let backend = conn.get_database_backend();
    let statement = match user_id {
        Some(user_id) => Statement::from_sql_and_values(
            backend,
            RENUMBER_ONE_USER.replace("{user}", placeholder(backend)),
            [user_id.into()],
        ),
        None => Statement::from_string(backend, RENUMBER_ALL_USERS),
    };
    let result = conn.execute(statement).await?;
    debug!(user_id, rows = result.rows_affected(), "renumbered pinned order");
    Ok(())
}

pub async fn add_pinned(ctx: &AppContext, session: &Session, input: ContactIdInput) -> Result<()> {
    input.validate()?;
    find_contact(&ctx.db, &session.organisation_id, &input.contact_id).await?;

    let already = pinned::Entity::find()
        .filter(pinned::Column::UserId.eq(&session.user_id))
        .filter(pinned::Column::ContactId.eq(&input.contact_id))
        .count(&ctx.db)
        .await?;
    if already > 0 {
        return Ok(());
    }

    let txn = ctx.db.begin().await?;
    let count = pinned::Entity::find()
        .filter(pinned::Column::UserId.eq(&session.user_id))
        .count(&txn)
        .await?;
    pinned::ActiveModel {
        id: Set(uuid_v4()?),
        user_id: Set(session.user_id.clone()),
        contact_id: Set(input.contact_id.clone()),
        order: Set(i32::try_from(count).unwrap_or(i32::MAX)),
        created_at: Set(now_ts()),
    }
    .insert(&txn)
    .await?;
    update_pinned_order(&txn, Some(&session.user_id)).await?;
    txn.commit().await?;

    ctx.revalidate_user(session, UserCacheKey::Pinned, &[])?;
    ctx.revalidate_user(session, UserCacheKey::ContactIsInPinned, &[&input.contact_id])?;
    Ok(())
}

pub async fn remove_pinned(ctx: &AppContext, session: &Session, input: ContactIdInput) -> Result<()> {
    input.validate()?;

    let txn = ctx.db.begin().await?;
    pinned::Entity::delete_many()
        .filter(pinned::Column::UserId.eq(&session.user_id))
        .filter(pinned::Column::ContactId.eq(&input.contact_id))
        .exec(&txn)
        .await?;
    update_pinned_order(&txn, Some(&session.user_id)).await?;
    txn.commit().await?;

    ctx.revalidate_user(session, UserCacheKey::Pinned, &[])?;
    ctx.revalidate_user(session, UserCacheKey::ContactIsInPinned, &[&input.contact_id])?;
    Ok(())
}

/// Apply client-supplied positions. Ids that are not the caller's pins are ignored.
pub async fn reorder_pinned(ctx: &AppContext, session: &Session, input: ReorderPinnedInput) -> Result<()> {
    input.validate()?;

    let txn = ctx.db.begin().await?;
    let owned: HashMap<String, pinned::Model> = pinned::Entity::find()
        .filter(pinned::Column::UserId.eq(&session.user_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();

    let mut updated = 0usize;
    for item in &input.pinned {
        let Some(existing) = owned.get(&item.id) else {
            continue;
        };
        if existing.order == item.order {
            continue;
        }
        let mut active: pinned::ActiveModel = existing.clone().into();
        active.order = Set(item.order);
        active.update(&txn).await?;
        updated += 1;
    }

    if updated > 0 {
        update_pinned_order(&txn, Some(&session.user_id)).await?;
    }
    txn.commit().await?;

    if updated > 0 {
        ctx.revalidate_user(session, UserCacheKey::Pinned, &[])?;
    }
    Ok(())
}
