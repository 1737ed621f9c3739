//! Cached, tenant-scoped reads.
//!
//! Each read stores its DTO in the [`TagCache`](crate::caching::TagCache) under key
//! parts derived from the caller, and labels it with the tags the matching actions
//! revalidate.

use sea_orm::{DatabaseTransaction, IsolationLevel, TransactionTrait};

use crate::caching::{
    create_organisation_key_parts, create_organisation_tag, create_user_key_parts,
    create_user_tag, OrganisationCacheKey, UserCacheKey,
};
use crate::context::AppContext;
use crate::error::Result;
use crate::session::Session;

pub mod contacts;
pub mod developers;
pub mod home;
pub mod members;
pub mod organisation;
pub mod pinned;

pub(crate) async fn read_uncommitted(ctx: &AppContext) -> Result<DatabaseTransaction> {
    Ok(ctx
        .db
        .begin_with_config(Some(IsolationLevel::ReadUncommitted), None)
        .await?)
}

/// Key parts plus tags for an organisation-scoped read.
pub(crate) struct CacheSlot {
    pub key_parts: Vec<String>,
    pub tags: Vec<String>,
}

impl CacheSlot {
    pub fn organisation(session: &Session, key: OrganisationCacheKey, extras: &[&str]) -> Result<Self> {
        Ok(Self {
            key_parts: create_organisation_key_parts(key, &session.organisation_id, extras)?,
            tags: vec![create_organisation_tag(key, &session.organisation_id, extras)?],
        })
    }

    pub fn user(session: &Session, key: UserCacheKey, extras: &[&str]) -> Result<Self> {
        Ok(Self {
            key_parts: create_user_key_parts(key, &session.user_id, extras)?,
            tags: vec![create_user_tag(key, &session.user_id, extras)?],
        })
    }

    pub fn also_organisation(mut self, session: &Session, key: OrganisationCacheKey, extras: &[&str]) -> Result<Self> {
        self.tags
            .push(create_organisation_tag(key, &session.organisation_id, extras)?);
        Ok(self)
    }
}
