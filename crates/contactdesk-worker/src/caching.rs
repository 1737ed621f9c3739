//! Cache keys and invalidation tags scoped to a user or an organisation.
//!
//! Every cached read is stored under key parts built here and labelled with one
//! or more tags. Mutations revalidate the tags they affect once their writes
//! have committed.

use std::borrow::Cow;
use std::collections::HashMap;
use std::future::Future;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use strum::IntoStaticStr;
use tracing::debug;

use crate::error::Result;
use crate::util::now_ts;

const USER_PREFIX: &str = "user";
const ORGANISATION_PREFIX: &str = "organisation";
const SEPARATOR: &str = ":";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, strum::EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum UserCacheKey {
    OnboardingData,
    Pinned,
    ContactIsInPinned,
    Profile,
    PersonalDetails,
    Preferences,
    MultiFactorAuthentication,
    Sessions,
    TransactionalEmails,
    MarketingEmails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, strum::EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum OrganisationCacheKey {
    LeadGenerationData,
    Contacts,
    ContactTags,
    Contact,
    ContactPageVisits,
    ContactTimelineEvents,
    ContactNotes,
    ContactTasks,
    ContactMedia,
    OrganisationDetails,
    BusinessHours,
    Members,
    Invitations,
    ApiKeys,
    Webhooks,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheKeyError {
    #[error("User ID cannot be empty")]
    EmptyUserId,
    #[error("Organisation ID cannot be empty")]
    EmptyOrganisationId,
}

// `%` and the separator are escaped so distinct inputs never share a tag.
fn escape_part(part: &str) -> Cow<'_, str> {
    if part.contains(['%', ':']) {
        Cow::Owned(part.replace('%', "%25").replace(':', "%3A"))
    } else {
        Cow::Borrowed(part)
    }
}

fn build_parts(prefix: &str, owner_id: &str, key_name: &str, extras: &[&str]) -> Vec<String> {
    [prefix, owner_id, key_name]
        .into_iter()
        .chain(extras.iter().copied())
        .filter(|part| !part.is_empty())
        .map(|part| escape_part(part).into_owned())
        .collect()
}

pub fn create_user_key_parts(
    key: UserCacheKey,
    user_id: &str,
    extras: &[&str],
) -> Result<Vec<String>, CacheKeyError> {
    if user_id.trim().is_empty() {
        return Err(CacheKeyError::EmptyUserId);
    }
    let name: &'static str = key.into();
    Ok(build_parts(USER_PREFIX, user_id, name, extras))
}

pub fn create_user_tag(
    key: UserCacheKey,
    user_id: &str,
    extras: &[&str],
) -> Result<String, CacheKeyError> {
    Ok(create_user_key_parts(key, user_id, extras)?.join(SEPARATOR))
}

pub fn create_organisation_key_parts(
    key: OrganisationCacheKey,
    organisation_id: &str,
    extras: &[&str],
) -> Result<Vec<String>, CacheKeyError> {
    if organisation_id.trim().is_empty() {
        return Err(CacheKeyError::EmptyOrganisationId);
    }
    let name: &'static str = key.into();
    Ok(build_parts(ORGANISATION_PREFIX, organisation_id, name, extras))
}

pub fn create_organisation_tag(
    key: OrganisationCacheKey,
    organisation_id: &str,
    extras: &[&str],
) -> Result<String, CacheKeyError> {
    Ok(create_organisation_key_parts(key, organisation_id, extras)?.join(SEPARATOR))
}

struct Entry {
    value: serde_json::Value,
    tags: Vec<String>,
    expires_at: i64,
}

/// In-process tag-addressed cache of serialized read results.
pub struct TagCache {
    entries: RwLock<HashMap<String, Entry>>,
    ttl_seconds: i64,
}

impl TagCache {
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl_seconds,
        }
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    fn lookup<T: DeserializeOwned>(&self, key: &str, now: i64) -> Option<T> {
        let entries = self.entries.read();
        let entry = entries.get(key).filter(|e| e.expires_at > now)?;
        serde_json::from_value(entry.value.clone()).ok()
    }

    /// Return the fresh entry for `key_parts`, or run `loader` and store its result.
    pub async fn cached<T, F, Fut>(&self, key_parts: &[String], tags: &[String], loader: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let key = key_parts.join(SEPARATOR);
        if let Some(hit) = self.lookup(&key, now_ts()) {
            return Ok(hit);
        }

        let value = loader().await?;
        let stored = serde_json::to_value(&value)?;
        let now = now_ts();
        let mut entries = self.entries.write();
        // Expired entries are never read again; drop them before growing the map.
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key,
            Entry {
                value: stored,
                tags: tags.to_vec(),
                expires_at: now + self.ttl_seconds,
            },
        );
        Ok(value)
    }

    /// Stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn is_cached(&self, key_parts: &[String]) -> bool {
        let key = key_parts.join(SEPARATOR);
        let now = now_ts();
        self.entries
            .read()
            .get(&key)
            .is_some_and(|e| e.expires_at > now)
    }

    /// Drop every entry labelled with `tag`. Returns how many were removed.
    pub fn revalidate_tag(&self, tag: &str) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.tags.iter().any(|t| t == tag));
        let removed = before - entries.len();
        debug!(tag, removed, "revalidated cache tag");
        removed
    }

    pub fn revalidate_user(
        &self,
        key: UserCacheKey,
        user_id: &str,
        extras: &[&str],
    ) -> Result<(), CacheKeyError> {
        self.revalidate_tag(&create_user_tag(key, user_id, extras)?);
        Ok(())
    }

    pub fn revalidate_organisation(
        &self,
        key: OrganisationCacheKey,
        organisation_id: &str,
        extras: &[&str],
    ) -> Result<(), CacheKeyError> {
        self.revalidate_tag(&create_organisation_tag(key, organisation_id, extras)?);
        Ok(())
    }

}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;

    const ORG: &str = "5f0c9a52-8d8e-4c1e-9a3e-2b1f6a7d9c10";

    #[test]
    fn organisation_tag_has_expected_layout() {
        let tag = create_organisation_tag(OrganisationCacheKey::ContactTasks, ORG, &["c1"]).unwrap();
        assert_eq!(tag, format!("organisation:{ORG}:contacttasks:c1"));
    }

    #[test]
    fn key_parts_drop_empty_extras() {
        let parts = create_user_key_parts(UserCacheKey::Pinned, "u1", &["", "x"]).unwrap();
        assert_eq!(parts, vec!["user", "u1", "pinned", "x"]);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn empty_owner_is_an_error(#[case] owner: &str) {
        assert_eq!(
            create_user_tag(UserCacheKey::Profile, owner, &[]),
            Err(CacheKeyError::EmptyUserId)
        );
        assert_eq!(
            create_organisation_key_parts(OrganisationCacheKey::Members, owner, &[]),
            Err(CacheKeyError::EmptyOrganisationId)
        );
    }

    #[test]
    fn tags_are_distinct_across_keys_and_scopes() {
        let mut seen = HashSet::new();
        for key in UserCacheKey::iter() {
            assert!(seen.insert(create_user_tag(key, ORG, &[]).unwrap()));
        }
        for key in OrganisationCacheKey::iter() {
            assert!(seen.insert(create_organisation_tag(key, ORG, &[]).unwrap()));
        }
    }

    #[test]
    fn separator_inside_parts_cannot_collide() {
        let joined = create_organisation_tag(OrganisationCacheKey::Contact, ORG, &["a:b"]).unwrap();
        let split = create_organisation_tag(OrganisationCacheKey::Contact, ORG, &["a", "b"]).unwrap();
        assert_ne!(joined, split);

        let escaped = create_organisation_tag(OrganisationCacheKey::Contact, ORG, &["a%3Ab"]).unwrap();
        assert_ne!(joined, escaped);
    }

    #[tokio::test]
    async fn revalidate_drops_only_tagged_entries() {
        let cache = TagCache::new(60);
        let a = vec!["a".to_string()];
        let b = vec!["b".to_string()];

        let v: i32 = cache.cached(&a, &["t1".to_string()], || async { Ok(1) }).await.unwrap();
        assert_eq!(v, 1);
        cache.cached(&b, &["t2".to_string()], || async { Ok(2) }).await.unwrap();

        // Served from cache: the loader result is ignored.
        let v: i32 = cache.cached(&a, &["t1".to_string()], || async { Ok(99) }).await.unwrap();
        assert_eq!(v, 1);

        assert_eq!(cache.revalidate_tag("t1"), 1);
        assert!(!cache.is_cached(&a));
        assert!(cache.is_cached(&b));
    }

    #[tokio::test]
    async fn zero_ttl_never_serves_stale_values() {
        let cache = TagCache::new(0);
        let key = vec!["k".to_string()];
        cache.cached(&key, &[], || async { Ok(1) }).await.unwrap();
        let v: i32 = cache.cached(&key, &[], || async { Ok(2) }).await.unwrap();
        assert_eq!(v, 2);
    }

    #[tokio::test]
    async fn expired_entries_are_pruned_on_insert() {
        let cache = TagCache::new(0);
        for i in 0..1_000 {
            let key = vec![format!("search-{i}")];
            cache.cached(&key, &[], || async { Ok(i) }).await.unwrap();
        }
        assert_eq!(cache.len(), 1);

        let live = TagCache::new(60);
        for i in 0..10 {
            let key = vec![format!("page-{i}")];
            live.cached(&key, &[], || async { Ok(i) }).await.unwrap();
        }
        assert_eq!(live.len(), 10);
    }
}
