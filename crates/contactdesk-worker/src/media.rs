//! Contact file attachments. Bytes go to object storage, metadata to the database.

use std::collections::HashMap;

use parking_lot::Mutex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IsolationLevel, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Serialize;
use tracing::{info, warn};

use entity::contact_media;

use crate::actions::find_contact;
use crate::caching::{create_organisation_key_parts, create_organisation_tag, OrganisationCacheKey};
use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::util::{is_uuid_like, now_millis, now_ts, sha256_hex, ts_to_rfc3339, uuid_v4};

pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

pub const ALLOWED_TYPES: &[&str] = &[
    "application/pdf",
    "image/png",
    "image/jpeg",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait MediaStore {
    /// Store `bytes` under `key` and return the public URL.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;

    async fn delete(&self, key: &str) -> Result<()>;
}

#[derive(Default)]
pub struct InMemoryMediaStore {
    objects: Mutex<HashMap<String, (String, Vec<u8>)>>,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().get(key).map(|(_, bytes)| bytes.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl MediaStore for InMemoryMediaStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        self.objects
            .lock()
            .insert(key.to_string(), (content_type.to_string(), bytes));
        Ok(format!("/uploads/{key}"))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.lock().remove(key);
        Ok(())
    }
}

/// File as received from a multipart form.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMediaDto {
    pub id: String,
    pub contact_id: String,
    pub file_name: String,
    pub file_size: i64,
    pub file_type: String,
    pub file_url: String,
    pub created_at: String,
}

impl From<contact_media::Model> for ContactMediaDto {
    fn from(m: contact_media::Model) -> Self {
        Self {
            id: m.id,
            contact_id: m.contact_id,
            file_name: m.file_name,
            file_size: m.file_size,
            file_type: m.file_type,
            file_url: m.file_url,
            created_at: ts_to_rfc3339(m.created_at),
        }
    }
}

const MAX_EXTENSION_LEN: usize = 8;

/// `.ext` of the file name when it is short ASCII alphanumeric text, otherwise empty.
fn extension(file_name: &str) -> &str {
    let Some(idx) = file_name.rfind('.').filter(|idx| *idx > 0) else {
        return "";
    };
    let ext = &file_name[idx + 1..];
    if ext.is_empty() || ext.len() > MAX_EXTENSION_LEN || !ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return "";
    }
    &file_name[idx..]
}

/// Storage key: `<unix millis>-<first 8 hex of sha256><original extension>`.
pub fn storage_key(file_name: &str, bytes: &[u8], millis: i64) -> String {
    let hash = sha256_hex(bytes);
    format!("{millis}-{}{}", &hash[..8], extension(file_name))
}

pub fn validate_upload(upload: &MediaUpload) -> Result<()> {
    if upload.bytes.is_empty() || upload.content_type.is_empty() {
        return Err(Error::invalid("A non-empty file is required"));
    }
    if !ALLOWED_TYPES.contains(&upload.content_type.as_str()) {
        return Err(Error::invalid(format!(
            "File type {} is not allowed",
            upload.content_type
        )));
    }
    if upload.bytes.len() > MAX_FILE_SIZE {
        return Err(Error::invalid("File exceeds the 10 MB limit"));
    }
    Ok(())
}

async fn ensure_contact(ctx: &AppContext, session: &Session, contact_id: &str) -> Result<()> {
    if !is_uuid_like(contact_id) {
        return Err(Error::invalid("Invalid contact id"));
    }
    find_contact(&ctx.db, &session.organisation_id, contact_id).await?;
    Ok(())
}

async fn insert_media(ctx: &AppContext, record: contact_media::ActiveModel) -> Result<contact_media::Model> {
    let txn = ctx
        .db
        .begin_with_config(Some(IsolationLevel::ReadCommitted), None)
        .await?;
    let media = record.insert(&txn).await?;
    txn.commit().await?;
    Ok(media)
}

pub async fn upload_contact_media(
    ctx: &AppContext,
    session: &Session,
    contact_id: &str,
    upload: MediaUpload,
) -> Result<ContactMediaDto> {
    ensure_contact(ctx, session, contact_id).await?;
    validate_upload(&upload)?;

    let key = storage_key(&upload.file_name, &upload.bytes, now_millis());
    let file_size = upload.bytes.len() as i64;
    let file_url = ctx.media.put(&key, upload.bytes, &upload.content_type).await?;

    let record = contact_media::ActiveModel {
        id: Set(uuid_v4()?),
        contact_id: Set(contact_id.to_string()),
        file_name: Set(upload.file_name),
        file_size: Set(file_size),
        file_type: Set(upload.content_type),
        file_url: Set(file_url),
        created_at: Set(now_ts()),
    };
    let media = match insert_media(ctx, record).await {
        Ok(media) => media,
        Err(e) => {
            // No row will ever point at the object.
            if let Err(cleanup) = ctx.media.delete(&key).await {
                warn!(key, error = %cleanup, "failed to delete orphaned media object");
            }
            return Err(e);
        }
    };

    ctx.cache.revalidate_tag(&create_organisation_tag(
        OrganisationCacheKey::ContactMedia,
        &session.organisation_id,
        &[contact_id],
    )?);

    info!(contact_id, media_id = %media.id, key, "contact media saved");
    Ok(media.into())
}

pub async fn list_contact_media(
    ctx: &AppContext,
    session: &Session,
    contact_id: &str,
) -> Result<Vec<ContactMediaDto>> {
    ensure_contact(ctx, session, contact_id).await?;

    let key_parts = create_organisation_key_parts(
        OrganisationCacheKey::ContactMedia,
        &session.organisation_id,
        &[contact_id],
    )?;
    let tags = vec![create_organisation_tag(
        OrganisationCacheKey::ContactMedia,
        &session.organisation_id,
        &[contact_id],
    )?];

    ctx.cache
        .cached(&key_parts, &tags, move || async move {
            let txn = ctx
                .db
                .begin_with_config(Some(IsolationLevel::ReadUncommitted), None)
                .await?;
            let media = contact_media::Entity::find()
                .filter(contact_media::Column::ContactId.eq(contact_id))
                .order_by_desc(contact_media::Column::CreatedAt)
                .order_by_desc(contact_media::Column::Id)
                .all(&txn)
                .await?;
            txn.commit().await?;
            Ok(media.into_iter().map(ContactMediaDto::from).collect())
        })
        .await
}
