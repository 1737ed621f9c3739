use worker::{Bucket, Data, Env, HttpMetadata};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::media::MediaStore;
use crate::worker_wasm::env::env_string;

pub const MEDIA_BINDING: &str = "MEDIA";

/// Contact media kept in an R2 bucket.
///
/// Objects are served from `MEDIA_PUBLIC_URL` when a public bucket domain is configured,
/// otherwise through the worker's own `/media/<key>` route.
pub struct R2MediaStore {
    bucket: Bucket,
    public_base: String,
}

impl R2MediaStore {
    pub fn from_env(env: &Env, config: &AppConfig) -> worker::Result<Self> {
        let public_base = env_string(env, "MEDIA_PUBLIC_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("{}/media", config.base_url));
        Ok(Self {
            bucket: env.bucket(MEDIA_BINDING)?,
            public_base,
        })
    }
}

fn storage_err(e: worker::Error) -> Error {
    Error::Storage(e.to_string())
}

#[async_trait::async_trait(?Send)]
impl MediaStore for R2MediaStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        self.bucket
            .put(key, Data::Bytes(bytes))
            .http_metadata(HttpMetadata {
                content_type: Some(content_type.to_string()),
                ..Default::default()
            })
            .execute()
            .await
            .map_err(storage_err)?;
        Ok(format!("{}/{key}", self.public_base))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.bucket.delete(key).await.map_err(storage_err)
    }
}

/// Object bytes and content type, or `None` when the key is unknown.
pub async fn fetch_object(env: &Env, key: &str) -> worker::Result<Option<(Vec<u8>, Option<String>)>> {
    let bucket = env.bucket(MEDIA_BINDING)?;
    let Some(object) = bucket.get(key).execute().await? else {
        return Ok(None);
    };
    let content_type = object.http_metadata().content_type;
    let Some(body) = object.body() else {
        return Ok(None);
    };
    Ok(Some((body.bytes().await?, content_type)))
}
