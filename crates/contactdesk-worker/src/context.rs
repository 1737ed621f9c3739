use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::caching::TagCache;
use crate::config::AppConfig;
use crate::mail::Mailer;
use crate::media::MediaStore;

/// Everything an action or read needs besides the caller's session.
#[derive(Clone)]
pub struct AppContext {
    pub db: DatabaseConnection,
    pub cache: Arc<TagCache>,
    pub mailer: Arc<dyn Mailer>,
    pub media: Arc<dyn MediaStore>,
    pub config: AppConfig,
}

impl AppContext {
    pub fn new(
        db: DatabaseConnection,
        cache: Arc<TagCache>,
        mailer: Arc<dyn Mailer>,
        media: Arc<dyn MediaStore>,
        config: AppConfig,
    ) -> Self {
        Self {
            db,
            cache,
            mailer,
            media,
            config,
        }
    }
}
