use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Uploaded file metadata. Bytes live in object storage.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contact_media")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub contact_id: String,
    pub file_name: String,
    pub file_size: i64,
    pub file_type: String,
    pub file_url: String,

    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
