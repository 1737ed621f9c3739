use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::sea_orm_active_enums::Role;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub organisation_id: String,

    pub name: String,

    /// Always stored lower-cased.
    #[sea_orm(unique)]
    pub email: String,

    /// Hex-encoded PBKDF2-SHA256 output.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    #[serde(skip_serializing)]
    pub password_salt: Option<String>,
    /// PBKDF2 rounds the stored hash was derived with.
    #[serde(skip_serializing)]
    pub password_iterations: i32,

    pub role: Role,
    pub locale: String,
    pub phone: Option<String>,
    pub image: Option<String>,
    pub completed_onboarding: bool,

    pub last_login: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
