use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::warn;

use entity::sea_orm_active_enums::Role;
use entity::{session, user};

use crate::error::{Error, Result};
use crate::util::{generate_token, is_uuid_like, now_ts, uuid_v4};

/// Authenticated caller as seen by actions and reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub organisation_id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl Session {
    pub fn from_user(u: &user::Model) -> Self {
        Self {
            user_id: u.id.clone(),
            organisation_id: u.organisation_id.clone(),
            email: u.email.clone(),
            name: u.name.clone(),
            role: u.role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::forbidden("Only admins can perform this action"))
        }
    }
}

/// Shape check run before a session is trusted.
pub fn check_session(session: &Session) -> bool {
    if !is_uuid_like(&session.user_id) {
        warn!("invalid user id format in session; expected a UUID");
        return false;
    }
    if session.email.trim().is_empty() {
        warn!(user_id = %session.user_id, "session user has an empty email");
        return false;
    }
    if session.name.trim().is_empty() {
        warn!(user_id = %session.user_id, "session user has an empty name");
        return false;
    }
    if !is_uuid_like(&session.organisation_id) {
        warn!(user_id = %session.user_id, "session user has an invalid organisation id");
        return false;
    }
    true
}

pub async fn create_session<C: ConnectionTrait>(db: &C, user_id: &str, max_age_seconds: i64) -> Result<String> {
    let now = now_ts();
    let token = generate_token()?;

    session::ActiveModel {
        id: Set(uuid_v4()?),
        user_id: Set(user_id.to_string()),
        token: Set(token.clone()),
        expires_at: Set(now + max_age_seconds),
        created_at: Set(now),
    }
    .insert(db)
    .await?;

    Ok(token)
}

/// Resolve a bearer token against the `sessions` table and load the owning user.
pub async fn authenticate_token<C: ConnectionTrait>(db: &C, token: &str) -> Result<Session> {
    let unauthorized = || Error::Unauthorized("Invalid token".to_string());

    let Some(s) = session::Entity::find()
        .filter(session::Column::Token.eq(token))
        .one(db)
        .await?
    else {
        return Err(unauthorized());
    };

    if s.expires_at <= now_ts() {
        return Err(Error::Unauthorized("Token expired".to_string()));
    }

    let Some(u) = user::Entity::find_by_id(s.user_id.clone()).one(db).await? else {
        return Err(unauthorized());
    };

    let session = Session::from_user(&u);
    if !check_session(&session) {
        return Err(unauthorized());
    }
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            user_id: "0b8e2f0e-43c3-4b8b-a3e6-3f1c5d1b9a01".to_string(),
            organisation_id: "5f0c9a52-8d8e-4c1e-9a3e-2b1f6a7d9c10".to_string(),
            email: "ada@example.com".to_string(),
            name: "Ada".to_string(),
            role: Role::Member,
        }
    }

    #[test]
    fn well_formed_session_passes() {
        assert!(check_session(&session()));
    }

    #[test]
    fn malformed_sessions_fail() {
        let mut s = session();
        s.organisation_id = "org-1".to_string();
        assert!(!check_session(&s));

        let mut s = session();
        s.name = " ".to_string();
        assert!(!check_session(&s));

        let mut s = session();
        s.user_id.clear();
        assert!(!check_session(&s));
    }

    #[test]
    fn members_are_not_admins() {
        assert!(session().require_admin().is_err());
    }
}
