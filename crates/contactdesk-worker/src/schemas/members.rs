use serde::Deserialize;
use validator::Validate;

use entity::sea_orm_active_enums::Role;

use super::{trimmed, validate_uuid};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendInvitationInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(email(message = "Enter a valid email address."), length(max = 255))]
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRoleInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_uuid"))]
    pub id: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invitation_email_is_trimmed_and_checked() {
        let input: SendInvitationInput =
            serde_json::from_str(r#"{"email":"  new@example.com ","role":"MEMBER"}"#).unwrap();
        assert_eq!(input.email, "new@example.com");
        assert!(input.validate().is_ok());

        let bad: SendInvitationInput =
            serde_json::from_str(r#"{"email":"not-an-email","role":"ADMIN"}"#).unwrap();
        assert!(bad.validate().is_err());
    }
}
