use serde::Deserialize;
use validator::Validate;

use entity::sea_orm_active_enums::{ContactRecord, ContactStage, ContactTaskStatus};

use super::{empty_string_as_none, trimmed, validate_salutation, validate_uuid, validate_uuid_list};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddContactInput {
    pub record: Option<ContactRecord>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(custom(function = "validate_salutation"))]
    pub salutation: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 64, message = "Maximum 64 characters allowed."))]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 64, message = "Maximum 64 characters allowed."))]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 64, message = "Maximum 64 characters allowed."))]
    pub company_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(email(message = "Enter a valid email address."), length(max = 255))]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 16, message = "Maximum 16 characters allowed."))]
    pub phone1: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 16, message = "Maximum 16 characters allowed."))]
    pub phone2: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 255))]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 70))]
    pub company_registration_number: Option<String>,
    pub stage: Option<ContactStage>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// PERSON contacts need a first and last name, COMPANY contacts a company name.
pub fn check_record_names(
    record: ContactRecord,
    first_name: Option<&str>,
    last_name: Option<&str>,
    company_name: Option<&str>,
) -> Result<()> {
    let blank = |v: Option<&str>| v.is_none_or(|s| s.trim().is_empty());
    match record {
        ContactRecord::Person if blank(first_name) => Err(Error::invalid(
            "First name is required for person contacts",
        )),
        ContactRecord::Person if blank(last_name) => Err(Error::invalid(
            "Last name is required for person contacts",
        )),
        ContactRecord::Company if blank(company_name) => Err(Error::invalid(
            "Company name is required for company contacts",
        )),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContactPropertiesInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_uuid"))]
    pub id: String,
    pub record: ContactRecord,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(custom(function = "validate_salutation"))]
    pub salutation: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 70, message = "Maximum 70 characters allowed."))]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 70, message = "Maximum 70 characters allowed."))]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 70, message = "Maximum 70 characters allowed."))]
    pub company_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(email(message = "Enter a valid email address."), length(max = 255))]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 70))]
    pub phone1: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 70))]
    pub phone2: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 255))]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 70))]
    pub company_registration_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContactStageInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_uuid"))]
    pub id: String,
    pub stage: ContactStage,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TagInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 128))]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContactTagsInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_uuid"))]
    pub id: String,
    #[validate(nested)]
    pub tags: Vec<TagInput>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveAction {
    Archive,
    Unarchive,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveContactsInput {
    #[validate(custom(function = "validate_uuid_list"))]
    pub ids: Vec<String>,
    pub action: ArchiveAction,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeleteContactsInput {
    #[validate(custom(function = "validate_uuid_list"))]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddContactTaskInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_uuid"))]
    pub contact_id: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 255, message = "Title is required."))]
    pub title: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 8000))]
    pub description: Option<String>,
    #[serde(default = "default_task_status")]
    pub status: ContactTaskStatus,
    /// Unix timestamp (seconds).
    pub due_date: Option<i64>,
}

fn default_task_status() -> ContactTaskStatus {
    ContactTaskStatus::Open
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContactTaskInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_uuid"))]
    pub id: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 255, message = "Title is required."))]
    pub title: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 8000))]
    pub description: Option<String>,
    pub status: ContactTaskStatus,
    pub due_date: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddContactNoteInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_uuid"))]
    pub contact_id: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 8000))]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContactNoteInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_uuid"))]
    pub id: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 8000))]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddContactCommentInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_uuid"))]
    pub contact_id: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContactCommentInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_uuid"))]
    pub id: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn person_needs_both_names() {
        assert!(check_record_names(ContactRecord::Person, Some("Ada"), Some("Lovelace"), None).is_ok());
        assert!(check_record_names(ContactRecord::Person, Some("Ada"), Some("  "), None).is_err());
        assert!(check_record_names(ContactRecord::Person, None, Some("Lovelace"), None).is_err());
    }

    #[test]
    fn company_needs_company_name() {
        assert!(check_record_names(ContactRecord::Company, None, None, Some("Acme")).is_ok());
        assert!(check_record_names(ContactRecord::Company, Some("Ada"), Some("L"), None).is_err());
    }

    #[test]
    fn add_contact_rejects_unknown_salutation_and_bad_email() {
        let input: AddContactInput = serde_json::from_str(
            r#"{"record":"PERSON","salutation":"Sir","firstName":"A","lastName":"B","email":"nope"}"#,
        )
        .unwrap();
        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("salutation"));
        assert!(fields.contains_key("email"));
    }

    #[test]
    fn empty_optional_strings_are_accepted() {
        let input: AddContactInput = serde_json::from_str(
            r#"{"record":"COMPANY","companyName":"Acme","salutation":"","email":""}"#,
        )
        .unwrap();
        assert!(input.validate().is_ok());
        assert_eq!(input.email, None);
    }

    #[test]
    fn archive_action_is_lowercase() {
        let input: ArchiveContactsInput =
            serde_json::from_str(r#"{"ids":[],"action":"unarchive"}"#).unwrap();
        assert_eq!(input.action, ArchiveAction::Unarchive);
    }
}
