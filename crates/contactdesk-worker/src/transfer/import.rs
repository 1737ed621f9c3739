//! CSV contact import with per-row validation.
//!
//! Rows are validated independently. Valid rows are written inside one transaction,
//! each in its own savepoint, so a row that fails to insert leaves nothing behind.

use std::collections::{BTreeMap, HashMap};

use sea_orm::{ActiveEnum, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use entity::sea_orm_active_enums::{ContactRecord, ContactStage};

use crate::actions::contacts::create_contact_and_capture;
use crate::caching::{OrganisationCacheKey, UserCacheKey};
use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::schemas::contacts::AddContactInput;
use crate::schemas::SALUTATIONS;
use crate::session::Session;

pub type Row = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportContactsInput {
    /// Contact field name to source column header.
    pub mappings: HashMap<String, String>,
    #[serde(default)]
    pub data: Vec<Row>,
    /// Raw CSV text with a header row; used when `data` is empty.
    #[serde(default)]
    pub csv: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRowError {
    /// 1-based position among the non-blank rows.
    pub row: usize,
    pub error: String,
    pub row_data: Row,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub success: usize,
    pub skipped: usize,
    pub errors: Vec<ImportRowError>,
    pub message: String,
}

/// Parse CSV text into header-keyed rows.
pub fn parse_csv(text: &str) -> Result<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect(),
        );
    }
    Ok(rows)
}

fn is_blank(row: &Row) -> bool {
    row.values().all(|v| v.trim().is_empty())
}

struct Mapped<'a> {
    row: &'a Row,
    mappings: &'a HashMap<String, String>,
}

impl Mapped<'_> {
    fn get(&self, field: &str) -> Option<String> {
        let column = self.mappings.get(field)?;
        let value = self.row.get(column)?.trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

/// Turn one mapped row into a contact, or explain why it cannot be imported.
pub fn row_to_contact(row: &Row, mappings: &HashMap<String, String>) -> Result<AddContactInput, String> {
    let m = Mapped { row, mappings };

    let salutation = m.get("salutation");
    if let Some(s) = salutation.as_deref() {
        if !SALUTATIONS.contains(&s) {
            return Err(format!(
                "Invalid salutation \"{s}\". Must be one of: {}",
                SALUTATIONS.join(", ")
            ));
        }
    }

    let record = match m.get("record").map(|r| r.to_uppercase()).as_deref() {
        None | Some("PERSON") => ContactRecord::Person,
        Some("COMPANY") => ContactRecord::Company,
        Some(_) => return Err("Invalid record type. Must be either \"PERSON\" or \"COMPANY\"".to_string()),
    };

    let (first_name, last_name, company_name) = match record {
        ContactRecord::Person => {
            let first = m
                .get("firstName")
                .ok_or("First name is required for person records")?;
            let last = m
                .get("lastName")
                .ok_or("Last name is required for person records")?;
            (Some(first), Some(last), None)
        }
        ContactRecord::Company => {
            let company = m
                .get("companyName")
                .ok_or("Company name is required for company records")?;
            (None, None, Some(company))
        }
    };

    let stage = match m.get("stage") {
        None => ContactStage::Lead,
        Some(raw) => {
            let normalized = raw.to_uppercase().replace([' ', '-'], "_");
            ContactStage::try_from_value(&normalized)
                .map_err(|_| format!("Invalid stage \"{raw}\""))?
        }
    };

    let tags = m
        .get("tags")
        .map(|t| {
            t.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(AddContactInput {
        record: Some(record),
        salutation,
        first_name,
        last_name,
        company_name,
        email: m.get("email"),
        phone1: m.get("phone1"),
        phone2: m.get("phone2"),
        address: m.get("address"),
        company_registration_number: m.get("companyRegistrationNumber"),
        stage: Some(stage),
        tags,
    })
}

pub async fn import_contacts(ctx: &AppContext, session: &Session, input: ImportContactsInput) -> Result<ImportResult> {
    if input.mappings.is_empty() {
        return Err(Error::invalid("Invalid import data"));
    }
    let rows = match (input.data.is_empty(), input.csv.as_deref()) {
        (true, Some(text)) => parse_csv(text)?,
        _ => input.data,
    };
    let rows: Vec<Row> = rows.into_iter().filter(|r| !is_blank(r)).collect();

    let mut success = 0usize;
    let mut errors = Vec::new();

    let txn = ctx.db.begin().await?;
    for (idx, row) in rows.into_iter().enumerate() {
        let number = idx + 1;
        let contact = match row_to_contact(&row, &input.mappings) {
            Ok(contact) => contact,
            Err(error) => {
                errors.push(ImportRowError {
                    row: number,
                    error,
                    row_data: row,
                });
                continue;
            }
        };

        let savepoint = txn.begin().await?;
        match create_contact_and_capture(&savepoint, session, contact).await {
            Ok(_) => {
                savepoint.commit().await?;
                success += 1;
            }
            Err(err) => {
                savepoint.rollback().await?;
                warn!(row = number, error = %err, "import row rejected");
                errors.push(ImportRowError {
                    row: number,
                    error: err.public_message(),
                    row_data: row,
                });
            }
        }
    }
    txn.commit().await?;

    ctx.revalidate_organisation(session, OrganisationCacheKey::Contacts, &[])?;
    ctx.revalidate_organisation(session, OrganisationCacheKey::ContactTags, &[])?;
    ctx.revalidate_organisation(session, OrganisationCacheKey::LeadGenerationData, &[])?;
    ctx.revalidate_user(session, UserCacheKey::Pinned, &[])?;

    let skipped = errors.len();
    info!(organisation_id = %session.organisation_id, success, skipped, "contacts imported");
    Ok(ImportResult {
        success,
        skipped,
        message: format!("Successfully imported {success} contacts. Skipped {skipped} invalid entries."),
        errors,
    })
}
