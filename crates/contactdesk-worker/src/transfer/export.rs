use std::collections::HashMap;

use rust_xlsxwriter::{DocProperties, Format, Workbook};
use sea_orm::{ActiveEnum, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use entity::contact;

use crate::context::AppContext;
use crate::data::contacts::tags_by_contact;
use crate::data::read_uncommitted;
use crate::error::{Error, Result};
use crate::schemas::validate_uuid_list;
use crate::session::Session;
use crate::transfer::CONTACT_COLUMNS;

pub const XLSX_FILE_NAME: &str = "contact-list.xlsx";
pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const CSV_FILE_NAME: &str = "contact-list.csv";
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

const SHEET_NAME: &str = "Contact List";
const COLUMN_WIDTHS: [f64; 12] = [14.0, 12.0, 20.0, 20.0, 28.0, 32.0, 18.0, 18.0, 36.0, 22.0, 16.0, 28.0];

/// Optional subset of contacts; every contact of the organisation when absent.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExportContactsInput {
    #[validate(custom(function = "validate_uuid_list"))]
    pub ids: Option<Vec<String>>,
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// One row per contact, cells in [`CONTACT_COLUMNS`] order.
async fn load_rows(ctx: &AppContext, session: &Session, input: &ExportContactsInput) -> Result<Vec<[String; 12]>> {
    input.validate()?;

    let txn = read_uncommitted(ctx).await?;
    let mut query = contact::Entity::find()
        .filter(contact::Column::OrganisationId.eq(&session.organisation_id))
        .order_by_asc(contact::Column::CreatedAt)
        .order_by_asc(contact::Column::Id);
    if let Some(ids) = &input.ids {
        query = query.filter(contact::Column::Id.is_in(ids.iter().cloned()));
    }
    let contacts = query.all(&txn).await?;
    let ids: Vec<String> = contacts.iter().map(|c| c.id.clone()).collect();
    let mut tags: HashMap<_, _> = tags_by_contact(&txn, &ids).await?;
    txn.commit().await?;

    Ok(contacts
        .into_iter()
        .map(|c| {
            let tag_text = tags
                .remove(&c.id)
                .unwrap_or_default()
                .into_iter()
                .map(|t| t.text)
                .collect::<Vec<_>>()
                .join(",");
            [
                c.record.to_value(),
                opt(&c.salutation),
                opt(&c.first_name),
                opt(&c.last_name),
                opt(&c.company_name),
                opt(&c.email),
                opt(&c.phone1),
                opt(&c.phone2),
                opt(&c.address),
                opt(&c.company_registration_number),
                c.stage.to_value(),
                tag_text,
            ]
        })
        .collect())
}

pub async fn export_contacts_xlsx(ctx: &AppContext, session: &Session, input: ExportContactsInput) -> Result<Vec<u8>> {
    let rows = load_rows(ctx, session, &input).await?;

    let mut workbook = Workbook::new();
    let properties = DocProperties::new()
        .set_author("contactdesk")
        .set_title(SHEET_NAME);
    workbook.set_properties(&properties);

    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    for (col, (title, width)) in CONTACT_COLUMNS.iter().zip(COLUMN_WIDTHS).enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *title, &header)?;
        sheet.set_column_width(col, width)?;
    }
    for (idx, row) in rows.iter().enumerate() {
        let r = idx as u32 + 1;
        for (col, value) in row.iter().enumerate() {
            if !value.is_empty() {
                sheet.write_string(r, col as u16, value)?;
            }
        }
    }

    let bytes = workbook.save_to_buffer()?;
    info!(organisation_id = %session.organisation_id, rows = rows.len(), "contacts exported to xlsx");
    Ok(bytes)
}

pub async fn export_contacts_csv(ctx: &AppContext, session: &Session, input: ExportContactsInput) -> Result<Vec<u8>> {
    let rows = load_rows(ctx, session, &input).await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CONTACT_COLUMNS)?;
    for row in &rows {
        writer.write_record(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| Error::Csv(err.into_error().into()))?;

    info!(organisation_id = %session.organisation_id, rows = rows.len(), "contacts exported to csv");
    Ok(bytes)
}
