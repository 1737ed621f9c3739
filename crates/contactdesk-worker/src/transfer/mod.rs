//! Bulk contact transfer: CSV import, CSV/Excel export, and the sample import file.

pub mod export;
pub mod import;
pub mod sample;

/// Column headers shared by exports and the sample import file, in order.
pub const CONTACT_COLUMNS: [&str; 12] = [
    "Record Type",
    "Salutation",
    "First Name",
    "Last Name",
    "Company Name",
    "Email",
    "Primary Phone",
    "Secondary Phone",
    "Address",
    "Company Registration",
    "Stage",
    "Tags",
];
