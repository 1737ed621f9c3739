pub const SAMPLE_FILE_NAME: &str = "sample-contacts.csv";

const SAMPLE_CONTACTS_CSV: &str = "\
Record Type,Salutation,First Name,Last Name,Company Name,Email,Primary Phone,Secondary Phone,Address,Company Registration,Stage,Tags
PERSON,Mrs,Berniece,Bahringer,Barton Boyer and Upton,your.email+fakedata45092@gmail.com,655-727-8198,088-053-8015,335 Gislason Parkway,,LEAD,
COMPANY,,,,Becker - Mueller,your.email+fakedata47704@gmail.com,246-972-2591,358-858-7834,82434 Janie Hills,Fisher and Sons,LEAD,
PERSON,Miss,Berniece,Shanahan,,your.email+fakedata45092@gmail.com,655-727-8198,088-053-8015,335 Gislason Parkway,,LEAD,";

/// Publicly downloadable example of the import format.
pub fn sample_contacts_csv() -> &'static str {
    SAMPLE_CONTACTS_CSV
}
