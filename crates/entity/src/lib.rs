pub mod sea_orm_active_enums;

pub mod api_key;
pub mod contact;
pub mod contact_activity;
pub mod contact_comment;
pub mod contact_media;
pub mod contact_note;
pub mod contact_page_visit;
pub mod contact_tag;
pub mod contact_tag_link;
pub mod contact_task;
pub mod feedback;
pub mod invitation;
pub mod organisation;
pub mod pinned;
pub mod session;
pub mod user;
pub mod webhook;
pub mod work_hours;
pub mod work_time_slot;

pub use api_key::Entity as ApiKey;
pub use contact::Entity as Contact;
pub use contact_tag::Entity as ContactTag;
pub use invitation::Entity as Invitation;
pub use organisation::Entity as Organisation;
pub use pinned::Entity as Pinned;
pub use user::Entity as User;
pub use webhook::Entity as Webhook;
