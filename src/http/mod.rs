pub mod extractors;
pub mod sql_guard;

pub use extractors::{field_errors, AdminUser, AuthUser, ValidatedJson};
