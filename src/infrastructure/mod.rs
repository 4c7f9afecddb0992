pub mod catalog_repo;
pub mod coupon_repo;
pub mod memory;
pub mod models;
pub mod order_repo;
pub mod user_repo;

use diesel::result::DatabaseErrorKind;

use crate::domain::errors::DomainError;

pub use catalog_repo::{DieselCategoryRepository, DieselDealRepository, DieselProductRepository};
pub use coupon_repo::DieselCouponRepository;
pub use memory::MemoryStore;
pub use order_repo::DieselOrderRepository;
pub use user_repo::DieselUserRepository;

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                DomainError::Conflict("Resource already exists".to_string())
            }
            diesel::result::Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                DomainError::Conflict("Resource is referenced by other records".to_string())
            }
            other => DomainError::Internal(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

/// Replaces the generic unique-violation message with a resource-specific one.
pub(crate) fn on_unique(message: &'static str) -> impl Fn(diesel::result::Error) -> DomainError {
    move |e| match e {
        diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            DomainError::Conflict(message.to_string())
        }
        other => other.into(),
    }
}
