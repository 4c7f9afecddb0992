use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// One failed field check, addressed by its path in the request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub message: String,
    pub path: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: path.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Validation failed")]
    Validation(Vec<FieldError>),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid or expired coupon")]
    InvalidCoupon,
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("Access denied")]
    Forbidden,
    #[error("Internal error: {0}")]
    Internal(String),
}
