pub mod auth;
pub mod categories;
pub mod coupons;
pub mod deals;
pub mod health;
pub mod orders;
pub mod products;

use std::borrow::Cow;

use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use validator::ValidationError;

use crate::domain::Page;

// ── Shared DTO helpers ───────────────────────────────────────────────────────

/// Money is rendered as a string with two decimals, e.g. "9.99".
pub fn money(value: &BigDecimal) -> String {
    value.with_scale(2).to_string()
}

/// Fractions (percentage coupons, deal discounts) keep their full precision.
pub fn fraction(value: &BigDecimal) -> String {
    value.normalized().to_string()
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

pub(crate) fn non_negative(value: &BigDecimal) -> Result<(), ValidationError> {
    if value < &BigDecimal::zero() {
        return Err(invalid("non_negative", "Must not be negative"));
    }
    Ok(())
}

pub(crate) fn positive(value: &BigDecimal) -> Result<(), ValidationError> {
    if value <= &BigDecimal::zero() {
        return Err(invalid("positive", "Must be greater than zero"));
    }
    Ok(())
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PageParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

pub(crate) fn default_page() -> i64 {
    1
}

pub(crate) fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

impl<T> PageResponse<T> {
    pub fn new<U>(page: Page<U>, number: i64, limit: i64) -> Self
    where
        T: From<U>,
    {
        let (number, limit) = crate::domain::clamp_page(number, limit);
        PageResponse {
            items: page.items.into_iter().map(T::from).collect(),
            total: page.total,
            page: number,
            limit,
        }
    }
}
