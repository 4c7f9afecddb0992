use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponKind {
    /// `discount` is a fraction of the subtotal, e.g. `0.2` for 20 %.
    Percentage,
    /// `discount` is an absolute amount.
    Fixed,
}

impl CouponKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponKind::Percentage => "percentage",
            CouponKind::Fixed => "fixed",
        }
    }
}

impl fmt::Display for CouponKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CouponKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(CouponKind::Percentage),
            "fixed" => Ok(CouponKind::Fixed),
            other => Err(DomainError::Internal(format!("unknown coupon kind '{}'", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub discount: BigDecimal,
    pub kind: CouponKind,
    pub max_discount: Option<BigDecimal>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub active: bool,
    /// Stored for reporting; redemptions are not counted against it.
    pub usage_limit: Option<i32>,
    /// Stored for reporting; the cart subtotal is not checked against it.
    pub minimum_purchase: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// Active, and `now` inside `[start_date, end_date]`. A missing bound
    /// leaves that side of the window open.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        if matches!(self.start_date, Some(start) if now < start) {
            return false;
        }
        if matches!(self.end_date, Some(end) if now > end) {
            return false;
        }
        true
    }

    pub fn discount_for(&self, subtotal: &BigDecimal) -> BigDecimal {
        compute_discount(
            self.kind,
            &self.discount,
            self.max_discount.as_ref(),
            subtotal,
        )
    }
}

/// Discount granted on `subtotal`, rounded to cents.
///
/// Percentage discounts are capped by `max_discount` when one is set; fixed
/// discounts never exceed the subtotal.
pub fn compute_discount(
    kind: CouponKind,
    discount: &BigDecimal,
    max_discount: Option<&BigDecimal>,
    subtotal: &BigDecimal,
) -> BigDecimal {
    let amount = match kind {
        CouponKind::Percentage => {
            let raw = subtotal * discount;
            match max_discount {
                Some(cap) if raw > *cap => cap.clone(),
                _ => raw,
            }
        }
        CouponKind::Fixed => {
            if discount > subtotal {
                subtotal.clone()
            } else {
                discount.clone()
            }
        }
    };
    amount.round(2)
}

/// Codes are matched case-insensitively and stored upper-case.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[derive(Debug, Clone)]
pub struct CouponInput {
    pub code: String,
    pub discount: BigDecimal,
    pub kind: CouponKind,
    pub max_discount: Option<BigDecimal>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub active: bool,
    pub usage_limit: Option<i32>,
    pub minimum_purchase: BigDecimal,
}

impl CouponInput {
    pub fn check(&self) -> Result<(), DomainError> {
        if self.kind == CouponKind::Percentage && self.discount > BigDecimal::from(1) {
            return Err(DomainError::InvalidInput(
                "percentage discount must be a fraction between 0 and 1".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(DomainError::InvalidInput(
                    "end_date must not be before start_date".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Outcome of looking a coupon up for a cart.
#[derive(Debug, Clone)]
pub struct CouponQuote {
    pub coupon: Coupon,
    pub discount: Option<BigDecimal>,
}
