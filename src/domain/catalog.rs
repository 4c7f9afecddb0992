use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CategoryInput {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub stock: i32,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub stock: i32,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    /// Case-insensitive substring of name or description.
    pub search: Option<String>,
    pub min_price: Option<BigDecimal>,
    pub max_price: Option<BigDecimal>,
    pub in_stock: bool,
    pub page: i64,
    pub limit: i64,
}

impl ProductFilter {
    pub fn check(&self) -> Result<(), DomainError> {
        if let (Some(min), Some(max)) = (&self.min_price, &self.max_price) {
            if min > max {
                return Err(DomainError::InvalidInput(
                    "min_price must not exceed max_price".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

/// Time-boxed discount on a single product.
#[derive(Debug, Clone)]
pub struct Deal {
    pub id: Uuid,
    pub product_id: Uuid,
    pub title: String,
    /// Fraction taken off the product price, `0 < discount <= 1`.
    pub discount: BigDecimal,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deal {
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.active
            && self.start_date.map_or(true, |start| now >= start)
            && self.end_date.map_or(true, |end| now <= end)
    }

    pub fn deal_price(&self, price: &BigDecimal) -> BigDecimal {
        (price - price * &self.discount).round(2)
    }
}

#[derive(Debug, Clone)]
pub struct DealInput {
    pub product_id: Uuid,
    pub title: String,
    pub discount: BigDecimal,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub active: bool,
}

impl DealInput {
    pub fn check(&self) -> Result<(), DomainError> {
        if self.discount <= BigDecimal::from(0) || self.discount > BigDecimal::from(1) {
            return Err(DomainError::InvalidInput(
                "discount must be a fraction in (0, 1]".to_string(),
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
