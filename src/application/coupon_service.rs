use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::coupon::{normalize_code, Coupon, CouponInput, CouponQuote};
use crate::domain::errors::DomainError;
use crate::domain::ports::CouponRepository;

pub struct CouponService {
    coupons: Arc<dyn CouponRepository>,
}

impl CouponService {
    pub fn new(coupons: Arc<dyn CouponRepository>) -> Self {
        Self { coupons }
    }

    pub fn list(&self) -> Result<Vec<Coupon>, DomainError> {
        self.coupons.list()
    }

    pub fn create(&self, mut input: CouponInput) -> Result<Coupon, DomainError> {
        input.code = normalize_code(&input.code);
        input.check()?;
        let coupon = self.coupons.create(input)?;
        log::info!("Created coupon {} ({})", coupon.code, coupon.kind);
        Ok(coupon)
    }

    pub fn update(&self, id: Uuid, mut input: CouponInput) -> Result<Coupon, DomainError> {
        input.code = normalize_code(&input.code);
        input.check()?;
        self.coupons
            .update(id, input)?
            .ok_or(DomainError::NotFound("Coupon"))
    }

    pub fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        if self.coupons.delete(id)? {
            Ok(())
        } else {
            Err(DomainError::NotFound("Coupon"))
        }
    }

    /// Finds the coupon for `code` and checks it is active and inside its
    /// validity window right now.
    pub fn find_valid(&self, code: &str) -> Result<Coupon, DomainError> {
        let coupon = self
            .coupons
            .find_by_code(&normalize_code(code))?
            .ok_or(DomainError::InvalidCoupon)?;
        if !coupon.is_valid_at(Utc::now()) {
            return Err(DomainError::InvalidCoupon);
        }
        Ok(coupon)
    }

    /// Public lookup; includes the discount when a subtotal is supplied.
    pub fn validate(
        &self,
        code: &str,
        subtotal: Option<&BigDecimal>,
    ) -> Result<CouponQuote, DomainError> {
        let coupon = self.find_valid(code)?;
        let discount = subtotal.map(|s| coupon.discount_for(s));
        Ok(CouponQuote { coupon, discount })
    }
}
