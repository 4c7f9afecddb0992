use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::coupon::{Coupon, CouponInput};
use crate::domain::errors::DomainError;
use crate::domain::ports::CouponRepository;
use crate::schema::coupons;

use super::models::{CouponChangeset, CouponRow, NewCouponRow};
use super::on_unique;

const CODE_TAKEN: &str = "Coupon code already exists";

pub struct DieselCouponRepository {
    pool: DbPool,
}

impl DieselCouponRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CouponRepository for DieselCouponRepository {
    fn list(&self) -> Result<Vec<Coupon>, DomainError> {
        let mut conn = self.pool.get()?;
        coupons::table
            .select(CouponRow::as_select())
            .order(coupons::created_at.desc())
            .load::<CouponRow>(&mut conn)?
            .into_iter()
            .map(Coupon::try_from)
            .collect()
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Coupon>, DomainError> {
        let mut conn = self.pool.get()?;
        coupons::table
            .find(id)
            .select(CouponRow::as_select())
            .first::<CouponRow>(&mut conn)
            .optional()?
            .map(Coupon::try_from)
            .transpose()
    }

    fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, DomainError> {
        let mut conn = self.pool.get()?;
        coupons::table
            .filter(coupons::code.eq(code))
            .select(CouponRow::as_select())
            .first::<CouponRow>(&mut conn)
            .optional()?
            .map(Coupon::try_from)
            .transpose()
    }

    fn create(&self, input: CouponInput) -> Result<Coupon, DomainError> {
        let mut conn = self.pool.get()?;
        let row: CouponRow = diesel::insert_into(coupons::table)
            .values(&NewCouponRow {
                id: Uuid::new_v4(),
                code: input.code,
                discount: input.discount,
                kind: input.kind.as_str().to_string(),
                max_discount: input.max_discount,
                start_date: input.start_date,
                end_date: input.end_date,
                active: input.active,
                usage_limit: input.usage_limit,
                minimum_purchase: input.minimum_purchase,
            })
            .returning(CouponRow::as_returning())
            .get_result(&mut conn)
            .map_err(on_unique(CODE_TAKEN))?;
        row.try_into()
    }

    fn update(&self, id: Uuid, input: CouponInput) -> Result<Option<Coupon>, DomainError> {
        let mut conn = self.pool.get()?;
        let row: Option<CouponRow> = diesel::update(coupons::table.find(id))
            .set(&CouponChangeset {
                code: input.code,
                discount: input.discount,
                kind: input.kind.as_str().to_string(),
                max_discount: input.max_discount,
                start_date: input.start_date,
                end_date: input.end_date,
                active: input.active,
                usage_limit: input.usage_limit,
                minimum_purchase: input.minimum_purchase,
                updated_at: Utc::now(),
            })
            .returning(CouponRow::as_returning())
            .get_result(&mut conn)
            .optional()
            .map_err(on_unique(CODE_TAKEN))?;
        row.map(Coupon::try_from).transpose()
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(coupons::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;

    use super::*;
    use crate::domain::coupon::CouponKind;
    use crate::infrastructure::test_db::setup_db;

    fn input(code: &str) -> CouponInput {
        CouponInput {
            code: code.to_string(),
            discount: BigDecimal::from_str("0.15").expect("valid decimal"),
            kind: CouponKind::Percentage,
            max_discount: Some(BigDecimal::from(20)),
            start_date: None,
            end_date: None,
            active: true,
            usage_limit: None,
            minimum_purchase: BigDecimal::from(0),
        }
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn percentage_fraction_survives_storage() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCouponRepository::new(pool);

        let created = repo.create(input("SPRING15")).expect("create failed");
        let found = repo
            .find_by_code("SPRING15")
            .expect("find failed")
            .expect("coupon should exist");
        assert_eq!(found.id, created.id);
        assert_eq!(found.kind, CouponKind::Percentage);
        assert_eq!(found.discount, BigDecimal::from_str("0.15").expect("valid decimal"));
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn duplicate_code_conflicts() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCouponRepository::new(pool);

        repo.create(input("ONCE")).expect("create failed");
        let err = repo.create(input("ONCE")).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(msg) if msg == CODE_TAKEN));
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn update_and_delete_missing_coupon() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCouponRepository::new(pool);

        assert!(repo.update(Uuid::new_v4(), input("NOPE")).expect("update failed").is_none());
        assert!(!repo.delete(Uuid::new_v4()).expect("delete failed"));
    }
}
