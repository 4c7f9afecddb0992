use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::coupon::{Coupon, CouponInput, CouponKind};
use crate::errors::AppError;
use crate::handlers::{fraction, money, non_negative, positive};
use crate::http::{AdminUser, ValidatedJson};
use crate::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct CouponRequest {
    #[validate(length(min = 3, max = 64, message = "Code must be 3 to 64 characters"))]
    pub code: String,
    /// A fraction for `percentage` coupons (0.2 = 20 %), an amount for `fixed`.
    #[validate(custom = "positive")]
    pub discount: BigDecimal,
    #[serde(rename = "type", alias = "kind")]
    pub kind: CouponKind,
    #[validate(custom = "positive")]
    pub max_discount: Option<BigDecimal>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[validate(range(min = 1, message = "Usage limit must be at least 1"))]
    pub usage_limit: Option<i32>,
    #[validate(custom = "non_negative")]
    pub minimum_purchase: Option<BigDecimal>,
}

impl From<CouponRequest> for CouponInput {
    fn from(r: CouponRequest) -> Self {
        CouponInput {
            code: r.code,
            discount: r.discount.round(4),
            kind: r.kind,
            max_discount: r.max_discount.map(|m| m.round(2)),
            start_date: r.start_date,
            end_date: r.end_date,
            active: r.active,
            usage_limit: r.usage_limit,
            minimum_purchase: r
                .minimum_purchase
                .map(|m| m.round(2))
                .unwrap_or_else(|| BigDecimal::from(0)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CouponResponse {
    pub id: Uuid,
    pub code: String,
    pub discount: String,
    #[serde(rename = "type")]
    pub kind: CouponKind,
    pub max_discount: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub active: bool,
    pub usage_limit: Option<i32>,
    pub minimum_purchase: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Coupon> for CouponResponse {
    fn from(c: Coupon) -> Self {
        CouponResponse {
            id: c.id,
            code: c.code,
            discount: match c.kind {
                CouponKind::Percentage => fraction(&c.discount),
                CouponKind::Fixed => money(&c.discount),
            },
            kind: c.kind,
            max_discount: c.max_discount.as_ref().map(money),
            start_date: c.start_date,
            end_date: c.end_date,
            active: c.active,
            usage_limit: c.usage_limit,
            minimum_purchase: money(&c.minimum_purchase),
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ValidateParams {
    pub subtotal: Option<BigDecimal>,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub coupon: CouponResponse,
    /// Present when a subtotal was supplied.
    pub discount_amount: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /api/coupons/validate/{code}
///
/// 400 "Invalid or expired coupon" when the code is unknown, inactive or
/// outside its date window.
pub async fn validate_coupon(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<ValidateParams>,
) -> Result<HttpResponse, AppError> {
    let code = path.into_inner();
    let subtotal = query.into_inner().subtotal;
    if matches!(&subtotal, Some(s) if non_negative(s).is_err()) {
        return Err(AppError::BadRequest("subtotal must not be negative".to_string()));
    }
    let quote = web::block(move || state.coupons.validate(&code, subtotal.as_ref())).await??;
    Ok(HttpResponse::Ok().json(ValidateResponse {
        valid: true,
        discount_amount: quote.discount.as_ref().map(money),
        coupon: quote.coupon.into(),
    }))
}

/// GET /api/coupons
pub async fn list_coupons(
    state: web::Data<AppState>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let coupons = web::block(move || state.coupons.list()).await??;
    let body: Vec<CouponResponse> = coupons.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// POST /api/coupons
pub async fn create_coupon(
    state: web::Data<AppState>,
    _admin: AdminUser,
    body: ValidatedJson<CouponRequest>,
) -> Result<HttpResponse, AppError> {
    let input = CouponInput::from(body.into_inner());
    let coupon = web::block(move || state.coupons.create(input)).await??;
    Ok(HttpResponse::Created().json(CouponResponse::from(coupon)))
}

/// PUT /api/coupons/{id}
pub async fn update_coupon(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
    body: ValidatedJson<CouponRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let input = CouponInput::from(body.into_inner());
    let coupon = web::block(move || state.coupons.update(id, input)).await??;
    Ok(HttpResponse::Ok().json(CouponResponse::from(coupon)))
}

/// DELETE /api/coupons/{id}
pub async fn delete_coupon(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    web::block(move || state.coupons.delete(id)).await??;
    Ok(HttpResponse::NoContent().finish())
}
