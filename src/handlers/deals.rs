use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::catalog::{Deal, DealInput};
use crate::errors::AppError;
use crate::handlers::{fraction, positive};
use crate::http::{AdminUser, ValidatedJson};
use crate::AppState;

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct DealRequest {
    pub product_id: Uuid,
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    /// Fraction of the price taken off, e.g. 0.25.
    #[validate(custom = "positive")]
    pub discount: BigDecimal,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl From<DealRequest> for DealInput {
    fn from(r: DealRequest) -> Self {
        DealInput {
            product_id: r.product_id,
            title: r.title.trim().to_string(),
            discount: r.discount.round(4),
            start_date: r.start_date,
            end_date: r.end_date,
            active: r.active,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DealResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub title: String,
    pub discount: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Deal> for DealResponse {
    fn from(d: Deal) -> Self {
        DealResponse {
            id: d.id,
            product_id: d.product_id,
            title: d.title,
            discount: fraction(&d.discount),
            start_date: d.start_date,
            end_date: d.end_date,
            active: d.active,
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}

fn respond(deals: Vec<Deal>) -> HttpResponse {
    let body: Vec<DealResponse> = deals.into_iter().map(Into::into).collect();
    HttpResponse::Ok().json(body)
}

/// GET /api/deals
///
/// Only deals that are active and inside their date window.
pub async fn live_deals(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let deals = web::block(move || state.catalog.live_deals()).await??;
    Ok(respond(deals))
}

/// GET /api/deals/all
pub async fn all_deals(
    state: web::Data<AppState>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let deals = web::block(move || state.catalog.all_deals()).await??;
    Ok(respond(deals))
}

/// POST /api/deals
pub async fn create_deal(
    state: web::Data<AppState>,
    _admin: AdminUser,
    body: ValidatedJson<DealRequest>,
) -> Result<HttpResponse, AppError> {
    let input = DealInput::from(body.into_inner());
    let deal = web::block(move || state.catalog.create_deal(input)).await??;
    Ok(HttpResponse::Created().json(DealResponse::from(deal)))
}

/// PUT /api/deals/{id}
pub async fn update_deal(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
    body: ValidatedJson<DealRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let input = DealInput::from(body.into_inner());
    let deal = web::block(move || state.catalog.update_deal(id, input)).await??;
    Ok(HttpResponse::Ok().json(DealResponse::from(deal)))
}

/// DELETE /api/deals/{id}
pub async fn delete_deal(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    web::block(move || state.catalog.delete_deal(id)).await??;
    Ok(HttpResponse::NoContent().finish())
}
