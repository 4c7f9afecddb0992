use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::catalog::{Product, ProductFilter, ProductInput};
use crate::errors::AppError;
use crate::handlers::{default_limit, default_page, money, non_negative, positive, PageResponse};
use crate::http::{AdminUser, ValidatedJson};
use crate::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct ProductRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(length(max = 5000, message = "Description is too long"))]
    pub description: Option<String>,
    /// Accepts a JSON number or a decimal string such as "9.99".
    #[validate(custom = "positive")]
    pub price: BigDecimal,
    #[validate(range(min = 0, message = "Stock must not be negative"))]
    pub stock: i32,
    #[validate(url(message = "Invalid image URL"))]
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
}

impl From<ProductRequest> for ProductInput {
    fn from(r: ProductRequest) -> Self {
        ProductInput {
            name: r.name.trim().to_string(),
            description: r.description,
            price: r.price.round(2),
            stock: r.stock,
            image_url: r.image_url,
            category_id: r.category_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: String,
    pub stock: i32,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        ProductResponse {
            id: p.id,
            name: p.name,
            description: p.description,
            price: money(&p.price),
            stock: p.stock,
            image_url: p.image_url,
            category_id: p.category_id,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProductQuery {
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    #[validate(custom = "non_negative")]
    pub min_price: Option<BigDecimal>,
    #[validate(custom = "non_negative")]
    pub max_price: Option<BigDecimal>,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /api/products
///
/// Filters by category, free text on name/description, price range and
/// stock; paginated with `page` (1-based) and `limit` (max 100).
pub async fn list_products(
    state: web::Data<AppState>,
    query: web::Query<ProductQuery>,
) -> Result<HttpResponse, AppError> {
    let q = query.into_inner();
    q.validate()
        .map_err(|e| AppError::Validation(crate::http::field_errors(&e)))?;
    let (page, limit) = (q.page, q.limit);
    let filter = ProductFilter {
        category_id: q.category_id,
        search: q.search,
        min_price: q.min_price,
        max_price: q.max_price,
        in_stock: q.in_stock,
        page,
        limit,
    };
    let result = web::block(move || state.catalog.list_products(filter)).await??;
    Ok(HttpResponse::Ok().json(PageResponse::<ProductResponse>::new(result, page, limit)))
}

/// GET /api/products/{id}
pub async fn get_product(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let product = web::block(move || state.catalog.get_product(id)).await??;
    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

/// POST /api/products
pub async fn create_product(
    state: web::Data<AppState>,
    _admin: AdminUser,
    body: ValidatedJson<ProductRequest>,
) -> Result<HttpResponse, AppError> {
    let input = ProductInput::from(body.into_inner());
    let product = web::block(move || state.catalog.create_product(input)).await??;
    Ok(HttpResponse::Created().json(ProductResponse::from(product)))
}

/// PUT /api/products/{id}
pub async fn update_product(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
    body: ValidatedJson<ProductRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let input = ProductInput::from(body.into_inner());
    let product = web::block(move || state.catalog.update_product(id, input)).await??;
    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

/// DELETE /api/products/{id}
pub async fn delete_product(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    web::block(move || state.catalog.delete_product(id)).await??;
    Ok(HttpResponse::NoContent().finish())
}
