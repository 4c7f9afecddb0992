use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::catalog::{Category, CategoryInput};
use crate::errors::AppError;
use crate::http::{AdminUser, ValidatedJson};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(length(max = 2000, message = "Description is too long"))]
    pub description: Option<String>,
}

impl From<CategoryRequest> for CategoryInput {
    fn from(r: CategoryRequest) -> Self {
        CategoryInput {
            name: r.name.trim().to_string(),
            description: r.description,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Category> for CategoryResponse {
    fn from(c: Category) -> Self {
        CategoryResponse {
            id: c.id,
            name: c.name,
            description: c.description,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// GET /api/categories
pub async fn list_categories(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let categories = web::block(move || state.catalog.list_categories()).await??;
    let body: Vec<CategoryResponse> = categories.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /api/categories/{id}
pub async fn get_category(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let category = web::block(move || state.catalog.get_category(id)).await??;
    Ok(HttpResponse::Ok().json(CategoryResponse::from(category)))
}

/// POST /api/categories
pub async fn create_category(
    state: web::Data<AppState>,
    _admin: AdminUser,
    body: ValidatedJson<CategoryRequest>,
) -> Result<HttpResponse, AppError> {
    let input = CategoryInput::from(body.into_inner());
    let category = web::block(move || state.catalog.create_category(input)).await??;
    Ok(HttpResponse::Created().json(CategoryResponse::from(category)))
}

/// PUT /api/categories/{id}
pub async fn update_category(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
    body: ValidatedJson<CategoryRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let input = CategoryInput::from(body.into_inner());
    let category = web::block(move || state.catalog.update_category(id, input)).await??;
    Ok(HttpResponse::Ok().json(CategoryResponse::from(category)))
}

/// DELETE /api/categories/{id}
///
/// Products in the category are kept and become uncategorised.
pub async fn delete_category(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    web::block(move || state.catalog.delete_category(id)).await??;
    Ok(HttpResponse::NoContent().finish())
}
