use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::application::auth_service::{AuthSession, ProfileUpdate};
use crate::domain::user::{Role, User};
use crate::errors::AppError;
use crate::http::{AuthUser, ValidatedJson};
use crate::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be 2 to 100 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, max = 128, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
    #[validate(length(min = 6, max = 128, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be 2 to 100 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 6, max = 128, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        AuthResponse {
            token: session.token,
            user: session.user.into(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /api/auth/register
pub async fn register(
    state: web::Data<AppState>,
    body: ValidatedJson<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let session =
        web::block(move || state.auth.register(&body.name, &body.email, &body.password)).await??;
    Ok(HttpResponse::Created().json(AuthResponse::from(session)))
}

/// POST /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    body: ValidatedJson<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let session = web::block(move || state.auth.login(&body.email, &body.password)).await??;
    Ok(HttpResponse::Ok().json(AuthResponse::from(session)))
}

/// POST /api/auth/forgot-password
///
/// Answers the same way whether or not the email is registered. There is
/// no mail transport; the token is only written to the debug log.
pub async fn forgot_password(
    state: web::Data<AppState>,
    body: ValidatedJson<ForgotPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let token = web::block(move || state.auth.forgot_password(&body.email)).await??;
    if let Some(token) = token {
        log::debug!("Password reset token issued: {}", token);
    }
    Ok(HttpResponse::Ok().json(json!({
        "message": "If that email is registered, a reset link has been sent"
    })))
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    state: web::Data<AppState>,
    body: ValidatedJson<ResetPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    web::block(move || state.auth.reset_password(&body.token, &body.password)).await??;
    Ok(HttpResponse::Ok().json(json!({ "message": "Password has been reset" })))
}

/// GET /api/auth/profile
pub async fn profile(
    state: web::Data<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<HttpResponse, AppError> {
    let user = web::block(move || state.auth.profile(actor.id)).await??;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// PUT /api/auth/profile
pub async fn update_profile(
    state: web::Data<AppState>,
    AuthUser(actor): AuthUser,
    body: ValidatedJson<UpdateProfileRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let update = ProfileUpdate {
        name: body.name,
        email: body.email,
        password: body.password,
    };
    let user = web::block(move || state.auth.update_profile(actor.id, update)).await??;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}
