use std::future::{ready, Future, Ready};
use std::ops::Deref;
use std::pin::Pin;

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::domain::errors::FieldError;
use crate::domain::user::Actor;
use crate::errors::AppError;
use crate::http::sql_guard;
use crate::AppState;

/// The caller identified by a valid `Authorization: Bearer` token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Actor);

/// An authenticated caller with the admin role.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub Actor);

fn authenticate(req: &HttpRequest) -> Result<Actor, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("application state missing".to_string()))?;
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;
    let claims = state.auth.verify_token(token).map_err(|e| {
        log::warn!("Rejected bearer token: {}", e);
        AppError::from(e)
    })?;
    Ok(Actor {
        id: claims.sub,
        role: claims.role,
    })
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req).map(AuthUser))
    }
}

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req).and_then(|actor| {
            if actor.is_admin() {
                Ok(AdminUser(actor))
            } else {
                log::warn!("User {} denied access to {}", actor.id, req.path());
                Err(AppError::Forbidden)
            }
        }))
    }
}

/// JSON body that has passed the SQL guard and its `Validate` rules.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T> ValidatedJson<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for ValidatedJson<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> FromRequest for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
{
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let body = web::Bytes::from_request(req, payload);
        let path = req.path().to_string();
        Box::pin(async move {
            let body = body
                .await
                .map_err(|e| AppError::BadRequest(format!("Unreadable request body: {}", e)))?;
            let value: serde_json::Value = serde_json::from_slice(&body)
                .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))?;

            if let Some(field) = sql_guard::find_suspicious(&value) {
                log::warn!("Rejected suspicious payload on {} (field '{}')", path, field);
                return Err(AppError::BadRequest(
                    "Potentially malicious input detected".to_string(),
                ));
            }

            let data: T = serde_json::from_value(value).map_err(|e| {
                AppError::Validation(vec![FieldError::new("body", e.to_string())])
            })?;
            data.validate()
                .map_err(|errors| AppError::Validation(field_errors(&errors)))?;
            Ok(ValidatedJson(data))
        })
    }
}

/// Flattens nested validator output into `{path, message}` pairs, e.g.
/// `shipping.email` or `items[2].quantity`.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    collect(errors, "", &mut out);
    out.sort_by(|a, b| a.path.cmp(&b.path));
    out
}

fn collect(errors: &ValidationErrors, prefix: &str, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", error.code));
                    out.push(FieldError::new(path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(inner, &format!("{}[{}]", path, index), out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, Validate)]
    struct Line {
        #[validate(range(min = 1, message = "Quantity must be at least 1"))]
        quantity: i32,
    }

    #[derive(Debug, Deserialize, Validate)]
    struct Body {
        #[validate(email(message = "Invalid email address"))]
        email: String,
        #[validate]
        lines: Vec<Line>,
    }

    #[test]
    fn nested_errors_get_paths() {
        let body = Body {
            email: "nope".to_string(),
            lines: vec![Line { quantity: 1 }, Line { quantity: 0 }],
        };
        let errors = body.validate().unwrap_err();
        let flat = field_errors(&errors);
        assert_eq!(
            flat,
            vec![
                FieldError::new("email", "Invalid email address"),
                FieldError::new("lines[1].quantity", "Quantity must be at least 1"),
            ]
        );
    }
}
