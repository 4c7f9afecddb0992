use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::ports::UserRepository;
use crate::domain::user::{normalize_email, NewUser, Role, User, UserChanges};
use crate::security::jwt::{Claims, JwtKeys};
use crate::security::password::{generate_reset_token, hash_password, verify_password};

const RESET_TOKEN_TTL_MINUTES: i64 = 60;
const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, keys: JwtKeys) -> Self {
        Self { users, keys }
    }

    pub fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthSession, DomainError> {
        self.register_with_role(name, email, password, Role::Customer)
    }

    /// Used by the admin bootstrap at start-up as well as by `register`.
    pub fn register_with_role(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<AuthSession, DomainError> {
        let email = normalize_email(email);
        if self.users.find_by_email(&email)?.is_some() {
            return Err(DomainError::Conflict("Email is already registered".to_string()));
        }
        let user = self.users.create(NewUser {
            name: name.trim().to_string(),
            email,
            password_hash: hash_password(password)?,
            role,
        })?;
        log::info!("Registered user {} ({})", user.id, user.role);
        self.session_for(user)
    }

    pub fn login(&self, email: &str, password: &str) -> Result<AuthSession, DomainError> {
        let email = normalize_email(email);
        let Some(user) = self.users.find_by_email(&email)? else {
            log::warn!("Login attempt for unknown email");
            return Err(DomainError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };
        if !verify_password(password, &user.password_hash)? {
            log::warn!("Failed login for user {}", user.id);
            return Err(DomainError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
        self.session_for(user)
    }

    /// Issues a reset token when the email belongs to a user. Callers report
    /// success either way so the endpoint cannot be used to probe accounts.
    pub fn forgot_password(&self, email: &str) -> Result<Option<String>, DomainError> {
        let email = normalize_email(email);
        let Some(user) = self.users.find_by_email(&email)? else {
            return Ok(None);
        };
        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.users
            .set_reset_token(user.id, Some(token.clone()), Some(expires_at))?;
        log::info!("Password reset requested for user {}", user.id);
        Ok(Some(token))
    }

    pub fn reset_password(&self, token: &str, new_password: &str) -> Result<(), DomainError> {
        let invalid = || DomainError::InvalidInput("Invalid or expired reset token".to_string());
        let user = self.users.find_by_reset_token(token)?.ok_or_else(invalid)?;
        let expired = user
            .reset_token_expires_at
            .map_or(true, |expires_at| expires_at < Utc::now());
        if expired {
            self.users.set_reset_token(user.id, None, None)?;
            return Err(invalid());
        }
        self.users.update(
            user.id,
            UserChanges {
                password_hash: Some(hash_password(new_password)?),
                ..Default::default()
            },
        )?;
        self.users.set_reset_token(user.id, None, None)?;
        log::info!("Password reset completed for user {}", user.id);
        Ok(())
    }

    pub fn profile(&self, user_id: Uuid) -> Result<User, DomainError> {
        self.users
            .find_by_id(user_id)?
            .ok_or(DomainError::NotFound("User"))
    }

    pub fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> Result<User, DomainError> {
        let current = self.profile(user_id)?;
        let email = match update.email {
            Some(email) => {
                let email = normalize_email(&email);
                if email != current.email && self.users.find_by_email(&email)?.is_some() {
                    return Err(DomainError::Conflict("Email is already registered".to_string()));
                }
                Some(email)
            }
            None => None,
        };
        let password_hash = update.password.as_deref().map(hash_password).transpose()?;
        self.users.update(
            user_id,
            UserChanges {
                name: update.name.map(|n| n.trim().to_string()),
                email,
                password_hash,
            },
        )
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, DomainError> {
        self.keys.verify(token)
    }

    fn session_for(&self, user: User) -> Result<AuthSession, DomainError> {
        let token = self.keys.issue(user.id, user.role)?;
        Ok(AuthSession { token, user })
    }
}
