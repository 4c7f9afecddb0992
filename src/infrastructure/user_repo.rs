use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::UserRepository;
use crate::domain::user::{NewUser, User, UserChanges};
use crate::schema::users;

use super::models::{NewUserRow, UserChangeset, UserRow};
use super::on_unique;

const EMAIL_TAKEN: &str = "Email is already registered";

pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl UserRepository for DieselUserRepository {
    fn create(&self, user: NewUser) -> Result<User, DomainError> {
        let mut conn = self.pool.get()?;
        let row: UserRow = diesel::insert_into(users::table)
            .values(&NewUserRow {
                id: Uuid::new_v4(),
                name: user.name,
                email: user.email,
                password_hash: user.password_hash,
                role: user.role.as_str().to_string(),
            })
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .map_err(on_unique(EMAIL_TAKEN))?;
        row.try_into()
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        let mut conn = self.pool.get()?;
        users::table
            .find(id)
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let mut conn = self.pool.get()?;
        users::table
            .filter(users::email.eq(email))
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    fn find_by_reset_token(&self, token: &str) -> Result<Option<User>, DomainError> {
        let mut conn = self.pool.get()?;
        users::table
            .filter(users::reset_token.eq(token))
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, DomainError> {
        let mut conn = self.pool.get()?;
        let row: UserRow = diesel::update(users::table.find(id))
            .set(&UserChangeset {
                name: changes.name,
                email: changes.email,
                password_hash: changes.password_hash,
                updated_at: Utc::now(),
            })
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .optional()
            .map_err(on_unique(EMAIL_TAKEN))?
            .ok_or(DomainError::NotFound("User"))?;
        row.try_into()
    }

    fn set_reset_token(
        &self,
        id: Uuid,
        token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(users::table.find(id))
            .set((
                users::reset_token.eq(token),
                users::reset_token_expires_at.eq(expires_at),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(DomainError::NotFound("User"));
        }
        Ok(())
    }
}
