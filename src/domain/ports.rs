use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::catalog::{Category, CategoryInput, Deal, DealInput, Product, ProductFilter, ProductInput};
use super::coupon::{Coupon, CouponInput};
use super::errors::DomainError;
use super::order::{NewOrder, OrderStatus, OrderView};
use super::user::{NewUser, User, UserChanges};
use super::Page;

pub trait UserRepository: Send + Sync + 'static {
    /// Fails with `Conflict` when the email is taken.
    fn create(&self, user: NewUser) -> Result<User, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError>;
    fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;
    fn find_by_reset_token(&self, token: &str) -> Result<Option<User>, DomainError>;
    fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, DomainError>;
    fn set_reset_token(
        &self,
        id: Uuid,
        token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), DomainError>;
}

pub trait CategoryRepository: Send + Sync + 'static {
    fn list(&self) -> Result<Vec<Category>, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, DomainError>;
    fn create(&self, input: CategoryInput) -> Result<Category, DomainError>;
    fn update(&self, id: Uuid, input: CategoryInput) -> Result<Option<Category>, DomainError>;
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
}

pub trait ProductRepository: Send + Sync + 'static {
    fn list(&self, filter: &ProductFilter) -> Result<Page<Product>, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError>;
    fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>, DomainError>;
    fn create(&self, input: ProductInput) -> Result<Product, DomainError>;
    fn update(&self, id: Uuid, input: ProductInput) -> Result<Option<Product>, DomainError>;
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
}

pub trait DealRepository: Send + Sync + 'static {
    fn list(&self) -> Result<Vec<Deal>, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Deal>, DomainError>;
    fn create(&self, input: DealInput) -> Result<Deal, DomainError>;
    fn update(&self, id: Uuid, input: DealInput) -> Result<Option<Deal>, DomainError>;
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
}

pub trait CouponRepository: Send + Sync + 'static {
    fn list(&self) -> Result<Vec<Coupon>, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Coupon>, DomainError>;
    /// `code` is expected already normalized.
    fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, DomainError>;
    /// Fails with `Conflict` when the code is taken.
    fn create(&self, input: CouponInput) -> Result<Coupon, DomainError>;
    fn update(&self, id: Uuid, input: CouponInput) -> Result<Option<Coupon>, DomainError>;
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Checks and decrements stock for every item, then inserts the order
    /// and its items. Any failure leaves stock and orders untouched.
    fn create(&self, order: NewOrder) -> Result<Uuid, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError>;
    /// `user_id = None` lists every order.
    fn list(
        &self,
        user_id: Option<Uuid>,
        page: i64,
        limit: i64,
    ) -> Result<Page<OrderView>, DomainError>;
    /// Moves a live order to `status`. Cancelled orders are final, and
    /// cancelling goes through [`OrderRepository::cancel`] so stock is restored.
    fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Option<OrderView>, DomainError>;
    /// Cancels a pending order and puts its items back into stock.
    fn cancel(&self, id: Uuid) -> Result<OrderView, DomainError>;
}
