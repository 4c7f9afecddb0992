//! Process-local implementation of every repository port.
//!
//! Selected with `APP_STORAGE=memory`; nothing survives a restart. The
//! service and HTTP tests run against it as well.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::catalog::{
    Category, CategoryInput, Deal, DealInput, Product, ProductFilter, ProductInput,
};
use crate::domain::coupon::{Coupon, CouponInput};
use crate::domain::errors::DomainError;
use crate::domain::order::{NewOrder, OrderItemView, OrderStatus, OrderView};
use crate::domain::ports::{
    CategoryRepository, CouponRepository, DealRepository, OrderRepository, ProductRepository,
    UserRepository,
};
use crate::domain::user::{NewUser, User, UserChanges};
use crate::domain::Page;

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    categories: Vec<Category>,
    products: Vec<Product>,
    deals: Vec<Deal>,
    coupons: Vec<Coupon>,
    orders: Vec<OrderView>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, DomainError> {
        self.tables
            .lock()
            .map_err(|_| DomainError::Internal("memory store lock poisoned".to_string()))
    }
}

/// Newest first, then one page.
fn paginate<T: Clone>(rows: Vec<&T>, page: i64, limit: i64) -> Page<T> {
    let total = rows.len() as i64;
    let skip = ((page - 1) * limit).max(0) as usize;
    Page {
        items: rows
            .into_iter()
            .rev()
            .skip(skip)
            .take(limit.max(0) as usize)
            .cloned()
            .collect(),
        total,
    }
}

// ── Users ────────────────────────────────────────────────────────────────────

impl UserRepository for MemoryStore {
    fn create(&self, user: NewUser) -> Result<User, DomainError> {
        let mut t = self.tables()?;
        if t.users.iter().any(|u| u.email == user.email) {
            return Err(DomainError::Conflict("Email is already registered".to_string()));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            reset_token: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        t.users.push(user.clone());
        Ok(user)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        Ok(self.tables()?.users.iter().find(|u| u.id == id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        Ok(self.tables()?.users.iter().find(|u| u.email == email).cloned())
    }

    fn find_by_reset_token(&self, token: &str) -> Result<Option<User>, DomainError> {
        Ok(self
            .tables()?
            .users
            .iter()
            .find(|u| u.reset_token.as_deref() == Some(token))
            .cloned())
    }

    fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, DomainError> {
        let mut t = self.tables()?;
        if let Some(email) = &changes.email {
            if t.users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(DomainError::Conflict("Email is already registered".to_string()));
            }
        }
        let user = t
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(DomainError::NotFound("User"))?;
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    fn set_reset_token(
        &self,
        id: Uuid,
        token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), DomainError> {
        let mut t = self.tables()?;
        let user = t
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(DomainError::NotFound("User"))?;
        user.reset_token = token;
        user.reset_token_expires_at = expires_at;
        Ok(())
    }
}

// ── Categories ───────────────────────────────────────────────────────────────

impl CategoryRepository for MemoryStore {
    fn list(&self) -> Result<Vec<Category>, DomainError> {
        let mut categories = self.tables()?.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, DomainError> {
        Ok(self.tables()?.categories.iter().find(|c| c.id == id).cloned())
    }

    fn create(&self, input: CategoryInput) -> Result<Category, DomainError> {
        let mut t = self.tables()?;
        if t.categories.iter().any(|c| c.name == input.name) {
            return Err(DomainError::Conflict("Category name already exists".to_string()));
        }
        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            created_at: now,
            updated_at: now,
        };
        t.categories.push(category.clone());
        Ok(category)
    }

    fn update(&self, id: Uuid, input: CategoryInput) -> Result<Option<Category>, DomainError> {
        let mut t = self.tables()?;
        if t.categories.iter().any(|c| c.id != id && c.name == input.name) {
            return Err(DomainError::Conflict("Category name already exists".to_string()));
        }
        Ok(t.categories.iter_mut().find(|c| c.id == id).map(|c| {
            c.name = input.name;
            c.description = input.description;
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut t = self.tables()?;
        let before = t.categories.len();
        t.categories.retain(|c| c.id != id);
        let removed = t.categories.len() != before;
        if removed {
            for product in t.products.iter_mut().filter(|p| p.category_id == Some(id)) {
                product.category_id = None;
            }
        }
        Ok(removed)
    }
}

// ── Products ─────────────────────────────────────────────────────────────────

fn matches_filter(product: &Product, filter: &ProductFilter) -> bool {
    if filter.category_id.is_some() && product.category_id != filter.category_id {
        return false;
    }
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        let in_name = product.name.to_lowercase().contains(&needle);
        let in_description = product
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&needle));
        if !in_name && !in_description {
            return false;
        }
    }
    if matches!(&filter.min_price, Some(min) if product.price < *min) {
        return false;
    }
    if matches!(&filter.max_price, Some(max) if product.price > *max) {
        return false;
    }
    !filter.in_stock || product.stock > 0
}

impl ProductRepository for MemoryStore {
    fn list(&self, filter: &ProductFilter) -> Result<Page<Product>, DomainError> {
        let t = self.tables()?;
        let rows: Vec<&Product> = t
            .products
            .iter()
            .filter(|p| matches_filter(p, filter))
            .collect();
        Ok(paginate(rows, filter.page, filter.limit))
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        Ok(self.tables()?.products.iter().find(|p| p.id == id).cloned())
    }

    fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>, DomainError> {
        Ok(self
            .tables()?
            .products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    fn create(&self, input: ProductInput) -> Result<Product, DomainError> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            price: input.price,
            stock: input.stock,
            image_url: input.image_url,
            category_id: input.category_id,
            created_at: now,
            updated_at: now,
        };
        self.tables()?.products.push(product.clone());
        Ok(product)
    }

    fn update(&self, id: Uuid, input: ProductInput) -> Result<Option<Product>, DomainError> {
        let mut t = self.tables()?;
        Ok(t.products.iter_mut().find(|p| p.id == id).map(|p| {
            p.name = input.name;
            p.description = input.description;
            p.price = input.price;
            p.stock = input.stock;
            p.image_url = input.image_url;
            p.category_id = input.category_id;
            p.updated_at = Utc::now();
            p.clone()
        }))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut t = self.tables()?;
        if t
            .orders
            .iter()
            .any(|o| o.items.iter().any(|i| i.product_id == id))
        {
            return Err(DomainError::Conflict(
                "Product is referenced by existing orders".to_string(),
            ));
        }
        let before = t.products.len();
        t.products.retain(|p| p.id != id);
        t.deals.retain(|d| d.product_id != id);
        Ok(t.products.len() != before)
    }
}

// ── Deals ────────────────────────────────────────────────────────────────────

impl DealRepository for MemoryStore {
    fn list(&self) -> Result<Vec<Deal>, DomainError> {
        Ok(self.tables()?.deals.iter().rev().cloned().collect())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Deal>, DomainError> {
        Ok(self.tables()?.deals.iter().find(|d| d.id == id).cloned())
    }

    fn create(&self, input: DealInput) -> Result<Deal, DomainError> {
        let now = Utc::now();
        let deal = Deal {
            id: Uuid::new_v4(),
            product_id: input.product_id,
            title: input.title,
            discount: input.discount,
            start_date: input.start_date,
            end_date: input.end_date,
            active: input.active,
            created_at: now,
            updated_at: now,
        };
        self.tables()?.deals.push(deal.clone());
        Ok(deal)
    }

    fn update(&self, id: Uuid, input: DealInput) -> Result<Option<Deal>, DomainError> {
        let mut t = self.tables()?;
        Ok(t.deals.iter_mut().find(|d| d.id == id).map(|d| {
            d.product_id = input.product_id;
            d.title = input.title;
            d.discount = input.discount;
            d.start_date = input.start_date;
            d.end_date = input.end_date;
            d.active = input.active;
            d.updated_at = Utc::now();
            d.clone()
        }))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut t = self.tables()?;
        let before = t.deals.len();
        t.deals.retain(|d| d.id != id);
        Ok(t.deals.len() != before)
    }
}

// ── Coupons ──────────────────────────────────────────────────────────────────

fn apply_coupon_input(coupon: &mut Coupon, input: CouponInput) {
    coupon.code = input.code;
    coupon.discount = input.discount;
    coupon.kind = input.kind;
    coupon.max_discount = input.max_discount;
    coupon.start_date = input.start_date;
    coupon.end_date = input.end_date;
    coupon.active = input.active;
    coupon.usage_limit = input.usage_limit;
    coupon.minimum_purchase = input.minimum_purchase;
}

impl CouponRepository for MemoryStore {
    fn list(&self) -> Result<Vec<Coupon>, DomainError> {
        Ok(self.tables()?.coupons.iter().rev().cloned().collect())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Coupon>, DomainError> {
        Ok(self.tables()?.coupons.iter().find(|c| c.id == id).cloned())
    }

    fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, DomainError> {
        Ok(self.tables()?.coupons.iter().find(|c| c.code == code).cloned())
    }

    fn create(&self, input: CouponInput) -> Result<Coupon, DomainError> {
        let mut t = self.tables()?;
        if t.coupons.iter().any(|c| c.code == input.code) {
            return Err(DomainError::Conflict("Coupon code already exists".to_string()));
        }
        let now = Utc::now();
        let coupon = Coupon {
            id: Uuid::new_v4(),
            code: input.code,
            discount: input.discount,
            kind: input.kind,
            max_discount: input.max_discount,
            start_date: input.start_date,
            end_date: input.end_date,
            active: input.active,
            usage_limit: input.usage_limit,
            minimum_purchase: input.minimum_purchase,
            created_at: now,
            updated_at: now,
        };
        t.coupons.push(coupon.clone());
        Ok(coupon)
    }

    fn update(&self, id: Uuid, input: CouponInput) -> Result<Option<Coupon>, DomainError> {
        let mut t = self.tables()?;
        if t.coupons.iter().any(|c| c.id != id && c.code == input.code) {
            return Err(DomainError::Conflict("Coupon code already exists".to_string()));
        }
        Ok(t.coupons.iter_mut().find(|c| c.id == id).map(|c| {
            apply_coupon_input(c, input);
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut t = self.tables()?;
        let before = t.coupons.len();
        t.coupons.retain(|c| c.id != id);
        Ok(t.coupons.len() != before)
    }
}

// ── Orders ───────────────────────────────────────────────────────────────────

impl OrderRepository for MemoryStore {
    fn create(&self, order: NewOrder) -> Result<Uuid, DomainError> {
        let mut t = self.tables()?;

        // Check every line before touching stock so a failure changes nothing.
        for item in &order.items {
            let product = t
                .products
                .iter()
                .find(|p| p.id == item.product_id)
                .ok_or(DomainError::NotFound("Product"))?;
            if product.stock < item.quantity {
                return Err(DomainError::InsufficientStock {
                    product_id: product.id,
                    requested: item.quantity,
                    available: product.stock,
                });
            }
        }
        for item in &order.items {
            if let Some(product) = t.products.iter_mut().find(|p| p.id == item.product_id) {
                product.stock -= item.quantity;
            }
        }

        let now = Utc::now();
        let id = Uuid::new_v4();
        t.orders.push(OrderView {
            id,
            user_id: order.user_id,
            status: OrderStatus::Pending,
            shipping: order.shipping,
            delivery_method: order.delivery_method,
            payment_method: order.payment_method,
            notes: order.notes,
            coupon_code: order.coupon_code,
            subtotal: order.subtotal,
            delivery_cost: order.delivery_cost,
            discount: order.discount,
            total: order.total,
            created_at: now,
            updated_at: now,
            items: order
                .items
                .into_iter()
                .map(|i| OrderItemView {
                    id: Uuid::new_v4(),
                    product_id: i.product_id,
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                })
                .collect(),
        });
        Ok(id)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        Ok(self.tables()?.orders.iter().find(|o| o.id == id).cloned())
    }

    fn list(
        &self,
        user_id: Option<Uuid>,
        page: i64,
        limit: i64,
    ) -> Result<Page<OrderView>, DomainError> {
        let t = self.tables()?;
        let rows: Vec<&OrderView> = t
            .orders
            .iter()
            .filter(|o| user_id.map_or(true, |uid| o.user_id == uid))
            .collect();
        Ok(paginate(rows, page, limit))
    }

    fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Option<OrderView>, DomainError> {
        if status == OrderStatus::Cancelled {
            return Err(DomainError::InvalidInput(
                "orders are cancelled through the cancel operation".to_string(),
            ));
        }
        let mut t = self.tables()?;
        let Some(order) = t.orders.iter_mut().find(|o| o.id == id) else {
            return Ok(None);
        };
        if order.status == OrderStatus::Cancelled {
            return Err(DomainError::Conflict(
                "Cancelled orders cannot change status".to_string(),
            ));
        }
        order.status = status;
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }

    fn cancel(&self, id: Uuid) -> Result<OrderView, DomainError> {
        let mut t = self.tables()?;
        let tables = &mut *t;
        let order = tables
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(DomainError::NotFound("Order"))?;
        if order.status != OrderStatus::Pending {
            return Err(DomainError::Conflict(format!(
                "Only pending orders can be cancelled (order is {})",
                order.status
            )));
        }
        for item in &order.items {
            if let Some(product) = tables.products.iter_mut().find(|p| p.id == item.product_id) {
                product.stock += item.quantity;
            }
        }
        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }
}
