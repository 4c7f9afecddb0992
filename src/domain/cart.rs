use std::collections::HashMap;
use std::sync::RwLock;

use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::coupon::{normalize_code, Coupon};
use super::errors::DomainError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
}

impl CartItem {
    pub fn line_total(&self) -> BigDecimal {
        &self.unit_price * BigDecimal::from(self.quantity)
    }
}

/// Shopping cart contents plus the coupon code the shopper entered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
    coupon_code: Option<String>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds `item`, merging quantities when the product is already present.
    pub fn add_item(&mut self, item: CartItem) -> Result<(), DomainError> {
        if item.quantity <= 0 {
            return Err(DomainError::InvalidInput(
                "quantity must be positive".to_string(),
            ));
        }
        match self
            .items
            .iter_mut()
            .find(|existing| existing.product_id == item.product_id)
        {
            Some(existing) => {
                existing.quantity = existing.quantity.checked_add(item.quantity).ok_or_else(|| {
                    DomainError::InvalidInput("quantity is too large".to_string())
                })?;
            }
            None => self.items.push(item),
        }
        Ok(())
    }

    /// Sets the quantity of a product; zero or less removes the line.
    pub fn update_quantity(&mut self, product_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        if quantity <= 0 {
            self.remove_item(product_id);
            return Ok(());
        }
        let item = self
            .items
            .iter_mut()
            .find(|item| item.product_id == product_id)
            .ok_or(DomainError::NotFound("Cart item"))?;
        item.quantity = quantity;
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: Uuid) {
        self.items.retain(|item| item.product_id != product_id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.coupon_code = None;
    }

    /// Total units across lines; widened so many large lines cannot overflow.
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|item| i64::from(item.quantity)).sum()
    }

    pub fn subtotal(&self) -> BigDecimal {
        self.items
            .iter()
            .fold(BigDecimal::zero(), |acc, item| acc + item.line_total())
            .with_scale(2)
    }

    pub fn apply_coupon(&mut self, code: &str) {
        self.coupon_code = Some(normalize_code(code));
    }

    pub fn remove_coupon(&mut self) {
        self.coupon_code = None;
    }

    pub fn coupon_code(&self) -> Option<&str> {
        self.coupon_code.as_deref()
    }

    /// Subtotal minus the coupon's discount, when the coupon matches the
    /// applied code. Validity is the caller's concern.
    pub fn total_with_discount(&self, coupon: Option<&Coupon>) -> BigDecimal {
        let subtotal = self.subtotal();
        match coupon {
            Some(c) if self.coupon_code.as_deref() == Some(c.code.as_str()) => {
                let discount = c.discount_for(&subtotal);
                (subtotal - discount).with_scale(2)
            }
            _ => subtotal,
        }
    }
}

/// Where a shopper's cart lives between requests.
pub trait CartStore: Send + Sync {
    fn load(&self, owner: &str) -> Cart;
    fn save(&self, owner: &str, cart: &Cart);
    fn clear(&self, owner: &str);
}

#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    carts: RwLock<HashMap<String, Cart>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartStore for InMemoryCartStore {
    fn load(&self, owner: &str) -> Cart {
        self.carts
            .read()
            .map(|carts| carts.get(owner).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    fn save(&self, owner: &str, cart: &Cart) {
        if let Ok(mut carts) = self.carts.write() {
            carts.insert(owner.to_string(), cart.clone());
        }
    }

    fn clear(&self, owner: &str) {
        if let Ok(mut carts) = self.carts.write() {
            carts.remove(owner);
        }
    }
}
