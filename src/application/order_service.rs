use std::collections::HashMap;
use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use uuid::Uuid;

use crate::domain::checkout::{delivery_cost, delivery_option, PaymentMethod};
use crate::domain::errors::DomainError;
use crate::domain::order::{NewOrder, OrderItemInput, OrderStatus, OrderView, ShippingAddress};
use crate::domain::ports::{OrderRepository, ProductRepository};
use crate::domain::user::Actor;
use crate::domain::{clamp_page, Page};

use super::coupon_service::CouponService;

#[derive(Debug, Clone)]
pub struct OrderLineRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub shipping: ShippingAddress,
    pub delivery_method: String,
    pub payment_method: String,
    pub notes: Option<String>,
    pub coupon_code: Option<String>,
    pub items: Vec<OrderLineRequest>,
}

pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    products: Arc<dyn ProductRepository>,
    coupons: Arc<CouponService>,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        products: Arc<dyn ProductRepository>,
        coupons: Arc<CouponService>,
    ) -> Self {
        Self {
            orders,
            products,
            coupons,
        }
    }

    /// Prices the order from stored product prices, applies the delivery
    /// cost and any coupon, then persists it while reserving stock.
    pub fn create_order(&self, actor: Actor, request: PlaceOrder) -> Result<OrderView, DomainError> {
        let lines = merge_lines(&request.items)?;
        if delivery_option(&request.delivery_method).is_none() {
            return Err(DomainError::InvalidInput(format!(
                "unknown delivery method '{}'",
                request.delivery_method
            )));
        }
        if PaymentMethod::parse(&request.payment_method).is_none() {
            return Err(DomainError::InvalidInput(format!(
                "unknown payment method '{}'",
                request.payment_method
            )));
        }

        let ids: Vec<Uuid> = lines.iter().map(|(id, _)| *id).collect();
        let products: HashMap<Uuid, BigDecimal> = self
            .products
            .find_by_ids(&ids)?
            .into_iter()
            .map(|p| (p.id, p.price))
            .collect();

        let mut items = Vec::with_capacity(lines.len());
        let mut subtotal = BigDecimal::zero();
        for (product_id, quantity) in lines {
            let unit_price = products
                .get(&product_id)
                .cloned()
                .ok_or(DomainError::NotFound("Product"))?;
            subtotal += &unit_price * BigDecimal::from(quantity);
            items.push(OrderItemInput {
                product_id,
                quantity,
                unit_price,
            });
        }
        let subtotal = subtotal.with_scale(2);

        let (coupon_code, discount) = match request.coupon_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => {
                let coupon = self.coupons.find_valid(code)?;
                let discount = coupon.discount_for(&subtotal);
                (Some(coupon.code), discount)
            }
            _ => (None, BigDecimal::zero()),
        };

        let delivery_cost = delivery_cost(Some(request.delivery_method.as_str()));
        let mut total = &subtotal + &delivery_cost - &discount;
        if total < BigDecimal::zero() {
            total = BigDecimal::zero();
        }

        let notes = request
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let order_id = self.orders.create(NewOrder {
            user_id: actor.id,
            shipping: request.shipping,
            delivery_method: request.delivery_method,
            payment_method: request.payment_method,
            notes,
            coupon_code,
            subtotal,
            delivery_cost: delivery_cost.with_scale(2),
            discount: discount.with_scale(2),
            total: total.with_scale(2),
            items,
        })?;
        log::info!("Order {} placed by user {}", order_id, actor.id);

        self.orders
            .find_by_id(order_id)?
            .ok_or_else(|| DomainError::Internal(format!("order {} vanished after insert", order_id)))
    }

    /// Admins see every order, customers only their own.
    pub fn list_orders(&self, actor: Actor, page: i64, limit: i64) -> Result<Page<OrderView>, DomainError> {
        let (page, limit) = clamp_page(page, limit);
        let owner = (!actor.is_admin()).then_some(actor.id);
        self.orders.list(owner, page, limit)
    }

    pub fn get_order(&self, actor: Actor, id: Uuid) -> Result<OrderView, DomainError> {
        let order = self
            .orders
            .find_by_id(id)?
            .ok_or(DomainError::NotFound("Order"))?;
        if !actor.can_access(order.user_id) {
            return Err(DomainError::Forbidden);
        }
        Ok(order)
    }

    /// Admin status change. Cancelling restores stock like an owner cancel.
    pub fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<OrderView, DomainError> {
        if status == OrderStatus::Cancelled {
            let order = self.orders.cancel(id)?;
            log::info!("Order {} cancelled by an admin", id);
            return Ok(order);
        }
        let order = self
            .orders
            .update_status(id, status)?
            .ok_or(DomainError::NotFound("Order"))?;
        log::info!("Order {} moved to {}", id, status);
        Ok(order)
    }

    /// Owners may cancel their own pending orders; stock is restored.
    pub fn cancel_order(&self, actor: Actor, id: Uuid) -> Result<OrderView, DomainError> {
        let order = self.get_order(actor, id)?;
        if order.status != OrderStatus::Pending {
            return Err(DomainError::Conflict(format!(
                "Only pending orders can be cancelled (order is {})",
                order.status
            )));
        }
        let order = self.orders.cancel(id)?;
        log::info!("Order {} cancelled by user {}", id, actor.id);
        Ok(order)
    }
}

/// Sums quantities per product, keeping first-seen order.
fn merge_lines(items: &[OrderLineRequest]) -> Result<Vec<(Uuid, i32)>, DomainError> {
    if items.is_empty() {
        return Err(DomainError::InvalidInput(
            "an order needs at least one item".to_string(),
        ));
    }
    let mut merged: Vec<(Uuid, i32)> = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity <= 0 {
            return Err(DomainError::InvalidInput(format!(
                "quantity for product {} must be positive",
                item.product_id
            )));
        }
        match merged.iter_mut().find(|(id, _)| *id == item.product_id) {
            Some((_, quantity)) => {
                *quantity = quantity.checked_add(item.quantity).ok_or_else(|| {
                    DomainError::InvalidInput(format!(
                        "quantity for product {} is too large",
                        item.product_id
                    ))
                })?;
            }
            None => merged.push((item.product_id, item.quantity)),
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::domain::catalog::ProductInput;
    use crate::domain::coupon::{CouponInput, CouponKind};
    use crate::domain::user::Role;
    use crate::infrastructure::memory::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        coupons: Arc<CouponService>,
        orders: OrderService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::default());
        let coupons = Arc::new(CouponService::new(store.clone()));
        let orders = OrderService::new(store.clone(), store.clone(), coupons.clone());
        Fixture {
            store,
            coupons,
            orders,
        }
    }

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn customer() -> Actor {
        Actor {
            id: Uuid::new_v4(),
            role: Role::Customer,
        }
    }

    fn admin() -> Actor {
        Actor {
            id: Uuid::new_v4(),
            role: Role::Admin,
        }
    }

    fn add_product(store: &MemoryStore, price: &str, stock: i32) -> Uuid {
        ProductRepository::create(
            store,
            ProductInput {
                name: "Mug".to_string(),
                description: None,
                price: dec(price),
                stock,
                image_url: None,
                category_id: None,
            },
        )
        .unwrap()
        .id
    }

    fn shipping() -> ShippingAddress {
        ShippingAddress {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: "555-0100".to_string(),
            address: "1 Loop Rd".to_string(),
            city: "London".to_string(),
            postal_code: "N1".to_string(),
            country: "UK".to_string(),
        }
    }

    fn request(items: Vec<(Uuid, i32)>, coupon: Option<&str>) -> PlaceOrder {
        PlaceOrder {
            shipping: shipping(),
            delivery_method: "express".to_string(),
            payment_method: "credit_card".to_string(),
            notes: Some("  leave at door ".to_string()),
            coupon_code: coupon.map(str::to_string),
            items: items
                .into_iter()
                .map(|(product_id, quantity)| OrderLineRequest {
                    product_id,
                    quantity,
                })
                .collect(),
        }
    }

    fn stock_of(store: &MemoryStore, id: Uuid) -> i32 {
        ProductRepository::find_by_id(store, id)
            .unwrap()
            .unwrap()
            .stock
    }

    #[test]
    fn totals_use_server_prices_and_delivery_table() {
        let f = fixture();
        let mug = add_product(&f.store, "10.50", 10);
        let order = f
            .orders
            .create_order(customer(), request(vec![(mug, 2), (mug, 2)], None))
            .unwrap();

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 4);
        assert_eq!(order.subtotal, dec("42.00"));
        assert_eq!(order.delivery_cost, dec("15.00"));
        assert_eq!(order.total, dec("57.00"));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.notes.as_deref(), Some("leave at door"));
        assert_eq!(stock_of(&f.store, mug), 6);
    }

    #[test]
    fn coupon_discount_is_applied() {
        let f = fixture();
        f.coupons
            .create(CouponInput {
                code: "save20".to_string(),
                discount: dec("0.2"),
                kind: CouponKind::Percentage,
                max_discount: Some(dec("50")),
                start_date: None,
                end_date: None,
                active: true,
                usage_limit: None,
                minimum_purchase: dec("0"),
            })
            .unwrap();
        let tv = add_product(&f.store, "500", 1);

        let order = f
            .orders
            .create_order(customer(), request(vec![(tv, 1)], Some("SAVE20")))
            .unwrap();

        assert_eq!(order.discount, dec("50"));
        assert_eq!(order.total, dec("465.00"));
        assert_eq!(order.coupon_code.as_deref(), Some("SAVE20"));
    }

    #[test]
    fn invalid_coupon_rejects_order() {
        let f = fixture();
        let mug = add_product(&f.store, "5", 3);
        let err = f
            .orders
            .create_order(customer(), request(vec![(mug, 1)], Some("BOGUS")))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidCoupon));
        assert_eq!(stock_of(&f.store, mug), 3);
    }

    #[test]
    fn insufficient_stock_rolls_back_every_item() {
        let f = fixture();
        let plenty = add_product(&f.store, "1", 10);
        let scarce = add_product(&f.store, "1", 1);

        let err = f
            .orders
            .create_order(customer(), request(vec![(plenty, 2), (scarce, 5)], None))
            .unwrap_err();

        assert!(matches!(err, DomainError::InsufficientStock { requested: 5, available: 1, .. }));
        assert_eq!(stock_of(&f.store, plenty), 10);
        assert_eq!(stock_of(&f.store, scarce), 1);
    }

    #[test]
    fn unknown_product_is_not_found() {
        let f = fixture();
        let err = f
            .orders
            .create_order(customer(), request(vec![(Uuid::new_v4(), 1)], None))
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound("Product")));
    }

    #[test]
    fn empty_or_non_positive_items_are_rejected() {
        let f = fixture();
        let mug = add_product(&f.store, "5", 3);
        assert!(matches!(
            f.orders.create_order(customer(), request(vec![], None)),
            Err(DomainError::InvalidInput(_))
        ));
        assert!(matches!(
            f.orders.create_order(customer(), request(vec![(mug, 0)], None)),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn customers_only_see_their_own_orders() {
        let f = fixture();
        let mug = add_product(&f.store, "5", 10);
        let alice = customer();
        let bob = customer();
        let order = f.orders.create_order(alice, request(vec![(mug, 1)], None)).unwrap();
        f.orders.create_order(bob, request(vec![(mug, 1)], None)).unwrap();

        assert_eq!(f.orders.list_orders(alice, 1, 20).unwrap().total, 1);
        assert_eq!(f.orders.list_orders(admin(), 1, 20).unwrap().total, 2);
        assert!(matches!(
            f.orders.get_order(bob, order.id),
            Err(DomainError::Forbidden)
        ));
        assert!(f.orders.get_order(admin(), order.id).is_ok());
    }

    #[test]
    fn cancelling_restores_stock_once() {
        let f = fixture();
        let mug = add_product(&f.store, "5", 4);
        let alice = customer();
        let order = f.orders.create_order(alice, request(vec![(mug, 3)], None)).unwrap();
        assert_eq!(stock_of(&f.store, mug), 1);

        let cancelled = f.orders.cancel_order(alice, order.id).unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(stock_of(&f.store, mug), 4);

        assert!(matches!(
            f.orders.cancel_order(alice, order.id),
            Err(DomainError::Conflict(_))
        ));
        assert_eq!(stock_of(&f.store, mug), 4);
    }

    #[test]
    fn admin_updates_status() {
        let f = fixture();
        let mug = add_product(&f.store, "5", 4);
        let order = f.orders.create_order(customer(), request(vec![(mug, 1)], None)).unwrap();

        let shipped = f.orders.update_status(order.id, OrderStatus::Shipped).unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);
        assert!(matches!(
            f.orders.update_status(Uuid::new_v4(), OrderStatus::Shipped),
            Err(DomainError::NotFound("Order"))
        ));
    }

    #[test]
    fn cancelled_order_cannot_be_reopened() {
        let f = fixture();
        let mug = add_product(&f.store, "5", 4);
        let alice = customer();
        let order = f.orders.create_order(alice, request(vec![(mug, 3)], None)).unwrap();
        f.orders.cancel_order(alice, order.id).unwrap();
        assert_eq!(stock_of(&f.store, mug), 4);

        assert!(matches!(
            f.orders.update_status(order.id, OrderStatus::Pending),
            Err(DomainError::Conflict(_))
        ));
        assert!(matches!(
            f.orders.cancel_order(alice, order.id),
            Err(DomainError::Conflict(_))
        ));
        assert_eq!(stock_of(&f.store, mug), 4);
        assert_eq!(
            f.orders.get_order(alice, order.id).unwrap().status,
            OrderStatus::Cancelled
        );
    }

    #[test]
    fn admin_cancel_restores_stock() {
        let f = fixture();
        let mug = add_product(&f.store, "5", 4);
        let order = f.orders.create_order(customer(), request(vec![(mug, 3)], None)).unwrap();

        let cancelled = f.orders.update_status(order.id, OrderStatus::Cancelled).unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(stock_of(&f.store, mug), 4);

        assert!(matches!(
            f.orders.update_status(order.id, OrderStatus::Cancelled),
            Err(DomainError::Conflict(_))
        ));
        assert_eq!(stock_of(&f.store, mug), 4);
    }

    #[test]
    fn overflowing_merged_quantity_is_rejected() {
        let f = fixture();
        let mug = add_product(&f.store, "5", 4);
        assert!(matches!(
            f.orders
                .create_order(customer(), request(vec![(mug, i32::MAX), (mug, 1)], None)),
            Err(DomainError::InvalidInput(_))
        ));
        assert_eq!(stock_of(&f.store, mug), 4);
    }
}
