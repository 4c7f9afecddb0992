use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::application::order_service::{OrderLineRequest, PlaceOrder};
use crate::domain::order::{OrderItemView, OrderStatus, OrderView, ShippingAddress};
use crate::errors::AppError;
use crate::handlers::{money, PageParams, PageResponse};
use crate::http::{AdminUser, AuthUser, ValidatedJson};
use crate::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ShippingRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 5, max = 50, message = "Phone number is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 1, max = 255, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, max = 20, message = "Postal code is required"))]
    pub postal_code: String,
    #[validate(length(min = 1, max = 100, message = "Country is required"))]
    pub country: String,
}

impl From<ShippingRequest> for ShippingAddress {
    fn from(r: ShippingRequest) -> Self {
        ShippingAddress {
            name: r.name,
            email: r.email,
            phone: r.phone,
            address: r.address,
            city: r.city,
            postal_code: r.postal_code,
            country: r.country,
        }
    }
}

impl From<ShippingAddress> for ShippingRequest {
    fn from(s: ShippingAddress) -> Self {
        ShippingRequest {
            name: s.name,
            email: s.email,
            phone: s.phone,
            address: s.address,
            city: s.city,
            postal_code: s.postal_code,
            country: s.country,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct OrderLineDto {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 1000, message = "Quantity must be between 1 and 1000"))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate]
    pub shipping: ShippingRequest,
    #[validate(length(min = 1, message = "Delivery method is required"))]
    pub delivery_method: String,
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,
    #[validate(length(max = 1000, message = "Notes are too long"))]
    pub notes: Option<String>,
    pub coupon_code: Option<String>,
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    #[validate]
    pub items: Vec<OrderLineDto>,
}

impl From<CreateOrderRequest> for PlaceOrder {
    fn from(r: CreateOrderRequest) -> Self {
        PlaceOrder {
            shipping: r.shipping.into(),
            delivery_method: r.delivery_method,
            payment_method: r.payment_method,
            notes: r.notes.filter(|n| !n.trim().is_empty()),
            coupon_code: r.coupon_code.filter(|c| !c.trim().is_empty()),
            items: r
                .items
                .into_iter()
                .map(|l| OrderLineRequest {
                    product_id: l.product_id,
                    quantity: l.quantity,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: String,
}

impl From<OrderItemView> for OrderItemResponse {
    fn from(i: OrderItemView) -> Self {
        OrderItemResponse {
            id: i.id,
            product_id: i.product_id,
            quantity: i.quantity,
            unit_price: money(&i.unit_price),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub shipping: ShippingRequest,
    pub delivery_method: String,
    pub payment_method: String,
    pub notes: Option<String>,
    pub coupon_code: Option<String>,
    pub subtotal: String,
    pub delivery_cost: String,
    pub discount: String,
    pub total: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

impl From<OrderView> for OrderResponse {
    fn from(o: OrderView) -> Self {
        OrderResponse {
            id: o.id,
            user_id: o.user_id,
            status: o.status,
            shipping: o.shipping.into(),
            delivery_method: o.delivery_method,
            payment_method: o.payment_method,
            notes: o.notes,
            coupon_code: o.coupon_code,
            subtotal: money(&o.subtotal),
            delivery_cost: money(&o.delivery_cost),
            discount: money(&o.discount),
            total: money(&o.total),
            created_at: o.created_at,
            updated_at: o.updated_at,
            items: o.items.into_iter().map(Into::into).collect(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /api/orders
///
/// Prices come from the catalogue, never from the request. Stock for every
/// item is reserved in the same transaction as the order insert.
pub async fn create_order(
    state: web::Data<AppState>,
    AuthUser(actor): AuthUser,
    body: ValidatedJson<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let request = PlaceOrder::from(body.into_inner());
    let order = web::block(move || state.orders.create_order(actor, request)).await??;
    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /api/orders
///
/// Admins see every order, customers only their own.
pub async fn list_orders(
    state: web::Data<AppState>,
    AuthUser(actor): AuthUser,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let PageParams { page, limit } = query.into_inner();
    let result = web::block(move || state.orders.list_orders(actor, page, limit)).await??;
    Ok(HttpResponse::Ok().json(PageResponse::<OrderResponse>::new(result, page, limit)))
}

/// GET /api/orders/{id}
pub async fn get_order(
    state: web::Data<AppState>,
    AuthUser(actor): AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let order = web::block(move || state.orders.get_order(actor, id)).await??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /api/orders/{id}/cancel
pub async fn cancel_order(
    state: web::Data<AppState>,
    AuthUser(actor): AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let order = web::block(move || state.orders.cancel_order(actor, id)).await??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// PUT /api/orders/{id}/status
pub async fn update_status(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
    body: ValidatedJson<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let status = body.into_inner().status;
    let order = web::block(move || state.orders.update_status(id, status)).await??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::http::field_errors;

    fn body(items: serde_json::Value) -> CreateOrderRequest {
        serde_json::from_value(json!({
            "shipping": {
                "name": "Ada Lovelace",
                "email": "ada@example.com",
                "phone": "555-0100",
                "address": "1 Loop Rd",
                "city": "London",
                "postal_code": "N1",
                "country": "UK"
            },
            "delivery_method": "standard",
            "payment_method": "paypal",
            "items": items
        }))
        .expect("request should deserialize")
    }

    #[test]
    fn empty_item_list_is_reported_on_items() {
        let errors = body(json!([])).validate().unwrap_err();
        let paths: Vec<String> = field_errors(&errors).into_iter().map(|e| e.path).collect();
        assert_eq!(paths, vec!["items"]);
    }

    #[test]
    fn bad_line_quantity_is_reported_per_line() {
        let product_id = Uuid::new_v4();
        let errors = body(json!([
            { "product_id": product_id, "quantity": 1 },
            { "product_id": product_id, "quantity": 0 }
        ]))
        .validate()
        .unwrap_err();
        let paths: Vec<String> = field_errors(&errors).into_iter().map(|e| e.path).collect();
        assert_eq!(paths, vec!["items[1].quantity"]);
    }

    #[test]
    fn well_formed_order_passes() {
        let request = body(json!([{ "product_id": Uuid::new_v4(), "quantity": 2 }]));
        assert!(request.validate().is_ok());
    }
}
