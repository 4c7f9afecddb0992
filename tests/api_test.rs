//! HTTP tests: the full `/api` surface against in-memory storage.
//!
//!   cargo test --test api_test

use actix_web::dev::ServiceResponse;
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use chrono::Duration;
use serde_json::{json, Value};
use shop_service::domain::user::Role;
use shop_service::security::JwtKeys;
use shop_service::{configure, AppState};

const ADMIN_EMAIL: &str = "admin@shop.test";
const PASSWORD: &str = "password123";

fn state() -> AppState {
    let state = AppState::in_memory(JwtKeys::new("api-test-secret", Duration::hours(1)));
    state
        .auth
        .register_with_role("Admin", ADMIN_EMAIL, PASSWORD, Role::Admin)
        .expect("admin bootstrap failed");
    state
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .configure(configure),
        )
        .await
    };
}

async fn read(resp: ServiceResponse) -> (StatusCode, Value) {
    let status = resp.status();
    let bytes = test::read_body(resp).await;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

macro_rules! call {
    ($app:expr, $req:expr $(,)?) => {
        read(test::call_service($app, $req.to_request()).await).await
    };
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

macro_rules! login {
    ($app:expr, $email:expr, $password:expr) => {{
        let (status, body) = call!(
            $app,
            test::TestRequest::post()
                .uri("/api/auth/login")
                .set_json(json!({ "email": $email, "password": $password }))
        );
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["token"].as_str().expect("token").to_string()
    }};
}

macro_rules! register {
    ($app:expr, $name:expr, $email:expr) => {{
        let (status, body) = call!(
            $app,
            test::TestRequest::post()
                .uri("/api/auth/register")
                .set_json(json!({ "name": $name, "email": $email, "password": PASSWORD }))
        );
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["token"].as_str().expect("token").to_string()
    }};
}

macro_rules! create_product {
    ($app:expr, $admin:expr, $name:expr, $price:expr, $stock:expr) => {{
        let (status, body) = call!(
            $app,
            test::TestRequest::post()
                .uri("/api/products")
                .insert_header(bearer($admin))
                .set_json(json!({ "name": $name, "price": $price, "stock": $stock }))
        );
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_str().expect("product id").to_string()
    }};
}

fn order_body(product_id: &str, quantity: i32, coupon: Option<&str>) -> Value {
    json!({
        "shipping": {
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "phone": "555-0101",
            "address": "12 Analytical St",
            "city": "London",
            "postal_code": "N1 9GU",
            "country": "UK"
        },
        "delivery_method": "express",
        "payment_method": "credit_card",
        "coupon_code": coupon,
        "items": [{ "product_id": product_id, "quantity": quantity }]
    })
}

#[actix_web::test]
async fn health_is_public() {
    let app = app!(state());
    let (status, body) = call!(&app, test::TestRequest::get().uri("/api/health"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn register_login_and_profile() {
    let app = app!(state());
    let token = register!(&app, "Ada", "Ada@Example.com");

    let (status, body) = call!(
        &app,
        test::TestRequest::get()
            .uri("/api/auth/profile")
            .insert_header(bearer(&token)),
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["role"], "customer");
    assert!(body.get("password_hash").is_none());

    // Same email, different case.
    let (status, _) = call!(
        &app,
        test::TestRequest::post().uri("/api/auth/register").set_json(json!({
            "name": "Ada Again", "email": "ADA@example.com", "password": PASSWORD
        })),
    );
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call!(
        &app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "ada@example.com", "password": "wrong-password" })),
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");

    let (status, body) = call!(
        &app,
        test::TestRequest::put()
            .uri("/api/auth/profile")
            .insert_header(bearer(&token))
            .set_json(json!({ "name": "Countess Ada" })),
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Countess Ada");
}

#[actix_web::test]
async fn missing_or_bad_token_is_unauthorized() {
    let app = app!(state());
    let (status, _) = call!(&app, test::TestRequest::get().uri("/api/auth/profile"));
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call!(
        &app,
        test::TestRequest::get()
            .uri("/api/orders")
            .insert_header(bearer("not-a-jwt")),
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");
}

#[actix_web::test]
async fn customer_cannot_use_admin_routes() {
    let app = app!(state());
    let token = register!(&app, "Bob", "bob@example.com");
    let (status, body) = call!(
        &app,
        test::TestRequest::post()
            .uri("/api/products")
            .insert_header(bearer(&token))
            .set_json(json!({ "name": "Hack", "price": "1.00", "stock": 1 })),
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access denied");
}

#[actix_web::test]
async fn validation_errors_have_field_paths() {
    let app = app!(state());
    let (status, body) = call!(
        &app,
        test::TestRequest::post().uri("/api/auth/register").set_json(json!({
            "name": "Al", "email": "not-an-email", "password": "123"
        })),
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation failed");
    let paths: Vec<&str> = body["errors"]
        .as_array()
        .expect("errors array")
        .iter()
        .filter_map(|e| e["path"].as_str())
        .collect();
    assert_eq!(paths, vec!["email", "password"]);
}

#[actix_web::test]
async fn sql_like_body_is_rejected() {
    let app = app!(state());
    let (status, body) = call!(
        &app,
        test::TestRequest::post().uri("/api/auth/login").set_json(json!({
            "email": "x@example.com' OR '1'='1", "password": "whatever"
        })),
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Potentially malicious input detected");
}

#[actix_web::test]
async fn unknown_reset_token_is_bad_request() {
    let app = app!(state());
    let (status, _) = call!(
        &app,
        test::TestRequest::post()
            .uri("/api/auth/forgot-password")
            .set_json(json!({ "email": "nobody@example.com" })),
    );
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call!(
        &app,
        test::TestRequest::post()
            .uri("/api/auth/reset-password")
            .set_json(json!({ "token": "bogus", "password": "newpassword" })),
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn password_reset_flow() {
    let state = state();
    let app = app!(state.clone());
    register!(&app, "Cy", "cy@example.com");

    let token = state
        .auth
        .forgot_password("cy@example.com")
        .expect("forgot failed")
        .expect("token issued");
    let (status, _) = call!(
        &app,
        test::TestRequest::post()
            .uri("/api/auth/reset-password")
            .set_json(json!({ "token": token, "password": "brand-new-pass" })),
    );
    assert_eq!(status, StatusCode::OK);
    login!(&app, "cy@example.com", "brand-new-pass");
}

#[actix_web::test]
async fn product_and_category_crud() {
    let app = app!(state());
    let admin = login!(&app, ADMIN_EMAIL, PASSWORD);

    let (status, category) = call!(
        &app,
        test::TestRequest::post()
            .uri("/api/categories")
            .insert_header(bearer(&admin))
            .set_json(json!({ "name": "Kitchen" })),
    );
    assert_eq!(status, StatusCode::CREATED);
    let category_id = category["id"].as_str().expect("category id").to_string();

    let (status, product) = call!(
        &app,
        test::TestRequest::post()
            .uri("/api/products")
            .insert_header(bearer(&admin))
            .set_json(json!({
                "name": "Kettle", "price": "24.5", "stock": 3, "category_id": category_id
            })),
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(product["price"], "24.50");
    let product_id = product["id"].as_str().expect("product id").to_string();

    let (status, page) = call!(
        &app,
        test::TestRequest::get().uri(&format!("/api/products?category_id={}&in_stock=true", category_id)),
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["name"], "Kettle");

    let (status, _) = call!(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/categories/{}", category_id))
            .insert_header(bearer(&admin)),
    );
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, product) = call!(
        &app,
        test::TestRequest::get().uri(&format!("/api/products/{}", product_id)),
    );
    assert_eq!(status, StatusCode::OK);
    assert!(product["category_id"].is_null());

    let (status, _) = call!(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/products/{}", product_id))
            .insert_header(bearer(&admin)),
    );
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = call!(
        &app,
        test::TestRequest::get().uri(&format!("/api/products/{}", product_id)),
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Product not found");
}

#[actix_web::test]
async fn coupon_validation_endpoint() {
    let app = app!(state());
    let admin = login!(&app, ADMIN_EMAIL, PASSWORD);

    let (status, coupon) = call!(
        &app,
        test::TestRequest::post()
            .uri("/api/coupons")
            .insert_header(bearer(&admin))
            .set_json(json!({
                "code": "spring20", "discount": "0.2", "type": "percentage", "max_discount": "15"
            })),
    );
    assert_eq!(status, StatusCode::CREATED, "{}", coupon);
    assert_eq!(coupon["code"], "SPRING20");

    let (status, body) = call!(
        &app,
        test::TestRequest::get().uri("/api/coupons/validate/Spring20?subtotal=50"),
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["discount_amount"], "10.00");

    // Capped by max_discount.
    let (_, body) = call!(
        &app,
        test::TestRequest::get().uri("/api/coupons/validate/SPRING20?subtotal=200"),
    );
    assert_eq!(body["discount_amount"], "15.00");

    let (status, body) = call!(
        &app,
        test::TestRequest::get().uri("/api/coupons/validate/NOPE"),
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid or expired coupon");
}

#[actix_web::test]
async fn order_lifecycle() {
    let app = app!(state());
    let admin = login!(&app, ADMIN_EMAIL, PASSWORD);
    let customer = register!(&app, "Ada", "ada@example.com");
    let product_id = create_product!(&app, &admin, "Loom", "10.00", 5);

    let (status, _) = call!(
        &app,
        test::TestRequest::post()
            .uri("/api/coupons")
            .insert_header(bearer(&admin))
            .set_json(json!({ "code": "SAVE10", "discount": "0.1", "type": "percentage" })),
    );
    assert_eq!(status, StatusCode::CREATED);

    let (status, order) = call!(
        &app,
        test::TestRequest::post()
            .uri("/api/orders")
            .insert_header(bearer(&customer))
            .set_json(order_body(&product_id, 2, Some("save10"))),
    );
    assert_eq!(status, StatusCode::CREATED, "{}", order);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["subtotal"], "20.00");
    assert_eq!(order["delivery_cost"], "15.00");
    assert_eq!(order["discount"], "2.00");
    assert_eq!(order["total"], "33.00");
    assert_eq!(order["coupon_code"], "SAVE10");
    let order_id = order["id"].as_str().expect("order id").to_string();

    let (_, product) = call!(
        &app,
        test::TestRequest::get().uri(&format!("/api/products/{}", product_id)),
    );
    assert_eq!(product["stock"], 3);

    // Admin sees it, and can read it.
    let (_, all) = call!(
        &app,
        test::TestRequest::get()
            .uri("/api/orders")
            .insert_header(bearer(&admin)),
    );
    assert_eq!(all["total"], 1);

    let (status, _) = call!(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/orders/{}/cancel", order_id))
            .insert_header(bearer(&customer)),
    );
    assert_eq!(status, StatusCode::OK);

    let (_, product) = call!(
        &app,
        test::TestRequest::get().uri(&format!("/api/products/{}", product_id)),
    );
    assert_eq!(product["stock"], 5);

    let (status, _) = call!(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/orders/{}/cancel", order_id))
            .insert_header(bearer(&customer)),
    );
    assert_eq!(status, StatusCode::CONFLICT);

    // Cancelled is final.
    let (status, _) = call!(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/orders/{}/status", order_id))
            .insert_header(bearer(&admin))
            .set_json(json!({ "status": "pending" })),
    );
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, product) = call!(
        &app,
        test::TestRequest::get().uri(&format!("/api/products/{}", product_id)),
    );
    assert_eq!(product["stock"], 5);
}

#[actix_web::test]
async fn orders_are_private_and_stock_is_enforced() {
    let app = app!(state());
    let admin = login!(&app, ADMIN_EMAIL, PASSWORD);
    let alice = register!(&app, "Alice", "alice@example.com");
    let mallory = register!(&app, "Mallory", "mallory@example.com");
    let product_id = create_product!(&app, &admin, "Rare Book", "99.00", 1);

    let (status, body) = call!(
        &app,
        test::TestRequest::post()
            .uri("/api/orders")
            .insert_header(bearer(&alice))
            .set_json(order_body(&product_id, 2, None)),
    );
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);

    let (status, order) = call!(
        &app,
        test::TestRequest::post()
            .uri("/api/orders")
            .insert_header(bearer(&alice))
            .set_json(order_body(&product_id, 1, None)),
    );
    assert_eq!(status, StatusCode::CREATED);
    let order_id = order["id"].as_str().expect("order id").to_string();

    let (status, _) = call!(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/orders/{}", order_id))
            .insert_header(bearer(&mallory)),
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, mine) = call!(
        &app,
        test::TestRequest::get()
            .uri("/api/orders")
            .insert_header(bearer(&mallory)),
    );
    assert_eq!(mine["total"], 0);

    let (status, updated) = call!(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/orders/{}/status", order_id))
            .insert_header(bearer(&admin))
            .set_json(json!({ "status": "shipped" })),
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "shipped");

    let (status, _) = call!(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/orders/{}/cancel", order_id))
            .insert_header(bearer(&alice)),
    );
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn deals_listing() {
    let app = app!(state());
    let admin = login!(&app, ADMIN_EMAIL, PASSWORD);
    let product_id = create_product!(&app, &admin, "Lamp", "40.00", 2);

    for (title, active) in [("Summer", true), ("Paused", false)] {
        let (status, body) = call!(
        &app,
            test::TestRequest::post()
                .uri("/api/deals")
                .insert_header(bearer(&admin))
                .set_json(json!({
                    "product_id": product_id, "title": title, "discount": "0.25", "active": active
                })),
        );
        assert_eq!(status, StatusCode::CREATED, "{}", body);
    }

    let (_, live) = call!(&app, test::TestRequest::get().uri("/api/deals"));
    assert_eq!(live.as_array().map(Vec::len), Some(1));
    assert_eq!(live[0]["discount"], "0.25");

    let (status, all) = call!(
        &app,
        test::TestRequest::get()
            .uri("/api/deals/all")
            .insert_header(bearer(&admin)),
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().map(Vec::len), Some(2));
}
