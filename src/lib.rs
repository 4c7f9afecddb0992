pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod http;
pub mod infrastructure;
pub mod schema;
pub mod security;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use application::{AuthService, CatalogService, CouponService, OrderService};
use domain::errors::DomainError;
use infrastructure::{
    DieselCategoryRepository, DieselCouponRepository, DieselDealRepository,
    DieselOrderRepository, DieselProductRepository, DieselUserRepository, MemoryStore,
};
use security::JwtKeys;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), DomainError> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| DomainError::Internal(format!("migrations failed: {}", e)))?;
    Ok(())
}

/// Services shared by every worker.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub catalog: Arc<CatalogService>,
    pub coupons: Arc<CouponService>,
    pub orders: Arc<OrderService>,
}

impl AppState {
    pub fn postgres(pool: DbPool, keys: JwtKeys) -> Self {
        let users = Arc::new(DieselUserRepository::new(pool.clone()));
        let categories = Arc::new(DieselCategoryRepository::new(pool.clone()));
        let products = Arc::new(DieselProductRepository::new(pool.clone()));
        let deals = Arc::new(DieselDealRepository::new(pool.clone()));
        let coupon_repo = Arc::new(DieselCouponRepository::new(pool.clone()));
        let orders = Arc::new(DieselOrderRepository::new(pool));

        let coupons = Arc::new(CouponService::new(coupon_repo));
        AppState {
            auth: Arc::new(AuthService::new(users, keys)),
            catalog: Arc::new(CatalogService::new(categories, products.clone(), deals)),
            orders: Arc::new(OrderService::new(orders, products, coupons.clone())),
            coupons,
        }
    }

    /// Every port backed by one process-local store.
    pub fn in_memory(keys: JwtKeys) -> Self {
        let store = Arc::new(MemoryStore::new());
        let coupons = Arc::new(CouponService::new(store.clone()));
        AppState {
            auth: Arc::new(AuthService::new(store.clone(), keys)),
            catalog: Arc::new(CatalogService::new(store.clone(), store.clone(), store.clone())),
            orders: Arc::new(OrderService::new(store.clone(), store, coupons.clone())),
            coupons,
        }
    }
}

/// Registers every `/api` route. Shared by the server and the HTTP tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    use handlers::{auth, categories, coupons, deals, health, orders, products};

    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health::health))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(auth::register))
                    .route("/login", web::post().to(auth::login))
                    .route("/forgot-password", web::post().to(auth::forgot_password))
                    .route("/reset-password", web::post().to(auth::reset_password))
                    .route("/profile", web::get().to(auth::profile))
                    .route("/profile", web::put().to(auth::update_profile)),
            )
            .service(
                web::scope("/products")
                    .route("", web::get().to(products::list_products))
                    .route("", web::post().to(products::create_product))
                    .route("/{id}", web::get().to(products::get_product))
                    .route("/{id}", web::put().to(products::update_product))
                    .route("/{id}", web::delete().to(products::delete_product)),
            )
            .service(
                web::scope("/categories")
                    .route("", web::get().to(categories::list_categories))
                    .route("", web::post().to(categories::create_category))
                    .route("/{id}", web::get().to(categories::get_category))
                    .route("/{id}", web::put().to(categories::update_category))
                    .route("/{id}", web::delete().to(categories::delete_category)),
            )
            .service(
                web::scope("/deals")
                    .route("", web::get().to(deals::live_deals))
                    .route("", web::post().to(deals::create_deal))
                    .route("/all", web::get().to(deals::all_deals))
                    .route("/{id}", web::put().to(deals::update_deal))
                    .route("/{id}", web::delete().to(deals::delete_deal)),
            )
            .service(
                web::scope("/coupons")
                    .route("", web::get().to(coupons::list_coupons))
                    .route("", web::post().to(coupons::create_coupon))
                    .route("/validate/{code}", web::get().to(coupons::validate_coupon))
                    .route("/{id}", web::put().to(coupons::update_coupon))
                    .route("/{id}", web::delete().to(coupons::delete_coupon)),
            )
            .service(
                web::scope("/orders")
                    .route("", web::post().to(orders::create_order))
                    .route("", web::get().to(orders::list_orders))
                    .route("/{id}", web::get().to(orders::get_order))
                    .route("/{id}/cancel", web::post().to(orders::cancel_order))
                    .route("/{id}/status", web::put().to(orders::update_status)),
            ),
    );
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: AppState,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let data = web::Data::new(state);
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(Logger::default())
            .configure(configure)
    })
    .bind((host.to_string(), port))?
    .run())
}
