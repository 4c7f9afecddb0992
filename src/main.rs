use chrono::Duration;
use dotenvy::dotenv;
use shop_service::config::{AdminBootstrap, Config, Storage};
use shop_service::domain::errors::DomainError;
use shop_service::domain::user::Role;
use shop_service::security::JwtKeys;
use shop_service::{build_server, create_pool, errors, run_migrations, AppState};

fn bootstrap_admin(state: &AppState, admin: &AdminBootstrap) {
    match state
        .auth
        .register_with_role("Administrator", &admin.email, &admin.password, Role::Admin)
    {
        Ok(session) => log::info!("Created admin account {}", session.user.id),
        Err(DomainError::Conflict(_)) => log::info!("Admin account already exists"),
        Err(e) => log::error!("Could not create admin account: {}", e),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().expect("Invalid configuration");
    errors::expose_internal_errors(!config.is_production());

    let keys = JwtKeys::new(
        &config.jwt_secret,
        Duration::hours(config.jwt_expiration_hours),
    );

    let state = match config.storage {
        Storage::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .expect("DATABASE_URL must be set");
            let pool = create_pool(url, config.db_pool_size)
                .expect("Failed to create database connection pool");
            run_migrations(&pool).expect("Failed to run database migrations");
            AppState::postgres(pool, keys)
        }
        Storage::Memory => {
            log::warn!("Using in-memory storage; data is lost on restart");
            AppState::in_memory(keys)
        }
    };

    if let Some(admin) = &config.admin {
        bootstrap_admin(&state, admin);
    }

    log::info!(
        "Starting server at http://{}:{} ({:?})",
        config.host,
        config.port,
        config.environment
    );

    build_server(state, &config.host, config.port)?.await
}
