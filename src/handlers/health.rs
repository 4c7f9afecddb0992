use actix_web::HttpResponse;
use chrono::Utc;
use serde_json::json;

/// GET /api/health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "timestamp": Utc::now(),
    }))
}
