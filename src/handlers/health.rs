use actix_web::{web, HttpResponse, Result};
use serde_json::json;

use crate::models::response::{ApiResponse, ErrorResponse};
use crate::services::BoardRegistry;

/// Storage health and record counts
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Storage is unreachable", body = ErrorResponse)
    )
)]
pub async fn health_check(registry: web::Data<BoardRegistry>) -> Result<HttpResponse> {
    let repository = registry.repository();
    match repository.stats().await {
        Ok(stats) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            "Scrum board API is running",
            json!({
                "status": "ok",
                "storage": repository.backend(),
                "stats": stats,
            }),
        ))),
        Err(e) => {
            log::error!("Storage health check failed: {}", e);
            Ok(HttpResponse::ServiceUnavailable().json(ErrorResponse::new("Storage connection failed")))
        }
    }
}

pub fn health_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}
