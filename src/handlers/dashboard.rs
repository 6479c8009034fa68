use actix_web::{web, HttpRequest, HttpResponse, Result};
use chrono::Utc;

use crate::config::AppConfig;
use crate::handlers::auth::current_claims;
use crate::models::board::BoardVariant;
use crate::models::dashboard::{Breakdown, DashboardQuery, DashboardSummary, MonthBucket};
use crate::models::response::ApiResponse;
use crate::services::{dashboard, BoardRegistry};
use crate::utils::errors::ServiceError;

/// Totals, per-board distribution and month-over-month growth
#[utoipa::path(
    get,
    path = "/api/{variant}/dashboard",
    tag = "dashboard",
    security(("bearer_auth" = [])),
    params(("variant" = BoardVariant, Path, description = "Board variant")),
    responses(
        (status = 200, description = "Dashboard retrieved successfully", body = ApiResponse<DashboardSummary>)
    )
)]
pub async fn get_summary(
    req: HttpRequest,
    path: web::Path<BoardVariant>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    let variant = path.into_inner();
    log::info!("GET /api/{}/dashboard", variant);
    current_claims(&req, &config)?;

    let summary = registry
        .read(variant, |ws| dashboard::summary(ws, Utc::now()))
        .await;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Dashboard retrieved successfully", summary)))
}

/// Card counts grouped by the value of one field
#[utoipa::path(
    get,
    path = "/api/{variant}/dashboard/breakdown/{field}",
    tag = "dashboard",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("field" = String, Path, description = "Field name to group by"),
        ("includeFinalized" = Option<bool>, Query, description = "Include completed and cancelled cards")
    ),
    responses(
        (status = 200, description = "Breakdown retrieved successfully", body = ApiResponse<Breakdown>),
        (status = 404, description = "Field not found", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn get_breakdown(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String)>,
    query: web::Query<DashboardQuery>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    let (variant, field) = path.into_inner();
    log::info!("GET /api/{}/dashboard/breakdown/{}", variant, field);
    current_claims(&req, &config)?;

    let breakdown = registry
        .read(variant, |ws| dashboard::breakdown(ws, &field, query.include_finalized))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Breakdown retrieved successfully", breakdown)))
}

/// Created and completed cards per month
#[utoipa::path(
    get,
    path = "/api/{variant}/dashboard/timeline",
    tag = "dashboard",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("months" = Option<u32>, Query, description = "Number of months, 1 to 36 (default 6)")
    ),
    responses(
        (status = 200, description = "Timeline retrieved successfully", body = ApiResponse<Vec<MonthBucket>>)
    )
)]
pub async fn get_timeline(
    req: HttpRequest,
    path: web::Path<BoardVariant>,
    query: web::Query<DashboardQuery>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    let variant = path.into_inner();
    log::info!("GET /api/{}/dashboard/timeline", variant);
    current_claims(&req, &config)?;

    let timeline = registry
        .read(variant, |ws| dashboard::timeline(ws, query.months, Utc::now()))
        .await;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Timeline retrieved successfully", timeline)))
}

pub fn dashboard_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/dashboard")
            .route("", web::get().to(get_summary))
            .route("/breakdown/{field}", web::get().to(get_breakdown))
            .route("/timeline", web::get().to(get_timeline)),
    );
}
