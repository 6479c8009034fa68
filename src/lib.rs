pub mod config;
pub mod database;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod services;
pub mod utils;

use std::sync::Arc;

use actix_web::web;

use crate::config::AppConfig;
use crate::database::PgRepository;
use crate::repository::{MemoryRepository, Repository};
use crate::utils::errors::ServiceError;

/// Mounts `/health` and every `/api` route.
///
/// Variant routes live under `/api/{variant}`. Attachment routes are
/// registered ahead of the card scope so `/cards/{id}/attachments` is
/// never swallowed by `/cards`.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(path_config())
        .app_data(query_config())
        .configure(handlers::health_config)
        .service(
            web::scope("/api")
                .configure(handlers::auth_config)
                .service(
                    web::scope("/{variant}")
                        .configure(handlers::attachment_config)
                        .configure(handlers::card_config)
                        .configure(handlers::board_config)
                        .configure(handlers::field_config)
                        .configure(handlers::dashboard_config),
                ),
        );
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        log::warn!("Rejected JSON body: {}", err);
        ServiceError::ValidationError(format!("Invalid request body: {}", err)).into()
    })
}

// The only typed path segment is the variant, so a failed path extraction
// means the board variant does not exist.
fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        log::warn!("Rejected path: {}", err);
        ServiceError::NotFound("Unknown board variant".to_string()).into()
    })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        ServiceError::ValidationError(format!("Invalid query string: {}", err)).into()
    })
}

/// Picks the storage backend: PostgreSQL when `DATABASE_URL` is set,
/// memory otherwise.
pub async fn build_repository(config: &AppConfig) -> anyhow::Result<Arc<dyn Repository>> {
    match &config.database_url {
        Some(url) => {
            let repository = PgRepository::new(url).await?;
            repository.health_check().await?;
            repository.run_migrations().await?;
            Ok(Arc::new(repository))
        }
        None => {
            log::warn!("⚠️  DATABASE_URL not set, using in-memory storage");
            Ok(Arc::new(MemoryRepository::new()))
        }
    }
}
