use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use anyhow::Context;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use scrumboard_be::config::AppConfig;
use scrumboard_be::docs::ApiDoc;
use scrumboard_be::handlers::attachment::ensure_upload_dir;
use scrumboard_be::handlers::auth::ensure_admin_account;
use scrumboard_be::services::BoardRegistry;
use scrumboard_be::{build_repository, configure_api};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().context("Invalid configuration")?;
    let port = config.port;
    let allowed_origins = config.frontend_urls.clone();

    log::info!("🚀 Starting Scrum Board API on port {} ({})", port, config.environment);
    log::info!("📋 Allowed frontend URLs: {}", allowed_origins.join(", "));

    let repository = build_repository(&config).await?;
    if let Some(admin) = &config.admin {
        ensure_admin_account(repository.as_ref(), admin)
            .await
            .context("Failed to create the administrator account")?;
    }
    if let Ok(stats) = repository.stats().await {
        stats.log_stats();
    }

    ensure_upload_dir(&config)
        .await
        .context("Failed to create the upload directory")?;

    let registry = BoardRegistry::load(repository)
        .await
        .context("Failed to load board state")?;

    let registry = web::Data::new(registry);
    let config = web::Data::new(config);
    let openapi = ApiDoc::openapi();

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                "Authorization",
                "Content-Type",
                "Accept",
                "Origin",
                "X-Requested-With",
            ])
            .supports_credentials();

        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(registry.clone())
            .app_data(config.clone())
            .configure(configure_api)
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()))
            .route("/", web::get().to(|| async {
                HttpResponse::Ok().json(serde_json::json!({
                    "name": "Scrum Board API",
                    "version": env!("CARGO_PKG_VERSION"),
                    "description": "REST API for the scrum board and registro civil boards"
                }))
            }))
    })
    .bind(format!("0.0.0.0:{}", port))?
    .run()
    .await?;

    Ok(())
}
