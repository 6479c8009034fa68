use actix_web::{web, HttpRequest, HttpResponse, Result};
use validator::Validate;

use crate::config::AppConfig;
use crate::handlers::auth::current_claims;
use crate::models::board::BoardVariant;
use crate::models::field::{
    CreateFieldRequest, FieldConfig, FormField, ReorderFieldsRequest, UpdateFieldRequest,
};
use crate::models::response::ApiResponse;
use crate::services::BoardRegistry;
use crate::utils::errors::ServiceError;

/// Field configuration of a variant, in display order
#[utoipa::path(
    get,
    path = "/api/{variant}/fields",
    tag = "fields",
    security(("bearer_auth" = [])),
    params(("variant" = BoardVariant, Path, description = "Board variant")),
    responses(
        (status = 200, description = "Fields retrieved successfully", body = ApiResponse<Vec<FieldConfig>>)
    )
)]
pub async fn get_fields(
    req: HttpRequest,
    path: web::Path<BoardVariant>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    let variant = path.into_inner();
    log::info!("GET /api/{}/fields", variant);
    current_claims(&req, &config)?;

    let fields = registry.read(variant, |ws| ws.fields()).await;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Fields retrieved successfully", fields)))
}

/// Add a dynamic field
#[utoipa::path(
    post,
    path = "/api/{variant}/fields",
    tag = "fields",
    security(("bearer_auth" = [])),
    params(("variant" = BoardVariant, Path, description = "Board variant")),
    request_body = CreateFieldRequest,
    responses(
        (status = 201, description = "Field created successfully", body = ApiResponse<FieldConfig>),
        (status = 400, description = "Invalid definition", body = crate::models::response::ErrorResponse),
        (status = 409, description = "Field already exists", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn create_field(
    req: HttpRequest,
    path: web::Path<BoardVariant>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
    body: web::Json<CreateFieldRequest>,
) -> Result<HttpResponse, ServiceError> {
    let variant = path.into_inner();
    log::info!("POST /api/{}/fields", variant);
    current_claims(&req, &config)?;
    body.validate()?;

    let field = registry
        .mutate(variant, |ws| ws.create_field(body.into_inner()))
        .await?;

    log::info!("Field '{}' ({}) created", field.field_name, field.kind);
    Ok(HttpResponse::Created().json(ApiResponse::success("Field created successfully", field)))
}

/// Set the display order of all fields
#[utoipa::path(
    put,
    path = "/api/{variant}/fields/order",
    tag = "fields",
    security(("bearer_auth" = [])),
    params(("variant" = BoardVariant, Path, description = "Board variant")),
    request_body = ReorderFieldsRequest,
    responses(
        (status = 200, description = "Field order updated successfully", body = ApiResponse<Vec<FieldConfig>>),
        (status = 400, description = "Not a permutation of the fields", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn reorder_fields(
    req: HttpRequest,
    path: web::Path<BoardVariant>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
    body: web::Json<ReorderFieldsRequest>,
) -> Result<HttpResponse, ServiceError> {
    let variant = path.into_inner();
    log::info!("PUT /api/{}/fields/order", variant);
    current_claims(&req, &config)?;

    let fields = registry
        .mutate(variant, |ws| ws.reorder_fields(&body.order))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Field order updated successfully", fields)))
}

/// Edit a field definition; protected fields are rejected
#[utoipa::path(
    put,
    path = "/api/{variant}/fields/{field_name}",
    tag = "fields",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("field_name" = String, Path, description = "Field name")
    ),
    request_body = UpdateFieldRequest,
    responses(
        (status = 200, description = "Field updated successfully", body = ApiResponse<FieldConfig>),
        (status = 403, description = "Protected field", body = crate::models::response::ErrorResponse),
        (status = 404, description = "Field not found", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn update_field(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
    body: web::Json<UpdateFieldRequest>,
) -> Result<HttpResponse, ServiceError> {
    let (variant, field_name) = path.into_inner();
    log::info!("PUT /api/{}/fields/{}", variant, field_name);
    current_claims(&req, &config)?;
    body.validate()?;

    let field = registry
        .mutate(variant, |ws| ws.update_field(&field_name, body.into_inner()))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Field updated successfully", field)))
}

/// Delete a field definition; stored card values are kept
#[utoipa::path(
    delete,
    path = "/api/{variant}/fields/{field_name}",
    tag = "fields",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("field_name" = String, Path, description = "Field name")
    ),
    responses(
        (status = 200, description = "Field deleted successfully", body = ApiResponse<FieldConfig>),
        (status = 403, description = "Protected field", body = crate::models::response::ErrorResponse),
        (status = 404, description = "Field not found", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn delete_field(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    let (variant, field_name) = path.into_inner();
    log::info!("DELETE /api/{}/fields/{}", variant, field_name);
    current_claims(&req, &config)?;

    let field = registry
        .mutate(variant, |ws| ws.delete_field(&field_name))
        .await?;

    log::info!("Field '{}' deleted", field.field_name);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Field deleted successfully", field)))
}

/// Form descriptors for the active fields
#[utoipa::path(
    get,
    path = "/api/{variant}/form-schema",
    tag = "fields",
    security(("bearer_auth" = [])),
    params(("variant" = BoardVariant, Path, description = "Board variant")),
    responses(
        (status = 200, description = "Form schema retrieved successfully", body = ApiResponse<Vec<FormField>>)
    )
)]
pub async fn get_form_schema(
    req: HttpRequest,
    path: web::Path<BoardVariant>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    let variant = path.into_inner();
    log::info!("GET /api/{}/form-schema", variant);
    current_claims(&req, &config)?;

    let schema = registry.read(variant, |ws| ws.schema()).await;
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Form schema retrieved successfully",
        schema.render(),
    )))
}

pub fn field_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/form-schema", web::get().to(get_form_schema)).service(
        web::scope("/fields")
            .route("", web::get().to(get_fields))
            .route("", web::post().to(create_field))
            .route("/order", web::put().to(reorder_fields))
            .route("/{field_name}", web::put().to(update_field))
            .route("/{field_name}", web::delete().to(delete_field)),
    );
}
