use actix_web::{web, HttpRequest, HttpResponse, Result};
use validator::Validate;

use crate::config::AppConfig;
use crate::handlers::attachment::remove_stored_file;
use crate::handlers::auth::{current_actor, current_claims};
use crate::models::board::{BoardKind, BoardVariant};
use crate::models::card::{
    Card, Comment, CommentRequest, CreateCardRequest, MoveCardRequest, PendingItem,
    PendingItemRequest, RestoreCardRequest, TaskItem, TaskQuery, UpdateCardRequest,
    UpdatePendingItemRequest,
};
use crate::models::response::ApiResponse;
use crate::services::BoardRegistry;
use crate::utils::errors::ServiceError;

/// Flat task list across boards
#[utoipa::path(
    get,
    path = "/api/{variant}/tasks",
    tag = "cards",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("board" = Option<String>, Query, description = "Only cards on this board"),
        ("member" = Option<String>, Query, description = "Only cards assigned to this member"),
        ("q" = Option<String>, Query, description = "Search in name and project id"),
        ("includeFinalized" = Option<bool>, Query, description = "Include completed and cancelled cards")
    ),
    responses(
        (status = 200, description = "Tasks retrieved successfully", body = ApiResponse<Vec<TaskItem>>),
        (status = 401, description = "Unauthorized", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn get_tasks(
    req: HttpRequest,
    path: web::Path<BoardVariant>,
    query: web::Query<TaskQuery>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    let variant = path.into_inner();
    log::info!("GET /api/{}/tasks", variant);
    current_claims(&req, &config)?;

    let tasks = registry.read(variant, |ws| ws.task_list(&query)).await;

    log::info!("Retrieved {} tasks", tasks.len());
    Ok(HttpResponse::Ok().json(ApiResponse::success("Tasks retrieved successfully", tasks)))
}

/// Create a card
#[utoipa::path(
    post,
    path = "/api/{variant}/cards",
    tag = "cards",
    security(("bearer_auth" = [])),
    params(("variant" = BoardVariant, Path, description = "Board variant")),
    request_body = CreateCardRequest,
    responses(
        (status = 201, description = "Card created successfully", body = ApiResponse<Card>),
        (status = 400, description = "Validation error", body = crate::models::response::ErrorResponse),
        (status = 422, description = "Invalid field values", body = crate::models::response::ErrorResponse),
        (status = 503, description = "Storage unavailable, nothing changed", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn create_card(
    req: HttpRequest,
    path: web::Path<BoardVariant>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
    body: web::Json<CreateCardRequest>,
) -> Result<HttpResponse, ServiceError> {
    let variant = path.into_inner();
    log::info!("POST /api/{}/cards", variant);
    let actor = current_actor(&req, &config)?;
    body.validate()?;

    let card = registry
        .mutate(variant, |ws| ws.create_card(body.into_inner(), &actor))
        .await?;

    log::info!("Card {} created on {}", card.project_id, card.board);
    Ok(HttpResponse::Created().json(ApiResponse::success("Card created successfully", card)))
}

/// Get a card
#[utoipa::path(
    get,
    path = "/api/{variant}/cards/{id}",
    tag = "cards",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("id" = String, Path, description = "Card ID")
    ),
    responses(
        (status = 200, description = "Card retrieved successfully", body = ApiResponse<Card>),
        (status = 404, description = "Card not found", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn get_card(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    let (variant, id) = path.into_inner();
    log::info!("GET /api/{}/cards/{}", variant, id);
    current_claims(&req, &config)?;

    let card = registry.read(variant, |ws| ws.card(&id).cloned()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Card retrieved successfully", card)))
}

/// Update name, members or dynamic fields of a card
#[utoipa::path(
    put,
    path = "/api/{variant}/cards/{id}",
    tag = "cards",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("id" = String, Path, description = "Card ID")
    ),
    request_body = UpdateCardRequest,
    responses(
        (status = 200, description = "Card updated successfully", body = ApiResponse<Card>),
        (status = 404, description = "Card not found", body = crate::models::response::ErrorResponse),
        (status = 409, description = "Card changed since expectedVersion", body = crate::models::response::ErrorResponse),
        (status = 422, description = "Invalid field values", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn update_card(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
    body: web::Json<UpdateCardRequest>,
) -> Result<HttpResponse, ServiceError> {
    let (variant, id) = path.into_inner();
    log::info!("PUT /api/{}/cards/{}", variant, id);
    let actor = current_actor(&req, &config)?;
    body.validate()?;

    let card = registry
        .mutate(variant, |ws| ws.update_card(&id, body.into_inner(), &actor))
        .await?;

    log::info!("Card {} updated (version {})", card.project_id, card.version);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Card updated successfully", card)))
}

/// Delete a card for good, including its stored attachments
#[utoipa::path(
    delete,
    path = "/api/{variant}/cards/{id}",
    tag = "cards",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("id" = String, Path, description = "Card ID")
    ),
    responses(
        (status = 200, description = "Card deleted successfully", body = ApiResponse<bool>),
        (status = 404, description = "Card not found", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn delete_card(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    let (variant, id) = path.into_inner();
    log::info!("DELETE /api/{}/cards/{}", variant, id);
    current_claims(&req, &config)?;

    let card = registry.mutate(variant, |ws| ws.delete_ticket(&id)).await?;
    for attachment in &card.attachments {
        remove_stored_file(&config, &attachment.stored_name).await;
    }

    log::info!("Card {} deleted", card.project_id);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Card deleted successfully", true)))
}

/// Drag-and-drop move between or within boards, or onto the trash
#[utoipa::path(
    post,
    path = "/api/{variant}/cards/{id}/move",
    tag = "cards",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("id" = String, Path, description = "Card ID")
    ),
    request_body = MoveCardRequest,
    responses(
        (status = 200, description = "Card moved successfully", body = ApiResponse<Card>),
        (status = 400, description = "Invalid destination", body = crate::models::response::ErrorResponse),
        (status = 409, description = "Card is no longer at the drag source", body = crate::models::response::ErrorResponse),
        (status = 503, description = "Storage unavailable, nothing changed", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn move_card(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
    body: web::Json<MoveCardRequest>,
) -> Result<HttpResponse, ServiceError> {
    let (variant, id) = path.into_inner();
    log::info!("POST /api/{}/cards/{}/move", variant, id);
    let actor = current_actor(&req, &config)?;

    let target = body
        .target()
        .ok_or_else(|| ServiceError::ValidationError("A destination board or trash is required".to_string()))?;

    let card = registry
        .mutate(variant, |ws| ws.drop_card(&id, body.source.as_ref(), target, &actor))
        .await?;

    log::info!("Card {} is now on {} at {}", card.project_id, card.board, card.position);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Card moved successfully", card)))
}

async fn finalize(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
    outcome: BoardKind,
) -> Result<HttpResponse, ServiceError> {
    let (variant, id) = path.into_inner();
    log::info!("POST /api/{}/cards/{}/{}", variant, id, outcome.as_str());
    let actor = current_actor(&req, &config)?;

    let card = registry
        .mutate(variant, |ws| ws.move_ticket_to_finalized(&id, outcome, &actor))
        .await?;

    log::info!("Card {} moved to {}", card.project_id, card.board);
    let message = if outcome == BoardKind::Completed {
        "Card completed successfully"
    } else {
        "Card cancelled successfully"
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success(message, card)))
}

/// Move a card to the completed board
#[utoipa::path(
    post,
    path = "/api/{variant}/cards/{id}/complete",
    tag = "cards",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("id" = String, Path, description = "Card ID")
    ),
    responses(
        (status = 200, description = "Card completed successfully", body = ApiResponse<Card>),
        (status = 400, description = "Card is not on a regular board", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn complete_card(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    finalize(req, path, registry, config, BoardKind::Completed).await
}

/// Move a card to the cancelled board
#[utoipa::path(
    post,
    path = "/api/{variant}/cards/{id}/cancel",
    tag = "cards",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("id" = String, Path, description = "Card ID")
    ),
    responses(
        (status = 200, description = "Card cancelled successfully", body = ApiResponse<Card>),
        (status = 400, description = "Card is not on a regular board", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn cancel_card(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    finalize(req, path, registry, config, BoardKind::Cancelled).await
}

/// Bring a finalized or trashed card back to a regular board
#[utoipa::path(
    post,
    path = "/api/{variant}/cards/{id}/restore",
    tag = "cards",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("id" = String, Path, description = "Card ID")
    ),
    request_body = RestoreCardRequest,
    responses(
        (status = 200, description = "Card restored successfully", body = ApiResponse<Card>),
        (status = 400, description = "Card is already active", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn restore_card(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
    body: Option<web::Json<RestoreCardRequest>>,
) -> Result<HttpResponse, ServiceError> {
    let (variant, id) = path.into_inner();
    log::info!("POST /api/{}/cards/{}/restore", variant, id);
    let actor = current_actor(&req, &config)?;
    let target = body.and_then(|b| b.into_inner().board);

    let card = registry
        .mutate(variant, |ws| ws.restore_card(&id, target.as_deref(), &actor))
        .await?;

    log::info!("Card {} restored to {}", card.project_id, card.board);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Card restored successfully", card)))
}

/// Add a comment
#[utoipa::path(
    post,
    path = "/api/{variant}/cards/{id}/comments",
    tag = "cards",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("id" = String, Path, description = "Card ID")
    ),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment added successfully", body = ApiResponse<Comment>),
        (status = 404, description = "Card not found", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn add_comment(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
    body: web::Json<CommentRequest>,
) -> Result<HttpResponse, ServiceError> {
    let (variant, id) = path.into_inner();
    log::info!("POST /api/{}/cards/{}/comments", variant, id);
    let actor = current_actor(&req, &config)?;
    body.validate()?;

    let comment = registry
        .mutate(variant, |ws| ws.add_comment(&id, &body.text, &actor))
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::success("Comment added successfully", comment)))
}

/// Delete a comment (author or administrator)
#[utoipa::path(
    delete,
    path = "/api/{variant}/cards/{id}/comments/{comment_id}",
    tag = "cards",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("id" = String, Path, description = "Card ID"),
        ("comment_id" = String, Path, description = "Comment ID")
    ),
    responses(
        (status = 200, description = "Comment deleted successfully", body = ApiResponse<Card>),
        (status = 403, description = "Not the author", body = crate::models::response::ErrorResponse),
        (status = 404, description = "Comment not found", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn delete_comment(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    let (variant, id, comment_id) = path.into_inner();
    log::info!("DELETE /api/{}/cards/{}/comments/{}", variant, id, comment_id);
    let actor = current_actor(&req, &config)?;

    let card = registry
        .mutate(variant, |ws| ws.delete_comment(&id, &comment_id, &actor))
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("Comment deleted successfully", card)))
}

/// Add a pending item to the card checklist
#[utoipa::path(
    post,
    path = "/api/{variant}/cards/{id}/pending-items",
    tag = "cards",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("id" = String, Path, description = "Card ID")
    ),
    request_body = PendingItemRequest,
    responses(
        (status = 201, description = "Pending item added successfully", body = ApiResponse<PendingItem>),
        (status = 404, description = "Card not found", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn add_pending_item(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
    body: web::Json<PendingItemRequest>,
) -> Result<HttpResponse, ServiceError> {
    let (variant, id) = path.into_inner();
    log::info!("POST /api/{}/cards/{}/pending-items", variant, id);
    let actor = current_actor(&req, &config)?;
    body.validate()?;

    let item = registry
        .mutate(variant, |ws| ws.add_pending_item(&id, &body.text, &actor))
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::success("Pending item added successfully", item)))
}

/// Edit or tick a pending item
#[utoipa::path(
    put,
    path = "/api/{variant}/cards/{id}/pending-items/{item_id}",
    tag = "cards",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("id" = String, Path, description = "Card ID"),
        ("item_id" = String, Path, description = "Pending item ID")
    ),
    request_body = UpdatePendingItemRequest,
    responses(
        (status = 200, description = "Pending item updated successfully", body = ApiResponse<PendingItem>),
        (status = 404, description = "Pending item not found", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn update_pending_item(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
    body: web::Json<UpdatePendingItemRequest>,
) -> Result<HttpResponse, ServiceError> {
    let (variant, id, item_id) = path.into_inner();
    log::info!("PUT /api/{}/cards/{}/pending-items/{}", variant, id, item_id);
    let actor = current_actor(&req, &config)?;
    body.validate()?;

    let item = registry
        .mutate(variant, |ws| {
            ws.update_pending_item(&id, &item_id, body.text.as_deref(), body.completed, &actor)
        })
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("Pending item updated successfully", item)))
}

/// Remove a pending item
#[utoipa::path(
    delete,
    path = "/api/{variant}/cards/{id}/pending-items/{item_id}",
    tag = "cards",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("id" = String, Path, description = "Card ID"),
        ("item_id" = String, Path, description = "Pending item ID")
    ),
    responses(
        (status = 200, description = "Pending item removed successfully", body = ApiResponse<Card>),
        (status = 404, description = "Pending item not found", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn remove_pending_item(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    let (variant, id, item_id) = path.into_inner();
    log::info!("DELETE /api/{}/cards/{}/pending-items/{}", variant, id, item_id);
    let actor = current_actor(&req, &config)?;

    let card = registry
        .mutate(variant, |ws| ws.remove_pending_item(&id, &item_id, &actor))
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("Pending item removed successfully", card)))
}

pub fn card_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/tasks", web::get().to(get_tasks)).service(
        web::scope("/cards")
            .route("", web::post().to(create_card))
            .route("/{id}", web::get().to(get_card))
            .route("/{id}", web::put().to(update_card))
            .route("/{id}", web::delete().to(delete_card))
            .route("/{id}/move", web::post().to(move_card))
            .route("/{id}/complete", web::post().to(complete_card))
            .route("/{id}/cancel", web::post().to(cancel_card))
            .route("/{id}/restore", web::post().to(restore_card))
            .route("/{id}/comments", web::post().to(add_comment))
            .route("/{id}/comments/{comment_id}", web::delete().to(delete_comment))
            .route("/{id}/pending-items", web::post().to(add_pending_item))
            .route("/{id}/pending-items/{item_id}", web::put().to(update_pending_item))
            .route("/{id}/pending-items/{item_id}", web::delete().to(remove_pending_item)),
    );
}
