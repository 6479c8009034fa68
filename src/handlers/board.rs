use actix_web::{web, HttpRequest, HttpResponse, Result};
use validator::Validate;

use crate::config::AppConfig;
use crate::handlers::auth::{current_actor, current_claims};
use crate::models::board::{
    AddMemberRequest, Board, BoardColorRequest, BoardKind, BoardVariant, BoardView, CreateBoardRequest,
    RenameBoardRequest, ReorderBoardsRequest, RevisionResponse,
};
use crate::models::response::ApiResponse;
use crate::services::BoardRegistry;
use crate::utils::errors::ServiceError;

/// Columns, order, members and colours of a variant
#[utoipa::path(
    get,
    path = "/api/{variant}/board",
    tag = "boards",
    security(("bearer_auth" = [])),
    params(("variant" = BoardVariant, Path, description = "Board variant")),
    responses(
        (status = 200, description = "Board retrieved successfully", body = ApiResponse<BoardView>),
        (status = 401, description = "Unauthorized", body = crate::models::response::ErrorResponse),
        (status = 404, description = "Unknown variant", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn get_board(
    req: HttpRequest,
    path: web::Path<BoardVariant>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    let variant = path.into_inner();
    log::info!("GET /api/{}/board", variant);
    current_claims(&req, &config)?;

    let view = registry.read(variant, |ws| ws.board_view()).await;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Board retrieved successfully", view)))
}

/// Current revision; changes on every committed mutation
#[utoipa::path(
    get,
    path = "/api/{variant}/revision",
    tag = "boards",
    security(("bearer_auth" = [])),
    params(("variant" = BoardVariant, Path, description = "Board variant")),
    responses(
        (status = 200, description = "Revision retrieved successfully", body = ApiResponse<RevisionResponse>)
    )
)]
pub async fn get_revision(
    req: HttpRequest,
    path: web::Path<BoardVariant>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    let variant = path.into_inner();
    log::debug!("GET /api/{}/revision", variant);
    current_claims(&req, &config)?;

    let revision = registry.read(variant, |ws| ws.revision()).await;
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Revision retrieved successfully",
        RevisionResponse { variant, revision },
    )))
}

/// All boards of a variant: regular, then finalized, then the trash board
#[utoipa::path(
    get,
    path = "/api/{variant}/boards",
    tag = "boards",
    security(("bearer_auth" = [])),
    params(("variant" = BoardVariant, Path, description = "Board variant")),
    responses(
        (status = 200, description = "Boards retrieved successfully", body = ApiResponse<Vec<Board>>)
    )
)]
pub async fn get_boards(
    req: HttpRequest,
    path: web::Path<BoardVariant>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    let variant = path.into_inner();
    log::info!("GET /api/{}/boards", variant);
    current_claims(&req, &config)?;

    let boards = registry
        .read(variant, |ws| {
            let mut boards = ws.regular_boards();
            boards.extend(ws.finalized_boards());
            boards.extend(ws.boards().iter().filter(|b| b.kind == BoardKind::Trash));
            boards.into_iter().cloned().collect::<Vec<Board>>()
        })
        .await;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Boards retrieved successfully", boards)))
}

/// Add a regular board at the end
#[utoipa::path(
    post,
    path = "/api/{variant}/boards",
    tag = "boards",
    security(("bearer_auth" = [])),
    params(("variant" = BoardVariant, Path, description = "Board variant")),
    request_body = CreateBoardRequest,
    responses(
        (status = 201, description = "Board created successfully", body = ApiResponse<Board>),
        (status = 409, description = "Board already exists", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn create_board(
    req: HttpRequest,
    path: web::Path<BoardVariant>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
    body: web::Json<CreateBoardRequest>,
) -> Result<HttpResponse, ServiceError> {
    let variant = path.into_inner();
    log::info!("POST /api/{}/boards", variant);
    current_claims(&req, &config)?;
    body.validate()?;

    let body = body.into_inner();
    let board = registry
        .mutate(variant, |ws| ws.create_board(&body.name, body.color))
        .await?;

    log::info!("Board '{}' created", board.name);
    Ok(HttpResponse::Created().json(ApiResponse::success("Board created successfully", board)))
}

/// Set the display order of the regular boards
#[utoipa::path(
    put,
    path = "/api/{variant}/boards/order",
    tag = "boards",
    security(("bearer_auth" = [])),
    params(("variant" = BoardVariant, Path, description = "Board variant")),
    request_body = ReorderBoardsRequest,
    responses(
        (status = 200, description = "Board order updated successfully", body = ApiResponse<Vec<String>>),
        (status = 400, description = "Not a permutation of the regular boards", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn update_ordered(
    req: HttpRequest,
    path: web::Path<BoardVariant>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
    body: web::Json<ReorderBoardsRequest>,
) -> Result<HttpResponse, ServiceError> {
    let variant = path.into_inner();
    log::info!("PUT /api/{}/boards/order", variant);
    current_claims(&req, &config)?;

    let ordered = registry
        .mutate(variant, |ws| ws.update_ordered(&body.ordered))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Board order updated successfully", ordered)))
}

/// Colours by board name
#[utoipa::path(
    get,
    path = "/api/{variant}/boards/colors",
    tag = "boards",
    security(("bearer_auth" = [])),
    params(("variant" = BoardVariant, Path, description = "Board variant")),
    responses(
        (status = 200, description = "Board colors retrieved successfully, keyed by board name")
    )
)]
pub async fn get_board_colors(
    req: HttpRequest,
    path: web::Path<BoardVariant>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    let variant = path.into_inner();
    log::info!("GET /api/{}/boards/colors", variant);
    current_claims(&req, &config)?;

    let colors = registry.read(variant, |ws| ws.board_colors()).await;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Board colors retrieved successfully", colors)))
}

/// Rename a board; its cards follow
#[utoipa::path(
    put,
    path = "/api/{variant}/boards/{name}",
    tag = "boards",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("name" = String, Path, description = "Current board name")
    ),
    request_body = RenameBoardRequest,
    responses(
        (status = 200, description = "Board renamed successfully", body = ApiResponse<Board>),
        (status = 404, description = "Board not found", body = crate::models::response::ErrorResponse),
        (status = 409, description = "Board name taken", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn rename_board(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
    body: web::Json<RenameBoardRequest>,
) -> Result<HttpResponse, ServiceError> {
    let (variant, name) = path.into_inner();
    log::info!("PUT /api/{}/boards/{}", variant, name);
    current_claims(&req, &config)?;
    body.validate()?;

    let board = registry
        .mutate(variant, |ws| ws.rename_board(&name, &body.name))
        .await?;

    log::info!("Board '{}' renamed to '{}'", name, board.name);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Board renamed successfully", board)))
}

/// Delete an empty regular board
#[utoipa::path(
    delete,
    path = "/api/{variant}/boards/{name}",
    tag = "boards",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("name" = String, Path, description = "Board name")
    ),
    responses(
        (status = 200, description = "Board deleted successfully", body = ApiResponse<bool>),
        (status = 400, description = "Board is not empty or is a system board", body = crate::models::response::ErrorResponse),
        (status = 404, description = "Board not found", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn delete_board(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    let (variant, name) = path.into_inner();
    log::info!("DELETE /api/{}/boards/{}", variant, name);
    current_claims(&req, &config)?;

    registry.mutate(variant, |ws| ws.delete_board(&name)).await?;

    log::info!("Board '{}' deleted", name);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Board deleted successfully", true)))
}

/// Set or clear the colour of a board
#[utoipa::path(
    put,
    path = "/api/{variant}/boards/{name}/color",
    tag = "boards",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("name" = String, Path, description = "Board name")
    ),
    request_body = BoardColorRequest,
    responses(
        (status = 200, description = "Board color updated successfully", body = ApiResponse<Board>),
        (status = 404, description = "Board not found", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn set_board_color(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
    body: web::Json<BoardColorRequest>,
) -> Result<HttpResponse, ServiceError> {
    let (variant, name) = path.into_inner();
    log::info!("PUT /api/{}/boards/{}/color", variant, name);
    current_claims(&req, &config)?;

    let board = registry
        .mutate(variant, |ws| ws.set_board_color(&name, body.color.as_deref()))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Board color updated successfully", board)))
}

/// Usernames assigned to a board
#[utoipa::path(
    get,
    path = "/api/{variant}/boards/{name}/members",
    tag = "boards",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("name" = String, Path, description = "Board name")
    ),
    responses(
        (status = 200, description = "Board members retrieved successfully", body = ApiResponse<Vec<String>>),
        (status = 404, description = "Board not found", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn get_board_members(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    let (variant, name) = path.into_inner();
    log::info!("GET /api/{}/boards/{}/members", variant, name);
    current_claims(&req, &config)?;

    let members = registry.read(variant, |ws| ws.board_members(&name)).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Board members retrieved successfully", members)))
}

/// Assign a user to a board (administrators only)
#[utoipa::path(
    post,
    path = "/api/{variant}/boards/{name}/members",
    tag = "boards",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("name" = String, Path, description = "Board name")
    ),
    request_body = AddMemberRequest,
    responses(
        (status = 200, description = "Board member added successfully", body = ApiResponse<Vec<String>>),
        (status = 403, description = "Administrators only", body = crate::models::response::ErrorResponse),
        (status = 404, description = "Board or user not found", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn add_board_member(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
    body: web::Json<AddMemberRequest>,
) -> Result<HttpResponse, ServiceError> {
    let (variant, name) = path.into_inner();
    log::info!("POST /api/{}/boards/{}/members", variant, name);
    let actor = current_actor(&req, &config)?;
    body.validate()?;

    let username = body.username.trim();
    if actor.is_admin && registry.repository().find_user_by_username(username).await?.is_none() {
        return Err(ServiceError::NotFound(format!("User '{}' not found", username)));
    }

    let members = registry
        .mutate(variant, |ws| ws.add_board_member(&name, username, &actor))
        .await?;

    log::info!("User '{}' added to board '{}'", username, name);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Board member added successfully", members)))
}

/// Unassign a user from a board (administrators only)
#[utoipa::path(
    delete,
    path = "/api/{variant}/boards/{name}/members/{username}",
    tag = "boards",
    security(("bearer_auth" = [])),
    params(
        ("variant" = BoardVariant, Path, description = "Board variant"),
        ("name" = String, Path, description = "Board name"),
        ("username" = String, Path, description = "Member username")
    ),
    responses(
        (status = 200, description = "Board member removed successfully", body = ApiResponse<Vec<String>>),
        (status = 403, description = "Administrators only", body = crate::models::response::ErrorResponse),
        (status = 404, description = "Board or member not found", body = crate::models::response::ErrorResponse)
    )
)]
pub async fn remove_board_member(
    req: HttpRequest,
    path: web::Path<(BoardVariant, String, String)>,
    registry: web::Data<BoardRegistry>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    let (variant, name, username) = path.into_inner();
    log::info!("DELETE /api/{}/boards/{}/members/{}", variant, name, username);
    let actor = current_actor(&req, &config)?;

    let members = registry
        .mutate(variant, |ws| ws.remove_board_member(&name, &username, &actor))
        .await?;

    log::info!("User '{}' removed from board '{}'", username, name);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Board member removed successfully", members)))
}

pub fn board_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/board", web::get().to(get_board))
        .route("/revision", web::get().to(get_revision))
        .service(
            web::scope("/boards")
                .route("", web::get().to(get_boards))
                .route("", web::post().to(create_board))
                .route("/order", web::put().to(update_ordered))
                .route("/colors", web::get().to(get_board_colors))
                .route("/{name}", web::put().to(rename_board))
                .route("/{name}", web::delete().to(delete_board))
                .route("/{name}/color", web::put().to(set_board_color))
                .route("/{name}/members", web::get().to(get_board_members))
                .route("/{name}/members", web::post().to(add_board_member))
                .route("/{name}/members/{username}", web::delete().to(remove_board_member)),
        );
}
