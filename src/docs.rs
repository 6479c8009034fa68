use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers;
use crate::models::{auth, board, card, dashboard, field, response};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Scrum Board API",
        description = "Scrum board and registro civil boards: cards, drag and drop, dynamic fields and dashboards"
    ),
    paths(
        handlers::health::health_check,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::get_me,
        handlers::auth::get_members,
        handlers::board::get_board,
        handlers::board::get_revision,
        handlers::board::get_boards,
        handlers::board::create_board,
        handlers::board::update_ordered,
        handlers::board::get_board_colors,
        handlers::board::rename_board,
        handlers::board::delete_board,
        handlers::board::set_board_color,
        handlers::board::get_board_members,
        handlers::board::add_board_member,
        handlers::board::remove_board_member,
        handlers::card::get_tasks,
        handlers::card::create_card,
        handlers::card::get_card,
        handlers::card::update_card,
        handlers::card::delete_card,
        handlers::card::move_card,
        handlers::card::complete_card,
        handlers::card::cancel_card,
        handlers::card::restore_card,
        handlers::card::add_comment,
        handlers::card::delete_comment,
        handlers::card::add_pending_item,
        handlers::card::update_pending_item,
        handlers::card::remove_pending_item,
        handlers::attachment::upload_file,
        handlers::attachment::get_card_attachments,
        handlers::attachment::download_file,
        handlers::attachment::delete_attachment,
        handlers::field::get_fields,
        handlers::field::create_field,
        handlers::field::reorder_fields,
        handlers::field::update_field,
        handlers::field::delete_field,
        handlers::field::get_form_schema,
        handlers::dashboard::get_summary,
        handlers::dashboard::get_breakdown,
        handlers::dashboard::get_timeline,
    ),
    components(schemas(
        response::ErrorResponse,
        auth::LoginRequest,
        auth::UserResponse,
        auth::MemberResponse,
        board::BoardVariant,
        board::BoardKind,
        board::Board,
        card::Card,
        card::ActivityEntry,
        card::DragLocation,
        card::DropTarget,
        field::FieldType,
        field::Widget,
        dashboard::DashboardSummary,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Login and session endpoints"),
        (name = "boards", description = "Board columns and the board view"),
        (name = "cards", description = "Cards, comments and pending items"),
        (name = "attachments", description = "Card file attachments"),
        (name = "fields", description = "Dynamic field configuration"),
        (name = "dashboard", description = "Aggregated statistics"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
