use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::board::BoardKind;

/// One ticket on the board.
///
/// Board membership lives in `board`; the per-column arrays shown to clients
/// are derived from it, so a card can never sit in two columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub board: String,
    pub position: usize,
    pub members: Vec<String>,
    pub comments: Vec<Comment>,
    pub attachments: Vec<Attachment>,
    pub pending_items: Vec<PendingItem>,
    pub activity: Vec<ActivityEntry>,
    /// Dynamic attributes described by the field configuration.
    #[schema(value_type = Object)]
    pub fields: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Regular board the card left when it was finalized or trashed.
    pub last_active_board: Option<String>,
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub stored_name: String,
    pub url: String,
    pub mime_type: String,
    pub size: u64,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingItem {
    pub id: String,
    pub text: String,
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Created,
    Updated,
    Moved,
    Commented,
    CommentDeleted,
    AttachmentAdded,
    AttachmentRemoved,
    ChecklistChanged,
    Completed,
    Cancelled,
    Restored,
    Trashed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: String,
    pub kind: ActivityKind,
    pub actor: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_board: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_board: Option<String>,
    pub at: DateTime<Utc>,
}

/// Body of the "new ticket" form.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardRequest {
    #[validate(length(min = 1, max = 200, message = "Name must have 1 to 200 characters"))]
    pub name: String,
    /// Target board; defaults to the first regular board.
    pub board: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCardRequest {
    #[validate(length(min = 1, max = 200, message = "Name must have 1 to 200 characters"))]
    pub name: Option<String>,
    pub members: Option<Vec<String>>,
    #[schema(value_type = Object)]
    pub fields: Option<Map<String, Value>>,
    /// Rejects the update with 409 when the card has changed since this version.
    pub expected_version: Option<i64>,
}

/// Where a dragged card was picked up.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DragLocation {
    pub board: String,
    pub index: usize,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DropTarget {
    Board { board: String, index: usize },
    Trash,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoveCardRequest {
    /// When present, must match the card's current placement.
    pub source: Option<DragLocation>,
    pub destination: Option<DropTarget>,
    /// Short form: `{ "board": ..., "index": ... }` without a drop target.
    pub board: Option<String>,
    pub index: Option<usize>,
}

impl MoveCardRequest {
    /// Resolves the drop target from either request form.
    pub fn target(&self) -> Option<DropTarget> {
        match (&self.destination, &self.board) {
            (Some(destination), _) => Some(destination.clone()),
            (None, Some(board)) => Some(DropTarget::Board {
                board: board.clone(),
                index: self.index.unwrap_or(usize::MAX),
            }),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RestoreCardRequest {
    pub board: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CommentRequest {
    #[validate(length(min = 1, max = 5000, message = "Comment must have 1 to 5000 characters"))]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PendingItemRequest {
    #[validate(length(min = 1, max = 500, message = "Item must have 1 to 500 characters"))]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePendingItemRequest {
    #[validate(length(min = 1, max = 500, message = "Item must have 1 to 500 characters"))]
    pub text: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    pub board: Option<String>,
    pub member: Option<String>,
    /// Case-insensitive match on name or project id.
    pub q: Option<String>,
    #[serde(default)]
    pub include_finalized: bool,
}

/// Row of the flat task list.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    #[serde(flatten)]
    pub card: Card,
    pub board_kind: BoardKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_target_deserialization() {
        let target: DropTarget =
            serde_json::from_str(r#"{"type":"board","board":"A Fazer","index":2}"#).unwrap();
        assert!(matches!(target, DropTarget::Board { ref board, index: 2 } if board == "A Fazer"));

        let trash: DropTarget = serde_json::from_str(r#"{"type":"trash"}"#).unwrap();
        assert!(matches!(trash, DropTarget::Trash));
    }

    #[test]
    fn test_move_request_short_form() {
        let req: MoveCardRequest = serde_json::from_str(r#"{"board":"Em Andamento","index":1}"#).unwrap();
        assert!(matches!(req.target(), Some(DropTarget::Board { ref board, index: 1 }) if board == "Em Andamento"));

        let req: MoveCardRequest = serde_json::from_str(r#"{"board":"Em Andamento"}"#).unwrap();
        assert!(matches!(req.target(), Some(DropTarget::Board { index: usize::MAX, .. })));

        let req: MoveCardRequest =
            serde_json::from_str(r#"{"source":{"board":"A Fazer","index":0},"destination":{"type":"trash"}}"#).unwrap();
        assert!(matches!(req.target(), Some(DropTarget::Trash)));
        assert!(serde_json::from_str::<MoveCardRequest>("{}").unwrap().target().is_none());
    }

    #[test]
    fn test_activity_kind_is_snake_case() {
        assert_eq!(
            serde_json::to_string(&ActivityKind::AttachmentAdded).unwrap(),
            "\"attachment_added\""
        );
    }

    #[test]
    fn test_create_request_defaults() {
        let req: CreateCardRequest = serde_json::from_str(r#"{"name":"Certidão"}"#).unwrap();
        assert!(req.members.is_empty());
        assert!(req.fields.is_empty());
        assert!(req.board.is_none());
    }
}
