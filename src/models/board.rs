use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::card::Card;

/// Names taken by fixed routes under `/boards`.
pub const RESERVED_BOARD_NAMES: [&str; 2] = ["order", "colors"];

/// The two board flavours served by the API. Each owns an independent set of
/// boards, cards and field configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum BoardVariant {
    Scrumboard,
    RegistroCivil,
}

impl BoardVariant {
    pub const ALL: [BoardVariant; 2] = [BoardVariant::Scrumboard, BoardVariant::RegistroCivil];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scrumboard => "scrumboard",
            Self::RegistroCivil => "registro-civil",
        }
    }

    /// Prefix of the human-facing project id (`SB-1`, `RC-1`).
    pub fn project_prefix(&self) -> &'static str {
        match self {
            Self::Scrumboard => "SB",
            Self::RegistroCivil => "RC",
        }
    }
}

impl fmt::Display for BoardVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoardVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scrumboard" => Ok(Self::Scrumboard),
            "registro-civil" => Ok(Self::RegistroCivil),
            _ => Err(format!("Invalid board variant: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BoardKind {
    Regular,
    Completed,
    Cancelled,
    Trash,
}

impl BoardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Trash => "trash",
        }
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl FromStr for BoardKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regular" => Ok(Self::Regular),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "trash" => Ok(Self::Trash),
            _ => Err(format!("Invalid board kind: {}", s)),
        }
    }
}

/// A column of the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Board {
    pub name: String,
    pub kind: BoardKind,
    pub position: usize,
    pub color: Option<String>,
    pub members: Vec<String>,
}

impl Board {
    pub fn new(name: &str, kind: BoardKind, position: usize) -> Self {
        Self {
            name: name.to_string(),
            kind,
            position,
            color: None,
            members: Vec::new(),
        }
    }
}

/// Snapshot of a variant's columns as the kanban view consumes it.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub variant: BoardVariant,
    pub columns: BTreeMap<String, Vec<Card>>,
    pub ordered: Vec<String>,
    pub finalized_columns: BTreeMap<String, Vec<Card>>,
    pub finalized_ordered: Vec<String>,
    pub board_members: BTreeMap<String, Vec<String>>,
    pub colors: BTreeMap<String, String>,
    pub revision: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RevisionResponse {
    pub variant: BoardVariant,
    pub revision: u64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBoardRequest {
    #[validate(length(min = 1, max = 80, message = "Board name must have 1 to 80 characters"))]
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RenameBoardRequest {
    #[validate(length(min = 1, max = 80, message = "Board name must have 1 to 80 characters"))]
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReorderBoardsRequest {
    pub ordered: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BoardColorRequest {
    /// `null` clears the colour.
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddMemberRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_roundtrip() {
        for s in &["scrumboard", "registro-civil"] {
            let parsed: BoardVariant = s.parse().unwrap();
            assert_eq!(parsed.as_str(), *s);
            assert_eq!(serde_json::to_string(&parsed).unwrap(), format!("\"{}\"", s));
        }
        assert!("kanban".parse::<BoardVariant>().is_err());
    }

    #[test]
    fn test_board_kind_roundtrip() {
        for s in &["regular", "completed", "cancelled", "trash"] {
            let parsed: BoardKind = s.parse().unwrap();
            assert_eq!(parsed.as_str(), *s);
        }
        assert!(BoardKind::Completed.is_finalized());
        assert!(BoardKind::Cancelled.is_finalized());
        assert!(!BoardKind::Trash.is_finalized());
    }
}
