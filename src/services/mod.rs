pub mod dashboard;
pub mod defaults;
pub mod schema;
pub mod sync;
pub mod workspace;

use std::collections::BTreeMap;

use thiserror::Error;

pub use sync::{BoardRegistry, MutationState};
pub use workspace::{Actor, Workspace};

/// Rejections raised by board mutations. None of them changes state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoardError {
    #[error("Card '{0}' not found")]
    CardNotFound(String),
    #[error("Board '{0}' not found")]
    BoardNotFound(String),
    #[error("Field '{0}' not found")]
    FieldNotFound(String),
    #[error("{0} not found")]
    ItemNotFound(String),
    #[error("{0}")]
    Invalid(String),
    #[error("Invalid field values")]
    Fields(BTreeMap<String, String>),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Forbidden(String),
}

pub type BoardResult<T> = Result<T, BoardError>;
