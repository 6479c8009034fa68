//! Storage abstraction for committed board state and user accounts.

pub mod memory;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::models::auth::User;
use crate::models::board::{Board, BoardVariant};
use crate::models::card::Card;
use crate::models::field::FieldConfig;

pub use memory::MemoryRepository;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Everything stored for one variant.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceSnapshot {
    pub boards: Vec<Board>,
    pub cards: Vec<Card>,
    pub fields: Vec<FieldConfig>,
    pub revision: u64,
}

/// Difference between two workspace states, written in one transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub upserted: Vec<Card>,
    pub removed: Vec<String>,
    /// Full board list, present only when any board changed.
    pub boards: Option<Vec<Board>>,
    /// Full field configuration, present only when it changed.
    pub fields: Option<Vec<FieldConfig>>,
    pub revision: u64,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.upserted.is_empty()
            && self.removed.is_empty()
            && self.boards.is_none()
            && self.fields.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct StorageStats {
    pub users: i64,
    pub boards: i64,
    pub cards: i64,
    pub field_configs: i64,
}

impl StorageStats {
    pub fn log_stats(&self) {
        log::info!("📈 Storage Statistics:");
        log::info!("   👥 Users: {}", self.users);
        log::info!("   🗂️  Boards: {}", self.boards);
        log::info!("   📋 Cards: {}", self.cards);
        log::info!("   🧩 Field configs: {}", self.field_configs);
    }
}

#[async_trait]
pub trait Repository: Send + Sync {
    /// Human readable backend name, reported by `/health`.
    fn backend(&self) -> &'static str;

    /// Stored state of a variant; `None` when it was never seeded.
    async fn load_workspace(&self, variant: BoardVariant) -> Result<Option<WorkspaceSnapshot>, StorageError>;

    async fn apply(&self, variant: BoardVariant, changes: &ChangeSet) -> Result<(), StorageError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError>;

    async fn find_user_by_id(&self, id: i32) -> Result<Option<User>, StorageError>;

    async fn list_users(&self) -> Result<Vec<User>, StorageError>;

    /// Creates the account or replaces its name, hash and admin flag.
    async fn upsert_user(
        &self,
        username: &str,
        name: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<User, StorageError>;

    async fn stats(&self) -> Result<StorageStats, StorageError>;
}
