use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{ChangeSet, Repository, StorageError, StorageStats, WorkspaceSnapshot};
use crate::models::auth::User;
use crate::models::board::BoardVariant;

/// Process-local storage used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryRepository {
    workspaces: Mutex<HashMap<BoardVariant, WorkspaceSnapshot>>,
    users: Mutex<Vec<User>>,
    offline: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every write fail with `Unavailable` until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn lock_error() -> StorageError {
        StorageError::Unavailable("memory store lock poisoned".to_string())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn load_workspace(&self, variant: BoardVariant) -> Result<Option<WorkspaceSnapshot>, StorageError> {
        let workspaces = self.workspaces.lock().map_err(|_| Self::lock_error())?;
        Ok(workspaces.get(&variant).cloned())
    }

    async fn apply(&self, variant: BoardVariant, changes: &ChangeSet) -> Result<(), StorageError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("memory store is offline".to_string()));
        }

        let mut workspaces = self.workspaces.lock().map_err(|_| Self::lock_error())?;
        let stored = workspaces.entry(variant).or_default();

        if let Some(boards) = &changes.boards {
            stored.boards = boards.clone();
        }
        if let Some(fields) = &changes.fields {
            stored.fields = fields.clone();
        }
        stored.cards.retain(|c| !changes.removed.contains(&c.id));
        for card in &changes.upserted {
            match stored.cards.iter_mut().find(|c| c.id == card.id) {
                Some(existing) => *existing = card.clone(),
                None => stored.cards.push(card.clone()),
            }
        }
        stored.revision = changes.revision;
        Ok(())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let users = self.users.lock().map_err(|_| Self::lock_error())?;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_id(&self, id: i32) -> Result<Option<User>, StorageError> {
        let users = self.users.lock().map_err(|_| Self::lock_error())?;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let users = self.users.lock().map_err(|_| Self::lock_error())?;
        let mut users = users.clone();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn upsert_user(
        &self,
        username: &str,
        name: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<User, StorageError> {
        let mut users = self.users.lock().map_err(|_| Self::lock_error())?;
        let now = Utc::now();
        if let Some(user) = users.iter_mut().find(|u| u.username == username) {
            user.name = name.to_string();
            user.password_hash = password_hash.to_string();
            user.is_admin = is_admin;
            user.updated_at = now;
            return Ok(user.clone());
        }

        let user = User {
            id: users.iter().map(|u| u.id).max().unwrap_or(0) + 1,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            name: name.to_string(),
            is_admin,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn stats(&self) -> Result<StorageStats, StorageError> {
        let workspaces = self.workspaces.lock().map_err(|_| Self::lock_error())?;
        let users = self.users.lock().map_err(|_| Self::lock_error())?.len();
        Ok(StorageStats {
            users: users as i64,
            boards: workspaces.values().map(|w| w.boards.len() as i64).sum(),
            cards: workspaces.values().map(|w| w.cards.len() as i64).sum(),
            field_configs: workspaces.values().map(|w| w.fields.len() as i64).sum(),
        })
    }
}
