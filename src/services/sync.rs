//! Commit protocol for board mutations.
//!
//! A mutation runs against the variant's workspace under its write lock. The
//! workspace is snapshotted first; after the mutation the difference is
//! written through the [`Repository`]. A storage failure restores the
//! snapshot, so memory never runs ahead of what was persisted.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::board::BoardVariant;
use crate::repository::{ChangeSet, Repository, StorageError};
use crate::services::workspace::Workspace;
use crate::services::BoardError;

#[derive(Debug, Clone, PartialEq)]
pub enum MutationState {
    Pending,
    Committed { revision: u64 },
    Failed { reason: String },
}

impl MutationState {
    /// Moves a pending mutation to its final state. Final states never change.
    pub fn resolve(self, outcome: Result<u64, String>) -> Self {
        match self {
            Self::Pending => match outcome {
                Ok(revision) => Self::Committed { revision },
                Err(reason) => Self::Failed { reason },
            },
            done => done,
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Error)]
pub enum MutationError {
    #[error(transparent)]
    Rejected(#[from] BoardError),
    #[error("Failed to persist change: {0}")]
    Storage(#[from] StorageError),
}

impl ChangeSet {
    /// Diffs two states of the same workspace.
    pub fn between(before: &Workspace, after: &Workspace) -> Self {
        let old = before.card_map();
        let new = after.card_map();

        let upserted = new
            .iter()
            .filter(|(id, card)| old.get(id.as_str()) != Some(*card))
            .map(|(_, card)| card.clone())
            .collect();
        let removed = old
            .keys()
            .filter(|id| !new.contains_key(id.as_str()))
            .cloned()
            .collect();

        Self {
            upserted,
            removed,
            boards: (before.boards() != after.boards()).then(|| after.boards().to_vec()),
            fields: (before.raw_fields() != after.raw_fields()).then(|| after.raw_fields().to_vec()),
            revision: after.revision(),
        }
    }

    /// Everything in the workspace, used when seeding storage.
    pub fn full(ws: &Workspace) -> Self {
        Self {
            upserted: ws.cards().cloned().collect(),
            removed: Vec::new(),
            boards: Some(ws.boards().to_vec()),
            fields: Some(ws.raw_fields().to_vec()),
            revision: ws.revision(),
        }
    }
}

/// Owns one workspace per variant and the storage they are committed to.
pub struct BoardRegistry {
    scrumboard: RwLock<Workspace>,
    registro_civil: RwLock<Workspace>,
    repository: Arc<dyn Repository>,
}

impl BoardRegistry {
    /// Loads every variant from storage, seeding defaults for variants that
    /// were never stored.
    pub async fn load(repository: Arc<dyn Repository>) -> Result<Self, StorageError> {
        let scrumboard = Self::load_variant(repository.as_ref(), BoardVariant::Scrumboard).await?;
        let registro_civil = Self::load_variant(repository.as_ref(), BoardVariant::RegistroCivil).await?;
        Ok(Self {
            scrumboard: RwLock::new(scrumboard),
            registro_civil: RwLock::new(registro_civil),
            repository,
        })
    }

    async fn load_variant(repository: &dyn Repository, variant: BoardVariant) -> Result<Workspace, StorageError> {
        let ws = match repository.load_workspace(variant).await? {
            Some(snapshot) => {
                log::info!(
                    "📂 Loaded {} workspace: {} cards, revision {}",
                    variant,
                    snapshot.cards.len(),
                    snapshot.revision
                );
                Workspace::from_snapshot(variant, snapshot)
            }
            None => {
                let ws = Workspace::new(variant);
                repository.apply(variant, &ChangeSet::full(&ws)).await?;
                log::info!("🌱 Seeded {} workspace with default boards and fields", variant);
                ws
            }
        };
        if let Err(problem) = ws.check_invariants() {
            log::warn!("⚠️  {} workspace failed invariant check: {}", variant, problem);
        }
        Ok(ws)
    }

    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repository
    }

    fn workspace(&self, variant: BoardVariant) -> &RwLock<Workspace> {
        match variant {
            BoardVariant::Scrumboard => &self.scrumboard,
            BoardVariant::RegistroCivil => &self.registro_civil,
        }
    }

    /// Runs a read-only query against the current state.
    pub async fn read<R>(&self, variant: BoardVariant, query: impl FnOnce(&Workspace) -> R) -> R {
        let ws = self.workspace(variant).read().await;
        query(&ws)
    }

    /// Applies `mutation` and commits the result. Rejected mutations and
    /// storage failures both leave the workspace exactly as it was.
    pub async fn mutate<R>(
        &self,
        variant: BoardVariant,
        mutation: impl FnOnce(&mut Workspace) -> Result<R, BoardError>,
    ) -> Result<R, MutationError> {
        let mut ws = self.workspace(variant).write().await;
        let snapshot = ws.clone();

        let output = match mutation(&mut ws) {
            Ok(output) => output,
            Err(e) => {
                *ws = snapshot;
                log::warn!("Rejected {} mutation: {}", variant, e);
                return Err(e.into());
            }
        };

        let mut changes = ChangeSet::between(&snapshot, &ws);
        if changes.is_empty() {
            return Ok(output);
        }
        changes.revision = ws.bump_revision();

        let state = MutationState::Pending;
        log::debug!(
            "{} mutation pending: {} upserted, {} removed, revision {}",
            variant,
            changes.upserted.len(),
            changes.removed.len(),
            changes.revision
        );

        match self.repository.apply(variant, &changes).await {
            Ok(()) => {
                let state = state.resolve(Ok(changes.revision));
                log::debug!("{} mutation {:?}", variant, state);
                Ok(output)
            }
            Err(e) => {
                *ws = snapshot;
                let state = state.resolve(Err(e.to_string()));
                log::error!("{} mutation {:?}; state rolled back", variant, state);
                Err(e.into())
            }
        }
    }
}
