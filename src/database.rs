use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::models::auth::User;
use crate::models::board::{Board, BoardVariant};
use crate::models::card::Card;
use crate::models::field::FieldConfig;
use crate::repository::{ChangeSet, Repository, StorageError, StorageStats, WorkspaceSnapshot};

const USER_COLUMNS: &str = "id, username, password_hash, name, is_admin, created_at, updated_at";

/// PostgreSQL storage. Boards, cards and field definitions are kept as JSONB
/// documents keyed by variant.
pub struct PgRepository {
    pub pool: PgPool,
}

impl PgRepository {
    pub async fn new(database_url: &str) -> Result<Self> {
        log::info!("🔗 Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("Failed to connect to the database")?;

        log::info!("✅ Database connection established");

        Ok(PgRepository { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        log::info!("📋 Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        log::info!("✅ Migrations applied");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        log::info!("🔍 Running database health check...");

        let row = sqlx::query("SELECT 1 as health_check")
            .fetch_one(&self.pool)
            .await
            .context("Failed to execute health check query")?;

        let result: i32 = row.get("health_check");

        if result == 1 {
            log::info!("✅ Database health check passed");
            Ok(())
        } else {
            Err(anyhow::anyhow!("Database health check failed"))
        }
    }
}

#[async_trait]
impl Repository for PgRepository {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn load_workspace(&self, variant: BoardVariant) -> Result<Option<WorkspaceSnapshot>, StorageError> {
        let row = sqlx::query("SELECT revision FROM workspaces WHERE variant = $1")
            .bind(variant.as_str())
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let revision: i64 = row.get("revision");

        let boards = sqlx::query_scalar::<_, Json<Board>>(
            "SELECT data FROM boards WHERE variant = $1 ORDER BY kind, position",
        )
        .bind(variant.as_str())
        .fetch_all(&self.pool)
        .await?;

        let cards = sqlx::query_scalar::<_, Json<Card>>(
            "SELECT data FROM cards WHERE variant = $1 ORDER BY board, position",
        )
        .bind(variant.as_str())
        .fetch_all(&self.pool)
        .await?;

        let fields = sqlx::query_scalar::<_, Json<FieldConfig>>(
            "SELECT definition FROM field_configs WHERE variant = $1 ORDER BY position",
        )
        .bind(variant.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(WorkspaceSnapshot {
            boards: boards.into_iter().map(|b| b.0).collect(),
            cards: cards.into_iter().map(|c| c.0).collect(),
            fields: fields.into_iter().map(|f| f.0).collect(),
            revision: revision.max(0) as u64,
        }))
    }

    async fn apply(&self, variant: BoardVariant, changes: &ChangeSet) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO workspaces (variant, revision) VALUES ($1, $2)
            ON CONFLICT (variant) DO UPDATE SET revision = EXCLUDED.revision, updated_at = NOW()
            "#,
        )
        .bind(variant.as_str())
        .bind(changes.revision as i64)
        .execute(&mut *tx)
        .await?;

        if let Some(boards) = &changes.boards {
            sqlx::query("DELETE FROM boards WHERE variant = $1")
                .bind(variant.as_str())
                .execute(&mut *tx)
                .await?;
            for board in boards {
                sqlx::query(
                    "INSERT INTO boards (variant, name, kind, position, data) VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(variant.as_str())
                .bind(&board.name)
                .bind(board.kind.as_str())
                .bind(board.position as i32)
                .bind(Json(board))
                .execute(&mut *tx)
                .await?;
            }
        }

        if let Some(fields) = &changes.fields {
            sqlx::query("DELETE FROM field_configs WHERE variant = $1")
                .bind(variant.as_str())
                .execute(&mut *tx)
                .await?;
            for field in fields {
                sqlx::query(
                    "INSERT INTO field_configs (variant, field_name, position, definition) VALUES ($1, $2, $3, $4)",
                )
                .bind(variant.as_str())
                .bind(&field.field_name)
                .bind(field.order)
                .bind(Json(field))
                .execute(&mut *tx)
                .await?;
            }
        }

        if !changes.removed.is_empty() {
            sqlx::query("DELETE FROM cards WHERE variant = $1 AND id = ANY($2)")
                .bind(variant.as_str())
                .bind(&changes.removed)
                .execute(&mut *tx)
                .await?;
        }

        for card in &changes.upserted {
            sqlx::query(
                r#"
                INSERT INTO cards (id, variant, project_id, board, position, version, data, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (id) DO UPDATE SET
                    project_id = EXCLUDED.project_id,
                    board = EXCLUDED.board,
                    position = EXCLUDED.position,
                    version = EXCLUDED.version,
                    data = EXCLUDED.data,
                    updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(&card.id)
            .bind(variant.as_str())
            .bind(&card.project_id)
            .bind(&card.board)
            .bind(card.position as i32)
            .bind(card.version)
            .bind(Json(card))
            .bind(card.created_at)
            .bind(card.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: i32) -> Result<Option<User>, StorageError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let users = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users ORDER BY name", USER_COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn upsert_user(
        &self,
        username: &str,
        name: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<User, StorageError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, name, password_hash, is_admin)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (username) DO UPDATE SET
                name = EXCLUDED.name,
                password_hash = EXCLUDED.password_hash,
                is_admin = EXCLUDED.is_admin,
                updated_at = NOW()
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(username)
        .bind(name)
        .bind(password_hash)
        .bind(is_admin)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn stats(&self) -> Result<StorageStats, StorageError> {
        let stats = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) as user_count,
                (SELECT COUNT(*) FROM boards) as board_count,
                (SELECT COUNT(*) FROM cards) as card_count,
                (SELECT COUNT(*) FROM field_configs) as field_count
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StorageStats {
            users: stats.get::<i64, _>("user_count"),
            boards: stats.get::<i64, _>("board_count"),
            cards: stats.get::<i64, _>("card_count"),
            field_configs: stats.get::<i64, _>("field_count"),
        })
    }
}
