//! Reverse-share repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use sharebox_core::error::{AppError, ErrorKind};
use sharebox_core::result::AppResult;
use sharebox_entity::share::{CreateReverseShareFile, ReverseShare, ReverseShareFile};

use crate::store::ReverseShareStore;

/// Repository for reverse shares and their uploaded files.
#[derive(Debug, Clone)]
pub struct ReverseShareRepository {
    pool: PgPool,
}

impl ReverseShareRepository {
    /// Create a new reverse-share repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReverseShareStore for ReverseShareRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ReverseShare>> {
        sqlx::query_as::<_, ReverseShare>("SELECT * FROM reverse_shares WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find reverse share", e)
            })
    }

    async fn find_by_alias(&self, alias: &str) -> AppResult<Option<ReverseShare>> {
        sqlx::query_as::<_, ReverseShare>("SELECT * FROM reverse_shares WHERE alias = $1")
            .bind(alias)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find reverse share", e)
            })
    }

    async fn count_files(&self, reverse_share_id: Uuid) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM reverse_share_files WHERE reverse_share_id = $1")
            .bind(reverse_share_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count reverse share files", e)
            })
    }

    async fn create_file(&self, data: &CreateReverseShareFile) -> AppResult<ReverseShareFile> {
        sqlx::query_as::<_, ReverseShareFile>(
            "INSERT INTO reverse_share_files \
             (reverse_share_id, name, extension, size, object_name, uploader_email, uploader_name) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(data.reverse_share_id)
        .bind(&data.name)
        .bind(&data.extension)
        .bind(data.size)
        .bind(&data.object_name)
        .bind(&data.uploader_email)
        .bind(&data.uploader_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to register reverse share file", e)
        })
    }

    async fn find_file(&self, id: Uuid) -> AppResult<Option<ReverseShareFile>> {
        sqlx::query_as::<_, ReverseShareFile>("SELECT * FROM reverse_share_files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find reverse share file", e)
            })
    }

    async fn find_files_for_owner(
        &self,
        ids: &[Uuid],
        owner_id: Uuid,
    ) -> AppResult<Vec<ReverseShareFile>> {
        sqlx::query_as::<_, ReverseShareFile>(
            "SELECT f.* FROM reverse_share_files f \
             JOIN reverse_shares s ON s.id = f.reverse_share_id \
             WHERE f.id = ANY($1) AND s.creator_id = $2 \
             ORDER BY f.name ASC, f.id ASC",
        )
        .bind(ids)
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find reverse share files", e)
        })
    }
}
