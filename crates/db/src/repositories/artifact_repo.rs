//! Repository for the `artifacts` table.

use sqlx::{FromRow, PgPool};
use flightlab_core::types::JobId;

use crate::models::artifact::{Artifact, CreateArtifact, UpsertOutcome};

/// Column list for `artifacts` queries.
const COLUMNS: &str = "\
    id, job_id, kind, file_name, relative_path, size_bytes, created_at, updated_at";

#[derive(FromRow)]
struct UpsertRow {
    inserted: bool,
}

/// Provides CRUD operations for job artifacts.
pub struct ArtifactRepo;

impl ArtifactRepo {
    /// Insert an artifact row. Fails on a duplicate `(job_id, kind, file_name)`.
    pub async fn create(pool: &PgPool, input: &CreateArtifact) -> Result<Artifact, sqlx::Error> {
        let query = format!(
            "INSERT INTO artifacts (job_id, kind, file_name, relative_path, size_bytes) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Artifact>(&query)
            .bind(input.job_id)
            .bind(input.kind.as_str())
            .bind(&input.file_name)
            .bind(&input.relative_path)
            .bind(input.size_bytes)
            .fetch_one(pool)
            .await
    }

    /// Insert or refresh the row keyed by `(job_id, kind, file_name)`.
    ///
    /// The update only fires when size or relative path differ, so a
    /// repeated sync of unchanged files writes nothing. `xmax = 0` marks a
    /// freshly inserted tuple.
    pub async fn upsert(
        pool: &PgPool,
        input: &CreateArtifact,
    ) -> Result<UpsertOutcome, sqlx::Error> {
        let row = sqlx::query_as::<_, UpsertRow>(
            "INSERT INTO artifacts (job_id, kind, file_name, relative_path, size_bytes) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (job_id, kind, file_name) DO UPDATE \
             SET relative_path = EXCLUDED.relative_path, size_bytes = EXCLUDED.size_bytes \
             WHERE artifacts.relative_path IS DISTINCT FROM EXCLUDED.relative_path \
                OR artifacts.size_bytes IS DISTINCT FROM EXCLUDED.size_bytes \
             RETURNING (xmax = 0) AS inserted",
        )
        .bind(input.job_id)
        .bind(input.kind.as_str())
        .bind(&input.file_name)
        .bind(&input.relative_path)
        .bind(input.size_bytes)
        .fetch_optional(pool)
        .await?;

        Ok(match row {
            Some(UpsertRow { inserted: true }) => UpsertOutcome::Created,
            Some(UpsertRow { inserted: false }) => UpsertOutcome::Updated,
            None => UpsertOutcome::Unchanged,
        })
    }

    /// List a job's artifacts ordered by kind then file name.
    pub async fn list_by_job(pool: &PgPool, job_id: JobId) -> Result<Vec<Artifact>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM artifacts WHERE job_id = $1 ORDER BY kind, file_name"
        );
        sqlx::query_as::<_, Artifact>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }
}
