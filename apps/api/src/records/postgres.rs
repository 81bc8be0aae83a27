use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use crate::errors::AppError;
use crate::models::student::{StudentRecord, StudentRow};
use crate::records::{RecordFeed, RecordStore, RecordSubscription};

/// Record store backed by the `students` table.
pub struct PgRecordStore {
    pool: PgPool,
    feed: RecordFeed,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            feed: RecordFeed::default(),
        }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn upsert(&self, record: StudentRecord) -> Result<StudentRecord, AppError> {
        // Merge on conflict: the uid is the document key, so a repeat
        // submission never creates a second row.
        let row: StudentRow = sqlx::query_as(
            r#"
            INSERT INTO students (uid, name, email, branch, cgpa, resume_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (uid) DO UPDATE SET
                name = EXCLUDED.name,
                email = EXCLUDED.email,
                branch = EXCLUDED.branch,
                cgpa = EXCLUDED.cgpa,
                resume_url = EXCLUDED.resume_url,
                updated_at = NOW()
            RETURNING uid, name, email, branch, cgpa, resume_url, updated_at
            "#,
        )
        .bind(&record.uid)
        .bind(&record.name)
        .bind(&record.email)
        .bind(record.branch.label())
        .bind(record.cgpa)
        .bind(&record.resume_url)
        .fetch_one(&self.pool)
        .await?;

        let saved = StudentRecord::try_from(row)?;
        info!("Saved student record {}", saved.uid);
        self.feed.publish(&saved);
        Ok(saved)
    }

    async fn get(&self, uid: &str) -> Result<Option<StudentRecord>, AppError> {
        let row: Option<StudentRow> = sqlx::query_as(
            "SELECT uid, name, email, branch, cgpa, resume_url, updated_at FROM students WHERE uid = $1",
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;

        row.map(StudentRecord::try_from).transpose()
    }

    async fn list_all(&self) -> Result<Vec<StudentRecord>, AppError> {
        let rows: Vec<StudentRow> = sqlx::query_as(
            "SELECT uid, name, email, branch, cgpa, resume_url, updated_at FROM students ORDER BY created_at ASC, uid ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StudentRecord::try_from).collect()
    }

    fn subscribe(&self, uid: &str) -> RecordSubscription {
        self.feed.subscribe(uid)
    }
}
