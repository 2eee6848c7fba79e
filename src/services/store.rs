//! Storage ports used by the report pipeline.
//!
//! The Postgres implementations live in `crate::db`; tests run against the
//! in-memory store in `services::memory`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::journal::{DayRating, MoodSample, Victory};
use crate::models::report::{Feedback, Report, ReportKind, ReportSummary};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Per-user time series: mood samples, day ratings and victories.
///
/// Range reads are inclusive on both ends.
#[async_trait]
pub trait JournalStore: Send + Sync {
    async fn mood_samples(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<Vec<MoodSample>>;

    async fn day_ratings(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<Vec<DayRating>>;

    async fn victories(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<Vec<Victory>>;

    /// Inserts, or overwrites the sample already logged for the same day.
    /// An existing note is kept when the new sample carries none.
    async fn upsert_mood_sample(&self, sample: MoodSample) -> StorageResult<MoodSample>;

    async fn upsert_day_rating(&self, rating: DayRating) -> StorageResult<DayRating>;

    async fn insert_victory(&self, victory: Victory) -> StorageResult<Victory>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn all_user_ids(&self) -> StorageResult<Vec<Uuid>>;
}

#[derive(Debug, Clone)]
pub struct ReportPage {
    pub reports: Vec<ReportSummary>,
    pub total: i64,
}

/// Report persistence. Every lookup is scoped to the owner; a report that
/// belongs to someone else behaves exactly like a missing one.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn count_since(
        &self,
        user_id: Uuid,
        kind: ReportKind,
        since: DateTime<Utc>,
    ) -> StorageResult<i64>;

    async fn insert(&self, report: Report) -> StorageResult<Report>;

    /// Newest first.
    async fn list(
        &self,
        user_id: Uuid,
        kind: Option<ReportKind>,
        offset: i64,
        limit: i64,
    ) -> StorageResult<ReportPage>;

    async fn latest(&self, user_id: Uuid) -> StorageResult<Option<Report>>;

    async fn find(&self, user_id: Uuid, report_id: Uuid) -> StorageResult<Option<Report>>;

    /// Sets `viewed`, and `viewed_at` only if it was never set.
    async fn mark_viewed(
        &self,
        user_id: Uuid,
        report_id: Uuid,
        at: DateTime<Utc>,
    ) -> StorageResult<Option<Report>>;

    /// Replaces any earlier feedback. Returns false when no owned report matched.
    async fn set_feedback(
        &self,
        user_id: Uuid,
        report_id: Uuid,
        feedback: Feedback,
    ) -> StorageResult<bool>;

    async fn delete(&self, user_id: Uuid, report_id: Uuid) -> StorageResult<bool>;

    async fn ping(&self) -> StorageResult<()>;
}
