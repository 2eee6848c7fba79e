use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::journal::{DayRating, MoodSample, Victory};
use crate::services::store::{JournalStore, StorageResult, UserDirectory};

#[derive(Clone)]
pub struct PgJournal {
    pool: PgPool,
}

impl PgJournal {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Mirrors the account id locally so journal rows and reports can reference it.
    async fn ensure_user(&self, user_id: Uuid) -> StorageResult<()> {
        sqlx::query("INSERT INTO users (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl JournalStore for PgJournal {
    async fn mood_samples(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<Vec<MoodSample>> {
        let rows = sqlx::query_as::<_, MoodSample>(
            r#"
            SELECT id, user_id, entry_date, emotion, reason, intensity, note, created_at
            FROM mood_entries
            WHERE user_id = $1 AND created_at BETWEEN $2 AND $3
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn day_ratings(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<Vec<DayRating>> {
        let rows = sqlx::query_as::<_, DayRating>(
            r#"
            SELECT id, user_id, rating_date, rating, note, created_at
            FROM day_ratings
            WHERE user_id = $1 AND rating_date BETWEEN $2 AND $3
            ORDER BY rating_date DESC
            "#,
        )
        .bind(user_id)
        .bind(from.date_naive())
        .bind(to.date_naive())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn victories(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<Vec<Victory>> {
        let rows = sqlx::query_as::<_, Victory>(
            r#"
            SELECT id, user_id, text, category, victory_date, created_at
            FROM victories
            WHERE user_id = $1 AND created_at BETWEEN $2 AND $3
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn upsert_mood_sample(&self, sample: MoodSample) -> StorageResult<MoodSample> {
        self.ensure_user(sample.user_id).await?;

        let row = sqlx::query_as::<_, MoodSample>(
            r#"
            INSERT INTO mood_entries (id, user_id, entry_date, emotion, reason, intensity, note, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, entry_date) DO UPDATE SET
                emotion = EXCLUDED.emotion,
                reason = EXCLUDED.reason,
                intensity = EXCLUDED.intensity,
                note = COALESCE(EXCLUDED.note, mood_entries.note)
            RETURNING id, user_id, entry_date, emotion, reason, intensity, note, created_at
            "#,
        )
        .bind(sample.id)
        .bind(sample.user_id)
        .bind(sample.entry_date)
        .bind(&sample.emotion)
        .bind(&sample.reason)
        .bind(sample.intensity)
        .bind(&sample.note)
        .bind(sample.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn upsert_day_rating(&self, rating: DayRating) -> StorageResult<DayRating> {
        self.ensure_user(rating.user_id).await?;

        let row = sqlx::query_as::<_, DayRating>(
            r#"
            INSERT INTO day_ratings (id, user_id, rating_date, rating, note, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, rating_date) DO UPDATE SET
                rating = EXCLUDED.rating,
                note = EXCLUDED.note
            RETURNING id, user_id, rating_date, rating, note, created_at
            "#,
        )
        .bind(rating.id)
        .bind(rating.user_id)
        .bind(rating.rating_date)
        .bind(rating.rating)
        .bind(&rating.note)
        .bind(rating.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_victory(&self, victory: Victory) -> StorageResult<Victory> {
        self.ensure_user(victory.user_id).await?;

        let row = sqlx::query_as::<_, Victory>(
            r#"
            INSERT INTO victories (id, user_id, text, category, victory_date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, text, category, victory_date, created_at
            "#,
        )
        .bind(victory.id)
        .bind(victory.user_id)
        .bind(&victory.text)
        .bind(&victory.category)
        .bind(&victory.victory_date)
        .bind(victory.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl UserDirectory for PgJournal {
    async fn all_user_ids(&self) -> StorageResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}
