//! In-memory store for tests, with per-user read failure injection.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::journal::{DayRating, MoodSample, Victory};
use crate::models::report::{Feedback, Report, ReportKind, ReportSummary};
use crate::services::store::{
    JournalStore, ReportPage, ReportStore, StorageError, StorageResult, UserDirectory,
};

#[derive(Default)]
struct Tables {
    users: Vec<Uuid>,
    moods: Vec<MoodSample>,
    ratings: Vec<DayRating>,
    victories: Vec<Victory>,
    reports: HashMap<Uuid, Report>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    failing_users: Arc<Mutex<HashSet<Uuid>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user_id: Uuid) {
        self.tables.lock().await.users.push(user_id);
    }

    /// Journal reads for this user fail with `StorageError::Unavailable`.
    pub async fn fail_reads_for(&self, user_id: Uuid) {
        self.failing_users.lock().await.insert(user_id);
    }

    pub async fn push_mood(&self, sample: MoodSample) {
        self.tables.lock().await.moods.push(sample);
    }

    pub async fn push_rating(&self, rating: DayRating) {
        self.tables.lock().await.ratings.push(rating);
    }

    pub async fn push_victory(&self, victory: Victory) {
        self.tables.lock().await.victories.push(victory);
    }

    pub async fn reports_for(&self, user_id: Uuid) -> Vec<Report> {
        self.tables
            .lock()
            .await
            .reports
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }

    async fn check_readable(&self, user_id: Uuid) -> StorageResult<()> {
        if self.failing_users.lock().await.contains(&user_id) {
            return Err(StorageError::Unavailable(format!(
                "injected read failure for {}",
                user_id
            )));
        }
        Ok(())
    }
}

fn in_window(t: DateTime<Utc>, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
    from <= t && t <= to
}

#[async_trait]
impl JournalStore for MemoryStore {
    async fn mood_samples(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<Vec<MoodSample>> {
        self.check_readable(user_id).await?;
        let tables = self.tables.lock().await;
        Ok(tables
            .moods
            .iter()
            .filter(|m| m.user_id == user_id && in_window(m.created_at, from, to))
            .cloned()
            .collect())
    }

    async fn day_ratings(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<Vec<DayRating>> {
        self.check_readable(user_id).await?;
        let (from_day, to_day) = (from.date_naive(), to.date_naive());
        let tables = self.tables.lock().await;
        Ok(tables
            .ratings
            .iter()
            .filter(|r| r.user_id == user_id && from_day <= r.rating_date && r.rating_date <= to_day)
            .cloned()
            .collect())
    }

    async fn victories(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<Vec<Victory>> {
        self.check_readable(user_id).await?;
        let tables = self.tables.lock().await;
        Ok(tables
            .victories
            .iter()
            .filter(|v| v.user_id == user_id && in_window(v.created_at, from, to))
            .cloned()
            .collect())
    }

    async fn upsert_mood_sample(&self, sample: MoodSample) -> StorageResult<MoodSample> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables
            .moods
            .iter_mut()
            .find(|m| m.user_id == sample.user_id && m.entry_date == sample.entry_date)
        {
            existing.emotion = sample.emotion;
            existing.reason = sample.reason;
            existing.intensity = sample.intensity;
            if sample.note.is_some() {
                existing.note = sample.note;
            }
            return Ok(existing.clone());
        }
        tables.moods.push(sample.clone());
        Ok(sample)
    }

    async fn upsert_day_rating(&self, rating: DayRating) -> StorageResult<DayRating> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables
            .ratings
            .iter_mut()
            .find(|r| r.user_id == rating.user_id && r.rating_date == rating.rating_date)
        {
            existing.rating = rating.rating;
            existing.note = rating.note;
            return Ok(existing.clone());
        }
        tables.ratings.push(rating.clone());
        Ok(rating)
    }

    async fn insert_victory(&self, victory: Victory) -> StorageResult<Victory> {
        self.tables.lock().await.victories.push(victory.clone());
        Ok(victory)
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn all_user_ids(&self) -> StorageResult<Vec<Uuid>> {
        Ok(self.tables.lock().await.users.clone())
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn count_since(
        &self,
        user_id: Uuid,
        kind: ReportKind,
        since: DateTime<Utc>,
    ) -> StorageResult<i64> {
        let tables = self.tables.lock().await;
        let count = tables
            .reports
            .values()
            .filter(|r| r.user_id == user_id && r.kind == kind && r.created_at >= since)
            .count();
        Ok(count as i64)
    }

    async fn insert(&self, report: Report) -> StorageResult<Report> {
        self.tables
            .lock()
            .await
            .reports
            .insert(report.id, report.clone());
        Ok(report)
    }

    async fn list(
        &self,
        user_id: Uuid,
        kind: Option<ReportKind>,
        offset: i64,
        limit: i64,
    ) -> StorageResult<ReportPage> {
        let tables = self.tables.lock().await;
        let mut owned: Vec<&Report> = tables
            .reports
            .values()
            .filter(|r| r.user_id == user_id && kind.map_or(true, |k| r.kind == k))
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = owned.len() as i64;
        let reports = owned
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(ReportSummary::from)
            .collect();
        Ok(ReportPage { reports, total })
    }

    async fn latest(&self, user_id: Uuid) -> StorageResult<Option<Report>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .reports
            .values()
            .filter(|r| r.user_id == user_id)
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
            .cloned())
    }

    async fn find(&self, user_id: Uuid, report_id: Uuid) -> StorageResult<Option<Report>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .reports
            .get(&report_id)
            .filter(|r| r.user_id == user_id)
            .cloned())
    }

    async fn mark_viewed(
        &self,
        user_id: Uuid,
        report_id: Uuid,
        at: DateTime<Utc>,
    ) -> StorageResult<Option<Report>> {
        let mut tables = self.tables.lock().await;
        let Some(report) = tables
            .reports
            .get_mut(&report_id)
            .filter(|r| r.user_id == user_id)
        else {
            return Ok(None);
        };
        report.viewed = true;
        report.viewed_at.get_or_insert(at);
        Ok(Some(report.clone()))
    }

    async fn set_feedback(
        &self,
        user_id: Uuid,
        report_id: Uuid,
        feedback: Feedback,
    ) -> StorageResult<bool> {
        let mut tables = self.tables.lock().await;
        match tables
            .reports
            .get_mut(&report_id)
            .filter(|r| r.user_id == user_id)
        {
            Some(report) => {
                report.feedback = Some(feedback);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, user_id: Uuid, report_id: Uuid) -> StorageResult<bool> {
        let mut tables = self.tables.lock().await;
        let owned = tables
            .reports
            .get(&report_id)
            .map_or(false, |r| r.user_id == user_id);
        if owned {
            tables.reports.remove(&report_id);
        }
        Ok(owned)
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}
