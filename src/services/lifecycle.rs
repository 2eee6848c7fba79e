use std::sync::Arc;

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use crate::models::report::{Feedback, NewReport, Report, ReportKind, ReportListResponse};
use crate::services::store::{ReportStore, StorageError};

pub const DEFAULT_DAILY_QUOTA: i64 = 3;
pub const MAX_PAGE_SIZE: i64 = 50;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Not enough data to generate a report (need at least {required} entries)")]
    InsufficientData { required: usize },

    #[error("You can generate at most {limit} reports per day")]
    QuotaExceeded { limit: i64 },

    #[error("Report not found")]
    NotFound,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type ReportResult<T> = Result<T, ReportError>;

/// Owner-scoped report lifecycle on top of a [`ReportStore`].
#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn ReportStore>,
    daily_quota: i64,
}

impl ReportService {
    pub fn new(store: Arc<dyn ReportStore>, daily_quota: i64) -> Self {
        Self { store, daily_quota }
    }

    /// Rejects once the user already has `daily_quota` on-demand reports
    /// created since UTC midnight.
    ///
    /// Count-then-insert is not atomic: two concurrent requests can both pass.
    pub async fn ensure_quota(&self, user_id: Uuid, now: DateTime<Utc>) -> ReportResult<()> {
        let midnight = Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN));
        let created_today = self
            .store
            .count_since(user_id, ReportKind::OnDemand, midnight)
            .await?;

        if created_today >= self.daily_quota {
            tracing::info!(user_id = %user_id, created_today, "On-demand report quota reached");
            return Err(ReportError::QuotaExceeded {
                limit: self.daily_quota,
            });
        }
        Ok(())
    }

    pub async fn create_report(&self, new: NewReport, now: DateTime<Utc>) -> ReportResult<Report> {
        if new.kind == ReportKind::OnDemand {
            self.ensure_quota(new.user_id, now).await?;
        }
        if new.stats.mood_entries == 0 && new.stats.total_ratings == 0 {
            return Err(ReportError::InsufficientData { required: 1 });
        }

        let report = Report {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            kind: new.kind,
            period_start: new.period_start,
            period_end: new.period_end,
            content: new.content,
            stats: new.stats,
            generation: new.generation,
            viewed: false,
            viewed_at: None,
            feedback: None,
            created_at: now,
        };
        let report = self.store.insert(report).await?;

        tracing::info!(
            user_id = %report.user_id,
            report_id = %report.id,
            kind = %report.kind,
            model = %report.generation.model,
            generation_ms = report.generation.generation_ms,
            "Report created"
        );
        Ok(report)
    }

    /// `page` is 1-based; `page_size` is clamped to `1..=MAX_PAGE_SIZE`.
    /// Pages past the end come back empty.
    pub async fn list_reports(
        &self,
        user_id: Uuid,
        kind: Option<ReportKind>,
        page: i64,
        page_size: i64,
    ) -> ReportResult<ReportListResponse> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);

        let listing = self
            .store
            .list(user_id, kind, (page - 1).saturating_mul(page_size), page_size)
            .await?;

        Ok(ReportListResponse {
            pages: (listing.total + page_size - 1) / page_size,
            reports: listing.reports,
            total: listing.total,
            page,
        })
    }

    pub async fn get_latest(&self, user_id: Uuid) -> ReportResult<Option<Report>> {
        Ok(self.store.latest(user_id).await?)
    }

    pub async fn get_by_id(&self, user_id: Uuid, report_id: Uuid) -> ReportResult<Report> {
        self.store
            .find(user_id, report_id)
            .await?
            .ok_or(ReportError::NotFound)
    }

    pub async fn mark_viewed(
        &self,
        user_id: Uuid,
        report_id: Uuid,
        now: DateTime<Utc>,
    ) -> ReportResult<Report> {
        self.store
            .mark_viewed(user_id, report_id, now)
            .await?
            .ok_or(ReportError::NotFound)
    }

    pub async fn submit_feedback(
        &self,
        user_id: Uuid,
        report_id: Uuid,
        helpful: bool,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> ReportResult<()> {
        let feedback = Feedback {
            helpful,
            comment: comment.filter(|c| !c.trim().is_empty()),
            submitted_at: now,
        };
        if self.store.set_feedback(user_id, report_id, feedback).await? {
            Ok(())
        } else {
            Err(ReportError::NotFound)
        }
    }

    pub async fn delete_report(&self, user_id: Uuid, report_id: Uuid) -> ReportResult<()> {
        if self.store.delete(user_id, report_id).await? {
            tracing::info!(user_id = %user_id, report_id = %report_id, "Report deleted");
            Ok(())
        } else {
            Err(ReportError::NotFound)
        }
    }

    pub async fn ping(&self) -> ReportResult<()> {
        Ok(self.store.ping().await?)
    }
}
