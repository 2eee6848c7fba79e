use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::report::{
    Feedback, GenerationMeta, Report, ReportContent, ReportKind, ReportSummary, StatsSnapshot,
};
use crate::services::store::{ReportPage, ReportStore, StorageError, StorageResult};

const REPORT_COLUMNS: &str = "id, user_id, kind, period_start, period_end, content, stats, \
     model, used_external_model, generation_ms, viewed, viewed_at, \
     feedback_helpful, feedback_comment, feedback_submitted_at, created_at";

#[derive(FromRow)]
struct ReportRow {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    content: Json<ReportContent>,
    stats: Json<StatsSnapshot>,
    model: String,
    used_external_model: bool,
    generation_ms: i64,
    viewed: bool,
    viewed_at: Option<DateTime<Utc>>,
    feedback_helpful: Option<bool>,
    feedback_comment: Option<String>,
    feedback_submitted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReportRow> for Report {
    type Error = StorageError;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        let feedback = match (row.feedback_helpful, row.feedback_submitted_at) {
            (Some(helpful), Some(submitted_at)) => Some(Feedback {
                helpful,
                comment: row.feedback_comment,
                submitted_at,
            }),
            _ => None,
        };

        Ok(Report {
            id: row.id,
            user_id: row.user_id,
            kind: row.kind.parse().map_err(StorageError::Corrupt)?,
            period_start: row.period_start,
            period_end: row.period_end,
            content: row.content.0,
            stats: row.stats.0,
            generation: GenerationMeta {
                model: row.model,
                used_external_model: row.used_external_model,
                generation_ms: row.generation_ms,
            },
            viewed: row.viewed,
            viewed_at: row.viewed_at,
            feedback,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct SummaryRow {
    id: Uuid,
    kind: String,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    stats: Json<StatsSnapshot>,
    viewed: bool,
    has_feedback: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<SummaryRow> for ReportSummary {
    type Error = StorageError;

    fn try_from(row: SummaryRow) -> Result<Self, Self::Error> {
        Ok(ReportSummary {
            id: row.id,
            kind: row.kind.parse().map_err(StorageError::Corrupt)?,
            period_start: row.period_start,
            period_end: row.period_end,
            stats: row.stats.0,
            viewed: row.viewed,
            has_feedback: row.has_feedback,
            created_at: row.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_owned(&self, sql: &str, user_id: Uuid, report_id: Uuid) -> StorageResult<Option<Report>> {
        sqlx::query_as::<_, ReportRow>(sql)
            .bind(report_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Report::try_from)
            .transpose()
    }
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn count_since(
        &self,
        user_id: Uuid,
        kind: ReportKind,
        since: DateTime<Utc>,
    ) -> StorageResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reports WHERE user_id = $1 AND kind = $2 AND created_at >= $3",
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn insert(&self, report: Report) -> StorageResult<Report> {
        let sql = format!(
            r#"
            INSERT INTO reports (
                id, user_id, kind, period_start, period_end, content, stats,
                model, used_external_model, generation_ms, viewed, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, false, $11)
            RETURNING {}
            "#,
            REPORT_COLUMNS
        );
        let row = sqlx::query_as::<_, ReportRow>(&sql)
            .bind(report.id)
            .bind(report.user_id)
            .bind(report.kind.as_str())
            .bind(report.period_start)
            .bind(report.period_end)
            .bind(Json(&report.content))
            .bind(Json(&report.stats))
            .bind(&report.generation.model)
            .bind(report.generation.used_external_model)
            .bind(report.generation.generation_ms)
            .bind(report.created_at)
            .fetch_one(&self.pool)
            .await?;
        Report::try_from(row)
    }

    async fn list(
        &self,
        user_id: Uuid,
        kind: Option<ReportKind>,
        offset: i64,
        limit: i64,
    ) -> StorageResult<ReportPage> {
        let kind = kind.map(|k| k.as_str());

        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT id, kind, period_start, period_end, stats, viewed,
                   feedback_submitted_at IS NOT NULL AS has_feedback, created_at
            FROM reports
            WHERE user_id = $1 AND ($2::text IS NULL OR kind = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reports WHERE user_id = $1 AND ($2::text IS NULL OR kind = $2)",
        )
        .bind(user_id)
        .bind(kind)
        .fetch_one(&self.pool)
        .await?;

        let reports = rows
            .into_iter()
            .map(ReportSummary::try_from)
            .collect::<StorageResult<Vec<_>>>()?;
        Ok(ReportPage { reports, total })
    }

    async fn latest(&self, user_id: Uuid) -> StorageResult<Option<Report>> {
        let sql = format!(
            "SELECT {} FROM reports WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1",
            REPORT_COLUMNS
        );
        sqlx::query_as::<_, ReportRow>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Report::try_from)
            .transpose()
    }

    async fn find(&self, user_id: Uuid, report_id: Uuid) -> StorageResult<Option<Report>> {
        let sql = format!(
            "SELECT {} FROM reports WHERE id = $1 AND user_id = $2",
            REPORT_COLUMNS
        );
        self.fetch_owned(&sql, user_id, report_id).await
    }

    async fn mark_viewed(
        &self,
        user_id: Uuid,
        report_id: Uuid,
        at: DateTime<Utc>,
    ) -> StorageResult<Option<Report>> {
        let sql = format!(
            r#"
            UPDATE reports SET
                viewed = true,
                viewed_at = COALESCE(viewed_at, $3)
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            REPORT_COLUMNS
        );
        sqlx::query_as::<_, ReportRow>(&sql)
            .bind(report_id)
            .bind(user_id)
            .bind(at)
            .fetch_optional(&self.pool)
            .await?
            .map(Report::try_from)
            .transpose()
    }

    async fn set_feedback(
        &self,
        user_id: Uuid,
        report_id: Uuid,
        feedback: Feedback,
    ) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reports SET
                feedback_helpful = $3,
                feedback_comment = $4,
                feedback_submitted_at = $5
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(report_id)
        .bind(user_id)
        .bind(feedback.helpful)
        .bind(&feedback.comment)
        .bind(feedback.submitted_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, user_id: Uuid, report_id: Uuid) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM reports WHERE id = $1 AND user_id = $2")
            .bind(report_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> StorageResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}
