use std::time::Instant;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use crate::models::report::{
    GenerationMeta, NewReport, Report, ReportKind, ReportPeriod, StatsSnapshot,
};
use crate::models::stats::AggregatedStats;
use crate::services::aggregator::Aggregator;
use crate::services::generator::{ContentGenerator, Generated};
use crate::services::lifecycle::{ReportError, ReportResult, ReportService};

/// Scheduled reports are skipped below this many mood samples in the window.
pub const WEEKLY_MIN_MOOD_SAMPLES: usize = 3;

/// Aggregate, generate, persist. Shared by the HTTP handlers and the scheduler.
#[derive(Clone)]
pub struct ReportPipeline {
    aggregator: Aggregator,
    generator: ContentGenerator,
    reports: ReportService,
}

impl ReportPipeline {
    pub fn new(aggregator: Aggregator, generator: ContentGenerator, reports: ReportService) -> Self {
        Self {
            aggregator,
            generator,
            reports,
        }
    }

    pub fn generator(&self) -> &ContentGenerator {
        &self.generator
    }

    /// User-triggered report. The quota is checked before any data is read so
    /// a rejected request never reaches the model.
    pub async fn generate_on_demand(
        &self,
        user_id: Uuid,
        period: ReportPeriod,
        now: DateTime<Utc>,
    ) -> ReportResult<Report> {
        self.reports.ensure_quota(user_id, now).await?;

        let started = Instant::now();
        let period_start = window_start(period, now);
        let stats = self.aggregator.aggregate(user_id, period_start, now).await?;
        if !stats.has_mood_or_rating() {
            return Err(ReportError::InsufficientData { required: 1 });
        }

        let generated = self.generator.generate(&stats, period.phrasing()).await;
        self.persist(user_id, ReportKind::OnDemand, &stats, generated, started, now)
            .await
    }

    /// Trailing 7-day report used by the scheduler.
    pub async fn generate_weekly(&self, user_id: Uuid, now: DateTime<Utc>) -> ReportResult<Report> {
        let started = Instant::now();
        let period_start = now - Duration::days(7);
        let stats = self.aggregator.aggregate(user_id, period_start, now).await?;
        if stats.total_mood_entries < WEEKLY_MIN_MOOD_SAMPLES {
            return Err(ReportError::InsufficientData {
                required: WEEKLY_MIN_MOOD_SAMPLES,
            });
        }

        let generated = self.generator.generate(&stats, ReportKind::Weekly).await;
        self.persist(user_id, ReportKind::Weekly, &stats, generated, started, now)
            .await
    }

    async fn persist(
        &self,
        user_id: Uuid,
        kind: ReportKind,
        stats: &AggregatedStats,
        generated: Generated,
        started: Instant,
        now: DateTime<Utc>,
    ) -> ReportResult<Report> {
        let new = NewReport {
            user_id,
            kind,
            period_start: stats.period_start,
            period_end: stats.period_end,
            content: generated.content,
            stats: StatsSnapshot::from(stats),
            generation: GenerationMeta {
                model: generated.model,
                used_external_model: generated.used_external_model,
                generation_ms: started.elapsed().as_millis() as i64,
            },
        };
        self.reports.create_report(new, now).await
    }
}

/// `Week` is the trailing 7 days; `Month` starts on the first day of the
/// previous calendar month.
pub fn window_start(period: ReportPeriod, now: DateTime<Utc>) -> DateTime<Utc> {
    match period {
        ReportPeriod::Week => now - Duration::days(7),
        ReportPeriod::Month => {
            let (year, month) = if now.month() == 1 {
                (now.year() - 1, 12)
            } else {
                (now.year(), now.month() - 1)
            };
            NaiveDate::from_ymd_opt(year, month, 1)
                .map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)))
                .unwrap_or(now - Duration::days(31))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::aggregator::tests::{at, mood, rating};
    use crate::services::generator::tests::StubClient;
    use crate::services::generator::{ExternalModelStrategy, TEMPLATE_MODEL};
    use crate::services::lifecycle::DEFAULT_DAILY_QUOTA;
    use crate::services::memory::MemoryStore;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn pipeline_with(store: &MemoryStore, generator: ContentGenerator) -> ReportPipeline {
        ReportPipeline::new(
            Aggregator::new(Arc::new(store.clone())),
            generator,
            ReportService::new(Arc::new(store.clone()), DEFAULT_DAILY_QUOTA),
        )
    }

    #[test]
    fn test_month_window_starts_on_first_of_previous_month() {
        assert_eq!(
            window_start(ReportPeriod::Month, at(17, 12)),
            Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap()
        );
        let january = Utc.with_ymd_and_hms(2027, 1, 15, 8, 0, 0).unwrap();
        assert_eq!(
            window_start(ReportPeriod::Month, january),
            Utc.with_ymd_and_hms(2026, 12, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(window_start(ReportPeriod::Week, at(17, 12)), at(10, 12));
    }

    #[tokio::test]
    async fn test_on_demand_report_from_a_single_rating() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store.push_rating(rating(user, 7, 4)).await;
        let pipeline = pipeline_with(&store, ContentGenerator::template_only());

        let report = pipeline
            .generate_on_demand(user, ReportPeriod::Week, at(8, 12))
            .await
            .unwrap();
        assert_eq!(report.kind, ReportKind::OnDemand);
        assert_eq!(report.stats.total_ratings, 1);
        assert_eq!(report.generation.model, TEMPLATE_MODEL);
        assert!(!report.generation.used_external_model);
        assert_eq!(report.period_end, at(8, 12));
        assert_eq!(report.period_start, at(1, 12));
    }

    #[tokio::test]
    async fn test_on_demand_without_data_is_rejected() {
        let store = MemoryStore::new();
        let pipeline = pipeline_with(&store, ContentGenerator::template_only());

        let result = pipeline
            .generate_on_demand(Uuid::new_v4(), ReportPeriod::Week, at(8, 12))
            .await;
        assert!(matches!(result, Err(ReportError::InsufficientData { required: 1 })));
    }

    #[tokio::test]
    async fn test_over_quota_request_never_calls_the_model() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store.push_mood(mood(user, at(7, 9), "happy", Some(7))).await;
        let client = Arc::new(StubClient::replying(r#"{"summary": "fine"}"#));
        let pipeline = pipeline_with(
            &store,
            ContentGenerator::with_external(ExternalModelStrategy::new(client.clone(), "m".into())),
        );

        for hour in 9..12 {
            pipeline
                .generate_on_demand(user, ReportPeriod::Week, at(8, hour))
                .await
                .unwrap();
        }
        let result = pipeline
            .generate_on_demand(user, ReportPeriod::Week, at(8, 12))
            .await;
        assert!(matches!(result, Err(ReportError::QuotaExceeded { .. })));
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_month_request_is_worded_as_a_month() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store.push_mood(mood(user, at(7, 9), "calm", Some(6))).await;
        let client = Arc::new(StubClient::replying(r#"{"summary": "fine"}"#));
        let pipeline = pipeline_with(
            &store,
            ContentGenerator::with_external(ExternalModelStrategy::new(client.clone(), "m".into())),
        );

        let report = pipeline
            .generate_on_demand(user, ReportPeriod::Month, at(8, 12))
            .await
            .unwrap();
        assert_eq!(report.kind, ReportKind::OnDemand);

        let prompts = client.prompts.lock().unwrap();
        let first_line = prompts[0].lines().next().unwrap();
        assert!(first_line.contains("month"), "{first_line}");
    }

    #[tokio::test]
    async fn test_template_wording_follows_requested_period() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store.push_mood(mood(user, at(7, 9), "calm", Some(6))).await;
        let pipeline = pipeline_with(&store, ContentGenerator::template_only());

        let month = pipeline
            .generate_on_demand(user, ReportPeriod::Month, at(8, 12))
            .await
            .unwrap();
        assert!(month.content.summary.starts_with("This month"));

        let week = pipeline
            .generate_on_demand(user, ReportPeriod::Week, at(8, 13))
            .await
            .unwrap();
        assert!(week.content.summary.starts_with("This week"));
        assert_eq!(week.kind, ReportKind::OnDemand);
    }

    #[tokio::test]
    async fn test_weekly_needs_three_mood_samples() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store.push_mood(mood(user, at(5, 9), "calm", Some(5))).await;
        store.push_mood(mood(user, at(6, 9), "calm", Some(5))).await;
        store.push_rating(rating(user, 6, 4)).await;
        let pipeline = pipeline_with(&store, ContentGenerator::template_only());

        let result = pipeline.generate_weekly(user, at(8, 20)).await;
        assert!(matches!(result, Err(ReportError::InsufficientData { required: 3 })));

        store.push_mood(mood(user, at(7, 9), "happy", Some(7))).await;
        let report = pipeline.generate_weekly(user, at(8, 20)).await.unwrap();
        assert_eq!(report.kind, ReportKind::Weekly);
        assert_eq!(report.stats.mood_entries, 3);
    }
}
