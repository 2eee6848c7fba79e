use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use serde::Serialize;

use crate::services::lifecycle::ReportError;
use crate::services::pipeline::ReportPipeline;
use crate::services::store::{StorageResult, UserDirectory};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Weekly batch of reports for every known user.
#[derive(Clone)]
pub struct ReportScheduler {
    pipeline: ReportPipeline,
    users: Arc<dyn UserDirectory>,
    hour_utc: u32,
}

impl ReportScheduler {
    pub fn new(pipeline: ReportPipeline, users: Arc<dyn UserDirectory>, hour_utc: u32) -> Self {
        Self {
            pipeline,
            users,
            hour_utc: hour_utc.min(23),
        }
    }

    /// Runs users one at a time. A failure for one user is logged and counted,
    /// never propagated; only failing to list users aborts the pass.
    pub async fn run_scheduled_pass(&self, now: DateTime<Utc>) -> StorageResult<PassSummary> {
        let user_ids = self.users.all_user_ids().await?;
        let mut summary = PassSummary::default();

        for user_id in user_ids {
            match self.pipeline.generate_weekly(user_id, now).await {
                Ok(report) => {
                    tracing::debug!(user_id = %user_id, report_id = %report.id, "Weekly report generated");
                    summary.generated += 1;
                }
                Err(ReportError::InsufficientData { .. }) => {
                    summary.skipped += 1;
                }
                Err(e) => {
                    tracing::error!(user_id = %user_id, error = %e, "Weekly report failed");
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            generated = summary.generated,
            skipped = summary.skipped,
            failed = summary.failed,
            "Weekly report pass finished"
        );
        Ok(summary)
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let next = next_firing(now, self.hour_utc);
                tracing::info!(next_run = %next, "Weekly report scheduler waiting");

                let wait = (next - now).to_std().unwrap_or_default();
                tokio::time::sleep(wait).await;

                if let Err(e) = self.run_scheduled_pass(Utc::now()).await {
                    tracing::error!(error = %e, "Weekly report pass could not list users");
                }
            }
        })
    }
}

/// Next Sunday at `hour_utc:00` strictly after `after`.
pub fn next_firing(after: DateTime<Utc>, hour_utc: u32) -> DateTime<Utc> {
    let date = after.date_naive();
    let days_to_sunday = (7 - date.weekday().num_days_from_sunday()) % 7;
    let time = NaiveTime::from_hms_opt(hour_utc, 0, 0).unwrap_or(NaiveTime::MIN);

    let candidate = Utc.from_utc_datetime(
        &(date + Duration::days(i64::from(days_to_sunday))).and_time(time),
    );
    if candidate > after {
        candidate
    } else {
        candidate + Duration::days(7)
    }
}
