use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::stats::{AggregatedStats, Trend};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReportKind {
    #[serde(rename = "weekly")]
    Weekly,
    #[serde(rename = "monthly")]
    Monthly,
    #[serde(rename = "on-demand")]
    OnDemand,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Weekly => "weekly",
            ReportKind::Monthly => "monthly",
            ReportKind::OnDemand => "on-demand",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(ReportKind::Weekly),
            "monthly" => Ok(ReportKind::Monthly),
            "on-demand" => Ok(ReportKind::OnDemand),
            other => Err(format!("unknown report kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PatternCategory {
    Positive,
    Neutral,
    Concern,
}

impl PatternCategory {
    /// Lenient mapping for model output; anything unrecognised is neutral.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" => PatternCategory::Positive,
            "concern" => PatternCategory::Concern,
            _ => PatternCategory::Neutral,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternEntry {
    pub title: String,
    pub description: String,
    pub category: PatternCategory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Suggestion {
    pub title: String,
    pub description: String,
    pub category: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReportContent {
    pub summary: String,
    pub patterns: Vec<PatternEntry>,
    pub strengths: Vec<String>,
    pub suggestions: Vec<Suggestion>,
    pub affirmation: String,
}

/// The part of [`AggregatedStats`] frozen into a report at generation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatsSnapshot {
    pub mood_entries: usize,
    pub average_intensity: f64,
    pub total_ratings: usize,
    pub average_rating: f64,
    pub victories: usize,
    pub most_common_mood: String,
    pub trend: Trend,
}

impl From<&AggregatedStats> for StatsSnapshot {
    fn from(stats: &AggregatedStats) -> Self {
        Self {
            mood_entries: stats.total_mood_entries,
            average_intensity: stats.average_intensity,
            total_ratings: stats.total_ratings,
            average_rating: stats.average_rating,
            victories: stats.total_victories,
            most_common_mood: stats.most_common_mood.clone(),
            trend: stats.trend,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationMeta {
    /// Model identifier, or `"template"` when the template strategy produced the content.
    pub model: String,
    pub used_external_model: bool,
    pub generation_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    pub helpful: bool,
    pub comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: ReportKind,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub content: ReportContent,
    pub stats: StatsSnapshot,
    pub generation: GenerationMeta,
    pub viewed: bool,
    pub viewed_at: Option<DateTime<Utc>>,
    pub feedback: Option<Feedback>,
    pub created_at: DateTime<Utc>,
}

/// List-view projection of a report; the generated content is left out.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReportSummary {
    pub id: Uuid,
    pub kind: ReportKind,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub stats: StatsSnapshot,
    pub viewed: bool,
    pub has_feedback: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Report> for ReportSummary {
    fn from(r: &Report) -> Self {
        Self {
            id: r.id,
            kind: r.kind,
            period_start: r.period_start,
            period_end: r.period_end,
            stats: r.stats.clone(),
            viewed: r.viewed,
            has_feedback: r.feedback.is_some(),
            created_at: r.created_at,
        }
    }
}

/// Everything the pipeline hands to the store to create a report.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub user_id: Uuid,
    pub kind: ReportKind,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub content: ReportContent,
    pub stats: StatsSnapshot,
    pub generation: GenerationMeta,
}

/// Window requested for an on-demand report.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    #[default]
    Week,
    Month,
}

impl ReportPeriod {
    /// Kind whose wording the generator uses. The report itself is still
    /// stored as on-demand.
    pub fn phrasing(self) -> ReportKind {
        match self {
            ReportPeriod::Week => ReportKind::Weekly,
            ReportPeriod::Month => ReportKind::Monthly,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateReportRequest {
    #[serde(default)]
    pub period: ReportPeriod,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FeedbackRequest {
    pub helpful: bool,
    #[validate(length(max = 500, message = "Comment must be at most 500 characters"))]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReportListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<ReportKind>,
}

#[derive(Debug, Serialize)]
pub struct ReportListResponse {
    pub reports: Vec<ReportSummary>,
    pub total: i64,
    pub page: i64,
    pub pages: i64,
}

#[derive(Debug, Serialize)]
pub struct GenerationStatusResponse {
    pub ai_enabled: bool,
    pub model: String,
}
