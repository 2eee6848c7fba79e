use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label used when a window has no mood samples to pick a dominant emotion from.
pub const UNKNOWN_MOOD: &str = "unknown";

pub const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    #[default]
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Declining => "declining",
            Trend::Stable => "stable",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reduction of one user's mood samples, day ratings and victories over a
/// window. Never stored on its own; reports keep a [`StatsSnapshot`] of it.
///
/// [`StatsSnapshot`]: crate::models::report::StatsSnapshot
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AggregatedStats {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,

    pub total_mood_entries: usize,
    pub average_intensity: f64,
    pub mood_distribution: BTreeMap<String, usize>,
    pub reason_distribution: BTreeMap<String, usize>,
    pub most_common_mood: String,
    pub most_common_reason: Option<String>,
    pub trend: Trend,

    pub total_ratings: usize,
    pub average_rating: f64,
    pub best_day: Option<String>,
    pub worst_day: Option<String>,

    pub total_victories: usize,
    pub victories_by_category: BTreeMap<String, usize>,

    /// Average intensity per weekday, Sunday = 0. `None` for days without samples.
    pub weekday_averages: [Option<f64>; 7],

    pub recent_notes: Vec<String>,
    pub recent_victories: Vec<String>,
}

impl AggregatedStats {
    pub fn has_mood_or_rating(&self) -> bool {
        self.total_mood_entries > 0 || self.total_ratings > 0
    }
}
