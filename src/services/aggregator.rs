use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::journal::{DayRating, MoodSample, Victory};
use crate::models::stats::{AggregatedStats, Trend, UNKNOWN_MOOD};
use crate::services::store::{JournalStore, StorageResult};

/// Fewer samples than this and the trend is reported as stable.
pub const MIN_TREND_SAMPLES: usize = 4;
/// Half-window mean difference (1-10 scale) that still counts as stable.
pub const TREND_DEADBAND: f64 = 0.5;
pub const MAX_RECENT_NOTES: usize = 5;
pub const MAX_RECENT_VICTORIES: usize = 3;

#[derive(Clone)]
pub struct Aggregator {
    journal: Arc<dyn JournalStore>,
}

impl Aggregator {
    pub fn new(journal: Arc<dyn JournalStore>) -> Self {
        Self { journal }
    }

    /// Reads the three series for `[from, to]` concurrently and reduces them.
    /// Storage errors are returned as-is.
    pub async fn aggregate(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<AggregatedStats> {
        let (moods, ratings, victories) = tokio::try_join!(
            self.journal.mood_samples(user_id, from, to),
            self.journal.day_ratings(user_id, from, to),
            self.journal.victories(user_id, from, to),
        )?;

        Ok(reduce(from, to, moods, ratings, victories))
    }
}

/// Pure reduction. Input order does not matter; everything is re-sorted so
/// the same records always give the same stats.
pub fn reduce(
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    mut moods: Vec<MoodSample>,
    mut ratings: Vec<DayRating>,
    mut victories: Vec<Victory>,
) -> AggregatedStats {
    // newest first
    moods.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    ratings.sort_by(|a, b| b.rating_date.cmp(&a.rating_date).then(b.id.cmp(&a.id)));
    victories.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

    let (mood_distribution, most_common_mood) =
        tally(moods.iter().map(|m| m.emotion.as_str()));
    let (reason_distribution, most_common_reason) = tally(
        moods
            .iter()
            .filter_map(|m| m.reason.as_deref())
            .filter(|r| !r.is_empty()),
    );
    let (victories_by_category, _) = tally(victories.iter().map(|v| {
        if v.category.is_empty() {
            "general"
        } else {
            v.category.as_str()
        }
    }));

    let intensities: Vec<f64> = moods.iter().map(MoodSample::effective_intensity).collect();
    let oldest_first: Vec<f64> = intensities.iter().rev().copied().collect();

    let mut weekday_buckets: [Vec<f64>; 7] = Default::default();
    for sample in &moods {
        let day = sample.created_at.weekday().num_days_from_sunday() as usize;
        weekday_buckets[day].push(sample.effective_intensity());
    }
    let weekday_averages = weekday_buckets.map(|bucket| {
        if bucket.is_empty() {
            None
        } else {
            Some(round1(mean(&bucket)))
        }
    });

    let rating_values: Vec<f64> = ratings.iter().map(|r| f64::from(r.rating)).collect();

    let recent_notes = moods
        .iter()
        .take(MAX_RECENT_NOTES)
        .filter_map(|m| m.note.clone())
        .filter(|n| !n.trim().is_empty())
        .collect();
    let recent_victories = victories
        .iter()
        .take(MAX_RECENT_VICTORIES)
        .map(|v| v.text.clone())
        .filter(|t| !t.trim().is_empty())
        .collect();

    AggregatedStats {
        period_start,
        period_end,
        total_mood_entries: moods.len(),
        average_intensity: round1(mean(&intensities)),
        mood_distribution,
        reason_distribution,
        most_common_mood: most_common_mood.unwrap_or_else(|| UNKNOWN_MOOD.to_string()),
        most_common_reason,
        trend: classify_trend(&oldest_first),
        total_ratings: ratings.len(),
        average_rating: round1(mean(&rating_values)),
        best_day: best_day(&ratings).map(format_day),
        worst_day: worst_day(&ratings).map(format_day),
        total_victories: victories.len(),
        victories_by_category,
        weekday_averages,
        recent_notes,
        recent_victories,
    }
}

/// Compares the mean of the later half of the window with the earlier half.
/// With an odd count the extra sample goes to the earlier half.
pub fn classify_trend(oldest_first: &[f64]) -> Trend {
    if oldest_first.len() < MIN_TREND_SAMPLES {
        return Trend::Stable;
    }
    let later_len = oldest_first.len() / 2;
    let (earlier, later) = oldest_first.split_at(oldest_first.len() - later_len);
    let delta = mean(later) - mean(earlier);

    if delta > TREND_DEADBAND {
        Trend::Improving
    } else if delta < -TREND_DEADBAND {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Frequency table plus the most frequent label. Labels arrive newest first,
/// so on a tie the label seen most recently wins.
fn tally<'a>(labels: impl Iterator<Item = &'a str>) -> (BTreeMap<String, usize>, Option<String>) {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut first_seen: HashMap<&'a str, usize> = HashMap::new();

    for (idx, label) in labels.enumerate() {
        *counts.entry(label.to_string()).or_insert(0) += 1;
        first_seen.entry(label).or_insert(idx);
    }

    let top = first_seen
        .iter()
        .max_by(|(a, ia), (b, ib)| counts[**a].cmp(&counts[**b]).then(ib.cmp(ia)))
        .map(|(label, _)| label.to_string());

    (counts, top)
}

// ratings arrive newest first
fn best_day(ratings: &[DayRating]) -> Option<NaiveDate> {
    let mut best: Option<&DayRating> = None;
    for r in ratings {
        if best.map_or(true, |b| r.rating > b.rating) {
            best = Some(r);
        }
    }
    best.map(|r| r.rating_date)
}

fn worst_day(ratings: &[DayRating]) -> Option<NaiveDate> {
    let mut worst: Option<&DayRating> = None;
    for r in ratings {
        if worst.map_or(true, |w| r.rating <= w.rating) {
            worst = Some(r);
        }
    }
    worst.map(|r| r.rating_date)
}

fn format_day(date: NaiveDate) -> String {
    date.format("%A, %B %-d").to_string()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
