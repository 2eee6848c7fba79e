use rand::seq::SliceRandom;

use crate::models::report::{PatternCategory, PatternEntry, ReportContent, ReportKind, Suggestion};
use crate::models::stats::{AggregatedStats, Trend, UNKNOWN_MOOD};

pub const AFFIRMATIONS: [&str; 7] = [
    "Every day is a new chance. You are stronger than you think.",
    "Your emotions matter. Thank you for taking care of yourself.",
    "You have every right to feel what you feel. You are on a good path.",
    "Small steps lead to big changes. Keep going.",
    "Noticing your emotions is the first step towards wellbeing.",
    "Appreciate your progress, even the small steps.",
    "Every effort counts. You are doing great.",
];

const GROWTH: &str = "growth";

/// Rule-based report content. Never fails and never leaves the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateStrategy;

impl TemplateStrategy {
    pub fn generate(&self, stats: &AggregatedStats, kind: ReportKind) -> ReportContent {
        ReportContent {
            summary: summary(stats, kind),
            patterns: patterns(stats),
            strengths: strengths(stats),
            suggestions: suggestions(stats),
            affirmation: AFFIRMATIONS
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(AFFIRMATIONS[0])
                .to_string(),
        }
    }
}

fn period_phrase(kind: ReportKind) -> &'static str {
    match kind {
        ReportKind::Weekly => "This week",
        ReportKind::Monthly => "This month",
        ReportKind::OnDemand => "Over this period",
    }
}

fn summary(stats: &AggregatedStats, kind: ReportKind) -> String {
    let mut summary = format!(
        "{} you logged {} mood {}",
        period_phrase(kind),
        stats.total_mood_entries,
        plural(stats.total_mood_entries, "entry", "entries"),
    );
    if stats.average_intensity > 0.0 {
        summary.push_str(&format!(
            " with an average intensity of {:.1}/10",
            stats.average_intensity
        ));
    }
    if stats.total_ratings > 0 {
        summary.push_str(&format!(
            " and {} day {} (average: {:.1}/5)",
            stats.total_ratings,
            plural(stats.total_ratings, "rating", "ratings"),
            stats.average_rating
        ));
    }
    summary.push('.');

    // No sentence for a declining trend; the report stays encouraging.
    match stats.trend {
        Trend::Improving => summary.push_str(" Your mood shows a positive trend!"),
        Trend::Stable => summary.push_str(" Your mood has been stable."),
        Trend::Declining => {}
    }
    summary
}

fn patterns(stats: &AggregatedStats) -> Vec<PatternEntry> {
    let mut patterns = Vec::new();

    if stats.most_common_mood != UNKNOWN_MOOD {
        patterns.push(PatternEntry {
            title: "Dominant mood".into(),
            description: format!("Most often you felt \"{}\"", stats.most_common_mood),
            category: PatternCategory::Neutral,
        });
    }
    if let Some(reason) = &stats.most_common_reason {
        patterns.push(PatternEntry {
            title: "Main influence".into(),
            description: format!("The most common reason was \"{}\"", reason),
            category: PatternCategory::Neutral,
        });
    }
    if let Some(day) = &stats.best_day {
        patterns.push(PatternEntry {
            title: "Best day".into(),
            description: format!("Your best-rated day was {}", day),
            category: PatternCategory::Positive,
        });
    }
    patterns
}

fn strengths(stats: &AggregatedStats) -> Vec<String> {
    let mut strengths = vec!["You track your mood regularly".to_string()];

    if stats.total_victories > 0 {
        strengths.push(format!(
            "You noticed {} small {}",
            stats.total_victories,
            plural(stats.total_victories, "win", "wins")
        ));
    }
    if stats.total_mood_entries >= 5 {
        strengths.push("You are building emotional awareness".to_string());
    }
    if stats.total_ratings >= 3 {
        strengths.push("You rate your days regularly".to_string());
    }
    strengths
}

fn suggestions(stats: &AggregatedStats) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    if stats.total_mood_entries < 3 {
        suggestions.push(Suggestion {
            title: "Log more often".into(),
            description: "Try recording your mood more often to better understand your patterns"
                .into(),
            category: GROWTH.into(),
        });
    }
    if stats.total_victories == 0 {
        suggestions.push(Suggestion {
            title: "Small wins".into(),
            description: "Start writing down your daily successes, even the small ones".into(),
            category: GROWTH.into(),
        });
    }
    suggestions.push(Suggestion {
        title: "Keep going".into(),
        description: "Keep tracking your mood and looking for patterns".into(),
        category: GROWTH.into(),
    });
    suggestions
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 {
        one
    } else {
        many
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::aggregator::reduce;
    use crate::services::aggregator::tests::{at, mood, rating, victory};
    use uuid::Uuid;

    fn empty_stats() -> AggregatedStats {
        reduce(at(1, 0), at(8, 0), vec![], vec![], vec![])
    }

    #[test]
    fn test_empty_stats_still_produce_full_content() {
        let content = TemplateStrategy.generate(&empty_stats(), ReportKind::Weekly);

        assert!(!content.summary.is_empty());
        assert!(content.patterns.is_empty());
        assert_eq!(content.strengths, vec!["You track your mood regularly"]);
        assert_eq!(content.suggestions.len(), 3);
        assert_eq!(content.suggestions.last().unwrap().title, "Keep going");
        assert!(AFFIRMATIONS.contains(&content.affirmation.as_str()));
    }

    #[test]
    fn test_summary_mentions_counts_and_averages() {
        let user = Uuid::new_v4();
        let stats = reduce(
            at(1, 0),
            at(8, 0),
            vec![mood(user, at(5, 9), "happy", Some(8)), mood(user, at(6, 9), "calm", Some(6))],
            vec![rating(user, 5, 4)],
            vec![],
        );
        let content = TemplateStrategy.generate(&stats, ReportKind::Monthly);
        assert_eq!(
            content.summary,
            "This month you logged 2 mood entries with an average intensity of 7.0/10 \
             and 1 day rating (average: 4.0/5). Your mood has been stable."
        );
    }

    #[test]
    fn test_declining_trend_adds_no_sentence() {
        let mut stats = empty_stats();
        stats.trend = Trend::Declining;
        let content = TemplateStrategy.generate(&stats, ReportKind::Weekly);
        assert_eq!(content.summary, "This week you logged 0 mood entries.");

        stats.trend = Trend::Improving;
        let content = TemplateStrategy.generate(&stats, ReportKind::Weekly);
        assert!(content.summary.ends_with("Your mood shows a positive trend!"));
    }

    #[test]
    fn test_patterns_strengths_and_suggestions_follow_the_data() {
        let user = Uuid::new_v4();
        let moods = (0..5)
            .map(|i| {
                let mut m = mood(user, at(2 + i, 9), "happy", Some(7));
                m.reason = Some("friends".into());
                m
            })
            .collect();
        let stats = reduce(
            at(1, 0),
            at(8, 0),
            moods,
            vec![rating(user, 2, 3), rating(user, 3, 5), rating(user, 4, 4)],
            vec![victory(user, at(3, 12), "called mum", "family")],
        );
        let content = TemplateStrategy.generate(&stats, ReportKind::Weekly);

        let titles: Vec<&str> = content.patterns.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Dominant mood", "Main influence", "Best day"]);
        assert_eq!(content.patterns[2].category, PatternCategory::Positive);
        assert_eq!(content.strengths.len(), 4);
        assert!(content.strengths.contains(&"You noticed 1 small win".to_string()));
        assert_eq!(content.suggestions.len(), 1);
    }
}
