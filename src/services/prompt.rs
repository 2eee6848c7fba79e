//! Prompt construction and response parsing for the external model.

use std::fmt::Write;

use serde::Deserialize;

use crate::models::report::{PatternCategory, PatternEntry, ReportContent, ReportKind, Suggestion};
use crate::models::stats::{AggregatedStats, WEEKDAY_NAMES};
use crate::services::claude::GenerationError;

pub const SYSTEM_PROMPT: &str = r#"You are an empathetic, supportive assistant that reviews mood and wellbeing journals.

CRITICAL RULES:
1. NEVER diagnose mental health conditions or disorders.
2. NEVER suggest that the user has depression, anxiety or any other clinical condition.
3. ALWAYS encourage contacting a professional when serious concerns appear.
4. Use warm, supportive language.
5. Focus on positive aspects and opportunities for growth.
6. Avoid judging, criticising or lecturing.

Respond ONLY with JSON in exactly this structure:
{
  "summary": "2-3 sentences summarising the period",
  "patterns": [{"title": "...", "description": "...", "category": "positive|neutral|concern"}],
  "strengths": ["strength 1", "strength 2"],
  "suggestions": [{"title": "...", "description": "...", "category": "..."}],
  "affirmation": "a positive closing affirmation"
}"#;

fn period_label(kind: ReportKind) -> &'static str {
    match kind {
        ReportKind::Weekly => "week",
        ReportKind::Monthly => "month",
        ReportKind::OnDemand => "period",
    }
}

fn json_map<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".into())
}

/// Renders every stats field in a fixed order so identical stats always
/// produce an identical prompt.
pub fn build_prompt(stats: &AggregatedStats, kind: ReportKind) -> String {
    let mut p = String::new();
    let none = "no data";

    let _ = writeln!(
        p,
        "Analyse the user's mood data from the last {} and prepare a supportive report.\n",
        period_label(kind)
    );
    let _ = writeln!(p, "DATA:");
    let _ = writeln!(p, "- Mood entries: {}", stats.total_mood_entries);
    let _ = writeln!(p, "- Average emotion intensity: {:.1}/10", stats.average_intensity);
    let _ = writeln!(p, "- Most common mood: {}", stats.most_common_mood);
    let _ = writeln!(
        p,
        "- Most common reason: {}",
        stats.most_common_reason.as_deref().unwrap_or(none)
    );
    let _ = writeln!(p, "- Mood trend: {}", stats.trend);
    let _ = writeln!(p, "- Mood distribution: {}", json_map(&stats.mood_distribution));
    let _ = writeln!(p, "- Reason distribution: {}", json_map(&stats.reason_distribution));
    let _ = writeln!(p);
    let _ = writeln!(p, "- Day ratings: {}", stats.total_ratings);
    let _ = writeln!(p, "- Average day rating: {:.1}/5", stats.average_rating);
    let _ = writeln!(p, "- Best day: {}", stats.best_day.as_deref().unwrap_or(none));
    let _ = writeln!(p, "- Worst day: {}", stats.worst_day.as_deref().unwrap_or(none));
    let _ = writeln!(p);
    let _ = writeln!(p, "- Small wins: {}", stats.total_victories);
    let _ = writeln!(
        p,
        "- Small wins by category: {}",
        json_map(&stats.victories_by_category)
    );

    if stats.weekday_averages.iter().any(Option::is_some) {
        let _ = writeln!(p, "\nWEEKDAY PATTERNS (average intensity):");
        for (name, avg) in WEEKDAY_NAMES.iter().zip(stats.weekday_averages.iter()) {
            if let Some(avg) = avg {
                let _ = writeln!(p, "- {}: {:.1}", name, avg);
            }
        }
    }
    if !stats.recent_notes.is_empty() {
        let _ = writeln!(p, "\nRECENT NOTES:");
        for note in &stats.recent_notes {
            let _ = writeln!(p, "- {}", note);
        }
    }
    if !stats.recent_victories.is_empty() {
        let _ = writeln!(p, "\nRECENT SMALL WINS:");
        for win in &stats.recent_victories {
            let _ = writeln!(p, "- {}", win);
        }
    }

    p.push_str("\nPrepare a supportive, positive report. Respond ONLY with JSON.");
    p
}

/// Finds the first balanced `{...}` span in `text` that parses as a JSON
/// object. Braces inside string literals are ignored.
pub fn extract_json_object(text: &str) -> Option<serde_json::Value> {
    let bytes = text.as_bytes();
    let mut start = 0;

    while let Some(offset) = text[start..].find('{') {
        let open = start + offset;
        if let Some(close) = matching_brace(bytes, open) {
            if let Ok(value @ serde_json::Value::Object(_)) =
                serde_json::from_str::<serde_json::Value>(&text[open..=close])
            {
                return Some(value);
            }
        }
        start = open + 1;
    }
    None
}

fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPattern {
    title: String,
    description: String,
    #[serde(alias = "type")]
    category: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawContent {
    summary: Option<String>,
    patterns: Option<Vec<RawPattern>>,
    strengths: Option<Vec<String>>,
    suggestions: Option<Vec<Suggestion>>,
    affirmation: Option<String>,
}

/// Parses model output into report content. Missing or null fields become
/// empty values; no JSON object or wrongly typed fields are an error.
pub fn parse_content(text: &str) -> Result<ReportContent, GenerationError> {
    let value = extract_json_object(text).ok_or(GenerationError::MissingJson)?;
    let raw: RawContent = serde_json::from_value(value)?;

    Ok(ReportContent {
        summary: raw.summary.unwrap_or_default(),
        patterns: raw
            .patterns
            .unwrap_or_default()
            .into_iter()
            .map(|p| PatternEntry {
                title: p.title,
                description: p.description,
                category: PatternCategory::from_label(&p.category),
            })
            .collect(),
        strengths: raw.strengths.unwrap_or_default(),
        suggestions: raw.suggestions.unwrap_or_default(),
        affirmation: raw.affirmation.unwrap_or_default(),
    })
}
