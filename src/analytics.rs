use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::models::{Category, HistoryRecord, PerCategory, RangeWindow};
use crate::score::record_score;

#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveSet<'a> {
    pub records: Vec<&'a HistoryRecord>,
    /// Set when a finite window matched nothing and all records were used instead.
    pub used_fallback: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Improvement {
    pub category: Category,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestSession {
    pub record_id: i64,
    pub score: f64,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoachingHint {
    pub keyword: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub most_improved: Option<Improvement>,
    pub best_session: Option<BestSession>,
    pub coaching_hint: Option<CoachingHint>,
}

impl Insights {
    pub fn from_history(records: &[HistoryRecord]) -> Self {
        Self {
            most_improved: most_improved(records),
            best_session: best_session(records),
            coaching_hint: coaching_hint(records),
        }
    }
}

/// Checked in order; the first keyword found in the suggestions wins.
const HINTS: [(&str, &[&str], &str); 8] = [
    (
        "pauses",
        &["pause"],
        "Try deliberate pauses after key points to let them land.",
    ),
    (
        "pace",
        &["pace", "pacing"],
        "Work on a steady pace; slow down when you reach the main idea.",
    ),
    (
        "clarity",
        &["clarity"],
        "Focus on clarity: shorter sentences and one idea at a time.",
    ),
    (
        "fillers",
        &["filler"],
        "Cut filler words like \"um\" and \"uh\" by pausing instead.",
    ),
    (
        "volume",
        &["volume"],
        "Project your voice so the back of the room can hear you.",
    ),
    (
        "structure",
        &["structure"],
        "Give the talk a clear structure: opening, three points, close.",
    ),
    (
        "eye contact",
        &["eye contact", "eye-contact"],
        "Hold eye contact with your audience between notes.",
    ),
    (
        "confidence",
        &["confiden"],
        "Own the room: stand still, breathe, and speak with confidence.",
    ),
];

pub fn cutoff(window: RangeWindow, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    window.days().map(|days| now - Duration::days(days))
}

/// Records created within `[now - window, now]`. `All` keeps everything,
/// including undated records; finite windows drop them.
pub fn filter_range(
    records: &[HistoryRecord],
    window: RangeWindow,
    now: DateTime<Utc>,
) -> Vec<&HistoryRecord> {
    let Some(cutoff) = cutoff(window, now) else {
        return records.iter().collect();
    };

    records
        .iter()
        .filter(|record| {
            record
                .created_at
                .is_some_and(|created_at| created_at >= cutoff && created_at <= now)
        })
        .collect()
}

pub fn effective_set(
    records: &[HistoryRecord],
    window: RangeWindow,
    now: DateTime<Utc>,
) -> EffectiveSet<'_> {
    let filtered = filter_range(records, window, now);
    if filtered.is_empty() && !records.is_empty() && window != RangeWindow::All {
        return EffectiveSet {
            records: records.iter().collect(),
            used_fallback: true,
        };
    }

    EffectiveSet {
        records: filtered,
        used_fallback: false,
    }
}

/// Mean of the non-null scores, rounded to one decimal place.
pub fn category_average(records: &[&HistoryRecord], category: Category) -> Option<f64> {
    let scores: Vec<f64> = records
        .iter()
        .filter_map(|record| record_score(record, category))
        .collect();
    average(&scores).map(|mean| (mean * 10.0).round() / 10.0)
}

pub fn category_averages(records: &[&HistoryRecord]) -> PerCategory<Option<f64>> {
    PerCategory::from_fn(|category| category_average(records, category))
}

/// Consecutive calendar days with practice, counting back from today.
///
/// Days are taken in `now`'s time zone; several sessions on one day count once.
pub fn streak_days<Tz: TimeZone>(records: &[HistoryRecord], now: &DateTime<Tz>) -> u32 {
    let zone = now.timezone();
    let active: BTreeSet<NaiveDate> = records
        .iter()
        .filter_map(|record| record.created_at)
        .map(|created_at| created_at.with_timezone(&zone).date_naive())
        .collect();

    let mut day = now.date_naive();
    let mut streak = 0;
    while active.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(previous) => day = previous,
            None => break,
        }
    }
    streak
}

/// Compares each category's mean between the earlier and later half of the
/// history. A half without scores for a category gives that category a delta of 0.
pub fn most_improved(records: &[HistoryRecord]) -> Option<Improvement> {
    if records.is_empty() {
        return None;
    }

    let (earlier, later) = records.split_at(records.len() / 2);
    let mut best: Option<Improvement> = None;

    for category in Category::ALL {
        let delta = match (half_mean(earlier, category), half_mean(later, category)) {
            (Some(before), Some(after)) => after - before,
            _ => 0.0,
        };

        if best.map_or(true, |current| delta > current.delta) {
            best = Some(Improvement { category, delta });
        }
    }

    best
}

/// Highest overall score; the earliest session wins a tie.
pub fn best_session(records: &[HistoryRecord]) -> Option<BestSession> {
    let mut best: Option<BestSession> = None;

    for record in records {
        let Some(score) = record_score(record, Category::Overall) else {
            continue;
        };
        if best.as_ref().map_or(true, |current| score > current.score) {
            best = Some(BestSession {
                record_id: record.id,
                score,
                created_at: record.created_at,
            });
        }
    }

    best
}

pub fn coaching_hint(records: &[HistoryRecord]) -> Option<CoachingHint> {
    let suggestions: Vec<&str> = records
        .iter()
        .filter_map(|record| record.feedback.as_ref())
        .flat_map(|feedback| feedback.suggestions.iter().map(String::as_str))
        .collect();

    if suggestions.is_empty() {
        return None;
    }

    let text = suggestions.join(" ").to_lowercase();
    HINTS
        .iter()
        .find(|(_, needles, _)| needles.iter().any(|needle| mentions(&text, needle)))
        .map(|&(keyword, _, message)| CoachingHint { keyword, message })
}

/// `needle` occurs at the start of a word, so "space" does not mention "pace".
fn mentions(text: &str, needle: &str) -> bool {
    text.match_indices(needle).any(|(start, _)| {
        text[..start]
            .chars()
            .next_back()
            .map_or(true, |before| !before.is_alphanumeric())
    })
}

fn half_mean(records: &[HistoryRecord], category: Category) -> Option<f64> {
    let scores: Vec<f64> = records
        .iter()
        .filter_map(|record| record_score(record, category))
        .collect();
    average(&scores)
}

pub fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
