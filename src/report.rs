use std::fmt::{Display, Write};

use chrono::{DateTime, TimeZone, Utc};

use crate::dashboard::{ProgressSnapshot, ViewOptions};
use crate::models::{Category, HistoryRecord, Section};
use crate::score::record_score;

const MISSING: &str = "—";
const EXCERPT_CHARS: usize = 60;

pub fn format_score(score: Option<f64>) -> String {
    score.map_or_else(|| MISSING.to_string(), |value| format!("{value:.1}"))
}

/// Calendar date of `created_at` in `zone`, the same day streaks count in.
pub fn format_date<Tz: TimeZone>(created_at: Option<DateTime<Utc>>, zone: &Tz) -> String
where
    Tz::Offset: Display,
{
    created_at.map_or_else(
        || MISSING.to_string(),
        |moment| moment.with_timezone(zone).format("%Y-%m-%d").to_string(),
    )
}

fn excerpt(transcript: Option<&str>) -> String {
    let text = transcript.unwrap_or_default().trim();
    let mut short: String = text.chars().take(EXCERPT_CHARS).collect();
    if text.chars().count() > EXCERPT_CHARS {
        short.push('…');
    }
    short
}

pub fn build_report<Tz: TimeZone>(
    snapshot: &ProgressSnapshot,
    options: &ViewOptions,
    history: &[HistoryRecord],
    zone: &Tz,
) -> String
where
    Tz::Offset: Display,
{
    let mut output = String::new();

    let _ = writeln!(output, "# Speaking Progress Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} of {} sessions in range)",
        options.range.label(),
        snapshot.filtered_count,
        snapshot.record_count
    );

    if snapshot.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "No sessions recorded yet.");
        return output;
    }

    if snapshot.used_fallback {
        let _ = writeln!(
            output,
            "No sessions in this range, so averages cover all sessions."
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Category Averages");
    let _ = writeln!(output, "| Category | Average |");
    let _ = writeln!(output, "| --- | --- |");
    for (category, average) in snapshot.averages.iter() {
        let _ = writeln!(output, "| {} | {} |", category.label(), format_score(*average));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Streak");
    match snapshot.streak_days {
        0 => {
            let _ = writeln!(output, "No practice yet today.");
        }
        1 => {
            let _ = writeln!(output, "1 day in a row.");
        }
        days => {
            let _ = writeln!(output, "{days} days in a row.");
        }
    }

    let insights = &snapshot.insights;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Highlights");
    if let Some(improvement) = insights.most_improved {
        let _ = writeln!(
            output,
            "- Most improved: {} ({:+.1})",
            improvement.category.label(),
            improvement.delta
        );
    }
    match &insights.best_session {
        Some(best) => {
            let _ = writeln!(
                output,
                "- Best session: #{} on {} scoring {:.1}",
                best.record_id,
                format_date(best.created_at, zone),
                best.score
            );
        }
        None => {
            let _ = writeln!(output, "- Best session: {MISSING}");
        }
    }
    match insights.coaching_hint {
        Some(hint) => {
            let _ = writeln!(output, "- Focus on {}: {}", hint.keyword, hint.message);
        }
        None => {
            let _ = writeln!(output, "- No coaching hint yet.");
        }
    }

    if let Some(latest) = history.last() {
        write_latest_feedback(&mut output, latest);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Sessions");
    for record in history.iter().rev().take(5) {
        let _ = writeln!(
            output,
            "- #{} on {}: overall {} {}",
            record.id,
            format_date(record.created_at, zone),
            format_score(record_score(record, Category::Overall)),
            excerpt(record.transcript.as_deref())
        );
    }

    output
}

fn write_latest_feedback(output: &mut String, record: &HistoryRecord) {
    let Some(feedback) = &record.feedback else {
        return;
    };

    let _ = writeln!(output);
    let _ = writeln!(output, "## Latest Feedback (session #{})", record.id);
    for (category, section) in feedback.sections.iter() {
        match section {
            Section::Missing => {}
            Section::Text(text) => {
                let _ = writeln!(output, "- **{}**: {}", category.label(), text);
            }
            Section::Structured(section) => {
                let summary = section.summary.as_deref().unwrap_or(MISSING);
                let _ = writeln!(output, "- **{}**: {}", category.label(), summary);
                for strength in &section.strengths {
                    let _ = writeln!(output, "  - + {strength}");
                }
                for weakness in &section.weaknesses {
                    let _ = writeln!(output, "  - − {weakness}");
                }
                for note in &section.notes {
                    let _ = writeln!(output, "  - {note}");
                }
            }
        }
    }
    for suggestion in &feedback.suggestions {
        let _ = writeln!(output, "- Suggestion: {suggestion}");
    }
}
