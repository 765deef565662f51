use chrono::SecondsFormat;

use crate::models::{Category, HistoryRecord, Series, SeriesPoint, Visibility};
use crate::score::record_score;

/// Trailing window of the smoothing average, in points.
pub const SMOOTHING_WINDOW: usize = 3;

pub fn category_color(category: Category) -> &'static str {
    match category {
        Category::Opening => "#6366f1",
        Category::Content => "#10b981",
        Category::Delivery => "#f59e0b",
        Category::Grammar => "#ef4444",
        Category::Overall => "#3b82f6",
    }
}

/// One series per visible category over `records`, which the caller has
/// already range-filtered. Hidden categories are left out entirely.
pub fn build_series(
    records: &[&HistoryRecord],
    visibility: &Visibility,
    smooth: bool,
) -> Vec<Series> {
    Category::ALL
        .into_iter()
        .filter(|category| visibility[*category])
        .map(|category| {
            let mut points = category_points(records, category);
            if smooth {
                let scores: Vec<f64> = points.iter().map(|point| point.score).collect();
                let smoothed = moving_average(&scores, SMOOTHING_WINDOW);
                for (point, score) in points.iter_mut().zip(smoothed) {
                    point.score = score;
                }
            }

            Series {
                category,
                name: category.label(),
                color: category_color(category),
                points,
            }
        })
        .collect()
}

fn category_points(records: &[&HistoryRecord], category: Category) -> Vec<SeriesPoint> {
    let mut points: Vec<SeriesPoint> = records
        .iter()
        .filter_map(|record| {
            let created_at = record.created_at?;
            let score = record_score(record, category)?;
            Some(SeriesPoint {
                timestamp_ms: created_at.timestamp_millis(),
                score,
                iso_timestamp: created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                record_id: record.id,
            })
        })
        .collect();

    points.sort_by_key(|point| point.timestamp_ms);
    points
}

/// Causal moving average: each value is averaged with up to `window - 1`
/// preceding values, so the window narrows at the start of the series.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|index| {
            let start = (index + 1).saturating_sub(window);
            let slice = &values[start..=index];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Feedback, PerCategory};
    use chrono::{Duration, TimeZone, Utc};

    fn record(id: i64, day: u32, delivery: Option<f64>) -> HistoryRecord {
        let mut feedback = Feedback::default();
        feedback.scores[Category::Delivery] = delivery;
        feedback.scores[Category::Overall] = Some(70.0);
        HistoryRecord {
            id,
            transcript: None,
            created_at: Some(Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap()),
            feedback: Some(feedback),
        }
    }

    #[test]
    fn causal_average_narrows_at_start() {
        assert_eq!(
            moving_average(&[60.0, 70.0, 80.0, 90.0], SMOOTHING_WINDOW),
            vec![60.0, 65.0, 70.0, 80.0]
        );
        assert!(moving_average(&[], SMOOTHING_WINDOW).is_empty());
    }

    #[test]
    fn points_are_sorted_and_skip_missing() {
        let records = vec![
            record(2, 5, Some(80.0)),
            record(1, 2, Some(60.0)),
            record(3, 7, None),
        ];
        let mut undated = record(4, 8, Some(99.0));
        undated.created_at = None;
        let mut all: Vec<&HistoryRecord> = records.iter().collect();
        all.push(&undated);

        let series = build_series(&all, &PerCategory::splat(true), false);
        assert_eq!(series.len(), 5);

        let delivery = &series[2];
        assert_eq!(delivery.category, Category::Delivery);
        let ids: Vec<i64> = delivery.points.iter().map(|point| point.record_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(delivery.points[0].iso_timestamp, "2025-03-02T09:00:00.000Z");
        assert!(series[0].points.is_empty());
    }

    #[test]
    fn hidden_series_are_omitted() {
        let records = vec![record(1, 2, Some(60.0))];
        let refs: Vec<&HistoryRecord> = records.iter().collect();
        let mut visibility = PerCategory::splat(false);
        visibility[Category::Delivery] = true;

        let series = build_series(&refs, &visibility, false);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].category, Category::Delivery);
    }

    #[test]
    fn smoothing_rewrites_scores_in_time_order() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let records: Vec<HistoryRecord> = [70.0, 60.0, 80.0, 70.0]
            .into_iter()
            .enumerate()
            .map(|(index, score)| {
                let mut entry = record(index as i64, 1, Some(score));
                // Reverse chronological input.
                entry.created_at = Some(start - Duration::days(index as i64));
                entry
            })
            .collect();
        let refs: Vec<&HistoryRecord> = records.iter().collect();
        let mut visibility = PerCategory::splat(false);
        visibility[Category::Delivery] = true;

        let series = build_series(&refs, &visibility, true);
        let scores: Vec<f64> = series[0].points.iter().map(|point| point.score).collect();
        assert_eq!(scores, vec![70.0, 75.0, 70.0, 70.0]);
    }
}
