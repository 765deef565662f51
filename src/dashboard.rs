//! The progress view as one pure computation over a history snapshot.
//!
//! Nothing is cached: every change of history or view options recomputes the
//! whole snapshot, and the same inputs always give the same snapshot.

use std::fmt::Display;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::analytics::{self, Insights};
use crate::chart::{ChartLayout, ChartScene};
use crate::models::{HistoryRecord, PerCategory, RangeWindow, Series, Visibility};
use crate::series::build_series;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewOptions {
    pub range: RangeWindow,
    pub smoothing: bool,
    pub visibility: Visibility,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            range: RangeWindow::default(),
            smoothing: false,
            visibility: PerCategory::splat(true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub record_count: usize,
    /// Records inside the selected range, before any fallback.
    pub filtered_count: usize,
    pub used_fallback: bool,
    pub averages: PerCategory<Option<f64>>,
    pub streak_days: u32,
    pub insights: Insights,
    pub series: Vec<Series>,
    pub chart: ChartScene,
}

impl ProgressSnapshot {
    /// `history` must be sorted oldest first, as `normalize_history` returns it.
    /// Streak days and chart dates are both taken in `now`'s time zone.
    pub fn compute<Tz: TimeZone>(
        history: &[HistoryRecord],
        options: &ViewOptions,
        now: &DateTime<Tz>,
        layout: ChartLayout,
    ) -> Self
    where
        Tz::Offset: Display,
    {
        let now_utc = now.with_timezone(&Utc);
        let filtered = analytics::filter_range(history, options.range, now_utc);
        let effective = analytics::effective_set(history, options.range, now_utc);
        let averages = analytics::category_averages(&effective.records);
        let series = build_series(&filtered, &options.visibility, options.smoothing);
        let chart = ChartScene::build(&series, layout, &now.timezone());

        Self {
            record_count: history.len(),
            filtered_count: filtered.len(),
            used_fallback: effective.used_fallback,
            averages,
            streak_days: analytics::streak_days(history, now),
            insights: Insights::from_history(history),
            series,
            chart,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }
}
