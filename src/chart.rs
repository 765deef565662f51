//! Chart geometry for the progress view.
//!
//! Series are projected onto a fixed logical canvas. The horizontal axis spans
//! the earliest to latest visible timestamp; the vertical axis is the fixed
//! score domain `[0, 100]`, inverted so higher scores draw higher. The scene
//! carries geometry only; [`ChartScene::to_svg`] is a plain rendering of it.

use std::fmt::{Display, Write};

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::models::{Category, Series, SeriesPoint};

pub const Y_MIN: f64 = 0.0;
pub const Y_MAX: f64 = 100.0;
pub const GRIDLINE_SCORES: [f64; 6] = [0.0, 20.0, 40.0, 60.0, 80.0, 100.0];
pub const EMPTY_MESSAGE: &str = "No sessions in this range yet.";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartLayout {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

impl Default for ChartLayout {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 320.0,
            padding: 40.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: ScreenPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Linear mapping from (timestamp, score) to canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scales {
    layout: ChartLayout,
    min_x: i64,
    max_x: i64,
}

impl Scales {
    /// `None` when no visible series has a point.
    pub fn fit(series: &[Series], layout: ChartLayout) -> Option<Self> {
        let mut timestamps = series
            .iter()
            .flat_map(|line| line.points.iter().map(|point| point.timestamp_ms));
        let first = timestamps.next()?;
        let (min_x, max_x) = timestamps.fold((first, first), |(min, max), value| {
            (min.min(value), max.max(value))
        });

        Some(Self {
            layout,
            min_x,
            max_x,
        })
    }

    pub fn x(&self, timestamp_ms: i64) -> f64 {
        // A single timestamp would give a zero span.
        let span = match self.max_x - self.min_x {
            0 => 1.0,
            span => span as f64,
        };
        let inner = self.layout.width - 2.0 * self.layout.padding;
        self.layout.padding + (timestamp_ms - self.min_x) as f64 / span * inner
    }

    pub fn y(&self, score: f64) -> f64 {
        let inner = self.layout.height - 2.0 * self.layout.padding;
        self.layout.height - self.layout.padding - (score - Y_MIN) / (Y_MAX - Y_MIN) * inner
    }

    pub fn project(&self, point: &SeriesPoint) -> ScreenPoint {
        ScreenPoint::new(self.x(point.timestamp_ms), self.y(point.score))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gridline {
    pub score: f64,
    pub y: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartLine {
    pub category: Category,
    pub name: &'static str,
    pub color: &'static str,
    /// Polyline vertices; a marker is drawn at each.
    pub points: Vec<ScreenPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisLabel {
    pub x: f64,
    pub y: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartScene {
    Empty {
        layout: ChartLayout,
        message: &'static str,
    },
    Plot {
        layout: ChartLayout,
        gridlines: Vec<Gridline>,
        lines: Vec<ChartLine>,
        x_labels: Vec<AxisLabel>,
    },
}

impl ChartScene {
    /// Axis dates are calendar days in `zone`.
    pub fn build<Tz: TimeZone>(series: &[Series], layout: ChartLayout, zone: &Tz) -> Self
    where
        Tz::Offset: Display,
    {
        let Some(scales) = Scales::fit(series, layout) else {
            return ChartScene::Empty {
                layout,
                message: EMPTY_MESSAGE,
            };
        };

        let gridlines = GRIDLINE_SCORES
            .iter()
            .map(|&score| Gridline {
                score,
                y: scales.y(score),
                label: format!("{score:.0}"),
            })
            .collect();

        let lines = series
            .iter()
            .filter(|line| !line.points.is_empty())
            .map(|line| ChartLine {
                category: line.category,
                name: line.name,
                color: line.color,
                points: line.points.iter().map(|point| scales.project(point)).collect(),
            })
            .collect();

        let label_y = layout.height - layout.padding / 3.0;
        let mut x_labels = vec![AxisLabel {
            x: scales.x(scales.min_x),
            y: label_y,
            text: date_label(scales.min_x, zone),
        }];
        let latest = date_label(scales.max_x, zone);
        if latest != x_labels[0].text {
            x_labels.push(AxisLabel {
                x: scales.x(scales.max_x),
                y: label_y,
                text: latest,
            });
        }

        ChartScene::Plot {
            layout,
            gridlines,
            lines,
            x_labels,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ChartScene::Empty { .. })
    }

    pub fn to_svg(&self) -> String {
        let mut output = String::new();
        let layout = match self {
            ChartScene::Empty { layout, .. } | ChartScene::Plot { layout, .. } => *layout,
        };

        let _ = writeln!(
            output,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = layout.width,
            h = layout.height
        );

        match self {
            ChartScene::Empty { message, .. } => {
                let _ = writeln!(
                    output,
                    r##"  <text x="{:.1}" y="{:.1}" text-anchor="middle" fill="#6b7280">{}</text>"##,
                    layout.width / 2.0,
                    layout.height / 2.0,
                    escape_xml(message)
                );
            }
            ChartScene::Plot {
                gridlines,
                lines,
                x_labels,
                ..
            } => {
                for gridline in gridlines {
                    let _ = writeln!(
                        output,
                        r##"  <line x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="#e5e7eb"/>"##,
                        layout.padding,
                        layout.width - layout.padding,
                        y = gridline.y
                    );
                    let _ = writeln!(
                        output,
                        r##"  <text x="{:.1}" y="{:.1}" text-anchor="end" fill="#6b7280">{}</text>"##,
                        layout.padding - 6.0,
                        gridline.y + 4.0,
                        gridline.label
                    );
                }

                for line in lines {
                    let path: Vec<String> = line
                        .points
                        .iter()
                        .map(|point| format!("{:.1},{:.1}", point.x, point.y))
                        .collect();
                    let _ = writeln!(
                        output,
                        r#"  <polyline fill="none" stroke="{}" stroke-width="2" points="{}"><title>{}</title></polyline>"#,
                        line.color,
                        path.join(" "),
                        line.name
                    );
                    for point in &line.points {
                        let _ = writeln!(
                            output,
                            r#"  <circle cx="{:.1}" cy="{:.1}" r="3" fill="{}"/>"#,
                            point.x, point.y, line.color
                        );
                    }
                }

                for label in x_labels {
                    let _ = writeln!(
                        output,
                        r##"  <text x="{:.1}" y="{:.1}" text-anchor="middle" fill="#6b7280">{}</text>"##,
                        label.x, label.y, label.text
                    );
                }
            }
        }

        let _ = writeln!(output, "</svg>");
        output
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoverHit {
    pub series_index: usize,
    pub category: Category,
    pub point: SeriesPoint,
    pub screen: ScreenPoint,
    pub distance: f64,
    pub tooltip: String,
}

/// Finds the point closest to `pointer` in screen space across every series.
///
/// Linear scan; on equal distance the first point encountered is kept.
pub fn resolve_hover<Tz: TimeZone>(
    series: &[Series],
    layout: ChartLayout,
    pointer: Option<ScreenPoint>,
    zone: &Tz,
) -> Option<HoverHit>
where
    Tz::Offset: Display,
{
    let pointer = pointer?;
    let scales = Scales::fit(series, layout)?;
    let mut nearest: Option<(usize, &SeriesPoint, ScreenPoint, f64)> = None;

    for (series_index, line) in series.iter().enumerate() {
        for point in &line.points {
            let screen = scales.project(point);
            let distance = screen.distance(pointer);
            if nearest.map_or(true, |(_, _, _, best)| distance < best) {
                nearest = Some((series_index, point, screen, distance));
            }
        }
    }

    let (series_index, point, screen, distance) = nearest?;
    let line = &series[series_index];
    Some(HoverHit {
        series_index,
        category: line.category,
        point: point.clone(),
        screen,
        distance,
        tooltip: format!(
            "{} · {} · {:.1}",
            line.name,
            date_label(point.timestamp_ms, zone),
            point.score
        ),
    })
}

fn date_label<Tz: TimeZone>(timestamp_ms: i64, zone: &Tz) -> String
where
    Tz::Offset: Display,
{
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map(|moment| moment.with_timezone(zone).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "—".to_string())
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
