use std::ops::{Index, IndexMut};

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize, Serializer};

/// One of the five fixed feedback dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Opening,
    Content,
    Delivery,
    Grammar,
    Overall,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Opening,
        Category::Content,
        Category::Delivery,
        Category::Grammar,
        Category::Overall,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Category::Opening => "opening",
            Category::Content => "content",
            Category::Delivery => "delivery",
            Category::Grammar => "grammar",
            Category::Overall => "overall",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Opening => "Opening",
            Category::Content => "Content",
            Category::Delivery => "Delivery",
            Category::Grammar => "Grammar",
            Category::Overall => "Overall",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Fixed-size map with one slot per category, iterated in category order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PerCategory<T> {
    values: [T; 5],
}

impl<T> PerCategory<T> {
    pub fn from_fn(mut f: impl FnMut(Category) -> T) -> Self {
        Self {
            values: Category::ALL.map(&mut f),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &T)> {
        Category::ALL.into_iter().zip(self.values.iter())
    }
}

impl<T: Clone> PerCategory<T> {
    pub fn splat(value: T) -> Self {
        Self::from_fn(|_| value.clone())
    }
}

/// Serializes as a map keyed by category name.
impl<T: Serialize> Serialize for PerCategory<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter().map(|(category, value)| (category.key(), value)))
    }
}

impl<T> Index<Category> for PerCategory<T> {
    type Output = T;

    fn index(&self, category: Category) -> &T {
        &self.values[category.index()]
    }
}

impl<T> IndexMut<Category> for PerCategory<T> {
    fn index_mut(&mut self, category: Category) -> &mut T {
        &mut self.values[category.index()]
    }
}

/// Which category series the caller wants drawn.
pub type Visibility = PerCategory<bool>;

/// A feedback section as it arrives from the scorer, after normalization.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Section {
    #[default]
    Missing,
    Text(String),
    Structured(StructuredSection),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StructuredSection {
    pub summary: Option<String>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub score: Option<f64>,
    /// Items of a section that arrived as a bare JSON array.
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Feedback {
    pub sections: PerCategory<Section>,
    pub suggestions: Vec<String>,
    /// The separate `scores` block keyed by category.
    pub scores: PerCategory<Option<f64>>,
}

/// One analyzed speech, normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub id: i64,
    pub transcript: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub feedback: Option<Feedback>,
}

/// A history entry exactly as the history endpoint returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    pub id: i64,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub feedback: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub timestamp_ms: i64,
    pub score: f64,
    pub iso_timestamp: String,
    pub record_id: i64,
}

/// One named, colored polyline, sorted ascending by timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub category: Category,
    pub name: &'static str,
    pub color: &'static str,
    pub points: Vec<SeriesPoint>,
}

/// Time range selectable by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RangeWindow {
    #[value(name = "7")]
    Days7,
    #[default]
    #[value(name = "30")]
    Days30,
    #[value(name = "90")]
    Days90,
    #[value(name = "all")]
    All,
}

impl RangeWindow {
    pub fn days(self) -> Option<i64> {
        match self {
            RangeWindow::Days7 => Some(7),
            RangeWindow::Days30 => Some(30),
            RangeWindow::Days90 => Some(90),
            RangeWindow::All => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RangeWindow::Days7 => "last 7 days",
            RangeWindow::Days30 => "last 30 days",
            RangeWindow::Days90 => "last 90 days",
            RangeWindow::All => "all time",
        }
    }
}
