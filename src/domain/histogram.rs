// Histogram panel domain model
use super::aggregation::ValueMode;
use super::interval::{Interval, IntervalError};
use super::stack::Datapoint;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistogramError {
    #[error("in {mode:?} mode a value field must be specified")]
    MissingValueField { mode: ValueMode },
    #[error(transparent)]
    Interval(#[from] IntervalError),
    #[error("failed to fetch segment {index}: {message}")]
    Segment { index: usize, message: String },
}

/// A query whose results become one series.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryInfo {
    pub id: String,
    pub query: String,
    pub alias: Option<String>,
    pub color: Option<String>,
}

impl QueryInfo {
    pub fn new(id: &str, query: &str) -> Self {
        Self {
            id: id.to_string(),
            query: query.to_string(),
            alias: None,
            color: None,
        }
    }

    pub fn label(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.query)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSeries {
    pub info: QueryInfo,
    pub hits: u64,
    /// Plot points; `None` is a gap.
    pub points: Vec<Option<Datapoint>>,
    /// Whether each point carries a baseline (`[x, y, bottom]`).
    pub with_bottom: bool,
    /// Per-point share of the coordinate total, when percent-stacked.
    pub shares: Option<Vec<Option<f64>>>,
    /// Values rejected for an unusable timestamp.
    pub dropped_entries: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedHistogram {
    pub interval: Option<Interval>,
    pub range: Option<TimeRange>,
    pub series: Vec<RenderedSeries>,
    pub hits: u64,
    pub stacked: bool,
    pub percentage: bool,
    /// Last segment failure of the pass, if any.
    pub error: Option<String>,
}

impl RenderedHistogram {
    pub fn empty() -> Self {
        Self {
            interval: None,
            range: None,
            series: Vec::new(),
            hits: 0,
            stacked: false,
            percentage: false,
            error: None,
        }
    }
}
