// Aggregation entries and per-query accumulation across result segments
use super::time_series::{TimeInput, ZeroFilled};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One bucket of a date histogram as returned by the search backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AggregationEntry {
    pub time: TimeInput,
    pub count: u64,
    #[serde(default)]
    pub mean: Option<f64>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub total: Option<f64>,
}

impl AggregationEntry {
    pub fn count(time: impl Into<TimeInput>, count: u64) -> Self {
        Self {
            time: time.into(),
            count,
            mean: None,
            min: None,
            max: None,
            total: None,
        }
    }
}

/// One chunk of results (typically one time-partitioned index), keyed by query id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Segment {
    #[serde(default)]
    pub facets: HashMap<String, Vec<AggregationEntry>>,
}

impl Segment {
    pub fn with_entries(mut self, query_id: &str, entries: Vec<AggregationEntry>) -> Self {
        self.facets.insert(query_id.to_string(), entries);
        self
    }

    pub fn entries_for(&self, query_id: &str) -> Option<&[AggregationEntry]> {
        self.facets.get(query_id).map(Vec::as_slice)
    }
}

/// Which statistic of an entry becomes the bucket value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueMode {
    #[default]
    Count,
    Mean,
    Min,
    Max,
    Total,
}

impl ValueMode {
    pub fn needs_value_field(self) -> bool {
        self != Self::Count
    }
}

/// Folds entries for one query into its series, keeping the hit totals
/// needed to merge means across segments.
#[derive(Debug, Clone)]
pub struct SeriesAccumulator {
    series: ZeroFilled,
    mode: ValueMode,
    hits: u64,
    counters: HashMap<i64, u64>,
}

impl SeriesAccumulator {
    pub fn new(series: ZeroFilled, mode: ValueMode) -> Self {
        Self {
            series,
            mode,
            hits: 0,
            counters: HashMap::new(),
        }
    }

    pub fn series(&self) -> &ZeroFilled {
        &self.series
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Hits seen so far in the bucket at `time`.
    pub fn bucket_hits(&self, time: i64) -> u64 {
        self.counters.get(&time).copied().unwrap_or(0)
    }

    pub fn fold_all(&mut self, entries: &[AggregationEntry]) {
        for entry in entries {
            self.fold(entry);
        }
    }

    pub fn fold(&mut self, entry: &AggregationEntry) {
        self.hits += entry.count;

        let Some(time) = entry.time.to_millis() else {
            // Recorded as dropped by the series.
            self.series.add_value(entry.time.clone(), None);
            return;
        };

        let existing = self.series.value_at(time);
        let value = match self.mode {
            ValueMode::Count => Some(existing.unwrap_or(0.0) + entry.count as f64),
            ValueMode::Mean => entry.mean.map(|mean| {
                let previous = self.bucket_hits(time) as f64;
                let total = previous + entry.count as f64;
                if total == 0.0 {
                    existing.unwrap_or(mean)
                } else {
                    (existing.unwrap_or(0.0) * previous + mean * entry.count as f64) / total
                }
            }),
            ValueMode::Min => entry
                .min
                .map(|min| existing.map_or(min, |current| current.min(min))),
            ValueMode::Max => entry
                .max
                .map(|max| existing.map_or(max, |current| current.max(max))),
            ValueMode::Total => entry
                .total
                .map(|total| existing.unwrap_or(0.0) + total),
        };

        let Some(value) = value else {
            tracing::debug!(
                "Entry at {} has no {:?} statistic, counting hits only",
                time,
                self.mode
            );
            return;
        };

        *self.counters.entry(time).or_insert(0) += entry.count;
        self.series.add_value(time, Some(value));
    }
}
