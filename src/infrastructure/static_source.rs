// In-memory aggregation source backed by pre-fetched JSON segments
use crate::application::aggregation_source::AggregationSource;
use crate::domain::aggregation::Segment;
use anyhow::Context;

/// Serves segments already held in memory, e.g. a saved response or a fixture.
#[derive(Debug, Clone, Default)]
pub struct StaticSegments {
    segments: Vec<Segment>,
}

impl StaticSegments {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Parses a JSON array of segments, each `{"facets": {"<query id>": [entries]}}`.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let segments: Vec<Segment> =
            serde_json::from_str(json).context("Failed to parse aggregation segments")?;
        tracing::debug!("Loaded {} aggregation segments", segments.len());
        Ok(Self::new(segments))
    }
}

impl AggregationSource for StaticSegments {
    fn segment_count(&self) -> usize {
        self.segments.len()
    }

    fn fetch_segment(&self, index: usize) -> anyhow::Result<Segment> {
        self.segments
            .get(index)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No segment at index {}", index))
    }
}
