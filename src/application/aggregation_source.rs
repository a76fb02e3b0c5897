// Source trait for date-histogram results
use crate::domain::aggregation::Segment;

/// Supplies the result segments of one render pass. Segments are fetched in
/// index order; each one covers part of the time range (e.g. one daily index).
pub trait AggregationSource {
    /// Number of segments the pass will read
    fn segment_count(&self) -> usize;

    /// Fetch the aggregation entries of every query for one segment
    fn fetch_segment(&self, index: usize) -> anyhow::Result<Segment>;
}
