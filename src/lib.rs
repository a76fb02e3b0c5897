//! Zero-filled time-series aggregation and stacking for histogram panels.
//!
//! Sparse date-histogram results are folded into one series per query,
//! expanded into dense `[time, value]` pairs with a configurable fill
//! strategy, and optionally stacked (or percent-stacked) before plotting.
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use application::aggregation_source::AggregationSource;
pub use application::histogram_service::HistogramService;
pub use domain::aggregation::{AggregationEntry, Segment, SeriesAccumulator, ValueMode};
pub use domain::histogram::{HistogramError, QueryInfo, RenderedHistogram, RenderedSeries, TimeRange};
pub use domain::interval::{Interval, IntervalError, IntervalUnit};
pub use domain::percent_stack::percent_stack_all;
pub use domain::stack::{stack_all, Datapoint, LineOptions, Orientation, StackSeries};
pub use domain::time_series::{FillStyle, FlotPair, TimeInput, ZeroFilled};
pub use infrastructure::config::{load_panel_config, PanelConfig};
pub use presentation::plot_payload::PlotPayload;
