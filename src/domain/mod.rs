// Domain layer - time bucketing, series filling and stacking
pub mod aggregation;
pub mod auto_interval;
pub mod histogram;
pub mod interval;
pub mod percent_stack;
pub mod stack;
pub mod time_series;
