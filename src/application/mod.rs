// Application layer - render passes over aggregation results
pub mod aggregation_source;
pub mod histogram_service;
pub mod series_transforms;
