// Infrastructure layer - configuration and aggregation sources
pub mod config;
pub mod static_source;
