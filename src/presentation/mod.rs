// Presentation layer - payloads for the charting library
pub mod plot_payload;
