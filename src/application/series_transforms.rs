// Per-series value transforms applied after filling and before stacking
use crate::domain::interval::Interval;
use crate::domain::time_series::FlotPair;

/// Change from the previous point. The first point, and any point next to a
/// gap, becomes a gap.
pub fn derivative(pairs: &[FlotPair]) -> Vec<FlotPair> {
    pairs
        .iter()
        .enumerate()
        .map(|(i, &(t, v))| {
            let prev = if i == 0 { None } else { pairs[i - 1].1 };
            match (v, prev) {
                (Some(v), Some(prev)) => (t, Some(v - prev)),
                _ => (t, None),
            }
        })
        .collect()
}

pub fn scale(pairs: &[FlotPair], factor: f64) -> Vec<FlotPair> {
    pairs.iter().map(|&(t, v)| (t, v.map(|v| v * factor))).collect()
}

/// Rescales per-bucket values to per-second rates.
pub fn scale_seconds(pairs: &[FlotPair], interval: &Interval) -> Vec<FlotPair> {
    let seconds = interval.seconds();
    pairs.iter().map(|&(t, v)| (t, v.map(|v| v / seconds))).collect()
}
