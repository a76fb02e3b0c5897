// Percent-stack transform - stacked values as a share of each coordinate's total
use super::stack::{Datapoint, StackSeries};
use std::collections::HashMap;

// Map key for a coordinate; folds -0.0 into 0.0.
fn coordinate_key(v: f64) -> u64 {
    if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() }
}

/// Sum of the values of every percent series at each coordinate. Gaps add nothing.
pub fn stack_sums(series: &[StackSeries]) -> HashMap<u64, f64> {
    let mut sums = HashMap::new();
    for s in series.iter().filter(|s| s.percent) {
        let o = s.orientation;
        for p in s.points.iter().flatten() {
            *sums.entry(coordinate_key(o.key(p))).or_insert(0.0) += o.value(p);
        }
    }
    sums
}

/// Stacks the percent series on each other per coordinate and rescales the
/// cumulative value and its baseline to percentages of the coordinate total.
/// Coordinates whose total is zero or negative map to 0.
///
/// Returns, per input series, each point's own share of the total (empty for
/// series that are not percent-stacked).
pub fn percent_stack_all(series: &mut [StackSeries]) -> Vec<Vec<Option<f64>>> {
    let sums = stack_sums(series);
    let mut bases: HashMap<u64, f64> = HashMap::new();
    let mut shares = Vec::with_capacity(series.len());

    for s in series.iter_mut() {
        if !s.percent {
            shares.push(Vec::new());
            continue;
        }

        let o = s.orientation;
        let mut series_shares = Vec::with_capacity(s.points.len());
        let points: Vec<Option<Datapoint>> = s
            .points
            .iter()
            .map(|point| {
                let Some(p) = point else {
                    series_shares.push(None);
                    return None;
                };
                let key = coordinate_key(o.key(p));
                let value = o.value(p);
                let base = bases.entry(key).or_insert(0.0);
                let bottom = *base;
                *base += value;

                let sum = sums.get(&key).copied().unwrap_or(0.0);
                if sum > 0.0 {
                    series_shares.push(Some(value * 100.0 / sum));
                    Some(o.point(o.key(p), (bottom + value) * 100.0 / sum, bottom * 100.0 / sum))
                } else {
                    series_shares.push(Some(0.0));
                    Some(o.point(o.key(p), 0.0, 0.0))
                }
            })
            .collect();

        s.points = points;
        s.with_bottom = true;
        shares.push(series_shares);
    }

    shares
}
