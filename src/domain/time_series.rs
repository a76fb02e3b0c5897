// Zero-filled time series - sparse bucket values expanded into plot-ready pairs
use super::interval::Interval;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A `[timestamp, value]` pair as handed to the charting library.
/// `None` marks a gap.
pub type FlotPair = (i64, Option<f64>);

/// How missing buckets between observed times are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillStyle {
    /// One zero on each side of a gap.
    #[default]
    Minimal,
    /// A zero in every missing bucket.
    All,
    /// Like `Minimal`, with nulls instead of zeros.
    Null,
    /// No filling; zero-valued points are dropped.
    No,
}

/// A timestamp as it arrives from upstream: epoch millis, a numeric string,
/// or a date.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TimeInput {
    Millis(i64),
    Float(f64),
    Date(DateTime<Utc>),
    Text(String),
}

impl TimeInput {
    /// Normalized bucket key, or `None` when the input is not a usable time.
    /// Dates lose their sub-second part; numbers are truncated to integers.
    pub fn to_millis(&self) -> Option<i64> {
        let ms = match self {
            Self::Millis(ms) => Some(*ms),
            #[allow(clippy::cast_possible_truncation)]
            Self::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            Self::Float(_) => None,
            Self::Date(date) => Some(date.timestamp() * 1000),
            Self::Text(text) => parse_int_prefix(text),
        };
        ms.filter(|ms| *ms >= 0)
    }
}

impl From<i64> for TimeInput {
    fn from(ms: i64) -> Self {
        Self::Millis(ms)
    }
}

impl From<f64> for TimeInput {
    fn from(ms: f64) -> Self {
        Self::Float(ms)
    }
}

impl From<DateTime<Utc>> for TimeInput {
    fn from(date: DateTime<Utc>) -> Self {
        Self::Date(date)
    }
}

impl From<&str> for TimeInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for TimeInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

// Leading integer of a string ("1500abc" -> 1500), ignoring leading whitespace.
fn parse_int_prefix(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (sign, digits) = match text.as_bytes().first() {
        Some(b'-') => (-1, &text[1..]),
        Some(b'+') => (1, &text[1..]),
        _ => (1, text),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    digits[..end].parse::<i64>().ok().map(|v| sign * v)
}

/// Sparse per-bucket values for one series, with the fill strategy used when
/// expanding them into pairs.
#[derive(Debug, Clone)]
pub struct ZeroFilled {
    interval: Interval,
    data: BTreeMap<i64, f64>,
    counters: BTreeMap<i64, u64>,
    start_time: Option<i64>,
    end_time: Option<i64>,
    fill_style: FillStyle,
    dropped: usize,
}

impl ZeroFilled {
    pub fn new(interval: Interval, fill_style: FillStyle) -> Self {
        Self {
            interval,
            data: BTreeMap::new(),
            counters: BTreeMap::new(),
            start_time: None,
            end_time: None,
            fill_style,
            dropped: 0,
        }
    }

    /// Sets the expected bounds of the series, truncated to whole seconds.
    pub fn with_range(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start_time = start.map(|d| d.timestamp() * 1000);
        self.end_time = end.map(|d| d.timestamp() * 1000);
        self
    }

    pub fn interval(&self) -> &Interval {
        &self.interval
    }

    pub fn fill_style(&self) -> FillStyle {
        self.fill_style
    }

    pub fn start_time(&self) -> Option<i64> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<i64> {
        self.end_time
    }

    /// Stores `value` (0 when absent) at `time`, replacing any earlier value.
    /// Times that cannot be read are dropped without error.
    pub fn add_value(&mut self, time: impl Into<TimeInput>, value: Option<f64>) {
        let time = time.into();
        let Some(ms) = time.to_millis() else {
            self.dropped += 1;
            tracing::debug!("Dropping value with unusable time {:?}", time);
            return;
        };
        *self.counters.entry(ms).or_insert(0) += 1;
        self.data.insert(ms, value.unwrap_or(0.0));
    }

    pub fn value_at(&self, time: i64) -> Option<f64> {
        self.data.get(&time).copied()
    }

    /// How many times the bucket at `time` was written.
    pub fn counter(&self, time: i64) -> u64 {
        self.counters.get(&time).copied().unwrap_or(0)
    }

    /// Number of `add_value` calls rejected for an unusable time.
    pub fn dropped_entries(&self) -> usize {
        self.dropped
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Ascending, duplicate-free stored times merged with `include`.
    pub fn get_ordered_times(&self, include: Option<&[i64]>) -> Vec<i64> {
        let mut times: Vec<i64> = self.data.keys().copied().collect();
        if let Some(include) = include {
            times.extend_from_slice(include);
            times.sort_unstable();
            times.dedup();
        }
        times
    }

    /// Expands the series into ordered pairs using the configured fill style.
    /// `required_times` forces buckets into the output so several series can
    /// share the same x values.
    pub fn get_flot_pairs(&self, required_times: Option<&[i64]>) -> Vec<FlotPair> {
        let times = self.get_ordered_times(required_times);
        let mut pairs = Vec::with_capacity(times.len());

        for i in 0..times.len() {
            match self.fill_style {
                FillStyle::Minimal => self.push_bracketed(&mut pairs, &times, i, Some(0.0)),
                FillStyle::Null => self.push_bracketed(&mut pairs, &times, i, None),
                FillStyle::All => self.push_all(&mut pairs, &times, i),
                FillStyle::No => {
                    if let Some(value) = self.truthy_value(times[i]) {
                        pairs.push((times[i], Some(value)));
                    }
                }
            }
        }

        pairs
    }

    // Zero and NaN count as "no value", the same as an empty bucket.
    fn truthy_value(&self, time: i64) -> Option<f64> {
        self.value_at(time).filter(|v| *v != 0.0 && !v.is_nan())
    }

    fn push_bracketed(&self, out: &mut Vec<FlotPair>, times: &[i64], i: usize, filler: Option<f64>) {
        let time = times[i];

        if i > 0 {
            let expected_prev = self.interval.before(time);
            // A gap of exactly two buckets shares its bracket with the previous point.
            let already_bracketed = out.last().is_some_and(|(t, _)| *t == expected_prev);
            if times[i - 1] < expected_prev && !already_bracketed {
                out.push((expected_prev, filler));
            }
        }

        out.push((time, self.truthy_value(time).or(filler)));

        if let Some(&next) = times.get(i + 1) {
            let expected_next = self.interval.after(time);
            if next > expected_next {
                out.push((expected_next, filler));
            }
        }
    }

    fn push_all(&self, out: &mut Vec<FlotPair>, times: &[i64], i: usize) {
        let time = times[i];
        out.push((time, Some(self.truthy_value(time).unwrap_or(0.0))));

        if let Some(&next) = times.get(i + 1) {
            let mut expected_next = self.interval.after(time);
            while next > expected_next {
                out.push((expected_next, Some(0.0)));
                expected_next = self.interval.after(expected_next);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn series(fill_style: FillStyle) -> ZeroFilled {
        let mut ts = ZeroFilled::new(Interval::parse("1m").unwrap(), fill_style);
        ts.add_value(0_i64, Some(4.0));
        ts.add_value(300_000_i64, Some(7.0));
        ts
    }

    #[test]
    fn test_minimal_fill_brackets_gap() {
        let pairs = series(FillStyle::Minimal).get_flot_pairs(None);
        assert_eq!(
            pairs,
            vec![
                (0, Some(4.0)),
                (60_000, Some(0.0)),
                (240_000, Some(0.0)),
                (300_000, Some(7.0)),
            ]
        );
    }

    #[test]
    fn test_all_fill_densifies_gap() {
        let pairs = series(FillStyle::All).get_flot_pairs(None);
        assert_eq!(
            pairs,
            vec![
                (0, Some(4.0)),
                (60_000, Some(0.0)),
                (120_000, Some(0.0)),
                (180_000, Some(0.0)),
                (240_000, Some(0.0)),
                (300_000, Some(7.0)),
            ]
        );
    }

    #[test]
    fn test_null_fill_uses_gaps() {
        let pairs = series(FillStyle::Null).get_flot_pairs(None);
        assert_eq!(
            pairs,
            vec![(0, Some(4.0)), (60_000, None), (240_000, None), (300_000, Some(7.0))]
        );
    }

    #[test]
    fn test_no_fill_drops_zero_values() {
        let mut ts = series(FillStyle::No);
        ts.add_value(120_000_i64, Some(0.0));
        ts.add_value(180_000_i64, None);
        assert_eq!(
            ts.get_flot_pairs(None),
            vec![(0, Some(4.0)), (300_000, Some(7.0))]
        );
    }

    #[test]
    fn test_adjacent_buckets_get_no_brackets() {
        let mut ts = ZeroFilled::new(Interval::parse("1m").unwrap(), FillStyle::Minimal);
        ts.add_value(0_i64, Some(1.0));
        ts.add_value(60_000_i64, Some(2.0));
        ts.add_value(120_000_i64, Some(3.0));
        assert_eq!(
            ts.get_flot_pairs(None),
            vec![(0, Some(1.0)), (60_000, Some(2.0)), (120_000, Some(3.0))]
        );
    }

    // A gap of exactly two buckets used to bracket the middle bucket twice,
    // once from each side ([60000, 0], [60000, 0]); it is emitted once here.
    #[test]
    fn test_two_bucket_gap_gets_one_bracket_not_a_duplicate() {
        let mut ts = ZeroFilled::new(Interval::parse("1m").unwrap(), FillStyle::Minimal);
        ts.add_value(0_i64, Some(1.0));
        ts.add_value(120_000_i64, Some(2.0));
        assert_eq!(
            ts.get_flot_pairs(None),
            vec![(0, Some(1.0)), (60_000, Some(0.0)), (120_000, Some(2.0))]
        );
    }

    #[test]
    fn test_required_times_are_zero_filled() {
        let ts = series(FillStyle::Minimal);
        let pairs = ts.get_flot_pairs(Some(&[120_000]));
        assert_eq!(
            pairs,
            vec![
                (0, Some(4.0)),
                (60_000, Some(0.0)),
                (120_000, Some(0.0)),
                (180_000, Some(0.0)),
                (240_000, Some(0.0)),
                (300_000, Some(7.0)),
            ]
        );
    }

    #[test]
    fn test_ordered_times_are_sorted_and_unique() {
        let mut ts = ZeroFilled::new(Interval::parse("1m").unwrap(), FillStyle::Minimal);
        for t in [300_000_i64, 0, 120_000, 0, 300_000] {
            ts.add_value(t, Some(1.0));
        }
        assert_eq!(ts.get_ordered_times(None), vec![0, 120_000, 300_000]);
        assert_eq!(
            ts.get_ordered_times(Some(&[60_000, 0, 600_000, 60_000])),
            vec![0, 60_000, 120_000, 300_000, 600_000]
        );
    }

    #[test]
    fn test_last_write_wins_and_counts() {
        let mut ts = ZeroFilled::new(Interval::parse("1m").unwrap(), FillStyle::Minimal);
        ts.add_value(60_000_i64, Some(1.0));
        ts.add_value("60000", Some(5.0));
        assert_eq!(ts.value_at(60_000), Some(5.0));
        assert_eq!(ts.counter(60_000), 2);
        ts.add_value(120_000_i64, None);
        assert_eq!(ts.value_at(120_000), Some(0.0));
    }

    #[test]
    fn test_invalid_times_are_dropped() {
        let mut ts = ZeroFilled::new(Interval::parse("1m").unwrap(), FillStyle::Minimal);
        ts.add_value("not a time", Some(1.0));
        ts.add_value(f64::NAN, Some(1.0));
        ts.add_value(-60_000_i64, Some(1.0));
        ts.add_value("  42abc", Some(2.0));
        assert_eq!(ts.get_ordered_times(None), vec![42]);
        assert_eq!(ts.dropped_entries(), 3);
    }

    #[test]
    fn test_dates_lose_sub_second_part() {
        let mut ts = ZeroFilled::new(Interval::parse("1s").unwrap(), FillStyle::Minimal);
        let date = Utc.timestamp_millis_opt(1_388_534_400_750).unwrap();
        ts.add_value(date, Some(3.0));
        assert_eq!(ts.value_at(1_388_534_400_000), Some(3.0));
    }

    #[test]
    fn test_time_input_from_json() {
        let inputs: Vec<TimeInput> =
            serde_json::from_str(r#"[1000, 1500.9, "2000", "2014-01-01T00:00:00.500Z"]"#).unwrap();
        let millis: Vec<Option<i64>> = inputs.iter().map(TimeInput::to_millis).collect();
        assert_eq!(
            millis,
            vec![Some(1000), Some(1500), Some(2000), Some(1_388_534_400_000)]
        );
    }

    #[test]
    fn test_flot_pairs_are_idempotent() {
        let ts = series(FillStyle::All);
        assert_eq!(ts.get_flot_pairs(Some(&[30_000])), ts.get_flot_pairs(Some(&[30_000])));
        assert_eq!(ts.get_ordered_times(None), vec![0, 300_000]);
    }

    #[test]
    fn test_month_buckets_fill_by_calendar() {
        let jan = Utc.with_ymd_and_hms(2014, 1, 1, 0, 0, 0).unwrap();
        let apr = Utc.with_ymd_and_hms(2014, 4, 1, 0, 0, 0).unwrap();
        let mut ts = ZeroFilled::new(Interval::parse("1M").unwrap(), FillStyle::All);
        ts.add_value(jan, Some(1.0));
        ts.add_value(apr, Some(2.0));
        let times: Vec<i64> = ts.get_flot_pairs(None).iter().map(|(t, _)| *t).collect();
        let expected: Vec<i64> = [(1, 1), (2, 1), (3, 1), (4, 1)]
            .iter()
            .map(|(m, d)| {
                Utc.with_ymd_and_hms(2014, *m, *d, 0, 0, 0)
                    .unwrap()
                    .timestamp_millis()
            })
            .collect();
        assert_eq!(times, expected);
    }
}
