// Automatic interval selection and axis label formats
use super::interval::{Interval, IntervalError};

/// Snaps a raw bucket width (ms) to the closest "nice" width the panel offers.
pub fn round_interval(interval_ms: f64) -> i64 {
    const STEPS: &[(f64, i64)] = &[
        (500.0, 100),                   // 0.1s
        (5_000.0, 1_000),               // 1s
        (7_500.0, 5_000),               // 5s
        (15_000.0, 10_000),             // 10s
        (45_000.0, 30_000),             // 30s
        (180_000.0, 60_000),            // 1m
        (450_000.0, 300_000),           // 5m
        (1_200_000.0, 600_000),         // 10m
        (2_700_000.0, 1_800_000),       // 30m
        (7_200_000.0, 3_600_000),       // 1h
        (21_600_000.0, 10_800_000),     // 3h
        (86_400_000.0, 43_200_000),     // 12h
        (604_800_000.0, 86_400_000),    // 1d
        (1_814_400_000.0, 604_800_000), // 1w
    ];

    for &(limit, step) in STEPS {
        if interval_ms <= limit {
            return step;
        }
    }
    if interval_ms < 3_628_800_000.0 {
        2_592_000_000 // 30d
    } else {
        31_536_000_000 // 1y
    }
}

/// Bucket width (ms) that splits `[from_ms, to_ms]` into roughly `resolution` buckets.
pub fn calculate_interval(from_ms: i64, to_ms: i64, resolution: u32) -> i64 {
    let span = (to_ms - from_ms) as f64;
    round_interval(span / f64::from(resolution.max(1)))
}

/// Renders a duration as an interval string using the largest unit that fits,
/// e.g. `"1y"`, `"30d"`, `"12h"`.
pub fn seconds_to_hms(seconds: f64) -> String {
    let years = (seconds / 31_536_000.0).floor();
    if years >= 1.0 {
        return format!("{}y", years);
    }
    let rem = seconds % 31_536_000.0;
    let days = (rem / 86_400.0).floor();
    if days >= 1.0 {
        return format!("{}d", days);
    }
    let rem = rem % 86_400.0;
    let hours = (rem / 3_600.0).floor();
    if hours >= 1.0 {
        return format!("{}h", hours);
    }
    let rem = rem % 3_600.0;
    let minutes = (rem / 60.0).floor();
    if minutes >= 1.0 {
        return format!("{}m", minutes);
    }
    let secs = rem % 60.0;
    if secs > 0.0 {
        return format!("{}s", secs);
    }
    "1s".to_string()
}

impl Interval {
    /// Picks an interval for a time range so it renders about `resolution` buckets.
    pub fn auto(from_ms: i64, to_ms: i64, resolution: u32) -> Result<Self, IntervalError> {
        let ms = calculate_interval(from_ms, to_ms, resolution);
        Self::parse(&seconds_to_hms(ms as f64 / 1000.0))
    }
}

/// Axis tick format for an interval, coarser for wider buckets.
pub fn time_format(interval: &Interval) -> &'static str {
    let seconds = interval.seconds();
    if seconds >= 2_628_000.0 {
        "%Y-%m"
    } else if seconds >= 86_400.0 {
        "%Y-%m-%d"
    } else if seconds >= 60.0 {
        "%H:%M<br>%m-%d"
    } else {
        "%H:%M:%S"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_interval() {
        assert_eq!(round_interval(10.0), 100);
        assert_eq!(round_interval(4_000.0), 1_000);
        assert_eq!(round_interval(100_000.0), 60_000);
        assert_eq!(round_interval(86_400_000.0), 43_200_000);
        assert_eq!(round_interval(2_000_000_000.0), 2_592_000_000);
        assert_eq!(round_interval(5_000_000_000.0), 31_536_000_000);
    }

    #[test]
    fn test_seconds_to_hms() {
        assert_eq!(seconds_to_hms(31_536_000.0), "1y");
        assert_eq!(seconds_to_hms(2_592_000.0), "30d");
        assert_eq!(seconds_to_hms(43_200.0), "12h");
        assert_eq!(seconds_to_hms(300.0), "5m");
        assert_eq!(seconds_to_hms(30.0), "30s");
        assert_eq!(seconds_to_hms(0.1), "0.1s");
        assert_eq!(seconds_to_hms(0.0), "1s");
    }

    #[test]
    fn test_auto_interval_for_a_day() {
        // 24h over 100 buckets is 864s, which snaps to 10m.
        let interval = Interval::auto(0, 86_400_000, 100).unwrap();
        assert_eq!(interval.as_str(), "10m");
        assert_eq!(interval.milliseconds(), 600_000);

        let interval = Interval::auto(0, 1_000, 100).unwrap();
        assert_eq!(interval.milliseconds(), 100);
    }

    #[test]
    fn test_time_format() {
        assert_eq!(time_format(&Interval::parse("1y").unwrap()), "%Y-%m");
        assert_eq!(time_format(&Interval::parse("2M").unwrap()), "%Y-%m");
        // A nominal 30-day month stays just under the monthly threshold.
        assert_eq!(time_format(&Interval::parse("1M").unwrap()), "%Y-%m-%d");
        assert_eq!(time_format(&Interval::parse("1d").unwrap()), "%Y-%m-%d");
        assert_eq!(time_format(&Interval::parse("5m").unwrap()), "%H:%M<br>%m-%d");
        assert_eq!(time_format(&Interval::parse("30s").unwrap()), "%H:%M:%S");
    }
}
