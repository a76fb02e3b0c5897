// Interval domain model - bucket widths and boundary arithmetic
use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntervalError {
    #[error("invalid interval string '{0}', expecting a number followed by one of \"Mwdhmsy\"")]
    Invalid(String),
    #[error("calendar interval '{0}' needs a whole-number count")]
    FractionalCalendarCount(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntervalUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl IntervalUnit {
    fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            's' => Some(Self::Second),
            'm' => Some(Self::Minute),
            'h' => Some(Self::Hour),
            'd' => Some(Self::Day),
            'w' => Some(Self::Week),
            'M' => Some(Self::Month),
            'y' => Some(Self::Year),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Self::Second => 's',
            Self::Minute => 'm',
            Self::Hour => 'h',
            Self::Day => 'd',
            Self::Week => 'w',
            Self::Month => 'M',
            Self::Year => 'y',
        }
    }

    /// Nominal length in seconds. Months count as 30 days and years as 365.
    pub fn seconds(self) -> f64 {
        match self {
            Self::Second => 1.0,
            Self::Minute => 60.0,
            Self::Hour => 3_600.0,
            Self::Day => 86_400.0,
            Self::Week => 604_800.0,
            Self::Month => 2_592_000.0,
            Self::Year => 31_536_000.0,
        }
    }

    /// Whether the bucket width depends on where in the calendar it starts.
    pub fn is_calendar(self) -> bool {
        matches!(self, Self::Month | Self::Year)
    }
}

/// A bucket width such as `"5m"` or `"1M"`.
///
/// Fixed units step by a constant number of milliseconds. Month and year
/// units step the UTC calendar fields, so consecutive buckets can differ in
/// length.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    text: String,
    unit: IntervalUnit,
    count: f64,
    ms: i64,
}

impl Interval {
    pub fn parse(text: &str) -> Result<Self, IntervalError> {
        let trimmed = text.trim();
        let invalid = || IntervalError::Invalid(text.to_string());

        let mut chars = trimmed.chars();
        let unit = chars
            .next_back()
            .and_then(IntervalUnit::from_symbol)
            .ok_or_else(invalid)?;
        let count_str = chars.as_str();
        if !is_decimal(count_str) {
            return Err(invalid());
        }
        let count: f64 = count_str.parse().map_err(|_| invalid())?;
        if count <= 0.0 || !count.is_finite() {
            return Err(invalid());
        }
        if unit.is_calendar() && count.fract() != 0.0 {
            return Err(IntervalError::FractionalCalendarCount(text.to_string()));
        }

        #[allow(clippy::cast_possible_truncation)]
        let ms = (count * unit.seconds() * 1000.0).ceil() as i64;

        Ok(Self {
            text: trimmed.to_string(),
            unit,
            count,
            ms,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn unit(&self) -> IntervalUnit {
        self.unit
    }

    pub fn count(&self) -> f64 {
        self.count
    }

    /// Fixed bucket width. For calendar units this is only the nominal width
    /// (30 days per month, 365 days per year).
    pub fn milliseconds(&self) -> i64 {
        self.ms
    }

    pub fn seconds(&self) -> f64 {
        self.ms as f64 / 1000.0
    }

    /// Start of the bucket following the one starting at `current_ms`.
    pub fn after(&self, current_ms: i64) -> i64 {
        self.step(current_ms, 1)
    }

    /// Start of the bucket preceding the one starting at `current_ms`.
    pub fn before(&self, current_ms: i64) -> i64 {
        self.step(current_ms, -1)
    }

    fn step(&self, current_ms: i64, delta: i64) -> i64 {
        #[allow(clippy::cast_possible_truncation)]
        let count = self.count as i64;
        let nominal = current_ms.saturating_add(delta.saturating_mul(self.ms));
        let months = match self.unit {
            IntervalUnit::Month => Some(count),
            IntervalUnit::Year => count.checked_mul(12),
            _ => return nominal,
        };

        // Past chrono's representable range fall back to the nominal width.
        months
            .and_then(|m| m.checked_mul(delta))
            .and_then(|m| shift_utc_months(current_ms, m))
            .unwrap_or(nominal)
    }
}

/// Moves `ms` by a number of UTC calendar months. A day of month that does not
/// exist in the target month rolls forward into the next one (Jan 31 + 1 month
/// is Mar 3 or Mar 2), the same way date-field setters normalize.
fn shift_utc_months(ms: i64, months: i64) -> Option<i64> {
    let at = DateTime::<Utc>::from_timestamp_millis(ms)?;
    let total = (i64::from(at.year()) * 12 + i64::from(at.month0())).checked_add(months)?;
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = u32::try_from(total.rem_euclid(12)).ok()? + 1;

    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let shifted = first
        .and_time(at.time())
        .checked_add_signed(TimeDelta::days(i64::from(at.day0())))?;
    Some(shifted.and_utc().timestamp_millis())
}

fn is_decimal(s: &str) -> bool {
    let mut parts = s.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    match parts.next() {
        Some(frac) => digits(whole) && digits(frac),
        None => digits(whole),
    }
}

impl FromStr for Interval {
    type Err = IntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
