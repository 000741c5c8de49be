//! Lexical helper functions
//!
//! Conversions from the lexical space of the built-in datatypes to Rust
//! values. Every function returns a short reason on failure; callers turn it
//! into a diagnostic.

use std::str::FromStr;

use base64::Engine;
use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

/// Result of a lexical conversion, with a failure reason
pub type LexicalResult<T> = std::result::Result<T, String>;

// =============================================================================
// Numeric Conversions
// =============================================================================

static DECIMAL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").unwrap());

static INTEGER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+$").unwrap());

static FLOAT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?|-?INF|NaN)$").unwrap()
});

/// Convert an xs:decimal lexical value
pub fn decimal_from_lexical(value: &str) -> LexicalResult<Decimal> {
    if !DECIMAL_REGEX.is_match(value) {
        return Err("not a valid decimal".to_string());
    }

    let (negative, digits) = match value.as_bytes()[0] {
        b'-' => (true, &value[1..]),
        b'+' => (false, &value[1..]),
        _ => (false, value),
    };
    let mut digits = digits.to_string();
    if digits.starts_with('.') {
        digits.insert(0, '0');
    }
    if digits.ends_with('.') {
        digits.pop();
    }

    let parsed = Decimal::from_str(&digits).map_err(|_| "decimal value out of range".to_string())?;
    Ok(if negative { -parsed } else { parsed })
}

/// Convert an xs:integer lexical value
pub fn integer_from_lexical(value: &str) -> LexicalResult<Decimal> {
    if !INTEGER_REGEX.is_match(value) {
        return Err("not a valid integer".to_string());
    }
    decimal_from_lexical(value)
}

/// Check an integer against inclusive bounds
pub fn check_integer_bounds(
    value: &Decimal,
    min: Option<Decimal>,
    max: Option<Decimal>,
) -> LexicalResult<()> {
    if let Some(min) = min {
        if *value < min {
            return Err(format!("value must be at least {}", min));
        }
    }
    if let Some(max) = max {
        if *value > max {
            return Err(format!("value must be at most {}", max));
        }
    }
    Ok(())
}

/// Convert an xs:float or xs:double lexical value
pub fn float_from_lexical(value: &str) -> LexicalResult<f64> {
    if !FLOAT_REGEX.is_match(value) {
        return Err("not a valid floating point number".to_string());
    }
    match value {
        "NaN" => Ok(f64::NAN),
        "INF" => Ok(f64::INFINITY),
        "-INF" => Ok(f64::NEG_INFINITY),
        _ => value
            .parse::<f64>()
            .map_err(|_| "not a valid floating point number".to_string()),
    }
}

/// Convert an xs:boolean lexical value
pub fn boolean_from_lexical(value: &str) -> LexicalResult<bool> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err("not a valid boolean".to_string()),
    }
}

// =============================================================================
// Binary Conversions
// =============================================================================

static HEX_BINARY_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9a-fA-F]{2})*$").unwrap());

/// Decode an xs:hexBinary value
pub fn hex_binary_decode(value: &str) -> LexicalResult<Vec<u8>> {
    if !HEX_BINARY_REGEX.is_match(value) {
        return Err("not a valid hexadecimal encoding".to_string());
    }

    (0..value.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&value[i..i + 2], 16).map_err(|_| "invalid hex byte".to_string())
        })
        .collect()
}

/// Decode an xs:base64Binary value
pub fn base64_binary_decode(value: &str) -> LexicalResult<Vec<u8>> {
    let cleaned: String = value.chars().filter(|c| *c != ' ').collect();
    if cleaned.is_empty() {
        return Ok(Vec::new());
    }

    base64::engine::general_purpose::STANDARD
        .decode(&cleaned)
        .map_err(|_| "not a valid base64 encoding".to_string())
}

// =============================================================================
// Duration
// =============================================================================

static DURATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(-)?P(?:(\d+)Y)?(?:(\d+)M)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d*)?|\.\d+)S)?)?$",
    )
    .unwrap()
});

/// A duration split into its month and second components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DurationValue {
    /// Signed total months
    pub months: i64,
    /// Signed total seconds
    pub seconds: Decimal,
}

/// Convert an xs:duration lexical value
pub fn duration_from_lexical(value: &str) -> LexicalResult<DurationValue> {
    let caps = DURATION_REGEX
        .captures(value)
        .ok_or_else(|| "not a valid duration".to_string())?;

    let has_date_part = (2..=4).any(|i| caps.get(i).is_some());
    let has_time_part = (5..=7).any(|i| caps.get(i).is_some());
    if !has_date_part && !has_time_part {
        return Err("a duration needs at least one component".to_string());
    }
    if value.ends_with('T') {
        return Err("'T' must be followed by a time component".to_string());
    }

    let number = |i: usize| -> LexicalResult<i64> {
        caps.get(i)
            .map(|m| m.as_str().parse::<i64>())
            .transpose()
            .map(|n| n.unwrap_or(0))
            .map_err(|_| "duration component out of range".to_string())
    };

    let (years, plain_months) = (number(2)?, number(3)?);
    let months = years
        .checked_mul(12)
        .and_then(|m| m.checked_add(plain_months))
        .ok_or_else(|| "duration component out of range".to_string())?;

    let whole_seconds = Decimal::from(number(4)?) * Decimal::from(86_400)
        + Decimal::from(number(5)?) * Decimal::from(3_600)
        + Decimal::from(number(6)?) * Decimal::from(60);
    let fractional = match caps.get(7) {
        Some(m) => decimal_from_lexical(m.as_str())?,
        None => Decimal::ZERO,
    };
    let seconds = whole_seconds + fractional;

    let negative = caps.get(1).is_some();
    Ok(DurationValue {
        months: if negative { -months } else { months },
        seconds: if negative { -seconds } else { seconds },
    })
}

// =============================================================================
// Date and Time
// =============================================================================

static DATE_TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-?\d{4,})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2})(\.\d+)?(Z|[+-]\d{2}:\d{2})?$")
        .unwrap()
});

static DATE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?\d{4,})-(\d{2})-(\d{2})(Z|[+-]\d{2}:\d{2})?$").unwrap());

static TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}):(\d{2}):(\d{2})(\.\d+)?(Z|[+-]\d{2}:\d{2})?$").unwrap()
});

static G_YEAR_MONTH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?\d{4,})-(\d{2})(Z|[+-]\d{2}:\d{2})?$").unwrap());

static G_YEAR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?\d{4,})(Z|[+-]\d{2}:\d{2})?$").unwrap());

static G_MONTH_DAY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^--(\d{2})-(\d{2})(Z|[+-]\d{2}:\d{2})?$").unwrap());

static G_DAY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^---(\d{2})(Z|[+-]\d{2}:\d{2})?$").unwrap());

static G_MONTH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^--(\d{2})(Z|[+-]\d{2}:\d{2})?$").unwrap());

/// Year used for the date/time types that carry no year
const REFERENCE_YEAR: i32 = 2000;

/// The seven date/time datatypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarKind {
    /// xs:dateTime
    DateTime,
    /// xs:date
    Date,
    /// xs:time
    Time,
    /// xs:gYearMonth
    GYearMonth,
    /// xs:gYear
    GYear,
    /// xs:gMonthDay
    GMonthDay,
    /// xs:gDay
    GDay,
    /// xs:gMonth
    GMonth,
}

/// A date/time value as a point on the time line, normalized to UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CalendarValue {
    /// Which datatype produced the value
    pub kind: CalendarKind,
    /// The instant, shifted to UTC when a timezone was given
    pub instant: NaiveDateTime,
    /// Whether the lexical form carried a timezone
    pub has_timezone: bool,
}

fn parse_year(s: &str) -> LexicalResult<i32> {
    let digits = s.trim_start_matches('-');
    if digits.len() > 4 && digits.starts_with('0') {
        return Err("year has leading zeros".to_string());
    }
    let year = s.parse::<i32>().map_err(|_| "year out of range".to_string())?;
    if year == 0 {
        return Err("year 0000 is not allowed".to_string());
    }
    Ok(year)
}

fn parse_two_digits(s: &str) -> LexicalResult<u32> {
    s.parse::<u32>().map_err(|_| "invalid number".to_string())
}

/// Timezone offset in minutes east of UTC
fn parse_timezone(tz: Option<&str>) -> LexicalResult<Option<i64>> {
    let Some(tz) = tz else {
        return Ok(None);
    };
    if tz == "Z" {
        return Ok(Some(0));
    }
    let sign = if tz.starts_with('-') { -1 } else { 1 };
    let hours = parse_two_digits(&tz[1..3])? as i64;
    let minutes = parse_two_digits(&tz[4..6])? as i64;
    if minutes > 59 || hours > 14 || (hours == 14 && minutes > 0) {
        return Err("timezone out of range".to_string());
    }
    Ok(Some(sign * (hours * 60 + minutes)))
}

fn nanos_from_fraction(fraction: Option<&str>) -> u32 {
    let Some(fraction) = fraction else {
        return 0;
    };
    let digits: String = fraction
        .trim_start_matches('.')
        .chars()
        .chain(std::iter::repeat('0'))
        .take(9)
        .collect();
    digits.parse::<u32>().unwrap_or(0)
}

fn make_date(year: i32, month: u32, day: u32) -> LexicalResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| "invalid date".to_string())
}

/// Build the time of day, accepting 24:00:00 as the end of the day
fn make_time(hour: u32, minute: u32, second: u32, nanos: u32) -> LexicalResult<(NaiveTime, bool)> {
    if hour == 24 {
        if minute == 0 && second == 0 && nanos == 0 {
            return Ok((NaiveTime::MIN, true));
        }
        return Err("invalid time".to_string());
    }
    NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
        .map(|t| (t, false))
        .ok_or_else(|| "invalid time".to_string())
}

fn finish(
    kind: CalendarKind,
    date: NaiveDate,
    time: NaiveTime,
    end_of_day: bool,
    tz: Option<i64>,
) -> LexicalResult<CalendarValue> {
    let mut instant = date.and_time(time);
    if end_of_day {
        instant = instant
            .checked_add_signed(ChronoDuration::days(1))
            .ok_or_else(|| "date out of range".to_string())?;
    }
    if let Some(offset) = tz {
        instant = instant
            .checked_sub_signed(ChronoDuration::minutes(offset))
            .ok_or_else(|| "date out of range".to_string())?;
    }
    Ok(CalendarValue {
        kind,
        instant,
        has_timezone: tz.is_some(),
    })
}

/// Convert a date/time lexical value of the given kind
pub fn calendar_from_lexical(kind: CalendarKind, value: &str) -> LexicalResult<CalendarValue> {
    let invalid = || format!("not a valid {}", calendar_kind_label(kind));

    match kind {
        CalendarKind::DateTime => {
            let c = DATE_TIME_REGEX.captures(value).ok_or_else(invalid)?;
            let date = make_date(
                parse_year(&c[1])?,
                parse_two_digits(&c[2])?,
                parse_two_digits(&c[3])?,
            )?;
            let (time, end_of_day) = make_time(
                parse_two_digits(&c[4])?,
                parse_two_digits(&c[5])?,
                parse_two_digits(&c[6])?,
                nanos_from_fraction(c.get(7).map(|m| m.as_str())),
            )?;
            finish(kind, date, time, end_of_day, parse_timezone(c.get(8).map(|m| m.as_str()))?)
        }
        CalendarKind::Date => {
            let c = DATE_REGEX.captures(value).ok_or_else(invalid)?;
            let date = make_date(
                parse_year(&c[1])?,
                parse_two_digits(&c[2])?,
                parse_two_digits(&c[3])?,
            )?;
            finish(kind, date, NaiveTime::MIN, false, parse_timezone(c.get(4).map(|m| m.as_str()))?)
        }
        CalendarKind::Time => {
            let c = TIME_REGEX.captures(value).ok_or_else(invalid)?;
            let date = make_date(REFERENCE_YEAR, 1, 1)?;
            let (time, end_of_day) = make_time(
                parse_two_digits(&c[1])?,
                parse_two_digits(&c[2])?,
                parse_two_digits(&c[3])?,
                nanos_from_fraction(c.get(4).map(|m| m.as_str())),
            )?;
            finish(kind, date, time, end_of_day, parse_timezone(c.get(5).map(|m| m.as_str()))?)
        }
        CalendarKind::GYearMonth => {
            let c = G_YEAR_MONTH_REGEX.captures(value).ok_or_else(invalid)?;
            let date = make_date(parse_year(&c[1])?, parse_two_digits(&c[2])?, 1)?;
            finish(kind, date, NaiveTime::MIN, false, parse_timezone(c.get(3).map(|m| m.as_str()))?)
        }
        CalendarKind::GYear => {
            let c = G_YEAR_REGEX.captures(value).ok_or_else(invalid)?;
            let date = make_date(parse_year(&c[1])?, 1, 1)?;
            finish(kind, date, NaiveTime::MIN, false, parse_timezone(c.get(2).map(|m| m.as_str()))?)
        }
        CalendarKind::GMonthDay => {
            let c = G_MONTH_DAY_REGEX.captures(value).ok_or_else(invalid)?;
            let date = make_date(
                REFERENCE_YEAR,
                parse_two_digits(&c[1])?,
                parse_two_digits(&c[2])?,
            )?;
            finish(kind, date, NaiveTime::MIN, false, parse_timezone(c.get(3).map(|m| m.as_str()))?)
        }
        CalendarKind::GDay => {
            let c = G_DAY_REGEX.captures(value).ok_or_else(invalid)?;
            let date = make_date(REFERENCE_YEAR, 1, parse_two_digits(&c[1])?)?;
            finish(kind, date, NaiveTime::MIN, false, parse_timezone(c.get(2).map(|m| m.as_str()))?)
        }
        CalendarKind::GMonth => {
            let c = G_MONTH_REGEX.captures(value).ok_or_else(invalid)?;
            let date = make_date(REFERENCE_YEAR, parse_two_digits(&c[1])?, 1)?;
            finish(kind, date, NaiveTime::MIN, false, parse_timezone(c.get(2).map(|m| m.as_str()))?)
        }
    }
}

fn calendar_kind_label(kind: CalendarKind) -> &'static str {
    match kind {
        CalendarKind::DateTime => "dateTime",
        CalendarKind::Date => "date",
        CalendarKind::Time => "time",
        CalendarKind::GYearMonth => "gYearMonth",
        CalendarKind::GYear => "gYear",
        CalendarKind::GMonthDay => "gMonthDay",
        CalendarKind::GDay => "gDay",
        CalendarKind::GMonth => "gMonth",
    }
}

// =============================================================================
// Tests
// =============================================================================
