//! Value type parsers for iCalendar (RFC 5545 §3.3).

use std::str::FromStr;

use chrono::NaiveDate;

use super::error::{ParseError, ParseErrorKind, ParseResult};
use crate::error::RfcResult;
use crate::rfc::ical::core::{
    DateTime, DateTimeForm, Duration, Frequency, Period, RRule, RRuleUntil, RecurrencePattern,
    UtcOffset, Weekday, WeekdayNum,
};

/// Parses a fixed-width run of ASCII digits.
fn digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Parses a DATE value (RFC 5545 §3.3.4).
///
/// Format: YYYYMMDD (e.g., "19970714")
///
/// ## Errors
/// Returns an error if the string is not an 8-digit calendar date.
pub fn parse_date(s: &str) -> ParseResult<NaiveDate> {
    let err = || ParseError::new(ParseErrorKind::InvalidDate, s);
    if s.len() != 8 {
        return Err(err());
    }

    let year = s.get(0..4).and_then(digits).ok_or_else(err)?;
    let month = s.get(4..6).and_then(digits).ok_or_else(err)?;
    let day = s.get(6..8).and_then(digits).ok_or_else(err)?;
    let year = i32::try_from(year).map_err(|_e| err())?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(err)
}

/// Parses a DATE-TIME value (RFC 5545 §3.3.5).
///
/// Format: YYYYMMDD"T"HHMMSS[Z] (e.g., "19970714T133000Z")
///
/// A trailing `Z` makes the value UTC and wins over `tzid`. Without it the
/// value is zoned when `tzid` is given and floating otherwise. A leap second
/// (`60`) is read as `59`.
///
/// ## Errors
/// Returns an error if the string is not a valid date-time.
pub fn parse_datetime(s: &str, tzid: Option<&str>) -> ParseResult<DateTime> {
    let err = || ParseError::new(ParseErrorKind::InvalidDateTime, s);
    let (date_str, time_str) = s.split_once('T').ok_or_else(err)?;
    let date = parse_date(date_str).map_err(|_e| err())?;

    let (time_str, is_utc) = match time_str.strip_suffix('Z') {
        Some(stripped) => (stripped, true),
        None => (time_str, false),
    };
    if time_str.len() != 6 {
        return Err(ParseError::new(ParseErrorKind::InvalidTime, s));
    }
    let time_err = || ParseError::new(ParseErrorKind::InvalidTime, s);
    let hour = time_str.get(0..2).and_then(digits).ok_or_else(time_err)?;
    let minute = time_str.get(2..4).and_then(digits).ok_or_else(time_err)?;
    let second = time_str.get(4..6).and_then(digits).ok_or_else(time_err)?;
    if second > 60 {
        return Err(time_err());
    }
    let value = date
        .and_hms_opt(hour, minute, second.min(59))
        .ok_or_else(time_err)?;

    let form = match tzid.map(str::trim) {
        _ if is_utc => DateTimeForm::Utc,
        Some("") => {
            return Err(err().with_context("TZID must not be empty"));
        }
        Some(tz) => DateTimeForm::Zoned {
            tzid: tz.to_string(),
        },
        None => DateTimeForm::Floating,
    };

    Ok(DateTime::from_naive(value, form))
}

/// Parses either a DATE or a DATE-TIME, depending on whether a time part is present.
///
/// ## Errors
/// Returns an error if the string is neither a valid date nor a valid date-time.
pub fn parse_date_or_datetime(s: &str, tzid: Option<&str>) -> ParseResult<DateTime> {
    if s.contains('T') {
        parse_datetime(s, tzid)
    } else {
        parse_date(s).map(DateTime::from_date)
    }
}

/// Parses a UTC-OFFSET value (RFC 5545 §3.3.14).
///
/// Format: (+|-)HHMM[SS] (e.g., "+0530", "-0800")
///
/// ## Errors
/// Returns an error if the string is not a valid UTC offset, including the
/// forbidden `-0000`.
pub fn parse_utc_offset(s: &str) -> ParseResult<UtcOffset> {
    let err = || ParseError::new(ParseErrorKind::InvalidUtcOffset, s);
    if s.len() != 5 && s.len() != 7 {
        return Err(err());
    }

    let negative = match s.as_bytes().first() {
        Some(b'+') => false,
        Some(b'-') => true,
        _ => return Err(err()),
    };

    let hours = s.get(1..3).and_then(digits).ok_or_else(err)?;
    let minutes = s.get(3..5).and_then(digits).ok_or_else(err)?;
    let seconds = match s.get(5..) {
        Some("") | None => 0,
        Some(rest) => digits(rest).ok_or_else(err)?,
    };
    if minutes > 59 || seconds > 59 {
        return Err(err());
    }

    let magnitude = i32::try_from(hours * 3600 + minutes * 60 + seconds).map_err(|_e| err())?;
    if negative && magnitude == 0 {
        return Err(err().with_context("-0000 is not a valid offset"));
    }
    UtcOffset::from_seconds(if negative { -magnitude } else { magnitude }).ok_or_else(err)
}

/// Parses a DURATION value (RFC 5545 §3.3.6).
///
/// Format: [+|-]P[nW] or [+|-]P[nD][T[nH][nM][nS]]
///
/// Designators must appear in descending order; each at most once.
///
/// ## Errors
/// Returns an error if the string is not a valid duration format.
pub fn parse_duration(s: &str) -> ParseResult<Duration> {
    let err = || ParseError::new(ParseErrorKind::InvalidDuration, s);

    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let body = rest.strip_prefix('P').ok_or_else(err)?;

    let mut duration = Duration {
        negative,
        ..Duration::zero()
    };
    let mut in_time = false;
    let mut time_parts = 0;
    let mut parts = 0;
    let mut last_rank = 0;
    let mut number_start = None;

    for (i, c) in body.char_indices() {
        if c.is_ascii_digit() {
            number_start.get_or_insert(i);
            continue;
        }
        if c == 'T' {
            if in_time || number_start.is_some() {
                return Err(err());
            }
            in_time = true;
            continue;
        }

        let start = number_start.take().ok_or_else(err)?;
        let value = digits(&body[start..i]).ok_or_else(err)?;
        let rank = match (c, in_time) {
            ('W', false) => {
                duration.weeks = value;
                1
            }
            ('D', false) => {
                duration.days = value;
                2
            }
            ('H', true) => {
                duration.hours = value;
                3
            }
            ('M', true) => {
                duration.minutes = value;
                4
            }
            ('S', true) => {
                duration.seconds = value;
                5
            }
            _ => return Err(err().with_context(format!("unexpected designator '{c}'"))),
        };
        if rank <= last_rank {
            return Err(err().with_context("designators out of order"));
        }
        last_rank = rank;
        parts += 1;
        if in_time {
            time_parts += 1;
        }
    }

    if number_start.is_some() || parts == 0 || (in_time && time_parts == 0) {
        return Err(err());
    }
    Ok(duration)
}

/// Parses a PERIOD value (RFC 5545 §3.3.9).
///
/// Format: start"/"end or start"/"duration
///
/// ## Errors
/// Returns an error if the string is not a valid period, or if the period
/// breaks an ordering or form constraint (end before start, negative
/// duration, mixed zone modes).
pub fn parse_period(s: &str, tzid: Option<&str>) -> ParseResult<Period> {
    let err = || ParseError::new(ParseErrorKind::InvalidPeriod, s);
    let (start_str, end_str) = s.split_once('/').ok_or_else(err)?;

    let start = parse_datetime(start_str, tzid)?;

    let period = if end_str.starts_with('P') || end_str.starts_with('+') || end_str.starts_with('-')
    {
        Period::from_duration(start, parse_duration(end_str)?)
    } else {
        Period::with_end(start, parse_datetime(end_str, tzid)?)
    };
    period.map_err(|e| err().with_context(e.to_string()))
}

/// Parses a comma-separated RDATE/EXDATE value list of DATE or DATE-TIME values.
///
/// ## Errors
/// Returns an error if any entry fails to parse.
pub fn parse_date_list(s: &str, tzid: Option<&str>) -> ParseResult<Vec<DateTime>> {
    s.split(',')
        .map(|v| parse_date_or_datetime(v.trim(), tzid))
        .collect()
}

/// Parses a comma-separated RDATE value list. Entries containing `/` are
/// periods; other entries become single-instant periods.
///
/// ## Errors
/// Returns an error if any entry fails to parse.
pub fn parse_period_list(s: &str, tzid: Option<&str>) -> ParseResult<Vec<Period>> {
    s.split(',')
        .map(str::trim)
        .map(|v| {
            if v.contains('/') {
                parse_period(v, tzid)
            } else {
                parse_date_or_datetime(v, tzid).map(Period::instant)
            }
        })
        .collect()
}

/// Parses a RECUR (RRULE) value (RFC 5545 §3.3.10).
///
/// An optional leading `RRULE:` is accepted. Unknown rule parts are ignored.
/// No range checks happen here; see `parse_recurrence_pattern`.
///
/// ## Errors
/// Returns an error if the string is not a syntactically valid recurrence rule.
pub fn parse_rrule(s: &str) -> ParseResult<RRule> {
    let body = s.strip_prefix("RRULE:").unwrap_or(s);
    let mut rrule = RRule::new();

    for part in body.split(';').filter(|part| !part.is_empty()) {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| ParseError::new(ParseErrorKind::InvalidRRule, s))?;
        parse_rrule_part(&mut rrule, key, value)
            .map_err(|e| ParseError { input: s.to_string(), ..e })?;
    }

    Ok(rrule)
}

/// ## Summary
/// Parses and validates a RECUR value in one step.
///
/// ## Errors
/// Returns a parse error for malformed text and a validation error when the
/// rule breaks a recurrence invariant (missing FREQ, out-of-range values).
pub fn parse_recurrence_pattern(s: &str) -> RfcResult<RecurrencePattern> {
    parse_rrule(s)?.build()
}

/// Parses a single RRULE key-value pair.
fn parse_rrule_part(rrule: &mut RRule, key: &str, value: &str) -> ParseResult<()> {
    let invalid = || ParseError::new(ParseErrorKind::InvalidRRule, value);
    match key.to_ascii_uppercase().as_str() {
        "FREQ" => {
            rrule.freq = Some(
                Frequency::parse(value)
                    .ok_or_else(|| ParseError::new(ParseErrorKind::InvalidFrequency, value))?,
            );
        }
        "INTERVAL" => {
            rrule.interval = Some(digits(value).ok_or_else(invalid)?);
        }
        "COUNT" => {
            if rrule.until.is_some() {
                return Err(ParseError::new(ParseErrorKind::UntilCountConflict, value));
            }
            rrule.count = Some(digits(value).ok_or_else(invalid)?);
        }
        "UNTIL" => {
            if rrule.count.is_some() {
                return Err(ParseError::new(ParseErrorKind::UntilCountConflict, value));
            }
            // UNTIL can be DATE or DATE-TIME
            rrule.until = Some(if value.contains('T') {
                RRuleUntil::DateTime(parse_datetime(value, None)?)
            } else {
                RRuleUntil::Date(parse_date(value)?)
            });
        }
        "WKST" => {
            rrule.wkst = Some(
                Weekday::parse(value)
                    .ok_or_else(|| ParseError::new(ParseErrorKind::InvalidWeekday, value))?,
            );
        }
        "BYSECOND" => rrule.by_second = parse_list(value)?,
        "BYMINUTE" => rrule.by_minute = parse_list(value)?,
        "BYHOUR" => rrule.by_hour = parse_list(value)?,
        "BYDAY" => {
            rrule.by_day = value
                .split(',')
                .map(|v| parse_weekday_num(v.trim()))
                .collect::<ParseResult<_>>()?;
        }
        "BYMONTHDAY" => rrule.by_monthday = parse_list(value)?,
        "BYYEARDAY" => rrule.by_yearday = parse_list(value)?,
        "BYWEEKNO" => rrule.by_weekno = parse_list(value)?,
        "BYMONTH" => rrule.by_month = parse_list(value)?,
        "BYSETPOS" => rrule.by_setpos = parse_list(value)?,
        _ => {} // Unknown rule part - ignore
    }
    Ok(())
}

/// Parses a comma-separated list of integers.
fn parse_list<T: FromStr>(s: &str) -> ParseResult<Vec<T>> {
    s.split(',')
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_e| ParseError::new(ParseErrorKind::InvalidRRule, s))
        })
        .collect()
}

/// Parses a single weekday with optional ordinal (e.g., "MO", "1MO", "-1FR").
fn parse_weekday_num(s: &str) -> ParseResult<WeekdayNum> {
    let err = || ParseError::new(ParseErrorKind::InvalidWeekday, s);
    let split = s.len().checked_sub(2).ok_or_else(err)?;
    let ordinal_str = s.get(..split).ok_or_else(err)?;
    let weekday = s.get(split..).and_then(Weekday::parse).ok_or_else(err)?;

    let ordinal = if ordinal_str.is_empty() {
        None
    } else {
        Some(
            ordinal_str
                .parse()
                .map_err(|_e| ParseError::new(ParseErrorKind::InvalidRRule, s))?,
        )
    };

    Ok(WeekdayNum { ordinal, weekday })
}
