//! iCalendar RRULE (Recurrence Rule) value type (RFC 5545 §3.3.10, §3.8.5.3).
//!
//! `RRule` is the raw rule as written; `RecurrencePattern` is the validated
//! form that the evaluator consumes.

use std::fmt;

use chrono::NaiveDate;

use super::DateTime;
use crate::error::{RfcError, RfcResult};

/// Recurrence frequency (RFC 5545 §3.3.10), ordered from finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Secondly => "SECONDLY",
            Self::Minutely => "MINUTELY",
            Self::Hourly => "HOURLY",
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }

    /// Parses a frequency from a string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.to_ascii_uppercase().as_str() {
            "SECONDLY" => Self::Secondly,
            "MINUTELY" => Self::Minutely,
            "HOURLY" => Self::Hourly,
            "DAILY" => Self::Daily,
            "WEEKLY" => Self::Weekly,
            "MONTHLY" => Self::Monthly,
            "YEARLY" => Self::Yearly,
            _ => return None,
        })
    }

    /// Returns whether the frequency steps in units shorter than a day.
    #[must_use]
    pub const fn is_sub_daily(self) -> bool {
        matches!(self, Self::Secondly | Self::Minutely | Self::Hourly)
    }

    /// Step length in seconds for sub-daily frequencies.
    pub(crate) const fn unit_seconds(self) -> Option<i64> {
        match self {
            Self::Secondly => Some(1),
            Self::Minutely => Some(60),
            Self::Hourly => Some(3600),
            Self::Daily | Self::Weekly | Self::Monthly | Self::Yearly => None,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    /// Returns the two-letter abbreviation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sunday => "SU",
            Self::Monday => "MO",
            Self::Tuesday => "TU",
            Self::Wednesday => "WE",
            Self::Thursday => "TH",
            Self::Friday => "FR",
            Self::Saturday => "SA",
        }
    }

    /// Parses a weekday from a two-letter abbreviation (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.to_ascii_uppercase().as_str() {
            "SU" => Self::Sunday,
            "MO" => Self::Monday,
            "TU" => Self::Tuesday,
            "WE" => Self::Wednesday,
            "TH" => Self::Thursday,
            "FR" => Self::Friday,
            "SA" => Self::Saturday,
            _ => return None,
        })
    }

    /// Converts to the chrono weekday.
    #[must_use]
    pub const fn to_chrono(self) -> chrono::Weekday {
        match self {
            Self::Sunday => chrono::Weekday::Sun,
            Self::Monday => chrono::Weekday::Mon,
            Self::Tuesday => chrono::Weekday::Tue,
            Self::Wednesday => chrono::Weekday::Wed,
            Self::Thursday => chrono::Weekday::Thu,
            Self::Friday => chrono::Weekday::Fri,
            Self::Saturday => chrono::Weekday::Sat,
        }
    }

    /// Converts from the chrono weekday.
    #[must_use]
    pub const fn from_chrono(weekday: chrono::Weekday) -> Self {
        match weekday {
            chrono::Weekday::Sun => Self::Sunday,
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
            chrono::Weekday::Sat => Self::Saturday,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Weekday with optional occurrence number.
///
/// Used in BYDAY rule part. Examples:
/// - `MO` - every Monday
/// - `1MO` - first Monday of the month/year
/// - `-1FR` - last Friday of the month/year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekdayNum {
    /// Optional occurrence number (-53 to 53, excluding 0).
    pub ordinal: Option<i8>,
    /// The day of the week.
    pub weekday: Weekday,
}

impl WeekdayNum {
    /// Creates a weekday occurrence without an ordinal.
    #[must_use]
    pub const fn every(weekday: Weekday) -> Self {
        Self {
            ordinal: None,
            weekday,
        }
    }

    /// Creates a weekday occurrence with an ordinal. The ordinal range is
    /// checked when the rule is validated.
    #[must_use]
    pub const fn nth(ordinal: i8, weekday: Weekday) -> Self {
        Self {
            ordinal: Some(ordinal),
            weekday,
        }
    }
}

impl fmt::Display for WeekdayNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(n) = self.ordinal {
            write!(f, "{n}")?;
        }
        write!(f, "{}", self.weekday)
    }
}

/// UNTIL value for RRULE - can be either DATE or DATE-TIME.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RRuleUntil {
    /// Date-only boundary (inclusive).
    Date(NaiveDate),
    /// Date-time boundary (inclusive, must be UTC if DTSTART has TZID or is UTC).
    DateTime(DateTime),
}

impl fmt::Display for RRuleUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(d) => write!(f, "{}", d.format("%Y%m%d")),
            Self::DateTime(dt) => write!(f, "{dt}"),
        }
    }
}

/// Recurrence rule as written (RFC 5545 §3.3.10, §3.8.5.3).
///
/// No invariants are enforced here; convert into a `RecurrencePattern` to
/// validate it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RRule {
    /// Recurrence frequency (required).
    pub freq: Option<Frequency>,

    /// Recurrence interval (default: 1).
    /// Defines how often the frequency repeats.
    pub interval: Option<u32>,

    /// End date/time of the recurrence (mutually exclusive with count).
    pub until: Option<RRuleUntil>,

    /// Number of occurrences (mutually exclusive with until).
    pub count: Option<u32>,

    /// Week start day (default: Monday).
    pub wkst: Option<Weekday>,

    /// By-second list (0-60, 60 for leap second).
    pub by_second: Vec<u8>,

    /// By-minute list (0-59).
    pub by_minute: Vec<u8>,

    /// By-hour list (0-23).
    pub by_hour: Vec<u8>,

    /// By-day list with optional occurrence numbers.
    pub by_day: Vec<WeekdayNum>,

    /// By-monthday list (-31 to 31, excluding 0).
    pub by_monthday: Vec<i8>,

    /// By-yearday list (-366 to 366, excluding 0).
    pub by_yearday: Vec<i16>,

    /// By-weekno list (-53 to 53, excluding 0).
    pub by_weekno: Vec<i8>,

    /// By-month list (1-12).
    pub by_month: Vec<u8>,

    /// By-setpos list (-366 to 366, excluding 0).
    /// Filters on position within the frequency period.
    pub by_setpos: Vec<i16>,
}

impl RRule {
    /// Creates a new empty recurrence rule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a rule with the given frequency.
    #[must_use]
    pub fn for_frequency(freq: Frequency) -> Self {
        Self {
            freq: Some(freq),
            ..Self::default()
        }
    }

    /// Creates a daily recurrence rule.
    #[must_use]
    pub fn daily() -> Self {
        Self::for_frequency(Frequency::Daily)
    }

    /// Creates a weekly recurrence rule.
    #[must_use]
    pub fn weekly() -> Self {
        Self::for_frequency(Frequency::Weekly)
    }

    /// Creates a monthly recurrence rule.
    #[must_use]
    pub fn monthly() -> Self {
        Self::for_frequency(Frequency::Monthly)
    }

    /// Creates a yearly recurrence rule.
    #[must_use]
    pub fn yearly() -> Self {
        Self::for_frequency(Frequency::Yearly)
    }

    /// Sets the interval.
    #[must_use]
    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Sets the count.
    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self.until = None; // Mutually exclusive
        self
    }

    /// Sets the until date.
    #[must_use]
    pub fn with_until_date(mut self, date: NaiveDate) -> Self {
        self.until = Some(RRuleUntil::Date(date));
        self.count = None; // Mutually exclusive
        self
    }

    /// Sets the until date-time.
    #[must_use]
    pub fn with_until_datetime(mut self, datetime: DateTime) -> Self {
        self.until = Some(RRuleUntil::DateTime(datetime));
        self.count = None; // Mutually exclusive
        self
    }

    /// Sets the week start day.
    #[must_use]
    pub fn with_wkst(mut self, wkst: Weekday) -> Self {
        self.wkst = Some(wkst);
        self
    }

    /// Sets the by-second list.
    #[must_use]
    pub fn with_by_second(mut self, seconds: Vec<u8>) -> Self {
        self.by_second = seconds;
        self
    }

    /// Sets the by-minute list.
    #[must_use]
    pub fn with_by_minute(mut self, minutes: Vec<u8>) -> Self {
        self.by_minute = minutes;
        self
    }

    /// Sets the by-hour list.
    #[must_use]
    pub fn with_by_hour(mut self, hours: Vec<u8>) -> Self {
        self.by_hour = hours;
        self
    }

    /// Sets the by-day list.
    #[must_use]
    pub fn with_by_day(mut self, days: Vec<WeekdayNum>) -> Self {
        self.by_day = days;
        self
    }

    /// Sets the by-monthday list.
    #[must_use]
    pub fn with_by_monthday(mut self, days: Vec<i8>) -> Self {
        self.by_monthday = days;
        self
    }

    /// Sets the by-yearday list.
    #[must_use]
    pub fn with_by_yearday(mut self, days: Vec<i16>) -> Self {
        self.by_yearday = days;
        self
    }

    /// Sets the by-weekno list.
    #[must_use]
    pub fn with_by_weekno(mut self, weeks: Vec<i8>) -> Self {
        self.by_weekno = weeks;
        self
    }

    /// Sets the by-month list.
    #[must_use]
    pub fn with_by_month(mut self, months: Vec<u8>) -> Self {
        self.by_month = months;
        self
    }

    /// Sets the by-setpos list.
    #[must_use]
    pub fn with_by_setpos(mut self, positions: Vec<i16>) -> Self {
        self.by_setpos = positions;
        self
    }

    /// ## Summary
    /// Validates this rule into a `RecurrencePattern`.
    ///
    /// ## Errors
    /// Returns a validation error under the same conditions as
    /// `RecurrencePattern::try_from`.
    pub fn build(self) -> RfcResult<RecurrencePattern> {
        RecurrencePattern::try_from(self)
    }
}

fn push_list<T: fmt::Display>(parts: &mut Vec<String>, name: &str, values: &[T]) {
    if !values.is_empty() {
        let s: Vec<_> = values.iter().map(ToString::to_string).collect();
        parts.push(format!("{name}={}", s.join(",")));
    }
}

impl fmt::Display for RRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        if let Some(ref freq) = self.freq {
            parts.push(format!("FREQ={freq}"));
        }

        if let Some(interval) = self.interval
            && interval != 1
        {
            parts.push(format!("INTERVAL={interval}"));
        }

        if let Some(ref until) = self.until {
            parts.push(format!("UNTIL={until}"));
        }

        if let Some(count) = self.count {
            parts.push(format!("COUNT={count}"));
        }

        if let Some(wkst) = self.wkst {
            parts.push(format!("WKST={wkst}"));
        }

        push_list(&mut parts, "BYSECOND", &self.by_second);
        push_list(&mut parts, "BYMINUTE", &self.by_minute);
        push_list(&mut parts, "BYHOUR", &self.by_hour);
        push_list(&mut parts, "BYDAY", &self.by_day);
        push_list(&mut parts, "BYMONTHDAY", &self.by_monthday);
        push_list(&mut parts, "BYYEARDAY", &self.by_yearday);
        push_list(&mut parts, "BYWEEKNO", &self.by_weekno);
        push_list(&mut parts, "BYMONTH", &self.by_month);
        push_list(&mut parts, "BYSETPOS", &self.by_setpos);

        write!(f, "{}", parts.join(";"))
    }
}

/// How a recurrence ends.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Termination {
    /// Stop after this many instances.
    Count(u32),
    /// Stop after the last instance on or before this bound.
    Until(RRuleUntil),
}

/// A validated recurrence rule.
///
/// Guarantees: a frequency is present, the interval is at least 1, COUNT and
/// UNTIL are not both set, every BY-list value lies in its legal range, and
/// no BY-list holds duplicates (first occurrence order is kept).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecurrencePattern {
    freq: Frequency,
    interval: u32,
    termination: Option<Termination>,
    wkst: Weekday,
    by_second: Vec<u8>,
    by_minute: Vec<u8>,
    by_hour: Vec<u8>,
    by_day: Vec<WeekdayNum>,
    by_monthday: Vec<i8>,
    by_yearday: Vec<i16>,
    by_weekno: Vec<i8>,
    by_month: Vec<u8>,
    by_setpos: Vec<i16>,
}

impl RecurrencePattern {
    /// Creates a pattern with only a frequency: interval 1, no end, weeks
    /// starting on Monday and no BY-filters.
    #[must_use]
    pub const fn new(freq: Frequency) -> Self {
        Self {
            freq,
            interval: 1,
            termination: None,
            wkst: Weekday::Monday,
            by_second: Vec::new(),
            by_minute: Vec::new(),
            by_hour: Vec::new(),
            by_day: Vec::new(),
            by_monthday: Vec::new(),
            by_yearday: Vec::new(),
            by_weekno: Vec::new(),
            by_month: Vec::new(),
            by_setpos: Vec::new(),
        }
    }

    /// Starts a raw rule with the given frequency, to be finished with
    /// `RRule::build`.
    #[must_use]
    pub fn builder(freq: Frequency) -> RRule {
        RRule::for_frequency(freq)
    }

    #[must_use]
    pub const fn freq(&self) -> Frequency {
        self.freq
    }

    #[must_use]
    pub const fn interval(&self) -> u32 {
        self.interval
    }

    #[must_use]
    pub const fn termination(&self) -> Option<&Termination> {
        self.termination.as_ref()
    }

    /// Returns the COUNT limit, if the pattern ends by count.
    #[must_use]
    pub const fn count(&self) -> Option<u32> {
        match self.termination {
            Some(Termination::Count(count)) => Some(count),
            Some(Termination::Until(_)) | None => None,
        }
    }

    /// Returns the UNTIL bound, if the pattern ends by date.
    #[must_use]
    pub const fn until(&self) -> Option<&RRuleUntil> {
        match &self.termination {
            Some(Termination::Until(until)) => Some(until),
            Some(Termination::Count(_)) | None => None,
        }
    }

    #[must_use]
    pub const fn wkst(&self) -> Weekday {
        self.wkst
    }

    #[must_use]
    pub fn by_second(&self) -> &[u8] {
        &self.by_second
    }

    #[must_use]
    pub fn by_minute(&self) -> &[u8] {
        &self.by_minute
    }

    #[must_use]
    pub fn by_hour(&self) -> &[u8] {
        &self.by_hour
    }

    #[must_use]
    pub fn by_day(&self) -> &[WeekdayNum] {
        &self.by_day
    }

    #[must_use]
    pub fn by_monthday(&self) -> &[i8] {
        &self.by_monthday
    }

    #[must_use]
    pub fn by_yearday(&self) -> &[i16] {
        &self.by_yearday
    }

    #[must_use]
    pub fn by_weekno(&self) -> &[i8] {
        &self.by_weekno
    }

    #[must_use]
    pub fn by_month(&self) -> &[u8] {
        &self.by_month
    }

    #[must_use]
    pub fn by_setpos(&self) -> &[i16] {
        &self.by_setpos
    }

    /// Converts back to a raw rule.
    #[must_use]
    pub fn to_rrule(&self) -> RRule {
        let (count, until) = match &self.termination {
            Some(Termination::Count(count)) => (Some(*count), None),
            Some(Termination::Until(until)) => (None, Some(until.clone())),
            None => (None, None),
        };
        RRule {
            freq: Some(self.freq),
            interval: Some(self.interval),
            until,
            count,
            wkst: (self.wkst != Weekday::Monday).then_some(self.wkst),
            by_second: self.by_second.clone(),
            by_minute: self.by_minute.clone(),
            by_hour: self.by_hour.clone(),
            by_day: self.by_day.clone(),
            by_monthday: self.by_monthday.clone(),
            by_yearday: self.by_yearday.clone(),
            by_weekno: self.by_weekno.clone(),
            by_month: self.by_month.clone(),
            by_setpos: self.by_setpos.clone(),
        }
    }

    /// Replaces the termination. Used where an UNTIL bound has to be
    /// re-expressed in another time base.
    pub(crate) fn with_termination(mut self, termination: Option<Termination>) -> Self {
        self.termination = termination;
        self
    }
}

impl TryFrom<RRule> for RecurrencePattern {
    type Error = RfcError;

    /// ## Summary
    /// Validates a raw rule.
    ///
    /// ## Errors
    /// Returns `RfcError::ValidationError` if FREQ is missing, INTERVAL is zero,
    /// COUNT and UNTIL are both set, a BY-list value is out of range, or a
    /// BY-list is used with a frequency RFC 5545 forbids it for.
    fn try_from(rule: RRule) -> RfcResult<Self> {
        let freq = rule
            .freq
            .ok_or_else(|| RfcError::invalid("RRULE requires FREQ"))?;

        let interval = rule.interval.unwrap_or(1);
        if interval == 0 {
            return Err(RfcError::invalid("RRULE INTERVAL must be at least 1"));
        }

        let termination = match (rule.count, rule.until) {
            (Some(_), Some(_)) => {
                return Err(RfcError::invalid(
                    "RRULE COUNT and UNTIL are mutually exclusive",
                ));
            }
            (Some(count), None) => Some(Termination::Count(count)),
            (None, Some(until)) => Some(Termination::Until(until)),
            (None, None) => None,
        };

        // Leap seconds have no representation, so 60 is refused outright.
        check_values("BYSECOND", &rule.by_second, |v| v <= 59)?;
        check_values("BYMINUTE", &rule.by_minute, |v| v <= 59)?;
        check_values("BYHOUR", &rule.by_hour, |v| v <= 23)?;
        check_values("BYMONTHDAY", &rule.by_monthday, |v| signed_within(v.into(), 31))?;
        check_values("BYYEARDAY", &rule.by_yearday, |v| signed_within(v.into(), 366))?;
        check_values("BYWEEKNO", &rule.by_weekno, |v| signed_within(v.into(), 53))?;
        check_values("BYMONTH", &rule.by_month, |v| (1..=12).contains(&v))?;
        check_values("BYSETPOS", &rule.by_setpos, |v| signed_within(v.into(), 366))?;
        check_values("BYDAY", &rule.by_day, |v| {
            v.ordinal.is_none_or(|n| signed_within(n.into(), 53))
        })?;
        check_frequency_scope(freq, &rule.by_day, &rule.by_weekno)?;

        Ok(Self {
            freq,
            interval,
            termination,
            wkst: rule.wkst.unwrap_or(Weekday::Monday),
            by_second: dedup_ordered(rule.by_second),
            by_minute: dedup_ordered(rule.by_minute),
            by_hour: dedup_ordered(rule.by_hour),
            by_day: dedup_ordered(rule.by_day),
            by_monthday: dedup_ordered(rule.by_monthday),
            by_yearday: dedup_ordered(rule.by_yearday),
            by_weekno: dedup_ordered(rule.by_weekno),
            by_month: dedup_ordered(rule.by_month),
            by_setpos: dedup_ordered(rule.by_setpos),
        })
    }
}

impl fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rrule())
    }
}

fn check_values<T: Copy + fmt::Display>(
    name: &str,
    values: &[T],
    valid: impl Fn(T) -> bool,
) -> RfcResult<()> {
    match values.iter().find(|value| !valid(**value)) {
        Some(value) => Err(RfcError::invalid(format!(
            "RRULE {name} value {value} is out of range"
        ))),
        None => Ok(()),
    }
}

/// BYDAY ordinals only exist for MONTHLY and YEARLY rules, BYWEEKNO only
/// for YEARLY ones, and the two never combine.
fn check_frequency_scope(
    freq: Frequency,
    by_day: &[WeekdayNum],
    by_weekno: &[i8],
) -> RfcResult<()> {
    let ordinal = by_day.iter().find(|day| day.ordinal.is_some());
    if let Some(day) = ordinal
        && !matches!(freq, Frequency::Monthly | Frequency::Yearly)
    {
        return Err(RfcError::invalid(format!(
            "RRULE BYDAY value {day} needs FREQ=MONTHLY or FREQ=YEARLY, not {freq}"
        )));
    }
    if by_weekno.is_empty() {
        return Ok(());
    }
    if freq != Frequency::Yearly {
        return Err(RfcError::invalid(format!(
            "RRULE BYWEEKNO needs FREQ=YEARLY, not {freq}"
        )));
    }
    match ordinal {
        Some(day) => Err(RfcError::invalid(format!(
            "RRULE BYDAY value {day} cannot be combined with BYWEEKNO"
        ))),
        None => Ok(()),
    }
}

const fn signed_within(value: i32, max: i32) -> bool {
    value != 0 && value.abs() <= max
}

fn dedup_ordered<T: PartialEq>(values: Vec<T>) -> Vec<T> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rrule_display_basic() {
        let rrule = RRule::daily().with_count(10);
        assert_eq!(rrule.to_string(), "FREQ=DAILY;COUNT=10");
    }

    #[test]
    fn test_rrule_display_weekly_byday() {
        let rrule = RRule::weekly().with_by_day(vec![
            WeekdayNum::every(Weekday::Monday),
            WeekdayNum::every(Weekday::Wednesday),
            WeekdayNum::every(Weekday::Friday),
        ]);
        assert_eq!(rrule.to_string(), "FREQ=WEEKLY;BYDAY=MO,WE,FR");
    }

    #[test]
    fn test_rrule_display_monthly_nth() {
        let rrule = RRule::monthly().with_by_day(vec![WeekdayNum::nth(-1, Weekday::Friday)]);
        assert_eq!(rrule.to_string(), "FREQ=MONTHLY;BYDAY=-1FR");
    }

    #[test]
    fn test_rrule_display_with_interval() {
        let rrule = RRule::weekly().with_interval(2);
        assert_eq!(rrule.to_string(), "FREQ=WEEKLY;INTERVAL=2");
    }

    #[test]
    fn test_weekday_parse() {
        assert_eq!(Weekday::parse("MO"), Some(Weekday::Monday));
        assert_eq!(Weekday::parse("fr"), Some(Weekday::Friday));
        assert_eq!(Weekday::parse("XX"), None);
    }

    #[test]
    fn test_frequency_parse() {
        assert_eq!(Frequency::parse("DAILY"), Some(Frequency::Daily));
        assert_eq!(Frequency::parse("weekly"), Some(Frequency::Weekly));
        assert_eq!(Frequency::parse("INVALID"), None);
        assert!(Frequency::Hourly < Frequency::Daily);
    }

    #[test]
    fn test_pattern_defaults() {
        let pattern = RRule::monthly().build().expect("valid rule");
        assert_eq!(pattern.freq(), Frequency::Monthly);
        assert_eq!(pattern.interval(), 1);
        assert_eq!(pattern.wkst(), Weekday::Monday);
        assert!(pattern.termination().is_none());
        assert_eq!(pattern, RecurrencePattern::new(Frequency::Monthly));
    }

    #[test]
    fn test_pattern_requires_frequency_and_interval() {
        assert!(RecurrencePattern::try_from(RRule::new()).is_err());
        assert!(RRule::daily().with_interval(0).build().is_err());
    }

    #[test]
    fn test_pattern_rejects_count_with_until() {
        let rule = RRule {
            count: Some(3),
            until: Some(RRuleUntil::Date(
                NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            )),
            ..RRule::daily()
        };
        assert!(matches!(
            RecurrencePattern::try_from(rule),
            Err(RfcError::ValidationError(_))
        ));
    }

    #[test]
    fn test_pattern_rejects_out_of_range_values() {
        assert!(RRule::monthly().with_by_monthday(vec![32]).build().is_err());
        assert!(RRule::monthly().with_by_monthday(vec![0]).build().is_err());
        assert!(RRule::monthly().with_by_monthday(vec![-31]).build().is_ok());
        assert!(RRule::yearly().with_by_month(vec![13]).build().is_err());
        assert!(RRule::yearly().with_by_weekno(vec![54]).build().is_err());
        assert!(RRule::yearly().with_by_yearday(vec![-367]).build().is_err());
        assert!(RRule::daily().with_by_hour(vec![24]).build().is_err());
        assert!(RRule::daily().with_by_second(vec![59]).build().is_ok());
        assert!(RRule::daily().with_by_second(vec![60]).build().is_err());
        assert!(RRule::monthly().with_by_setpos(vec![0]).build().is_err());
        assert!(
            RRule::yearly()
                .with_by_day(vec![WeekdayNum::nth(54, Weekday::Monday)])
                .build()
                .is_err()
        );
        assert!(
            RRule::yearly()
                .with_by_day(vec![WeekdayNum::nth(-53, Weekday::Monday)])
                .build()
                .is_ok()
        );
    }

    #[test]
    fn test_pattern_rejects_filters_outside_their_frequency() {
        let second_monday = vec![WeekdayNum::nth(2, Weekday::Monday)];
        for rule in [
            RRule::weekly().with_by_day(second_monday.clone()),
            RRule::daily().with_by_day(second_monday.clone()),
            RRule::monthly().with_by_weekno(vec![3]),
            RRule::weekly().with_by_weekno(vec![3]),
            RRule::yearly()
                .with_by_weekno(vec![20])
                .with_by_day(second_monday.clone()),
        ] {
            let text = rule.to_string();
            assert!(
                matches!(
                    RecurrencePattern::try_from(rule),
                    Err(RfcError::ValidationError(_))
                ),
                "{text} should be rejected"
            );
        }

        assert!(RRule::monthly().with_by_day(second_monday.clone()).build().is_ok());
        assert!(RRule::yearly().with_by_day(second_monday).build().is_ok());
        assert!(
            RRule::yearly()
                .with_by_weekno(vec![20])
                .with_by_day(vec![WeekdayNum::every(Weekday::Monday)])
                .build()
                .is_ok()
        );
        assert!(
            RRule::weekly()
                .with_by_day(vec![WeekdayNum::every(Weekday::Monday)])
                .build()
                .is_ok()
        );
    }

    #[test]
    fn test_pattern_removes_duplicates_in_order() {
        let pattern = RRule::monthly()
            .with_by_monthday(vec![15, 1, 15, -1, 1])
            .with_by_day(vec![
                WeekdayNum::nth(2, Weekday::Monday),
                WeekdayNum::every(Weekday::Monday),
                WeekdayNum::nth(2, Weekday::Monday),
            ])
            .build()
            .unwrap();
        assert_eq!(pattern.by_monthday(), &[15, 1, -1]);
        assert_eq!(
            pattern.by_day(),
            &[
                WeekdayNum::nth(2, Weekday::Monday),
                WeekdayNum::every(Weekday::Monday)
            ]
        );
    }

    #[test]
    fn test_pattern_display_round_trips_through_rrule() {
        let pattern = RRule::yearly()
            .with_by_month(vec![6, 9])
            .with_by_day(vec![WeekdayNum::nth(2, Weekday::Monday)])
            .with_count(4)
            .build()
            .unwrap();
        assert_eq!(pattern.to_string(), "FREQ=YEARLY;COUNT=4;BYDAY=2MO;BYMONTH=6,9");
        assert_eq!(pattern.to_rrule().build().unwrap(), pattern);
    }
}
