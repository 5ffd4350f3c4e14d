//! iCalendar DATE and DATE-TIME values (RFC 5545 §3.3.4, §3.3.5).

use std::cmp::Ordering;
use std::fmt;

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};

use super::Duration;
use crate::error::{RfcError, RfcResult};
use crate::rfc::ical::expand::{ConversionError, TimeZone, TimeZoneResolver};

/// UTC offset representation (e.g., +0530, -0800).
///
/// Stored as total seconds from UTC. Offsets must be less than a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtcOffset {
    /// Total seconds from UTC (positive = east, negative = west).
    seconds: i32,
}

impl UtcOffset {
    /// UTC offset (zero).
    pub const UTC: Self = Self { seconds: 0 };

    const LIMIT: i32 = 86_400;

    /// Creates a UTC offset from total seconds.
    ///
    /// Returns `None` when the offset is a full day or more.
    #[must_use]
    pub const fn from_seconds(seconds: i32) -> Option<Self> {
        if seconds > -Self::LIMIT && seconds < Self::LIMIT {
            Some(Self { seconds })
        } else {
            None
        }
    }

    /// Creates a UTC offset from a sign and hour/minute magnitudes.
    #[must_use]
    pub fn from_hours_minutes(negative: bool, hours: u8, minutes: u8) -> Option<Self> {
        if minutes > 59 {
            return None;
        }
        let magnitude = i32::from(hours) * 3600 + i32::from(minutes) * 60;
        Self::from_seconds(if negative { -magnitude } else { magnitude })
    }

    /// Returns the offset as total seconds from UTC.
    #[must_use]
    pub const fn as_seconds(self) -> i32 {
        self.seconds
    }

    /// Returns the offset as a signed time delta.
    #[must_use]
    pub fn as_delta(self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.seconds))
    }

    /// Returns hours component (may be negative).
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "Offsets are bounded to less than 24 hours, truncation to i8 is safe"
    )]
    pub const fn hours(self) -> i8 {
        (self.seconds / 3600) as i8
    }

    /// Returns minutes component (always positive).
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "Minutes component is always 0-59, truncation and sign loss to u8 are safe"
    )]
    pub const fn minutes(self) -> u8 {
        ((self.seconds.abs() % 3600) / 60) as u8
    }
}

impl fmt::Display for UtcOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.seconds >= 0 { '+' } else { '-' };
        let total = self.seconds.abs();
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let seconds = total % 60;
        if seconds == 0 {
            write!(f, "{sign}{hours:02}{minutes:02}")
        } else {
            write!(f, "{sign}{hours:02}{minutes:02}{seconds:02}")
        }
    }
}

/// Form of DATE-TIME value (RFC 5545 §3.3.5).
///
/// iCalendar DATE-TIME values come in three mutually exclusive forms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DateTimeForm {
    /// Floating time - same wall-clock time in any timezone.
    ///
    /// Example: `19980118T230000`
    Floating,

    /// UTC time - absolute instant, indicated by 'Z' suffix.
    ///
    /// Example: `19980119T070000Z`
    Utc,

    /// Zoned time - local time with TZID reference.
    ///
    /// Example: `TZID=America/New_York:19980119T020000`
    Zoned {
        /// The timezone identifier, resolved through a `TimeZoneResolver`.
        tzid: String,
    },
}

/// Position of a value on the shared timeline.
///
/// Zoned and UTC values map to their UTC instant; floating values and dates
/// map to their wall-clock reading taken as UTC. The `has_time` flag keeps a
/// DATE from ever matching a DATE-TIME at midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct TimelineKey {
    pub(crate) instant: NaiveDateTime,
    pub(crate) has_time: bool,
}

impl TimelineKey {
    pub(crate) fn as_utc(self) -> chrono::DateTime<Utc> {
        self.instant.and_utc()
    }
}

/// A DATE or DATE-TIME value, optionally bound to a time zone.
///
/// Values are immutable; arithmetic returns new values in the same form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DateTime {
    value: NaiveDateTime,
    has_time: bool,
    form: DateTimeForm,
}

impl DateTime {
    /// ## Summary
    /// Creates a floating DATE-TIME.
    ///
    /// ## Errors
    /// Returns a validation error if the components do not name a real date and time.
    pub fn floating(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> RfcResult<Self> {
        let value = checked_datetime(year, month, day, hour, minute, second)?;
        Ok(Self::from_naive(value, DateTimeForm::Floating))
    }

    /// ## Summary
    /// Creates a UTC DATE-TIME.
    ///
    /// ## Errors
    /// Returns a validation error if the components do not name a real date and time.
    pub fn utc(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> RfcResult<Self> {
        let value = checked_datetime(year, month, day, hour, minute, second)?;
        Ok(Self::from_naive(value, DateTimeForm::Utc))
    }

    /// ## Summary
    /// Creates a zoned DATE-TIME. The TZID is not resolved until the value is
    /// converted or compared.
    ///
    /// ## Errors
    /// Returns a validation error if the components do not name a real date
    /// and time or if the TZID is empty.
    pub fn zoned(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        tzid: impl Into<String>,
    ) -> RfcResult<Self> {
        let tzid = tzid.into();
        if tzid.trim().is_empty() {
            return Err(RfcError::invalid("TZID must not be empty"));
        }
        let value = checked_datetime(year, month, day, hour, minute, second)?;
        Ok(Self::from_naive(value, DateTimeForm::Zoned { tzid }))
    }

    /// ## Summary
    /// Creates a DATE value (no time component).
    ///
    /// ## Errors
    /// Returns a validation error if the components do not name a real date.
    pub fn date(year: i32, month: u32, day: u32) -> RfcResult<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            RfcError::invalid(format!("invalid date {year:04}-{month:02}-{day:02}"))
        })?;
        Ok(Self::from_date(date))
    }

    /// Creates a DATE-TIME from a wall-clock value and form.
    #[must_use]
    pub const fn from_naive(value: NaiveDateTime, form: DateTimeForm) -> Self {
        Self {
            value,
            has_time: true,
            form,
        }
    }

    /// Creates a DATE value from a calendar date.
    #[must_use]
    pub const fn from_date(date: NaiveDate) -> Self {
        Self {
            value: NaiveDateTime::new(date, NaiveTime::MIN),
            has_time: false,
            form: DateTimeForm::Floating,
        }
    }

    /// Returns the wall-clock reading. DATE values read as midnight.
    #[must_use]
    pub const fn naive(&self) -> NaiveDateTime {
        self.value
    }

    /// Returns the calendar date.
    #[must_use]
    pub const fn date_part(&self) -> NaiveDate {
        self.value.date()
    }

    /// Returns the time of day, or `None` for a DATE value.
    #[must_use]
    pub fn time(&self) -> Option<NaiveTime> {
        self.has_time.then_some(self.value.time())
    }

    /// Returns whether this value carries a time component.
    #[must_use]
    pub const fn has_time(&self) -> bool {
        self.has_time
    }

    /// Returns the form (floating, UTC or zoned).
    #[must_use]
    pub const fn form(&self) -> &DateTimeForm {
        &self.form
    }

    /// Returns whether this is a UTC time.
    #[must_use]
    pub const fn is_utc(&self) -> bool {
        matches!(self.form, DateTimeForm::Utc)
    }

    /// Returns whether this is a floating time.
    #[must_use]
    pub const fn is_floating(&self) -> bool {
        matches!(self.form, DateTimeForm::Floating)
    }

    /// Returns the timezone ID if this is a zoned time.
    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        match &self.form {
            DateTimeForm::Zoned { tzid } => Some(tzid),
            DateTimeForm::Floating | DateTimeForm::Utc => None,
        }
    }

    /// Returns whether both values use the same form (and the same TZID).
    #[must_use]
    pub fn same_form(&self, other: &Self) -> bool {
        self.form == other.form
    }

    /// ## Summary
    /// Converts this value to a UTC instant.
    ///
    /// Floating values and dates are read as UTC wall clock.
    ///
    /// ## Errors
    /// Returns a conversion error if the TZID cannot be resolved.
    pub fn to_utc(&self, resolver: &TimeZoneResolver) -> RfcResult<chrono::DateTime<Utc>> {
        Ok(self.timeline_key(resolver)?.as_utc())
    }

    /// ## Summary
    /// Re-expresses this value as wall clock in another zone.
    ///
    /// DATE values carry no instant and are returned unchanged.
    ///
    /// ## Errors
    /// Returns a conversion error if either TZID cannot be resolved.
    pub fn in_timezone(&self, tzid: &str, resolver: &TimeZoneResolver) -> RfcResult<Self> {
        if !self.has_time {
            return Ok(self.clone());
        }
        let instant = self.to_utc(resolver)?;
        let zone = resolver.resolve(tzid)?;
        Ok(Self::from_naive(
            zone.to_local(instant),
            DateTimeForm::Zoned {
                tzid: tzid.to_string(),
            },
        ))
    }

    /// ## Summary
    /// Adds a duration, preserving the form of this value.
    ///
    /// Weeks and days move the wall clock; hours, minutes and seconds move the
    /// instant. Zoned results are re-resolved against the zone, so a wall time
    /// that lands in a DST gap is shifted past it. Adding a time component to
    /// a DATE yields a DATE-TIME.
    ///
    /// ## Errors
    /// Returns an error if the TZID cannot be resolved or the result is out of range.
    pub fn add_duration(&self, duration: &Duration, resolver: &TimeZoneResolver) -> RfcResult<Self> {
        let zone = self.zone(resolver)?;
        self.add_duration_in(duration, zone.as_ref())
    }

    /// ## Summary
    /// Compares two values on the timeline.
    ///
    /// Returns `None` when one value is a DATE and the other a DATE-TIME.
    /// Values compare by instant when both carry a zone (UTC or TZID), and by
    /// wall clock otherwise.
    ///
    /// ## Errors
    /// Returns a conversion error if a TZID cannot be resolved.
    pub fn partial_cmp_in(
        &self,
        other: &Self,
        resolver: &TimeZoneResolver,
    ) -> RfcResult<Option<Ordering>> {
        if self.has_time != other.has_time {
            return Ok(None);
        }
        if self.is_floating() || other.is_floating() {
            return Ok(Some(self.value.cmp(&other.value)));
        }
        Ok(Some(self.to_utc(resolver)?.cmp(&other.to_utc(resolver)?)))
    }

    /// ## Summary
    /// Like `partial_cmp_in`, but a DATE against a DATE-TIME is an error.
    ///
    /// ## Errors
    /// Returns `ConversionError::Incomparable` when exactly one value has a
    /// time component, or a conversion error if a TZID cannot be resolved.
    pub fn cmp_in(&self, other: &Self, resolver: &TimeZoneResolver) -> RfcResult<Ordering> {
        self.partial_cmp_in(other, resolver)?.ok_or_else(|| {
            ConversionError::Incomparable(format!("{self} and {other}")).into()
        })
    }

    /// Resolves the zone of a zoned value.
    pub(crate) fn zone(&self, resolver: &TimeZoneResolver) -> RfcResult<Option<TimeZone>> {
        match &self.form {
            DateTimeForm::Zoned { tzid } => Ok(Some(resolver.resolve(tzid)?)),
            DateTimeForm::Floating | DateTimeForm::Utc => Ok(None),
        }
    }

    pub(crate) fn timeline_key(&self, resolver: &TimeZoneResolver) -> RfcResult<TimelineKey> {
        let zone = self.zone(resolver)?;
        self.timeline_key_in(zone.as_ref())
    }

    /// Timeline position using an already resolved zone.
    pub(crate) fn timeline_key_in(&self, zone: Option<&TimeZone>) -> RfcResult<TimelineKey> {
        let instant = match (&self.form, zone) {
            (DateTimeForm::Zoned { .. }, Some(zone)) if self.has_time => {
                zone.to_utc(self.value)?.naive_utc()
            }
            _ => self.value,
        };
        Ok(TimelineKey {
            instant,
            has_time: self.has_time,
        })
    }

    pub(crate) fn add_duration_in(
        &self,
        duration: &Duration,
        zone: Option<&TimeZone>,
    ) -> RfcResult<Self> {
        let out_of_range = || RfcError::invalid(format!("{self} + {duration} is out of range"));
        let wall = shift_days(self.value, duration.nominal_days()).ok_or_else(out_of_range)?;
        let exact = TimeDelta::seconds(duration.exact_seconds());
        let has_time = self.has_time || duration.has_time_component();

        let value = match (&self.form, zone) {
            (DateTimeForm::Zoned { .. }, Some(zone)) if has_time => {
                let instant = zone.to_utc(wall)?;
                let shifted = instant.checked_add_signed(exact).ok_or_else(out_of_range)?;
                zone.to_local(shifted)
            }
            _ => wall.checked_add_signed(exact).ok_or_else(out_of_range)?,
        };

        Ok(Self {
            value,
            has_time,
            form: self.form.clone(),
        })
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.has_time {
            return write!(f, "{}", self.value.format("%Y%m%d"));
        }
        write!(f, "{}", self.value.format("%Y%m%dT%H%M%S"))?;
        if self.is_utc() {
            write!(f, "Z")?;
        }
        Ok(())
    }
}

/// Moves a wall-clock value by whole calendar days.
fn shift_days(value: NaiveDateTime, days: i64) -> Option<NaiveDateTime> {
    let magnitude = Days::new(days.unsigned_abs());
    if days >= 0 {
        value.checked_add_days(magnitude)
    } else {
        value.checked_sub_days(magnitude)
    }
}

fn checked_datetime(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> RfcResult<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or_else(|| {
            RfcError::invalid(format!(
                "invalid date-time {year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}"
            ))
        })
}
