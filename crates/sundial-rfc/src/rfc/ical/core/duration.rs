//! iCalendar DURATION value type (RFC 5545 §3.3.6).

use std::fmt;

use chrono::TimeDelta;

use crate::error::{RfcError, RfcResult};

const SECONDS_PER_DAY: i64 = 86_400;

/// Duration value (RFC 5545 §3.3.6).
///
/// Represents a duration of time. iCalendar durations can be either:
/// - Week-based: `P1W` (1 week)
/// - Day/time-based: `P1DT2H30M` (1 day, 2 hours, 30 minutes)
///
/// Weeks and days are nominal: added to a zoned value they move the wall
/// clock, so a day across a DST change is 23 or 25 hours long. Hours, minutes
/// and seconds are exact.
///
/// Note: iCalendar does not support year/month designators in durations
/// because months have variable lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Duration {
    /// Whether this duration is negative.
    pub negative: bool,
    /// Number of weeks.
    pub weeks: u32,
    /// Number of days.
    pub days: u32,
    /// Number of hours.
    pub hours: u32,
    /// Number of minutes.
    pub minutes: u32,
    /// Number of seconds.
    pub seconds: u32,
}

impl Duration {
    /// Creates a new zero duration.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            negative: false,
            weeks: 0,
            days: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }

    /// Creates a duration from weeks.
    #[must_use]
    pub const fn weeks(weeks: u32) -> Self {
        Self {
            weeks,
            ..Self::zero()
        }
    }

    /// Creates a duration from days.
    #[must_use]
    pub const fn days(days: u32) -> Self {
        Self {
            days,
            ..Self::zero()
        }
    }

    /// Creates a duration from hours.
    #[must_use]
    pub const fn hours(hours: u32) -> Self {
        Self {
            hours,
            ..Self::zero()
        }
    }

    /// Creates a duration from minutes.
    #[must_use]
    pub const fn minutes(minutes: u32) -> Self {
        Self {
            minutes,
            ..Self::zero()
        }
    }

    /// Creates a duration from seconds.
    #[must_use]
    pub const fn seconds(seconds: u32) -> Self {
        Self {
            seconds,
            ..Self::zero()
        }
    }

    /// ## Summary
    /// Creates a duration from signed components.
    ///
    /// ## Errors
    /// Returns a validation error if non-zero components disagree in sign or a
    /// component magnitude does not fit the value range.
    pub fn from_parts(
        weeks: i64,
        days: i64,
        hours: i64,
        minutes: i64,
        seconds: i64,
    ) -> RfcResult<Self> {
        let parts = [weeks, days, hours, minutes, seconds];
        let negative = parts.iter().any(|part| *part < 0);
        if negative && parts.iter().any(|part| *part > 0) {
            return Err(RfcError::invalid(format!(
                "duration components must share one sign: {parts:?}"
            )));
        }

        let magnitude = |part: i64| {
            u32::try_from(part.unsigned_abs())
                .map_err(|_e| RfcError::invalid(format!("duration component {part} is too large")))
        };

        Ok(Self {
            negative,
            weeks: magnitude(weeks)?,
            days: magnitude(days)?,
            hours: magnitude(hours)?,
            minutes: magnitude(minutes)?,
            seconds: magnitude(seconds)?,
        })
    }

    /// ## Summary
    /// Creates a canonical day/time duration from an elapsed time.
    ///
    /// Whole days become the day component; sub-second precision is dropped.
    ///
    /// ## Errors
    /// Returns a validation error if the day count does not fit the value range.
    pub fn from_time_delta(delta: TimeDelta) -> RfcResult<Self> {
        let total = delta.num_seconds();
        let magnitude = total.unsigned_abs();
        let days = u32::try_from(magnitude / 86_400)
            .map_err(|_e| RfcError::invalid(format!("elapsed time {delta} is too large")))?;
        let rest = magnitude % 86_400;
        let part = |value: u64| u32::try_from(value).unwrap_or(u32::MAX);

        Ok(Self {
            negative: total < 0,
            weeks: 0,
            days,
            hours: part(rest / 3600),
            minutes: part((rest % 3600) / 60),
            seconds: part(rest % 60),
        })
    }

    /// Creates a new duration builder.
    #[must_use]
    pub const fn builder() -> DurationBuilder {
        DurationBuilder::new()
    }

    /// Returns whether this is a week-based duration.
    #[must_use]
    pub const fn is_week_based(&self) -> bool {
        self.weeks > 0
    }

    /// Returns whether every component is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.weeks == 0 && self.days == 0 && !self.has_time_component()
    }

    /// Returns whether this duration is strictly below zero.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.negative && !self.is_zero()
    }

    /// Returns whether hours, minutes or seconds are set.
    #[must_use]
    pub const fn has_time_component(&self) -> bool {
        self.hours > 0 || self.minutes > 0 || self.seconds > 0
    }

    /// Negates this duration.
    #[must_use]
    pub const fn negate(mut self) -> Self {
        self.negative = !self.negative;
        self
    }

    /// Signed number of calendar days (weeks count as seven days).
    #[must_use]
    pub fn nominal_days(&self) -> i64 {
        self.signed(i64::from(self.weeks) * 7 + i64::from(self.days))
    }

    /// Signed number of exact seconds from the hour, minute and second parts.
    #[must_use]
    pub fn exact_seconds(&self) -> i64 {
        self.signed(
            i64::from(self.hours) * 3600 + i64::from(self.minutes) * 60 + i64::from(self.seconds),
        )
    }

    /// Returns the total duration as seconds, counting a day as 24 hours.
    #[must_use]
    pub fn as_seconds(&self) -> i64 {
        self.nominal_days() * SECONDS_PER_DAY + self.exact_seconds()
    }

    /// Converts to an elapsed time, counting a day as 24 hours.
    ///
    /// Exact for floating and UTC values; zoned arithmetic should go through
    /// `DateTime::add_duration` instead.
    #[must_use]
    pub fn to_time_delta(&self) -> TimeDelta {
        TimeDelta::seconds(self.as_seconds())
    }

    const fn signed(&self, magnitude: i64) -> i64 {
        if self.negative { -magnitude } else { magnitude }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-")?;
        }
        write!(f, "P")?;

        if self.is_week_based() && self.days == 0 && !self.has_time_component() {
            return write!(f, "{}W", self.weeks);
        }

        let days = u64::from(self.weeks) * 7 + u64::from(self.days);
        if days > 0 {
            write!(f, "{days}D")?;
        }
        if self.has_time_component() {
            write!(f, "T")?;
            if self.hours > 0 {
                write!(f, "{}H", self.hours)?;
            }
            if self.minutes > 0 {
                write!(f, "{}M", self.minutes)?;
            }
            if self.seconds > 0 {
                write!(f, "{}S", self.seconds)?;
            }
        } else if days == 0 {
            // Zero duration: P0D
            write!(f, "0D")?;
        } else {
            // Days only
        }
        Ok(())
    }
}

/// Builder for constructing `Duration` values.
#[derive(Debug, Clone, Copy, Default)]
pub struct DurationBuilder {
    inner: Duration,
}

impl DurationBuilder {
    /// Creates a new duration builder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: Duration::zero(),
        }
    }

    /// Sets the duration as negative.
    #[must_use]
    pub const fn negative(mut self) -> Self {
        self.inner.negative = true;
        self
    }

    /// Sets the weeks component.
    #[must_use]
    pub const fn weeks(mut self, weeks: u32) -> Self {
        self.inner.weeks = weeks;
        self
    }

    /// Sets the days component.
    #[must_use]
    pub const fn days(mut self, days: u32) -> Self {
        self.inner.days = days;
        self
    }

    /// Sets the hours component.
    #[must_use]
    pub const fn hours(mut self, hours: u32) -> Self {
        self.inner.hours = hours;
        self
    }

    /// Sets the minutes component.
    #[must_use]
    pub const fn minutes(mut self, minutes: u32) -> Self {
        self.inner.minutes = minutes;
        self
    }

    /// Sets the seconds component.
    #[must_use]
    pub const fn seconds(mut self, seconds: u32) -> Self {
        self.inner.seconds = seconds;
        self
    }

    /// Builds the duration.
    #[must_use]
    pub const fn build(self) -> Duration {
        self.inner
    }
}
