//! iCalendar PERIOD value type (RFC 5545 §3.3.9).

use std::fmt;

use super::{DateTime, Duration};
use crate::error::{RfcError, RfcResult};
use crate::rfc::ical::expand::TimeZoneResolver;

/// How far a period extends past its start.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PeriodSpan {
    /// No end or duration: a single instant.
    Instant,
    /// Explicit end value.
    End(DateTime),
    /// Duration from the start.
    Duration(Duration),
}

/// PERIOD value (RFC 5545 §3.3.9).
///
/// A start plus at most one of an end or a duration. All invariants are
/// checked on construction:
/// - end is not before start
/// - duration is not negative
/// - start and end share the same form (and TZID) and the same time flag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Period {
    start: DateTime,
    span: PeriodSpan,
}

impl Period {
    /// Creates a single-instant period.
    #[must_use]
    pub const fn instant(start: DateTime) -> Self {
        Self {
            start,
            span: PeriodSpan::Instant,
        }
    }

    /// ## Summary
    /// Creates a period from a start and an explicit end.
    ///
    /// ## Errors
    /// Returns a validation error if the values differ in form or time flag, or
    /// if the end lies before the start.
    pub fn with_end(start: DateTime, end: DateTime) -> RfcResult<Self> {
        if start.has_time() != end.has_time() {
            return Err(RfcError::invalid(format!(
                "period {start}/{end} mixes DATE and DATE-TIME values"
            )));
        }
        if !start.same_form(&end) {
            return Err(RfcError::invalid(format!(
                "period {start}/{end} mixes time zone modes"
            )));
        }
        // Same form, so wall clock order is timeline order.
        if end.naive() < start.naive() {
            return Err(RfcError::invalid(format!(
                "period end {end} is before start {start}"
            )));
        }
        Ok(Self {
            start,
            span: PeriodSpan::End(end),
        })
    }

    /// ## Summary
    /// Creates a period from a start and a duration.
    ///
    /// ## Errors
    /// Returns a validation error if the duration is negative, or if it has a
    /// time component while the start is a DATE.
    pub fn from_duration(start: DateTime, duration: Duration) -> RfcResult<Self> {
        if duration.is_negative() {
            return Err(RfcError::invalid(format!(
                "period duration {duration} is negative"
            )));
        }
        if !start.has_time() && duration.has_time_component() {
            return Err(RfcError::invalid(format!(
                "period starting on DATE {start} cannot last {duration}"
            )));
        }
        Ok(Self {
            start,
            span: PeriodSpan::Duration(duration),
        })
    }

    /// Builds an occurrence period from an already validated base duration.
    pub(crate) const fn with_base_duration(start: DateTime, duration: Duration) -> Self {
        let span = if duration.is_zero() {
            PeriodSpan::Instant
        } else {
            PeriodSpan::Duration(duration)
        };
        Self { start, span }
    }

    /// Returns the start of the period.
    #[must_use]
    pub const fn start(&self) -> &DateTime {
        &self.start
    }

    /// Returns how the period extends past its start.
    #[must_use]
    pub const fn span(&self) -> &PeriodSpan {
        &self.span
    }

    /// Returns whether the period carries neither an end nor a duration.
    #[must_use]
    pub const fn is_instant(&self) -> bool {
        matches!(self.span, PeriodSpan::Instant)
    }

    /// ## Summary
    /// Returns the end, derived from the duration when only that is present.
    /// A single-instant period ends at its start.
    ///
    /// ## Errors
    /// Returns an error if the start's TZID cannot be resolved.
    pub fn effective_end(&self, resolver: &TimeZoneResolver) -> RfcResult<DateTime> {
        match &self.span {
            PeriodSpan::Instant => Ok(self.start.clone()),
            PeriodSpan::End(end) => Ok(end.clone()),
            PeriodSpan::Duration(duration) => self.start.add_duration(duration, resolver),
        }
    }

    /// ## Summary
    /// Returns the duration, derived from the end when only that is present.
    ///
    /// DATE periods measure whole days; DATE-TIME periods measure elapsed time
    /// between the two instants.
    ///
    /// ## Errors
    /// Returns an error if a TZID cannot be resolved.
    pub fn effective_duration(&self, resolver: &TimeZoneResolver) -> RfcResult<Duration> {
        match &self.span {
            PeriodSpan::Instant => Ok(Duration::zero()),
            PeriodSpan::Duration(duration) => Ok(*duration),
            PeriodSpan::End(end) if !self.start.has_time() => {
                let days = (end.date_part() - self.start.date_part()).num_days();
                Duration::from_parts(0, days, 0, 0, 0)
            }
            PeriodSpan::End(end) => {
                Duration::from_time_delta(end.to_utc(resolver)? - self.start.to_utc(resolver)?)
            }
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.span {
            PeriodSpan::Instant => write!(f, "{}", self.start),
            PeriodSpan::End(end) => write!(f, "{}/{end}", self.start),
            PeriodSpan::Duration(duration) => write!(f, "{}/{duration}", self.start),
        }
    }
}
