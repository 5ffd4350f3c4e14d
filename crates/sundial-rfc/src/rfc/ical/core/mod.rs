//! Temporal value model for recurrence evaluation (RFC 5545 §3.3).
//!
//! Values are immutable and carry enough information (form, TZID, time flag)
//! to be placed on a single timeline once their zones are resolved.

mod datetime;
mod duration;
mod period;
mod recurrence_id;
mod rrule;

pub(crate) use datetime::TimelineKey;
pub use datetime::{DateTime, DateTimeForm, UtcOffset};
pub use duration::{Duration, DurationBuilder};
pub use period::{Period, PeriodSpan};
pub use recurrence_id::{RecurrenceId, RecurrenceRange};
pub use rrule::{
    Frequency, RRule, RRuleUntil, RecurrencePattern, Termination, Weekday, WeekdayNum,
};
