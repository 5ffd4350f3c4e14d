//! Recurrence expansion for iCalendar components.
//!
//! Zone resolution, custom VTIMEZONE zones, lazy RRULE evaluation and the
//! occurrence aggregation built on top of them.

mod occurrence;
mod rrule;
mod timezone;
mod vtimezone;

pub use occurrence::{
    MergedOccurrences, Occurrence, Occurrences, RecurrenceIndex, RecurrenceSet, TimeRange,
};
pub use rrule::{ExpansionError, ExpansionOptions, Periods, RuleIter};
pub use timezone::{ConversionError, TimeZone, TimeZoneResolver, Transition};
pub use vtimezone::{Observance, ObservanceKind, VTimezone};
